use serde::{Deserialize, Serialize};

use super::schedule::{Availability, BlockedSlot, ScheduleEntry};

/// Clients, providers and admins share one table; provider-only fields are
/// ignored for the other roles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub is_special: bool,
    pub earnings: i64,
    pub schedule: Vec<ScheduleEntry>,
    pub blocked_slots: Vec<BlockedSlot>,
}

impl User {
    pub fn is_provider(&self) -> bool {
        self.role == Role::Provider
    }

    pub fn availability(&self) -> Availability {
        Availability::new(self.schedule.clone(), self.blocked_slots.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Provider,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Provider => "provider",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "provider" => Role::Provider,
            "admin" => Role::Admin,
            _ => Role::Client,
        }
    }
}
