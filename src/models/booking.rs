use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::schedule::{parse_date, parse_time};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub provider_id: String,
    pub client_id: Option<String>,
    pub client_name: String,
    pub client_email: String,
    pub service_id: Option<String>,
    pub service_name: Option<ServiceName>,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`, 24h
    pub time: String,
    pub status: BookingStatus,
    pub note: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Booking {
    /// Session start in the provider's local frame.
    pub fn starts_at(&self) -> anyhow::Result<NaiveDateTime> {
        Ok(parse_date(&self.date)?.and_time(parse_time(&self.time)?))
    }
}

/// Display label captured when the booking is made. Either plain text or the
/// bilingual pair the catalog uses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ServiceName {
    Text(String),
    Localized { en: String, mn: String },
}

impl ServiceName {
    pub fn display(&self) -> &str {
        match self {
            ServiceName::Text(s) => s,
            ServiceName::Localized { en, mn } if en.is_empty() => mn,
            ServiceName::Localized { en, .. } => en,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Rejected,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Rejected => "rejected",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "rejected" => Some(BookingStatus::Rejected),
            "completed" => Some(BookingStatus::Completed),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Rejected | BookingStatus::Completed | BookingStatus::Cancelled
        )
    }

    /// Whether a booking in this status still holds its provider slot.
    pub fn holds_slot(&self) -> bool {
        !matches!(self, BookingStatus::Rejected | BookingStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: &BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Rejected)
                | (Pending, Cancelled)
                | (Confirmed, Rejected)
                | (Confirmed, Cancelled)
                | (Confirmed, Completed)
        )
    }
}
