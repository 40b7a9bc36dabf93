use axum::http::HeaderMap;

use crate::errors::AppError;

/// Who is making a request. Identity itself comes from the upstream identity
/// provider; this only reads what it forwards.
#[derive(Debug, Clone, PartialEq)]
pub enum Caller {
    Admin,
    User(String),
    Anonymous,
}

fn bearer_token(headers: &HeaderMap) -> &str {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    auth.strip_prefix("Bearer ").unwrap_or("")
}

impl Caller {
    pub fn from_headers(headers: &HeaderMap, admin_token: &str) -> Self {
        if !admin_token.is_empty() && bearer_token(headers) == admin_token {
            return Caller::Admin;
        }

        match headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
        {
            Some(id) if !id.is_empty() => Caller::User(id.to_string()),
            _ => Caller::Anonymous,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Caller::Admin)
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Caller::User(id) => Some(id),
            _ => None,
        }
    }

    /// Admins manage everything; a provider manages only their own bookings
    /// and schedule.
    pub fn can_manage(&self, provider_id: &str) -> bool {
        self.is_admin() || self.user_id() == Some(provider_id)
    }
}

pub fn require_admin(headers: &HeaderMap, admin_token: &str) -> Result<(), AppError> {
    if admin_token.is_empty() || bearer_token(headers) != admin_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}
