use std::env;

use chrono::Duration;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    pub admin_email: String,
    pub mail_api_url: String,
    pub mail_api_key: String,
    pub mail_from: String,
    pub cors_allow_origin: Option<String>,
    pub settlement: SettlementRates,
    pub sessions: SessionPolicy,
}

/// Amounts credited when a booking completes, in whole currency units.
#[derive(Clone, Debug, PartialEq)]
pub struct SettlementRates {
    pub standard_amount: i64,
    pub special_amount: i64,
    pub commission_amount: i64,
}

impl Default for SettlementRates {
    fn default() -> Self {
        Self {
            standard_amount: 50_000,
            special_amount: 100_000,
            commission_amount: 10_000,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SweepMode {
    /// Expired sessions complete only when someone lists bookings.
    Lazy,
    /// Listings still sweep, and a periodic task sweeps every confirmed booking.
    Background { interval_secs: u64 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct SessionPolicy {
    pub grace_minutes: i64,
    pub slot_interval_minutes: i64,
    pub sweep: SweepMode,
}

impl SessionPolicy {
    pub fn grace(&self) -> Duration {
        Duration::minutes(self.grace_minutes.clamp(0, MAX_GRACE_MINUTES))
    }

    pub fn slot_interval(&self) -> Duration {
        Duration::minutes(self.slot_interval_minutes.clamp(1, MAX_SLOT_INTERVAL_MINUTES))
    }
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            grace_minutes: 30,
            slot_interval_minutes: 60,
            sweep: SweepMode::Lazy,
        }
    }
}

/// Upper bound for the grace period: one week.
const MAX_GRACE_MINUTES: i64 = 7 * 24 * 60;
/// Upper bound for the slot step: one day.
const MAX_SLOT_INTERVAL_MINUTES: i64 = 24 * 60;

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = SettlementRates::default();
        let session_defaults = SessionPolicy::default();

        let sweep = match env::var("SWEEP_MODE").unwrap_or_default().to_lowercase().as_str() {
            "background" => SweepMode::Background {
                interval_secs: parsed::<u64>("SWEEP_INTERVAL_SECS")
                    .filter(|v| *v > 0)
                    .unwrap_or(60),
            },
            "" | "lazy" => SweepMode::Lazy,
            other => {
                tracing::warn!(mode = other, "unknown SWEEP_MODE, falling back to lazy");
                SweepMode::Lazy
            }
        };

        Self {
            port: parsed("PORT").unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "sanctuary.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            admin_email: env::var("ADMIN_EMAIL").unwrap_or_default(),
            mail_api_url: env::var("MAIL_API_URL").unwrap_or_default(),
            mail_api_key: env::var("MAIL_API_KEY").unwrap_or_default(),
            mail_from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "Sanctuary <no-reply@localhost>".to_string()),
            cors_allow_origin: env::var("CORS_ALLOW_ORIGIN").ok().filter(|v| !v.is_empty()),
            settlement: SettlementRates {
                standard_amount: parsed("SETTLEMENT_STANDARD_AMOUNT")
                    .unwrap_or(defaults.standard_amount),
                special_amount: parsed("SETTLEMENT_SPECIAL_AMOUNT")
                    .unwrap_or(defaults.special_amount),
                commission_amount: parsed("SETTLEMENT_COMMISSION_AMOUNT")
                    .unwrap_or(defaults.commission_amount),
            },
            sessions: SessionPolicy {
                grace_minutes: parsed::<i64>("SESSION_GRACE_MINUTES")
                    .filter(|v| *v >= 0)
                    .map(|v| v.min(MAX_GRACE_MINUTES))
                    .unwrap_or(session_defaults.grace_minutes),
                slot_interval_minutes: parsed::<i64>("SLOT_INTERVAL_MINUTES")
                    .filter(|v| *v > 0)
                    .map(|v| v.min(MAX_SLOT_INTERVAL_MINUTES))
                    .unwrap_or(session_defaults.slot_interval_minutes),
                sweep,
            },
        }
    }

    pub fn is_mail_configured(&self) -> bool {
        !self.mail_api_url.is_empty()
    }
}
