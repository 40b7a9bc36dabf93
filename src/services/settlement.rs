use rusqlite::Connection;
use serde::Serialize;

use crate::config::SettlementRates;
use crate::db::queries;
use crate::models::Booking;

/// What a completed booking paid out.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    pub provider_id: String,
    pub amount: i64,
    pub special_tier: bool,
    pub commission_amount: i64,
    pub commission_recipients: usize,
}

/// Credits the provider of a booking that just completed, plus the special-tier
/// commission when the provider is not special themselves.
///
/// Must run inside the same transaction that flipped the booking to
/// `completed`. Earnings are only ever incremented in SQL. A missing provider
/// is not an error: nothing is credited and `None` is returned.
pub fn settle(
    conn: &Connection,
    booking: &Booking,
    rates: &SettlementRates,
) -> anyhow::Result<Option<Settlement>> {
    let provider = match queries::get_user(conn, &booking.provider_id)? {
        Some(user) if user.is_provider() => user,
        Some(_) | None => {
            tracing::warn!(
                booking_id = %booking.id,
                provider_id = %booking.provider_id,
                "provider not found, skipping settlement"
            );
            return Ok(None);
        }
    };

    let amount = if provider.is_special {
        rates.special_amount
    } else {
        rates.standard_amount
    };
    queries::credit_earnings(conn, &provider.id, amount)?;

    let (commission_amount, commission_recipients) = if provider.is_special {
        (0, 0)
    } else {
        let recipients = queries::credit_special_providers(conn, rates.commission_amount)?;
        (rates.commission_amount, recipients)
    };

    tracing::info!(
        booking_id = %booking.id,
        provider_id = %provider.id,
        amount,
        special_tier = provider.is_special,
        commission_recipients,
        "settled booking"
    );

    Ok(Some(Settlement {
        provider_id: provider.id,
        amount,
        special_tier: provider.is_special,
        commission_amount,
        commission_recipients,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{BookingStatus, Role, User};
    use chrono::NaiveDateTime;

    fn setup_db() -> Connection {
        db::init_db(":memory:").unwrap()
    }

    fn provider(conn: &Connection, id: &str, is_special: bool) {
        queries::save_user(
            conn,
            &User {
                id: id.to_string(),
                name: id.to_string(),
                email: format!("{id}@example.com"),
                role: Role::Provider,
                is_special,
                earnings: 0,
                schedule: vec![],
                blocked_slots: vec![],
            },
        )
        .unwrap();
    }

    fn earnings(conn: &Connection, id: &str) -> i64 {
        queries::get_user(conn, id).unwrap().unwrap().earnings
    }

    fn booking_for(provider_id: &str) -> Booking {
        let ts = NaiveDateTime::parse_from_str("2025-06-01 12:00", "%Y-%m-%d %H:%M").unwrap();
        Booking {
            id: "b1".to_string(),
            provider_id: provider_id.to_string(),
            client_id: None,
            client_name: "Alice".to_string(),
            client_email: "alice@example.com".to_string(),
            service_id: None,
            service_name: None,
            date: "2025-06-16".to_string(),
            time: "09:00".to_string(),
            status: BookingStatus::Completed,
            note: None,
            created_at: ts,
            updated_at: ts,
        }
    }

    fn rates() -> SettlementRates {
        SettlementRates {
            standard_amount: 50_000,
            special_amount: 100_000,
            commission_amount: 10_000,
        }
    }

    #[test]
    fn test_standard_provider_pays_commission_to_special_tier() {
        let conn = setup_db();
        provider(&conn, "plain", false);
        provider(&conn, "gold-1", true);
        provider(&conn, "gold-2", true);
        provider(&conn, "other", false);

        let settlement = settle(&conn, &booking_for("plain"), &rates()).unwrap().unwrap();

        assert_eq!(settlement.amount, 50_000);
        assert_eq!(settlement.commission_recipients, 2);
        assert_eq!(earnings(&conn, "plain"), 50_000);
        assert_eq!(earnings(&conn, "gold-1"), 10_000);
        assert_eq!(earnings(&conn, "gold-2"), 10_000);
        assert_eq!(earnings(&conn, "other"), 0);
    }

    #[test]
    fn test_special_provider_gets_special_amount_only() {
        let conn = setup_db();
        provider(&conn, "gold-1", true);
        provider(&conn, "gold-2", true);
        provider(&conn, "plain", false);

        let settlement = settle(&conn, &booking_for("gold-1"), &rates()).unwrap().unwrap();

        assert!(settlement.special_tier);
        assert_eq!(settlement.commission_recipients, 0);
        assert_eq!(earnings(&conn, "gold-1"), 100_000);
        assert_eq!(earnings(&conn, "gold-2"), 0);
        assert_eq!(earnings(&conn, "plain"), 0);
    }

    #[test]
    fn test_missing_provider_is_skipped() {
        let conn = setup_db();
        provider(&conn, "gold-1", true);

        let settlement = settle(&conn, &booking_for("ghost"), &rates()).unwrap();

        assert!(settlement.is_none());
        assert_eq!(earnings(&conn, "gold-1"), 0);
    }

    #[test]
    fn test_earnings_accumulate() {
        let conn = setup_db();
        provider(&conn, "plain", false);

        settle(&conn, &booking_for("plain"), &rates()).unwrap();
        settle(&conn, &booking_for("plain"), &rates()).unwrap();

        assert_eq!(earnings(&conn, "plain"), 100_000);
    }
}
