use chrono::{Duration, NaiveDateTime};
use rusqlite::Connection;
use serde::Deserialize;

use crate::auth::Caller;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::schedule::{parse_date, parse_time, DATE_FORMAT, TIME_FORMAT};
use crate::models::{Booking, BookingStatus, ServiceName};
use crate::services::scheduling::{self, SchedulingError};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    #[serde(default)]
    pub provider_id: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub client_email: String,
    pub client_id: Option<String>,
    pub service_id: Option<String>,
    pub service_name: Option<ServiceName>,
    pub note: Option<String>,
}

fn required<'a>(value: &'a str, field: &str) -> Result<&'a str, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(trimmed)
}

/// Validates a booking request and stores it as `pending`.
pub fn create_booking(
    conn: &Connection,
    request: NewBooking,
    now: NaiveDateTime,
    slot_interval: Duration,
) -> Result<Booking, AppError> {
    let provider_id = required(&request.provider_id, "providerId")?;
    let client_name = required(&request.client_name, "clientName")?;
    let client_email = required(&request.client_email, "clientEmail")?;
    if !client_email.contains('@') {
        return Err(AppError::Validation(format!(
            "clientEmail is not a valid address: {client_email}"
        )));
    }

    let date = parse_date(required(&request.date, "date")?)
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let time = parse_time(required(&request.time, "time")?)
        .map_err(|e| AppError::Validation(e.to_string()))?;

    scheduling::validate_booking_time(conn, provider_id, date, time, now, slot_interval)?;

    let booking = Booking {
        id: uuid::Uuid::new_v4().to_string(),
        provider_id: provider_id.to_string(),
        client_id: request.client_id.filter(|s| !s.trim().is_empty()),
        client_name: client_name.to_string(),
        client_email: client_email.to_string(),
        service_id: request.service_id,
        service_name: request.service_name,
        date: date.format(DATE_FORMAT).to_string(),
        time: time.format(TIME_FORMAT).to_string(),
        status: BookingStatus::Pending,
        note: request.note.filter(|s| !s.trim().is_empty()),
        created_at: now,
        updated_at: now,
    };

    // The guard above can race with a concurrent request; the unique index cannot.
    if !queries::insert_booking(conn, &booking)? {
        return Err(SchedulingError::SlotTaken.into());
    }

    tracing::info!(
        booking_id = %booking.id,
        provider_id = %booking.provider_id,
        date = %booking.date,
        time = %booking.time,
        "booking requested"
    );

    Ok(booking)
}

fn load(conn: &Connection, id: &str) -> Result<Booking, AppError> {
    queries::get_booking_by_id(conn, id)?.ok_or_else(|| AppError::NotFound(format!("booking {id}")))
}

fn transition(
    conn: &Connection,
    booking: Booking,
    next: BookingStatus,
    now: NaiveDateTime,
) -> Result<Booking, AppError> {
    if !booking.status.can_transition_to(&next) {
        return Err(AppError::InvalidTransition {
            from: booking.status.as_str(),
            to: next.as_str(),
        });
    }

    if !queries::transition_booking_status(conn, &booking.id, &booking.status, &next, &now)? {
        return Err(AppError::Conflict(format!(
            "booking {} changed while it was being updated",
            booking.id
        )));
    }

    tracing::info!(booking_id = %booking.id, from = booking.status.as_str(), to = next.as_str(), "booking status changed");

    Ok(Booking {
        status: next,
        updated_at: now,
        ..booking
    })
}

/// Provider or admin decision on a booking. Only `confirmed` and `rejected`
/// may be set this way; completion has its own path.
///
/// Returns the booking and whether the status actually changed.
pub fn set_status(
    conn: &Connection,
    id: &str,
    next: BookingStatus,
    caller: &Caller,
    now: NaiveDateTime,
) -> Result<(Booking, bool), AppError> {
    if !matches!(next, BookingStatus::Confirmed | BookingStatus::Rejected) {
        return Err(AppError::Validation(format!(
            "status must be confirmed or rejected, got {}",
            next.as_str()
        )));
    }

    let booking = load(conn, id)?;
    if !caller.can_manage(&booking.provider_id) {
        return Err(AppError::Forbidden);
    }

    if booking.status == next {
        return Ok((booking, false));
    }

    Ok((transition(conn, booking, next, now)?, true))
}

pub fn cancel_booking(conn: &Connection, id: &str, now: NaiveDateTime) -> Result<Booking, AppError> {
    let booking = load(conn, id)?;
    if booking.status == BookingStatus::Cancelled {
        return Ok(booking);
    }
    transition(conn, booking, BookingStatus::Cancelled, now)
}

/// Removes a booking together with its chat transcript.
pub fn delete_booking(conn: &mut Connection, id: &str) -> Result<usize, AppError> {
    let tx = conn.transaction()?;
    let messages_deleted = queries::delete_messages_for_booking(&tx, id)?;
    if !queries::delete_booking(&tx, id)? {
        return Err(AppError::NotFound(format!("booking {id}")));
    }
    tx.commit()?;

    tracing::info!(booking_id = id, messages_deleted, "booking deleted");
    Ok(messages_deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2025-06-01 12:00", "%Y-%m-%d %H:%M").unwrap()
    }

    fn hour() -> Duration {
        Duration::minutes(60)
    }

    fn request(time: &str) -> NewBooking {
        NewBooking {
            provider_id: "p1".to_string(),
            date: "2025-06-16".to_string(),
            time: time.to_string(),
            client_name: "Alice".to_string(),
            client_email: "alice@example.com".to_string(),
            client_id: None,
            service_id: Some("svc-1".to_string()),
            service_name: Some(ServiceName::Text("Tarot".to_string())),
            note: None,
        }
    }

    fn provider() -> Caller {
        Caller::User("p1".to_string())
    }

    #[test]
    fn test_create_starts_pending() {
        let conn = db::init_db(":memory:").unwrap();
        let booking = create_booking(&conn, request("09:00"), now(), hour()).unwrap();

        assert_eq!(booking.status, BookingStatus::Pending);
        let stored = queries::get_booking_by_id(&conn, &booking.id).unwrap().unwrap();
        assert_eq!(stored.time, "09:00");
        assert_eq!(stored.service_name, Some(ServiceName::Text("Tarot".to_string())));
    }

    #[test]
    fn test_create_normalises_short_time() {
        let conn = db::init_db(":memory:").unwrap();
        let booking = create_booking(&conn, request("9:00"), now(), hour()).unwrap();
        assert_eq!(booking.time, "09:00");
    }

    #[test]
    fn test_missing_fields_are_validation_errors() {
        let conn = db::init_db(":memory:").unwrap();

        let mut no_email = request("09:00");
        no_email.client_email = "  ".to_string();
        assert!(matches!(
            create_booking(&conn, no_email, now(), hour()),
            Err(AppError::Validation(_))
        ));

        let mut bad_date = request("09:00");
        bad_date.date = "16/06/2025".to_string();
        assert!(matches!(
            create_booking(&conn, bad_date, now(), hour()),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_second_request_for_slot_conflicts() {
        let conn = db::init_db(":memory:").unwrap();
        create_booking(&conn, request("09:00"), now(), hour()).unwrap();

        let result = create_booking(&conn, request("09:00"), now(), hour());
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[test]
    fn test_provider_confirms_own_booking() {
        let conn = db::init_db(":memory:").unwrap();
        let booking = create_booking(&conn, request("09:00"), now(), hour()).unwrap();

        let (updated, changed) =
            set_status(&conn, &booking.id, BookingStatus::Confirmed, &provider(), now()).unwrap();
        assert!(changed);
        assert_eq!(updated.status, BookingStatus::Confirmed);

        let (_, changed) =
            set_status(&conn, &booking.id, BookingStatus::Confirmed, &provider(), now()).unwrap();
        assert!(!changed);
    }

    #[test]
    fn test_other_provider_is_forbidden() {
        let conn = db::init_db(":memory:").unwrap();
        let booking = create_booking(&conn, request("09:00"), now(), hour()).unwrap();

        let result = set_status(
            &conn,
            &booking.id,
            BookingStatus::Confirmed,
            &Caller::User("p2".to_string()),
            now(),
        );
        assert!(matches!(result, Err(AppError::Forbidden)));
    }

    #[test]
    fn test_status_endpoint_cannot_complete() {
        let conn = db::init_db(":memory:").unwrap();
        let booking = create_booking(&conn, request("09:00"), now(), hour()).unwrap();

        let result = set_status(&conn, &booking.id, BookingStatus::Completed, &Caller::Admin, now());
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_rejected_booking_cannot_be_confirmed() {
        let conn = db::init_db(":memory:").unwrap();
        let booking = create_booking(&conn, request("09:00"), now(), hour()).unwrap();
        set_status(&conn, &booking.id, BookingStatus::Rejected, &provider(), now()).unwrap();

        let result = set_status(&conn, &booking.id, BookingStatus::Confirmed, &provider(), now());
        assert!(matches!(result, Err(AppError::InvalidTransition { .. })));
    }

    #[test]
    fn test_cancel_frees_slot() {
        let conn = db::init_db(":memory:").unwrap();
        let booking = create_booking(&conn, request("09:00"), now(), hour()).unwrap();

        let cancelled = cancel_booking(&conn, &booking.id, now()).unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert!(create_booking(&conn, request("09:00"), now(), hour()).is_ok());
    }

    #[test]
    fn test_delete_removes_booking() {
        let mut conn = db::init_db(":memory:").unwrap();
        let booking = create_booking(&conn, request("09:00"), now(), hour()).unwrap();

        delete_booking(&mut conn, &booking.id).unwrap();
        assert!(queries::get_booking_by_id(&conn, &booking.id).unwrap().is_none());
        assert!(matches!(
            delete_booking(&mut conn, &booking.id),
            Err(AppError::NotFound(_))
        ));
    }
}
