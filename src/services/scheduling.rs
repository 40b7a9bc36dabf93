use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::schedule::{DATE_FORMAT, TIME_FORMAT};

#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("bookings must be made for a future time; {date} {time} has already passed")]
    InPast { date: String, time: String },

    #[error("that time is outside the provider's schedule. Available: {hours}")]
    OutsideSchedule { hours: String },

    #[error("the provider does not work on that day")]
    DayOff,

    #[error("the provider has blocked that time slot")]
    Blocked,

    #[error("Sorry, that time slot is already booked. Could you pick a different time?")]
    SlotTaken,
}

/// Checks a requested slot against the clock, the provider's schedule and the
/// existing bookings. The storage-level unique index remains the final word on
/// double booking; this gives callers a precise reason up front.
pub fn validate_booking_time(
    conn: &Connection,
    provider_id: &str,
    date: NaiveDate,
    time: NaiveTime,
    now: NaiveDateTime,
    slot_interval: Duration,
) -> Result<(), AppError> {
    let date_str = date.format(DATE_FORMAT).to_string();
    let time_str = time.format(TIME_FORMAT).to_string();

    if date.and_time(time) <= now {
        return Err(SchedulingError::InPast {
            date: date_str,
            time: time_str,
        }
        .into());
    }

    // Unknown providers and providers without a schedule are not restricted.
    if let Some(provider) = queries::get_user(conn, provider_id)? {
        let avail = provider.availability();
        if avail.has_schedule() {
            if !avail.entry_for(date).is_some_and(|e| e.active) {
                return Err(SchedulingError::DayOff.into());
            }
            if !avail.candidate_slots(date, slot_interval).any(|t| t == time) {
                return Err(SchedulingError::OutsideSchedule {
                    hours: avail.to_human_readable(),
                }
                .into());
            }
        }
        if avail.is_blocked(&date_str, &time_str) {
            return Err(SchedulingError::Blocked.into());
        }
    }

    if queries::find_active_booking(conn, provider_id, &date_str, &time_str)?.is_some() {
        return Err(SchedulingError::SlotTaken.into());
    }

    Ok(())
}

/// Bookable and taken times for one provider on one date.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DaySlots {
    pub provider_id: String,
    pub date: String,
    pub available: Vec<String>,
    pub booked: Vec<String>,
}

pub fn day_slots(
    conn: &Connection,
    provider_id: &str,
    date: NaiveDate,
    slot_interval: Duration,
) -> anyhow::Result<DaySlots> {
    let date_str = date.format(DATE_FORMAT).to_string();

    let mut booked: Vec<String> = queries::get_bookings_for_provider_on(conn, provider_id, &date_str)?
        .into_iter()
        .filter(|b| b.status.holds_slot())
        .map(|b| b.time)
        .collect();
    booked.sort();
    booked.dedup();

    let available = match queries::get_user(conn, provider_id)? {
        Some(provider) => provider
            .availability()
            .open_slots(date, slot_interval)
            .into_iter()
            .filter(|t| !booked.contains(t))
            .collect(),
        None => Vec::new(),
    };

    Ok(DaySlots {
        provider_id: provider_id.to_string(),
        date: date_str,
        available,
        booked,
    })
}
