use chrono::NaiveDateTime;
use rusqlite::Connection;

use crate::config::SettlementRates;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::BookingStatus;
use crate::services::conversation;
use crate::services::settlement::{self, Settlement};

#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    Completed {
        settlement: Option<Settlement>,
        messages_deleted: usize,
    },
    AlreadyCompleted,
}

/// Moves a confirmed booking to `completed`, settles it and purges its chat.
///
/// The status flip and the earnings credit commit together; the flip is a
/// compare-and-set on `confirmed`, so a booking is settled at most once no
/// matter how many callers race here. Chat cleanup runs after the commit and
/// is best-effort.
pub fn complete_booking(
    conn: &mut Connection,
    booking_id: &str,
    rates: &SettlementRates,
    now: NaiveDateTime,
) -> Result<CompletionOutcome, AppError> {
    let tx = conn.transaction()?;

    let booking = queries::get_booking_by_id(&tx, booking_id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;

    match booking.status {
        BookingStatus::Completed => return Ok(CompletionOutcome::AlreadyCompleted),
        BookingStatus::Confirmed => {}
        ref other => {
            return Err(AppError::InvalidTransition {
                from: other.as_str(),
                to: BookingStatus::Completed.as_str(),
            })
        }
    }

    let flipped = queries::transition_booking_status(
        &tx,
        booking_id,
        &BookingStatus::Confirmed,
        &BookingStatus::Completed,
        &now,
    )?;
    if !flipped {
        // Someone else completed it between the read and the write.
        return Ok(CompletionOutcome::AlreadyCompleted);
    }

    let settlement = settlement::settle(&tx, &booking, rates)?;
    tx.commit()?;

    let messages_deleted = conversation::purge_transcript(conn, booking_id);

    tracing::info!(booking_id, messages_deleted, "booking completed");

    Ok(CompletionOutcome::Completed {
        settlement,
        messages_deleted,
    })
}
