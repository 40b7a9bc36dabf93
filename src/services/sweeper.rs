use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use rusqlite::Connection;
use tokio::task::JoinHandle;

use crate::config::SettlementRates;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus};
use crate::services::completion::{self, CompletionOutcome};
use crate::state::AppState;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepReport {
    pub expired: usize,
    pub completed: usize,
    pub failed: usize,
}

/// A confirmed session is over once `grace` has passed since its start.
pub fn is_expired(booking: &Booking, now: NaiveDateTime, grace: Duration) -> anyhow::Result<bool> {
    if booking.status != BookingStatus::Confirmed {
        return Ok(false);
    }
    let ends = booking
        .starts_at()?
        .checked_add_signed(grace)
        .ok_or_else(|| anyhow::anyhow!("grace period overflows booking {} start", booking.id))?;
    Ok(now > ends)
}

/// Completes every expired confirmed booking in `bookings`, updating the slice
/// in place so the caller can return it as-is. One failing booking never stops
/// the rest.
pub fn sweep_expired(
    conn: &mut Connection,
    bookings: &mut [Booking],
    rates: &SettlementRates,
    grace: Duration,
    now: NaiveDateTime,
) -> SweepReport {
    let mut report = SweepReport::default();

    for booking in bookings.iter_mut() {
        match is_expired(booking, now, grace) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                tracing::warn!(booking_id = %booking.id, error = %e, "unreadable booking start, skipping");
                report.failed += 1;
                continue;
            }
        }
        report.expired += 1;

        match completion::complete_booking(conn, &booking.id, rates, now) {
            Ok(outcome) => {
                if matches!(outcome, CompletionOutcome::Completed { .. }) {
                    report.completed += 1;
                }
                booking.status = BookingStatus::Completed;
                booking.updated_at = now;
            }
            Err(e) => {
                tracing::error!(booking_id = %booking.id, error = %e, "auto-completion failed");
                report.failed += 1;
            }
        }
    }

    if report.expired > 0 {
        tracing::info!(
            expired = report.expired,
            completed = report.completed,
            failed = report.failed,
            "swept expired sessions"
        );
    }

    report
}

/// Sweeps every confirmed booking in the store.
pub fn sweep_all(
    conn: &mut Connection,
    rates: &SettlementRates,
    grace: Duration,
    now: NaiveDateTime,
) -> anyhow::Result<SweepReport> {
    let mut confirmed = queries::get_bookings_with_status(conn, &BookingStatus::Confirmed)?;
    Ok(sweep_expired(conn, &mut confirmed, rates, grace, now))
}

fn sweep_state(state: &AppState) -> Result<SweepReport, AppError> {
    let now = state.clock.now();
    let mut conn = state.conn();
    let report = sweep_all(
        &mut conn,
        &state.config.settlement,
        state.config.sessions.grace(),
        now,
    )?;
    Ok(report)
}

/// Periodic sweep for deployments that cannot rely on bookings being listed.
pub fn spawn_background_sweeper(state: Arc<AppState>, every: std::time::Duration) -> JoinHandle<()> {
    tracing::info!(interval_secs = every.as_secs(), "starting background session sweeper");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = sweep_state(&state) {
                tracing::error!(error = %e, "background sweep failed");
            }
        }
    })
}
