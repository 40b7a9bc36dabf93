use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::Caller;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::schedule::parse_date;
use crate::models::{Booking, BookingStatus};
use crate::services::bookings::{self, NewBooking};
use crate::services::completion::{self, CompletionOutcome};
use crate::services::notifications;
use crate::services::scheduling::{self, DaySlots};
use crate::services::settlement::Settlement;
use crate::services::sweeper;
use crate::state::AppState;

/// Display name and mail address of a booking's provider. Unknown providers
/// get a generic name and no address.
fn provider_contact(conn: &rusqlite::Connection, provider_id: &str) -> (String, String) {
    let provider = queries::get_user(conn, provider_id).ok().flatten();
    let email = provider
        .as_ref()
        .map(|u| u.email.trim().to_string())
        .unwrap_or_default();
    let name = provider
        .map(|u| u.name)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "your provider".to_string());
    (name, email)
}

// POST /bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NewBooking>,
) -> Result<impl IntoResponse, AppError> {
    let now = state.clock.now();

    let (booking, provider) = {
        let conn = state.conn();
        let booking = bookings::create_booking(
            &conn,
            request,
            now,
            state.config.sessions.slot_interval(),
        )?;
        let provider = provider_contact(&conn, &booking.provider_id);
        (booking, provider)
    };

    let (provider_name, provider_email) = provider;
    let emails = notifications::booking_requested(
        &booking,
        &provider_name,
        &provider_email,
        &state.config.admin_email,
    );
    notifications::deliver(state.notifier.as_ref(), emails).await;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": booking.id, "status": booking.status })),
    ))
}

// GET /bookings
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingsQuery {
    pub provider_id: Option<String>,
    pub date: Option<String>,
    pub client_email: Option<String>,
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum BookingsView {
    Day(DaySlots),
    Records(Vec<Booking>),
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Lists bookings. Any confirmed session past its grace period is completed
/// before the listing is returned.
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<BookingsView>, AppError> {
    let provider_id = non_empty(query.provider_id);
    let client_email = non_empty(query.client_email);
    let date = non_empty(query.date);

    let now = state.clock.now();
    let rates = &state.config.settlement;
    let grace = state.config.sessions.grace();
    let mut conn = state.conn();

    let view = match (provider_id, date, client_email) {
        (Some(provider_id), Some(date), _) => {
            let date = parse_date(&date).map_err(|e| AppError::Validation(e.to_string()))?;
            let mut listed = queries::get_bookings_for_provider(&conn, &provider_id)?;
            sweeper::sweep_expired(&mut conn, &mut listed, rates, grace, now);
            BookingsView::Day(scheduling::day_slots(
                &conn,
                &provider_id,
                date,
                state.config.sessions.slot_interval(),
            )?)
        }
        (Some(provider_id), None, client_email) => {
            let mut listed = queries::get_bookings_for_provider(&conn, &provider_id)?;
            if let Some(email) = client_email {
                listed.retain(|b| b.client_email == email);
            }
            sweeper::sweep_expired(&mut conn, &mut listed, rates, grace, now);
            BookingsView::Records(listed)
        }
        (None, _, Some(email)) => {
            let mut listed = queries::get_bookings_for_client(&conn, &email)?;
            sweeper::sweep_expired(&mut conn, &mut listed, rates, grace, now);
            BookingsView::Records(listed)
        }
        (None, _, None) => {
            return Err(AppError::Validation(
                "providerId or clientEmail is required".to_string(),
            ))
        }
    };

    Ok(Json(view))
}

// PATCH /bookings/:id
#[derive(Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<Booking>, AppError> {
    let caller = Caller::from_headers(&headers, &state.config.admin_token);
    let next = BookingStatus::parse(update.status.trim())
        .ok_or_else(|| AppError::Validation(format!("unknown status: {}", update.status)))?;
    let now = state.clock.now();

    let (booking, changed, provider) = {
        let conn = state.conn();
        let (booking, changed) = bookings::set_status(&conn, &id, next, &caller, now)?;
        let (provider, _) = provider_contact(&conn, &booking.provider_id);
        (booking, changed, provider)
    };

    if changed {
        if let Some(email) = notifications::status_update(&booking, &provider) {
            notifications::deliver(state.notifier.as_ref(), vec![email]).await;
        }
    }

    Ok(Json(booking))
}

// POST /bookings/:id/complete
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResponse {
    id: String,
    status: BookingStatus,
    already_completed: bool,
    settlement: Option<Settlement>,
    messages_deleted: usize,
}

pub async fn complete_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<CompletionResponse>, AppError> {
    let caller = Caller::from_headers(&headers, &state.config.admin_token);
    let now = state.clock.now();
    let mut conn = state.conn();

    let booking = queries::get_booking_by_id(&conn, &id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;
    if !caller.can_manage(&booking.provider_id) {
        return Err(AppError::Forbidden);
    }

    let outcome = completion::complete_booking(&mut conn, &id, &state.config.settlement, now)?;

    let response = match outcome {
        CompletionOutcome::Completed {
            settlement,
            messages_deleted,
        } => CompletionResponse {
            id,
            status: BookingStatus::Completed,
            already_completed: false,
            settlement,
            messages_deleted,
        },
        CompletionOutcome::AlreadyCompleted => CompletionResponse {
            id,
            status: BookingStatus::Completed,
            already_completed: true,
            settlement: None,
            messages_deleted: 0,
        },
    };

    Ok(Json(response))
}
