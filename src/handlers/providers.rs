use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::Caller;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::schedule::{parse_date, validate_blocked_slots, validate_schedule};
use crate::models::{BlockedSlot, ScheduleEntry, User};
use crate::services::scheduling::{self, DaySlots};
use crate::state::AppState;

/// Public view of a provider. Email and earnings stay private.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderProfile {
    id: String,
    name: String,
    is_special: bool,
    schedule: Vec<ScheduleEntry>,
    blocked_slots: Vec<BlockedSlot>,
}

impl From<User> for ProviderProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            is_special: user.is_special,
            schedule: user.schedule,
            blocked_slots: user.blocked_slots,
        }
    }
}

// GET /providers
pub async fn list_providers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ProviderProfile>>, AppError> {
    let conn = state.conn();
    let providers = queries::list_providers(&conn)?
        .into_iter()
        .map(ProviderProfile::from)
        .collect();

    Ok(Json(providers))
}

// GET /providers/:id
pub async fn get_provider(
    State(state): State<Arc<AppState>>,
    Path(provider_id): Path<String>,
) -> Result<Json<ProviderProfile>, AppError> {
    let conn = state.conn();
    match queries::get_user(&conn, &provider_id)? {
        Some(user) if user.is_provider() => Ok(Json(user.into())),
        _ => Err(AppError::NotFound(format!("provider {provider_id}"))),
    }
}

// PATCH /providers/:id/schedule
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleUpdate {
    pub schedule: Option<Vec<ScheduleEntry>>,
    pub blocked_slots: Option<Vec<BlockedSlot>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResponse {
    provider_id: String,
    schedule: Vec<ScheduleEntry>,
    blocked_slots: Vec<BlockedSlot>,
    summary: String,
}

pub async fn update_schedule(
    State(state): State<Arc<AppState>>,
    Path(provider_id): Path<String>,
    headers: HeaderMap,
    Json(update): Json<ScheduleUpdate>,
) -> Result<Json<ScheduleResponse>, AppError> {
    let caller = Caller::from_headers(&headers, &state.config.admin_token);
    if !caller.can_manage(&provider_id) {
        return Err(AppError::Forbidden);
    }

    if update.schedule.is_none() && update.blocked_slots.is_none() {
        return Err(AppError::Validation(
            "schedule or blockedSlots is required".to_string(),
        ));
    }
    if let Some(schedule) = &update.schedule {
        validate_schedule(schedule).map_err(|e| AppError::Validation(e.to_string()))?;
    }
    if let Some(blocked) = &update.blocked_slots {
        validate_blocked_slots(blocked).map_err(|e| AppError::Validation(e.to_string()))?;
    }

    let conn = state.conn();
    match queries::get_user(&conn, &provider_id)? {
        Some(user) if user.is_provider() => {}
        _ => return Err(AppError::NotFound(format!("provider {provider_id}"))),
    }

    queries::update_schedule(
        &conn,
        &provider_id,
        update.schedule.as_deref(),
        update.blocked_slots.as_deref(),
    )?;

    let provider = queries::get_user(&conn, &provider_id)?
        .ok_or_else(|| AppError::NotFound(format!("provider {provider_id}")))?;
    let summary = provider.availability().to_human_readable();

    tracing::info!(provider_id = %provider_id, "provider schedule updated");

    Ok(Json(ScheduleResponse {
        provider_id,
        schedule: provider.schedule,
        blocked_slots: provider.blocked_slots,
        summary,
    }))
}

// GET /providers/:id/slots?date=
#[derive(Deserialize)]
pub struct SlotsQuery {
    pub date: Option<String>,
}

pub async fn get_slots(
    State(state): State<Arc<AppState>>,
    Path(provider_id): Path<String>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<DaySlots>, AppError> {
    let date = query
        .date
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| AppError::Validation("date is required".to_string()))?;
    let date = parse_date(date).map_err(|e| AppError::Validation(e.to_string()))?;

    let conn = state.conn();
    let slots = scheduling::day_slots(
        &conn,
        &provider_id,
        date,
        state.config.sessions.slot_interval(),
    )?;

    Ok(Json(slots))
}
