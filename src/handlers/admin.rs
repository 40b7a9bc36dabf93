use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::require_admin;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingStatus, Role, User};
use crate::services::bookings;
use crate::state::AppState;

// GET /api/admin/bookings
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub async fn get_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    require_admin(&headers, &state.config.admin_token)?;

    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let status_filter = match query.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(s) => Some(
            BookingStatus::parse(s)
                .ok_or_else(|| AppError::Validation(format!("unknown status: {s}")))?,
        ),
    };

    let conn = state.conn();
    let bookings = queries::get_all_bookings(&conn, status_filter.as_ref(), limit)?;

    Ok(Json(bookings))
}

// POST /api/admin/bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    require_admin(&headers, &state.config.admin_token)?;

    let now = state.clock.now();
    let conn = state.conn();
    let booking = bookings::cancel_booking(&conn, &id, now)?;

    Ok(Json(booking))
}

// DELETE /api/admin/bookings/:id
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    deleted: bool,
    messages_deleted: usize,
}

pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    require_admin(&headers, &state.config.admin_token)?;

    let mut conn = state.conn();
    let messages_deleted = bookings::delete_booking(&mut conn, &id)?;

    Ok(Json(DeleteResponse {
        deleted: true,
        messages_deleted,
    }))
}

// GET /api/admin/users
pub async fn get_users(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<User>>, AppError> {
    require_admin(&headers, &state.config.admin_token)?;

    let conn = state.conn();
    Ok(Json(queries::list_users(&conn)?))
}

// PUT /api/admin/users/:id
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub is_special: bool,
}

/// Creates or updates a user's profile. Schedule, blocked slots and earnings
/// are kept as they are.
pub async fn upsert_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(update): Json<UserUpdate>,
) -> Result<Json<User>, AppError> {
    require_admin(&headers, &state.config.admin_token)?;

    if update.name.trim().is_empty() {
        return Err(AppError::Validation("name is required".to_string()));
    }

    let conn = state.conn();
    let existing = queries::get_user(&conn, &id)?;
    let (schedule, blocked_slots) = existing
        .map(|u| (u.schedule, u.blocked_slots))
        .unwrap_or_default();

    queries::save_user(
        &conn,
        &User {
            id: id.clone(),
            name: update.name.trim().to_string(),
            email: update.email.trim().to_string(),
            role: update.role,
            is_special: update.is_special,
            earnings: 0,
            schedule,
            blocked_slots,
        },
    )?;

    let user = queries::get_user(&conn, &id)?
        .ok_or_else(|| AppError::NotFound(format!("user {id}")))?;

    tracing::info!(user_id = %id, role = user.role.as_str(), is_special = user.is_special, "user saved");

    Ok(Json(user))
}
