use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::ChatMessage;
use crate::services::conversation::{self, NewMessage};
use crate::state::AppState;

// GET /chat?bookingId=
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatQuery {
    pub booking_id: Option<String>,
}

pub async fn get_messages(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ChatQuery>,
) -> Result<Json<Vec<ChatMessage>>, AppError> {
    let booking_id = query
        .booking_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::Validation("bookingId is required".to_string()))?;

    let conn = state.conn();
    if queries::get_booking_by_id(&conn, &booking_id)?.is_none() {
        return Err(AppError::NotFound(format!("booking {booking_id}")));
    }
    let messages = queries::get_messages_for_booking(&conn, &booking_id)?;

    Ok(Json(messages))
}

// POST /chat
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMessage {
    #[serde(default)]
    pub booking_id: String,
    #[serde(default)]
    pub sender_id: String,
    #[serde(default)]
    pub sender_name: String,
    #[serde(default)]
    pub text: String,
}

pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PostMessage>,
) -> Result<impl IntoResponse, AppError> {
    let now = state.clock.now();
    let conn = state.conn();

    let message = conversation::post_message(
        &conn,
        NewMessage {
            booking_id: body.booking_id,
            sender_id: body.sender_id,
            sender_name: body.sender_name,
            text: body.text,
        },
        now,
    )?;

    Ok((StatusCode::CREATED, Json(message)))
}
