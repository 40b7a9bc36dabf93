use chrono::NaiveDateTime;
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::ChatMessage;

pub struct NewMessage {
    pub booking_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub text: String,
}

/// Appends a message to a booking's chat. Chats close once the booking reaches
/// a terminal status.
pub fn post_message(
    conn: &Connection,
    message: NewMessage,
    now: NaiveDateTime,
) -> Result<ChatMessage, AppError> {
    if message.booking_id.trim().is_empty()
        || message.sender_id.trim().is_empty()
        || message.text.trim().is_empty()
    {
        return Err(AppError::Validation(
            "bookingId, senderId and text are required".to_string(),
        ));
    }

    let booking = queries::get_booking_by_id(conn, &message.booking_id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {}", message.booking_id)))?;

    if booking.status.is_terminal() {
        return Err(AppError::Conflict(format!(
            "chat is closed for {} bookings",
            booking.status.as_str()
        )));
    }

    let chat_message = ChatMessage {
        id: uuid::Uuid::new_v4().to_string(),
        booking_id: booking.id,
        sender_id: message.sender_id.trim().to_string(),
        sender_name: message.sender_name.trim().to_string(),
        text: message.text.trim().to_string(),
        created_at: now,
    };
    queries::insert_message(conn, &chat_message)?;

    Ok(chat_message)
}

/// Deletes the transcript of a completed booking. Failures are logged and
/// swallowed; the completion that triggered this stands either way.
pub fn purge_transcript(conn: &Connection, booking_id: &str) -> usize {
    match queries::delete_messages_for_booking(conn, booking_id) {
        Ok(deleted) => {
            tracing::debug!(booking_id, deleted, "purged booking chat");
            deleted
        }
        Err(e) => {
            tracing::error!(booking_id, error = %e, "failed to purge booking chat");
            0
        }
    }
}
