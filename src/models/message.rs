use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub booking_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub text: String,
    pub created_at: NaiveDateTime,
}
