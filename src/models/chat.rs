use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A persisted chat message. Immutable once stored.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub group_id: String,
    pub sender_id: String,
    /// `None` means the message is addressed to the whole group.
    pub receiver_id: Option<String>,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// A chat message that has passed validation and is ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewChatMessage {
    pub group_id: String,
    pub sender_id: String,
    pub receiver_id: Option<String>,
    pub text: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct SenderInfo {
    pub id: String,
    pub name: String,
    pub role: String,
}

/// A chat message as broadcast to clients, with the sender resolved.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageView {
    pub id: Uuid,
    pub group_id: String,
    pub sender_id: SenderInfo,
    pub receiver_id: Option<String>,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessageView {
    pub fn new(message: ChatMessage, sender: SenderInfo) -> Self {
        Self {
            id: message.id,
            group_id: message.group_id,
            sender_id: sender,
            receiver_id: message.receiver_id,
            text: message.text,
            timestamp: message.timestamp,
        }
    }
}
