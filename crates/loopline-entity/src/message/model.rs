//! Direct message entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::kind::MessageType;
use crate::user::UserSummary;

/// A direct message between two users.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    /// Unique message identifier.
    pub id: Uuid,
    /// The sender.
    pub from_user_id: Uuid,
    /// The recipient.
    pub to_user_id: Uuid,
    /// Message text. At least one of text and media_url is present.
    pub text: Option<String>,
    /// URL of the attached image.
    pub media_url: Option<String>,
    /// What the body carries.
    pub message_type: MessageType,
    /// Whether the recipient has seen the message.
    pub seen: bool,
    /// When the message was sent.
    pub created_at: DateTime<Utc>,
}

/// A message with the sender's display fields denormalized in. This is
/// the shape pushed over the realtime channel and returned by the chat
/// history endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageWithSender {
    /// Unique message identifier.
    pub id: Uuid,
    /// The sender's public fields.
    pub from_user: UserSummary,
    /// The recipient.
    pub to_user_id: Uuid,
    /// Message text.
    pub text: Option<String>,
    /// URL of the attached image.
    pub media_url: Option<String>,
    /// What the body carries.
    pub message_type: MessageType,
    /// Whether the recipient has seen the message.
    pub seen: bool,
    /// When the message was sent.
    pub created_at: DateTime<Utc>,
}

impl MessageWithSender {
    /// Join a stored message with its sender's display fields.
    pub fn from_parts(message: Message, sender: UserSummary) -> Self {
        Self {
            id: message.id,
            from_user: sender,
            to_user_id: message.to_user_id,
            text: message.text,
            media_url: message.media_url,
            message_type: message.message_type,
            seen: message.seen,
            created_at: message.created_at,
        }
    }
}

/// Per-recipient unseen message count, as aggregated for the daily
/// digest.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UnseenCount {
    /// The recipient.
    pub user_id: Uuid,
    /// Number of unseen messages addressed to them.
    pub count: i64,
}

/// Data required to persist a new message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMessage {
    /// The sender.
    pub from_user_id: Uuid,
    /// The recipient.
    pub to_user_id: Uuid,
    /// Message text.
    pub text: Option<String>,
    /// URL of the attached image.
    pub media_url: Option<String>,
    /// What the body carries.
    pub message_type: MessageType,
}
