//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use loopline_entity::user::User;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Always `true` for successful responses.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Signup and login response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    /// Bearer access token.
    pub token: String,
    /// When the token expires.
    pub expires_at: DateTime<Utc>,
    /// The authenticated user. The password hash never serializes.
    pub user: User,
}

/// Body of POST /api/message/send: the populated message under the
/// `message` key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub success: bool,
    pub message: loopline_entity::message::MessageWithSender,
}

/// Simple acknowledgement body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

/// Like toggle result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeResponse {
    /// Whether the caller now likes the story.
    pub liked: bool,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: bool,
}
