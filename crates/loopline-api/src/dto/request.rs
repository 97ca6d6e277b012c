//! Request DTOs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// POST /api/auth/signup
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SignupRequest {
    /// Desired username, lowercased on the way in.
    #[validate(length(min = 3, max = 32))]
    pub username: String,
    /// Display name.
    #[validate(length(min = 1, max = 100))]
    pub full_name: String,
    /// Optional email, required to receive notification mails.
    #[validate(email)]
    pub email: Option<String>,
    /// Plaintext password.
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

/// POST /api/auth/login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// GET /api/user/search
#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    /// Prefix to match against usernames and display names.
    pub q: String,
}

/// POST /api/connection/request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionRequestBody {
    pub to_user_id: Uuid,
}

/// POST /api/connection/accept and /api/connection/reject
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionDecisionBody {
    pub connection_id: Uuid,
}

/// POST /api/story/view and /api/story/like
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryActionBody {
    pub story_id: Uuid,
}
