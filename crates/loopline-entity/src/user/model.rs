//! User entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A registered Loopline user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Unique user identifier.
    pub id: Uuid,
    /// Unique login name.
    pub username: String,
    /// Email address (optional; a user without one receives no mail).
    pub email: Option<String>,
    /// Argon2 password hash.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Display name shown next to messages and stories.
    pub full_name: String,
    /// Short profile bio.
    pub bio: Option<String>,
    /// URL of the profile picture.
    pub profile_picture: Option<String>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// The display fields denormalized into pushed messages and emails.
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            full_name: self.full_name.clone(),
            profile_picture: self.profile_picture.clone(),
        }
    }
}

/// The public slice of a user embedded in message payloads, story
/// feeds, and viewer lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UserSummary {
    /// The user ID.
    pub id: Uuid,
    /// Unique login name.
    pub username: String,
    /// Display name.
    pub full_name: String,
    /// URL of the profile picture.
    pub profile_picture: Option<String>,
}

/// Data required to create a new user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Desired username.
    pub username: String,
    /// Email address (optional).
    pub email: Option<String>,
    /// Pre-hashed password.
    pub password_hash: String,
    /// Display name.
    pub full_name: String,
}

/// Data for updating an existing user's profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateUser {
    /// The user ID to update.
    pub id: Uuid,
    /// New display name.
    pub full_name: Option<String>,
    /// New bio.
    pub bio: Option<String>,
    /// New profile picture URL.
    pub profile_picture: Option<String>,
}
