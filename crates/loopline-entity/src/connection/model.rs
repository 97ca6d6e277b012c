//! Connection request entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::status::ConnectionStatus;
use crate::user::User;

/// A connection request between two users. Unique per (from, to) pair.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Connection {
    /// Unique connection identifier.
    pub id: Uuid,
    /// The requesting user.
    pub from_user_id: Uuid,
    /// The user being asked.
    pub to_user_id: Uuid,
    /// Current status.
    pub status: ConnectionStatus,
    /// When the request was created.
    pub created_at: DateTime<Utc>,
    /// When the request was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A connection with both participants loaded. The mail handlers need
/// the recipient's email and the requester's display name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionWithUsers {
    /// Unique connection identifier.
    pub id: Uuid,
    /// The requesting user.
    pub from_user: User,
    /// The user being asked.
    pub to_user: User,
    /// Current status.
    pub status: ConnectionStatus,
    /// When the request was created.
    pub created_at: DateTime<Utc>,
    /// When the request was last updated.
    pub updated_at: DateTime<Utc>,
}
