//! Message repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use loopline_core::error::{AppError, ErrorKind};
use loopline_core::result::AppResult;
use loopline_entity::message::{
    CreateMessage, Message, MessageType, MessageWithSender, UnseenCount,
};
use loopline_entity::user::UserSummary;

use crate::traits::MessageStore;

/// Repository for direct message persistence and queries.
#[derive(Debug, Clone)]
pub struct MessageRepository {
    pool: PgPool,
}

impl MessageRepository {
    /// Create a new message repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// A message row joined with the sender's display columns.
#[derive(Debug, FromRow)]
struct MessageSenderRow {
    id: Uuid,
    from_user_id: Uuid,
    to_user_id: Uuid,
    text: Option<String>,
    media_url: Option<String>,
    message_type: MessageType,
    seen: bool,
    created_at: DateTime<Utc>,
    sender_username: String,
    sender_full_name: String,
    sender_profile_picture: Option<String>,
}

impl From<MessageSenderRow> for MessageWithSender {
    fn from(row: MessageSenderRow) -> Self {
        MessageWithSender {
            id: row.id,
            from_user: UserSummary {
                id: row.from_user_id,
                username: row.sender_username,
                full_name: row.sender_full_name,
                profile_picture: row.sender_profile_picture,
            },
            to_user_id: row.to_user_id,
            text: row.text,
            media_url: row.media_url,
            message_type: row.message_type,
            seen: row.seen,
            created_at: row.created_at,
        }
    }
}

const SENDER_COLUMNS: &str = "m.id, m.from_user_id, m.to_user_id, m.text, m.media_url, \
     m.message_type, m.seen, m.created_at, \
     u.username AS sender_username, u.full_name AS sender_full_name, \
     u.profile_picture AS sender_profile_picture";

#[async_trait]
impl MessageStore for MessageRepository {
    async fn create(&self, data: &CreateMessage) -> AppResult<Message> {
        sqlx::query_as::<_, Message>(
            "INSERT INTO messages (from_user_id, to_user_id, text, media_url, message_type) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(data.from_user_id)
        .bind(data.to_user_id)
        .bind(&data.text)
        .bind(&data.media_url)
        .bind(data.message_type)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create message", e))
    }

    async fn conversation(
        &self,
        user_a: Uuid,
        user_b: Uuid,
    ) -> AppResult<Vec<MessageWithSender>> {
        let rows = sqlx::query_as::<_, MessageSenderRow>(&format!(
            "SELECT {SENDER_COLUMNS} \
             FROM messages m JOIN users u ON u.id = m.from_user_id \
             WHERE (m.from_user_id = $1 AND m.to_user_id = $2) \
                OR (m.from_user_id = $2 AND m.to_user_id = $1) \
             ORDER BY m.created_at ASC",
        ))
        .bind(user_a)
        .bind(user_b)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to load conversation", e)
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn mark_seen(&self, from_user_id: Uuid, to_user_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE messages SET seen = TRUE \
             WHERE from_user_id = $1 AND to_user_id = $2 AND seen = FALSE",
        )
        .bind(from_user_id)
        .bind(to_user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to mark messages seen", e)
        })?;
        Ok(result.rows_affected())
    }

    async fn recent_per_partner(&self, user_id: Uuid) -> AppResult<Vec<MessageWithSender>> {
        // DISTINCT ON the conversation partner keeps only the newest
        // message per thread; the outer sort orders threads by recency.
        let rows = sqlx::query_as::<_, MessageSenderRow>(&format!(
            "SELECT * FROM ( \
                SELECT DISTINCT ON (partner_id) {SENDER_COLUMNS}, \
                    CASE WHEN m.from_user_id = $1 THEN m.to_user_id \
                         ELSE m.from_user_id END AS partner_id \
                FROM messages m JOIN users u ON u.id = m.from_user_id \
                WHERE m.from_user_id = $1 OR m.to_user_id = $1 \
                ORDER BY partner_id, m.created_at DESC \
             ) latest ORDER BY created_at DESC",
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to load recent messages", e)
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn unseen_counts(&self) -> AppResult<Vec<UnseenCount>> {
        sqlx::query_as::<_, UnseenCount>(
            "SELECT to_user_id AS user_id, COUNT(*) AS count \
             FROM messages WHERE seen = FALSE GROUP BY to_user_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to aggregate unseen counts", e)
        })
    }
}
