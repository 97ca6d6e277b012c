//! Story repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use loopline_core::error::{AppError, ErrorKind};
use loopline_core::result::AppResult;
use loopline_entity::story::{CreateStory, Story, StoryMediaType, StoryWithAuthor};
use loopline_entity::user::UserSummary;

use crate::traits::StoryStore;

/// Repository for stories, views, and likes.
#[derive(Debug, Clone)]
pub struct StoryRepository {
    pool: PgPool,
}

impl StoryRepository {
    /// Create a new story repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// A story row joined with its author and aggregate counters.
#[derive(Debug, FromRow)]
struct StoryFeedRow {
    id: Uuid,
    user_id: Uuid,
    content: Option<String>,
    media_url: Option<String>,
    media_type: StoryMediaType,
    background_color: Option<String>,
    created_at: DateTime<Utc>,
    author_username: String,
    author_full_name: String,
    author_profile_picture: Option<String>,
    view_count: i64,
    like_count: i64,
    liked_by_me: bool,
}

impl From<StoryFeedRow> for StoryWithAuthor {
    fn from(row: StoryFeedRow) -> Self {
        StoryWithAuthor {
            story: Story {
                id: row.id,
                user_id: row.user_id,
                content: row.content,
                media_url: row.media_url,
                media_type: row.media_type,
                background_color: row.background_color,
                created_at: row.created_at,
            },
            author: UserSummary {
                id: row.user_id,
                username: row.author_username,
                full_name: row.author_full_name,
                profile_picture: row.author_profile_picture,
            },
            view_count: row.view_count,
            like_count: row.like_count,
            liked_by_me: row.liked_by_me,
        }
    }
}

#[async_trait]
impl StoryStore for StoryRepository {
    async fn create(&self, data: &CreateStory) -> AppResult<Story> {
        sqlx::query_as::<_, Story>(
            "INSERT INTO stories (user_id, content, media_url, media_type, background_color) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(data.user_id)
        .bind(&data.content)
        .bind(&data.media_url)
        .bind(data.media_type)
        .bind(&data.background_color)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create story", e))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Story>> {
        sqlx::query_as::<_, Story>("SELECT * FROM stories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find story", e))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM stories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete story", e)
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn feed(&self, viewer_id: Uuid, limit: i64) -> AppResult<Vec<StoryWithAuthor>> {
        let rows = sqlx::query_as::<_, StoryFeedRow>(
            "SELECT s.id, s.user_id, s.content, s.media_url, s.media_type, \
                    s.background_color, s.created_at, \
                    u.username AS author_username, u.full_name AS author_full_name, \
                    u.profile_picture AS author_profile_picture, \
                    (SELECT COUNT(*) FROM story_views v WHERE v.story_id = s.id) AS view_count, \
                    (SELECT COUNT(*) FROM story_likes l WHERE l.story_id = s.id) AS like_count, \
                    EXISTS(SELECT 1 FROM story_likes l \
                           WHERE l.story_id = s.id AND l.user_id = $1) AS liked_by_me \
             FROM stories s JOIN users u ON u.id = s.user_id \
             ORDER BY s.created_at DESC LIMIT $2",
        )
        .bind(viewer_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load story feed", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn record_view(&self, story_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT INTO story_views (story_id, user_id) VALUES ($1, $2) \
             ON CONFLICT (story_id, user_id) DO NOTHING",
        )
        .bind(story_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to record story view", e)
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn toggle_like(&self, story_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let inserted = sqlx::query(
            "INSERT INTO story_likes (story_id, user_id) VALUES ($1, $2) \
             ON CONFLICT (story_id, user_id) DO NOTHING",
        )
        .bind(story_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to like story", e))?;

        if inserted.rows_affected() > 0 {
            return Ok(true);
        }

        // Already liked, so this toggle removes it.
        sqlx::query("DELETE FROM story_likes WHERE story_id = $1 AND user_id = $2")
            .bind(story_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to unlike story", e))?;
        Ok(false)
    }

    async fn viewers(&self, story_id: Uuid) -> AppResult<Vec<UserSummary>> {
        sqlx::query_as::<_, UserSummary>(
            "SELECT u.id, u.username, u.full_name, u.profile_picture \
             FROM story_views v JOIN users u ON u.id = v.user_id \
             WHERE v.story_id = $1 ORDER BY v.viewed_at DESC",
        )
        .bind(story_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list story viewers", e)
        })
    }
}
