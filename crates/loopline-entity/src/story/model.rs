//! Story entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::media::StoryMediaType;
use crate::user::UserSummary;

/// An ephemeral story. Deleted by the expiry job once its
/// time-to-live elapses.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Story {
    /// Unique story identifier.
    pub id: Uuid,
    /// The author.
    pub user_id: Uuid,
    /// Text content.
    pub content: Option<String>,
    /// URL of the attached media.
    pub media_url: Option<String>,
    /// What the frame shows.
    pub media_type: StoryMediaType,
    /// Background color for text stories.
    pub background_color: Option<String>,
    /// When the story was posted.
    pub created_at: DateTime<Utc>,
}

/// A story with its author's display fields and aggregate counters,
/// as returned by the feed endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryWithAuthor {
    /// The stored story.
    #[serde(flatten)]
    pub story: Story,
    /// The author's public fields.
    pub author: UserSummary,
    /// How many users have viewed it.
    pub view_count: i64,
    /// How many users have liked it.
    pub like_count: i64,
    /// Whether the requesting user has liked it.
    pub liked_by_me: bool,
}

/// A recorded story view.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StoryView {
    /// The viewed story.
    pub story_id: Uuid,
    /// The viewer.
    pub user_id: Uuid,
    /// When the view was recorded.
    pub viewed_at: DateTime<Utc>,
}

/// Data required to persist a new story.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStory {
    /// The author.
    pub user_id: Uuid,
    /// Text content.
    pub content: Option<String>,
    /// URL of the attached media.
    pub media_url: Option<String>,
    /// What the frame shows.
    pub media_type: StoryMediaType,
    /// Background color for text stories.
    pub background_color: Option<String>,
}
