//! Story lifecycle: creation with scheduled expiry, views, likes.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::info;
use uuid::Uuid;

use loopline_core::error::AppError;
use loopline_core::jobs::{StoryExpiryPayload, STORY_EXPIRY};
use loopline_core::result::AppResult;
use loopline_database::traits::{JobStore, StoryStore};
use loopline_entity::job::{CreateJob, JobPriority};
use loopline_entity::story::{CreateStory, Story, StoryMediaType, StoryWithAuthor};
use loopline_entity::user::UserSummary;

use crate::media::MediaStore;
use crate::message::ImageUpload;

const FEED_LIMIT: i64 = 50;

/// Handles stories. Every created story gets a matching expiry job so
/// it disappears after the configured time-to-live.
#[derive(Clone)]
pub struct StoryService {
    stories: Arc<dyn StoryStore>,
    jobs: Arc<dyn JobStore>,
    media: Arc<dyn MediaStore>,
    ttl_hours: i64,
}

impl StoryService {
    /// Creates a new story service.
    pub fn new(
        stories: Arc<dyn StoryStore>,
        jobs: Arc<dyn JobStore>,
        media: Arc<dyn MediaStore>,
        ttl_hours: i64,
    ) -> Self {
        Self {
            stories,
            jobs,
            media,
            ttl_hours,
        }
    }

    /// Create a story and schedule its deletion.
    pub async fn create(
        &self,
        user_id: Uuid,
        content: Option<String>,
        media: Option<ImageUpload>,
        media_type: StoryMediaType,
        background_color: Option<String>,
    ) -> AppResult<Story> {
        let content = content
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        if content.is_none() && media.is_none() {
            return Err(AppError::validation("A story needs content or media"));
        }

        let media_url = match media {
            Some(upload) => Some(self.media.save(&upload.filename, &upload.bytes).await?),
            None => None,
        };

        let story = self
            .stories
            .create(&CreateStory {
                user_id,
                content,
                media_url,
                media_type,
                background_color,
            })
            .await?;

        let payload = StoryExpiryPayload { story_id: story.id };
        self.jobs
            .enqueue(&CreateJob {
                kind: STORY_EXPIRY.to_string(),
                queue: "default".to_string(),
                priority: JobPriority::Low,
                payload: serde_json::to_value(&payload)?,
                max_attempts: 3,
                scheduled_at: Some(Utc::now() + Duration::hours(self.ttl_hours)),
            })
            .await?;

        info!(story_id = %story.id, user_id = %user_id, "Story created");
        Ok(story)
    }

    /// Recent stories with author fields and counters.
    pub async fn feed(&self, viewer_id: Uuid) -> AppResult<Vec<StoryWithAuthor>> {
        self.stories.feed(viewer_id, FEED_LIMIT).await
    }

    /// Record that the caller viewed a story.
    pub async fn view(&self, caller_id: Uuid, story_id: Uuid) -> AppResult<()> {
        if self.stories.find_by_id(story_id).await?.is_none() {
            return Err(AppError::not_found("Story not found"));
        }
        self.stories.record_view(story_id, caller_id).await?;
        Ok(())
    }

    /// Toggle the caller's like. Returns whether the story is now liked.
    pub async fn like(&self, caller_id: Uuid, story_id: Uuid) -> AppResult<bool> {
        if self.stories.find_by_id(story_id).await?.is_none() {
            return Err(AppError::not_found("Story not found"));
        }
        self.stories.toggle_like(story_id, caller_id).await
    }

    /// Viewer list, visible to the story owner only.
    pub async fn viewers(&self, caller_id: Uuid, story_id: Uuid) -> AppResult<Vec<UserSummary>> {
        let story = self
            .stories
            .find_by_id(story_id)
            .await?
            .ok_or_else(|| AppError::not_found("Story not found"))?;

        if story.user_id != caller_id {
            return Err(AppError::authorization(
                "Only the story owner can see viewers",
            ));
        }

        self.stories.viewers(story_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use loopline_database::memory::{MemoryJobStore, MemoryStoryStore, MemoryUserStore};
    use loopline_entity::user::User;

    struct NullMediaStore;

    #[async_trait]
    impl MediaStore for NullMediaStore {
        async fn save(&self, _filename: &str, _bytes: &[u8]) -> AppResult<String> {
            Ok("/media/stub.mp4".to_string())
        }
    }

    fn user(username: &str) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: None,
            password_hash: "x".to_string(),
            full_name: username.to_string(),
            bio: None,
            profile_picture: None,
            created_at: now,
            updated_at: now,
        }
    }

    async fn setup() -> (StoryService, MemoryUserStore, MemoryJobStore) {
        let users = MemoryUserStore::new();
        let stories = MemoryStoryStore::new(users.clone());
        let jobs = MemoryJobStore::new();
        let service = StoryService::new(
            Arc::new(stories),
            Arc::new(jobs.clone()),
            Arc::new(NullMediaStore),
            24,
        );
        (service, users, jobs)
    }

    #[tokio::test]
    async fn create_schedules_expiry_roughly_one_day_out() {
        let (service, users, jobs) = setup().await;
        let author = user("mika");
        users.insert(author.clone()).await;

        let before = Utc::now();
        let story = service
            .create(
                author.id,
                Some("hello".to_string()),
                None,
                StoryMediaType::Text,
                Some("#10b981".to_string()),
            )
            .await
            .unwrap();

        let expiry_jobs = jobs.of_kind(STORY_EXPIRY).await;
        assert_eq!(expiry_jobs.len(), 1);

        let payload: StoryExpiryPayload =
            serde_json::from_value(expiry_jobs[0].payload.clone()).unwrap();
        assert_eq!(payload.story_id, story.id);

        let scheduled_at = expiry_jobs[0].scheduled_at.unwrap();
        let delay = scheduled_at - before;
        assert!(delay >= Duration::hours(23) && delay <= Duration::hours(25));
    }

    #[tokio::test]
    async fn empty_story_is_rejected() {
        let (service, users, _) = setup().await;
        let author = user("mika");
        users.insert(author.clone()).await;

        let err = service
            .create(author.id, None, None, StoryMediaType::Text, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, loopline_core::error::ErrorKind::Validation);
    }

    #[tokio::test]
    async fn viewers_are_owner_only() {
        let (service, users, _) = setup().await;
        let author = user("mika");
        let viewer = user("aki");
        users.insert(author.clone()).await;
        users.insert(viewer.clone()).await;

        let story = service
            .create(
                author.id,
                Some("hi".to_string()),
                None,
                StoryMediaType::Text,
                None,
            )
            .await
            .unwrap();

        service.view(viewer.id, story.id).await.unwrap();
        // Repeat views stay idempotent.
        service.view(viewer.id, story.id).await.unwrap();

        let err = service.viewers(viewer.id, story.id).await.unwrap_err();
        assert_eq!(err.kind, loopline_core::error::ErrorKind::Authorization);

        let viewers = service.viewers(author.id, story.id).await.unwrap();
        assert_eq!(viewers.len(), 1);
        assert_eq!(viewers[0].id, viewer.id);
    }

    #[tokio::test]
    async fn like_toggles() {
        let (service, users, _) = setup().await;
        let author = user("mika");
        users.insert(author.clone()).await;

        let story = service
            .create(
                author.id,
                Some("hi".to_string()),
                None,
                StoryMediaType::Text,
                None,
            )
            .await
            .unwrap();

        assert!(service.like(author.id, story.id).await.unwrap());
        assert!(!service.like(author.id, story.id).await.unwrap());
    }
}
