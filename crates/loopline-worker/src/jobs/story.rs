//! Story expiry handler.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use loopline_core::jobs::{StoryExpiryPayload, STORY_EXPIRY};
use loopline_database::traits::StoryStore;
use loopline_entity::job::Job;

use crate::executor::{parse_payload, JobExecutionError, JobHandler};

/// Deletes a story once its time-to-live has elapsed. The job is
/// idempotent: a story deleted by hand before the job runs is a no-op.
pub struct StoryExpiryHandler {
    stories: Arc<dyn StoryStore>,
}

impl StoryExpiryHandler {
    pub fn new(stories: Arc<dyn StoryStore>) -> Self {
        Self { stories }
    }
}

#[async_trait]
impl JobHandler for StoryExpiryHandler {
    fn kind(&self) -> &str {
        STORY_EXPIRY
    }

    async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let payload: StoryExpiryPayload = parse_payload(job)?;

        let deleted = self.stories.delete(payload.story_id).await?;
        if deleted {
            tracing::info!(story_id = %payload.story_id, "Expired story deleted");
        } else {
            tracing::debug!(story_id = %payload.story_id, "Story already gone");
        }

        Ok(Some(serde_json::json!({"deleted": deleted})))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loopline_database::memory::{MemoryStoryStore, MemoryUserStore};
    use loopline_entity::story::{CreateStory, StoryMediaType};

    use crate::jobs::testing::{claimed_job, user};

    #[tokio::test]
    async fn expiry_deletes_once_and_stays_idempotent() {
        let users = MemoryUserStore::new();
        let author = user("mika", None);
        users.insert(author.clone()).await;

        let stories = Arc::new(MemoryStoryStore::new(users));
        let story = stories
            .create(&CreateStory {
                user_id: author.id,
                content: Some("hello".to_string()),
                media_url: None,
                media_type: StoryMediaType::Text,
                background_color: None,
            })
            .await
            .unwrap();

        let handler = StoryExpiryHandler::new(stories.clone());
        let payload = serde_json::to_value(StoryExpiryPayload { story_id: story.id }).unwrap();

        let job = claimed_job(STORY_EXPIRY, payload.clone());
        let first = handler.execute(&job).await.unwrap();
        assert_eq!(first, Some(serde_json::json!({"deleted": true})));
        assert!(stories.find_by_id(story.id).await.unwrap().is_none());

        let second = handler
            .execute(&claimed_job(STORY_EXPIRY, payload))
            .await
            .unwrap();
        assert_eq!(second, Some(serde_json::json!({"deleted": false})));
    }

    #[tokio::test]
    async fn malformed_payload_fails_permanently() {
        let stories = Arc::new(MemoryStoryStore::new(MemoryUserStore::new()));
        let handler = StoryExpiryHandler::new(stories);

        let job = claimed_job(STORY_EXPIRY, serde_json::json!({"story": "not-a-uuid"}));
        let err = handler.execute(&job).await.unwrap_err();
        assert!(matches!(err, JobExecutionError::Permanent(_)));
    }
}
