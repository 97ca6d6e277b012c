//! In-memory story store.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use loopline_core::result::AppResult;
use loopline_entity::story::{CreateStory, Story, StoryWithAuthor};
use loopline_entity::user::UserSummary;

use crate::traits::{StoryStore, UserStore};

use super::user::MemoryUserStore;

#[derive(Debug, Default)]
struct InnerState {
    stories: Vec<Story>,
    views: HashMap<Uuid, Vec<(Uuid, DateTime<Utc>)>>,
    likes: HashMap<Uuid, HashSet<Uuid>>,
}

/// In-memory story store over the shared user store.
#[derive(Debug, Clone)]
pub struct MemoryStoryStore {
    state: Arc<Mutex<InnerState>>,
    users: MemoryUserStore,
}

impl MemoryStoryStore {
    /// Creates an empty store over the given user store.
    pub fn new(users: MemoryUserStore) -> Self {
        Self {
            state: Arc::new(Mutex::new(InnerState::default())),
            users,
        }
    }

    /// Insert a pre-built story.
    pub async fn insert(&self, story: Story) {
        self.state.lock().await.stories.push(story);
    }

    /// Snapshot of all stored stories.
    pub async fn all(&self) -> Vec<Story> {
        self.state.lock().await.stories.clone()
    }
}

#[async_trait]
impl StoryStore for MemoryStoryStore {
    async fn create(&self, data: &CreateStory) -> AppResult<Story> {
        let story = Story {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            content: data.content.clone(),
            media_url: data.media_url.clone(),
            media_type: data.media_type,
            background_color: data.background_color.clone(),
            created_at: Utc::now(),
        };
        self.state.lock().await.stories.push(story.clone());
        Ok(story)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Story>> {
        Ok(self
            .state
            .lock()
            .await
            .stories
            .iter()
            .find(|s| s.id == id)
            .cloned())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        let before = state.stories.len();
        state.stories.retain(|s| s.id != id);
        let deleted = state.stories.len() < before;
        if deleted {
            state.views.remove(&id);
            state.likes.remove(&id);
        }
        Ok(deleted)
    }

    async fn feed(&self, viewer_id: Uuid, limit: i64) -> AppResult<Vec<StoryWithAuthor>> {
        let state = self.state.lock().await;
        let mut stories = state.stories.clone();
        stories.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        stories.truncate(limit as usize);

        let mut result = Vec::with_capacity(stories.len());
        for story in stories {
            let author = match self.users.find_by_id(story.user_id).await? {
                Some(user) => user.summary(),
                None => UserSummary {
                    id: story.user_id,
                    username: String::new(),
                    full_name: String::new(),
                    profile_picture: None,
                },
            };
            let view_count = state.views.get(&story.id).map(Vec::len).unwrap_or(0) as i64;
            let likes = state.likes.get(&story.id);
            result.push(StoryWithAuthor {
                author,
                view_count,
                like_count: likes.map(HashSet::len).unwrap_or(0) as i64,
                liked_by_me: likes.map(|l| l.contains(&viewer_id)).unwrap_or(false),
                story,
            });
        }
        Ok(result)
    }

    async fn record_view(&self, story_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        let views = state.views.entry(story_id).or_default();
        if views.iter().any(|(viewer, _)| *viewer == user_id) {
            return Ok(false);
        }
        views.push((user_id, Utc::now()));
        Ok(true)
    }

    async fn toggle_like(&self, story_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        let likes = state.likes.entry(story_id).or_default();
        if likes.insert(user_id) {
            Ok(true)
        } else {
            likes.remove(&user_id);
            Ok(false)
        }
    }

    async fn viewers(&self, story_id: Uuid) -> AppResult<Vec<UserSummary>> {
        let views = {
            let state = self.state.lock().await;
            let mut views = state.views.get(&story_id).cloned().unwrap_or_default();
            views.sort_by(|a, b| b.1.cmp(&a.1));
            views
        };

        let mut result = Vec::with_capacity(views.len());
        for (user_id, _) in views {
            if let Some(user) = self.users.find_by_id(user_id).await? {
                result.push(user.summary());
            }
        }
        Ok(result)
    }
}
