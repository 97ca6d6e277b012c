//! In-memory user store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use loopline_core::error::AppError;
use loopline_core::result::AppResult;
use loopline_entity::user::{CreateUser, User, UserSummary};

use crate::traits::UserStore;

/// In-memory user store backed by a Tokio mutex.
#[derive(Debug, Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<Mutex<HashMap<Uuid, User>>>,
}

impl MemoryUserStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pre-built user, replacing any existing row.
    pub async fn insert(&self, user: User) {
        self.users.lock().await.insert(user.id, user);
    }

    /// Remove a user.
    pub async fn remove(&self, id: Uuid) {
        self.users.lock().await.remove(&id);
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.users.lock().await.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .await
            .values()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn create(&self, data: &CreateUser) -> AppResult<User> {
        let mut users = self.users.lock().await;
        if users
            .values()
            .any(|u| u.username.eq_ignore_ascii_case(&data.username))
        {
            return Err(AppError::conflict("Username or email already taken"));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: data.username.clone(),
            email: data.email.clone(),
            password_hash: data.password_hash.clone(),
            full_name: data.full_name.clone(),
            bio: None,
            profile_picture: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn search(&self, query: &str, limit: i64) -> AppResult<Vec<UserSummary>> {
        let query = query.to_lowercase();
        let mut matches: Vec<UserSummary> = self
            .users
            .lock()
            .await
            .values()
            .filter(|u| {
                u.username.to_lowercase().starts_with(&query)
                    || u.full_name.to_lowercase().starts_with(&query)
            })
            .map(User::summary)
            .collect();
        matches.sort_by(|a, b| a.username.cmp(&b.username));
        matches.truncate(limit as usize);
        Ok(matches)
    }
}
