//! In-memory message store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use loopline_core::result::AppResult;
use loopline_entity::message::{
    CreateMessage, Message, MessageWithSender, UnseenCount,
};
use loopline_entity::user::UserSummary;

use crate::traits::{MessageStore, UserStore};

use super::user::MemoryUserStore;

/// In-memory message store. Resolves sender display fields through the
/// shared user store, the way the SQL implementation joins users.
#[derive(Debug, Clone)]
pub struct MemoryMessageStore {
    messages: Arc<Mutex<Vec<Message>>>,
    users: MemoryUserStore,
}

impl MemoryMessageStore {
    /// Creates an empty store over the given user store.
    pub fn new(users: MemoryUserStore) -> Self {
        Self {
            messages: Arc::new(Mutex::new(Vec::new())),
            users,
        }
    }

    /// Insert a pre-built message.
    pub async fn insert(&self, message: Message) {
        self.messages.lock().await.push(message);
    }

    /// Snapshot of all stored messages.
    pub async fn all(&self) -> Vec<Message> {
        self.messages.lock().await.clone()
    }

    async fn sender_summary(&self, user_id: Uuid) -> UserSummary {
        match self.users.find_by_id(user_id).await {
            Ok(Some(user)) => user.summary(),
            _ => UserSummary {
                id: user_id,
                username: String::new(),
                full_name: String::new(),
                profile_picture: None,
            },
        }
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn create(&self, data: &CreateMessage) -> AppResult<Message> {
        let message = Message {
            id: Uuid::new_v4(),
            from_user_id: data.from_user_id,
            to_user_id: data.to_user_id,
            text: data.text.clone(),
            media_url: data.media_url.clone(),
            message_type: data.message_type,
            seen: false,
            created_at: Utc::now(),
        };
        self.messages.lock().await.push(message.clone());
        Ok(message)
    }

    async fn conversation(
        &self,
        user_a: Uuid,
        user_b: Uuid,
    ) -> AppResult<Vec<MessageWithSender>> {
        let mut rows: Vec<Message> = self
            .messages
            .lock()
            .await
            .iter()
            .filter(|m| {
                (m.from_user_id == user_a && m.to_user_id == user_b)
                    || (m.from_user_id == user_b && m.to_user_id == user_a)
            })
            .cloned()
            .collect();
        rows.sort_by_key(|m| m.created_at);

        let mut result = Vec::with_capacity(rows.len());
        for message in rows {
            let sender = self.sender_summary(message.from_user_id).await;
            result.push(MessageWithSender::from_parts(message, sender));
        }
        Ok(result)
    }

    async fn mark_seen(&self, from_user_id: Uuid, to_user_id: Uuid) -> AppResult<u64> {
        let mut updated = 0;
        for message in self.messages.lock().await.iter_mut() {
            if message.from_user_id == from_user_id
                && message.to_user_id == to_user_id
                && !message.seen
            {
                message.seen = true;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn recent_per_partner(&self, user_id: Uuid) -> AppResult<Vec<MessageWithSender>> {
        let mut latest: HashMap<Uuid, Message> = HashMap::new();
        for message in self.messages.lock().await.iter() {
            let partner = if message.from_user_id == user_id {
                message.to_user_id
            } else if message.to_user_id == user_id {
                message.from_user_id
            } else {
                continue;
            };
            let replace = latest
                .get(&partner)
                .map(|current| message.created_at > current.created_at)
                .unwrap_or(true);
            if replace {
                latest.insert(partner, message.clone());
            }
        }

        let mut rows: Vec<Message> = latest.into_values().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut result = Vec::with_capacity(rows.len());
        for message in rows {
            let sender = self.sender_summary(message.from_user_id).await;
            result.push(MessageWithSender::from_parts(message, sender));
        }
        Ok(result)
    }

    async fn unseen_counts(&self) -> AppResult<Vec<UnseenCount>> {
        let mut counts: HashMap<Uuid, i64> = HashMap::new();
        for message in self.messages.lock().await.iter() {
            if !message.seen {
                *counts.entry(message.to_user_id).or_insert(0) += 1;
            }
        }
        Ok(counts
            .into_iter()
            .map(|(user_id, count)| UnseenCount { user_id, count })
            .collect())
    }
}
