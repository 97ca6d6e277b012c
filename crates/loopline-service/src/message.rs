//! Direct message operations: send, history, recents.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use loopline_core::error::AppError;
use loopline_core::result::AppResult;
use loopline_database::traits::{MessageStore, UserStore};
use loopline_entity::message::{CreateMessage, MessageType, MessageWithSender};
use loopline_realtime::LiveDispatcher;

use crate::media::MediaStore;

/// An uploaded image attachment.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// Client-supplied file name (only the extension is trusted).
    pub filename: String,
    /// Raw file bytes.
    pub bytes: Vec<u8>,
}

/// Handles message sending and conversation queries.
///
/// The send path persists first, then populates the sender's display
/// fields and hands the result to the dispatcher. Push delivery is
/// best effort; the caller's success only depends on persistence.
#[derive(Clone)]
pub struct MessageService {
    messages: Arc<dyn MessageStore>,
    users: Arc<dyn UserStore>,
    media: Arc<dyn MediaStore>,
    dispatcher: LiveDispatcher,
}

impl MessageService {
    /// Creates a new message service.
    pub fn new(
        messages: Arc<dyn MessageStore>,
        users: Arc<dyn UserStore>,
        media: Arc<dyn MediaStore>,
        dispatcher: LiveDispatcher,
    ) -> Self {
        Self {
            messages,
            users,
            media,
            dispatcher,
        }
    }

    /// Send a message from `from_user_id` to `to_user_id`.
    ///
    /// At least one of `text` and `image` must be present and the
    /// recipient must exist.
    pub async fn send(
        &self,
        from_user_id: Uuid,
        to_user_id: Uuid,
        text: Option<String>,
        image: Option<ImageUpload>,
    ) -> AppResult<MessageWithSender> {
        let text = text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        if text.is_none() && image.is_none() {
            return Err(AppError::validation(
                "A message needs text or an image attachment",
            ));
        }

        if self.users.find_by_id(to_user_id).await?.is_none() {
            return Err(AppError::not_found("Recipient not found"));
        }

        let sender = self
            .users
            .find_by_id(from_user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Sender not found"))?;

        let (media_url, message_type) = match image {
            Some(upload) => {
                let url = self.media.save(&upload.filename, &upload.bytes).await?;
                (Some(url), MessageType::Image)
            }
            None => (None, MessageType::Text),
        };

        let message = self
            .messages
            .create(&CreateMessage {
                from_user_id,
                to_user_id,
                text,
                media_url,
                message_type,
            })
            .await?;

        info!(
            message_id = %message.id,
            from = %from_user_id,
            to = %to_user_id,
            kind = %message.message_type,
            "Message stored"
        );

        let populated = MessageWithSender::from_parts(message, sender.summary());
        self.dispatcher.dispatch(&populated);
        Ok(populated)
    }

    /// Conversation history with `partner_id`, oldest first. Opening a
    /// conversation marks the partner's messages as seen.
    pub async fn chat_with(
        &self,
        caller_id: Uuid,
        partner_id: Uuid,
    ) -> AppResult<Vec<MessageWithSender>> {
        self.messages.mark_seen(partner_id, caller_id).await?;
        self.messages.conversation(caller_id, partner_id).await
    }

    /// The most recent message per conversation partner.
    pub async fn recent(&self, caller_id: Uuid) -> AppResult<Vec<MessageWithSender>> {
        self.messages.recent_per_partner(caller_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use loopline_database::memory::{MemoryMessageStore, MemoryUserStore};
    use loopline_entity::user::User;
    use loopline_realtime::{ChannelRegistry, ChannelSink, SinkEvent};
    use tokio::sync::mpsc;

    struct NullMediaStore;

    #[async_trait]
    impl MediaStore for NullMediaStore {
        async fn save(&self, _filename: &str, _bytes: &[u8]) -> AppResult<String> {
            Ok("/media/stub.jpg".to_string())
        }
    }

    fn user(username: &str) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: Some(format!("{username}@example.com")),
            password_hash: "x".to_string(),
            full_name: format!("{username} surname"),
            bio: None,
            profile_picture: None,
            created_at: now,
            updated_at: now,
        }
    }

    async fn service() -> (MessageService, MemoryUserStore, Arc<ChannelRegistry>) {
        let users = MemoryUserStore::new();
        let messages = MemoryMessageStore::new(users.clone());
        let registry = Arc::new(ChannelRegistry::new());
        let service = MessageService::new(
            Arc::new(messages),
            Arc::new(users.clone()),
            Arc::new(NullMediaStore),
            LiveDispatcher::new(registry.clone()),
        );
        (service, users, registry)
    }

    #[tokio::test]
    async fn send_requires_text_or_image() {
        let (service, users, _) = service().await;
        let sender = user("mika");
        let recipient = user("aki");
        users.insert(sender.clone()).await;
        users.insert(recipient.clone()).await;

        let err = service
            .send(sender.id, recipient.id, Some("   ".to_string()), None)
            .await
            .unwrap_err();
        assert_eq!(
            err.kind,
            loopline_core::error::ErrorKind::Validation
        );
    }

    #[tokio::test]
    async fn send_to_unknown_recipient_fails() {
        let (service, users, _) = service().await;
        let sender = user("mika");
        users.insert(sender.clone()).await;

        let err = service
            .send(sender.id, Uuid::new_v4(), Some("hey".to_string()), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, loopline_core::error::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn send_populates_sender_and_pushes_to_connected_recipient() {
        let (service, users, registry) = service().await;
        let sender = user("mika");
        let recipient = user("aki");
        users.insert(sender.clone()).await;
        users.insert(recipient.clone()).await;

        let (tx, mut rx) = mpsc::channel(8);
        registry.register(recipient.id, ChannelSink::new(tx));

        let sent = service
            .send(sender.id, recipient.id, Some("hello".to_string()), None)
            .await
            .unwrap();
        assert_eq!(sent.from_user.username, "mika");
        assert_eq!(sent.message_type, MessageType::Text);

        let pushed = match rx.recv().await {
            Some(SinkEvent::Data(payload)) => payload,
            other => panic!("expected push, got {other:?}"),
        };
        let parsed: MessageWithSender = serde_json::from_str(&pushed).unwrap();
        assert_eq!(parsed.id, sent.id);
        assert_eq!(parsed.from_user.id, sender.id);
    }

    #[tokio::test]
    async fn send_succeeds_when_recipient_is_offline() {
        let (service, users, _) = service().await;
        let sender = user("mika");
        let recipient = user("aki");
        users.insert(sender.clone()).await;
        users.insert(recipient.clone()).await;

        let sent = service
            .send(sender.id, recipient.id, Some("offline".to_string()), None)
            .await
            .unwrap();

        // The message is persisted and shows up in history.
        let history = service.chat_with(recipient.id, sender.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, sent.id);
    }

    #[tokio::test]
    async fn image_message_carries_media_url() {
        let (service, users, _) = service().await;
        let sender = user("mika");
        let recipient = user("aki");
        users.insert(sender.clone()).await;
        users.insert(recipient.clone()).await;

        let sent = service
            .send(
                sender.id,
                recipient.id,
                None,
                Some(ImageUpload {
                    filename: "cat.jpg".to_string(),
                    bytes: vec![1, 2, 3],
                }),
            )
            .await
            .unwrap();
        assert_eq!(sent.message_type, MessageType::Image);
        assert_eq!(sent.media_url.as_deref(), Some("/media/stub.jpg"));
    }

    #[tokio::test]
    async fn opening_chat_marks_partner_messages_seen() {
        let (service, users, _) = service().await;
        let sender = user("mika");
        let recipient = user("aki");
        users.insert(sender.clone()).await;
        users.insert(recipient.clone()).await;

        service
            .send(sender.id, recipient.id, Some("one".to_string()), None)
            .await
            .unwrap();

        let history = service.chat_with(recipient.id, sender.id).await.unwrap();
        assert!(history[0].seen);
    }
}
