//! Push delivery of new messages to connected recipients.

use std::sync::Arc;

use tracing::{debug, warn};

use loopline_entity::message::MessageWithSender;

use crate::registry::ChannelRegistry;

/// Pushes freshly persisted messages to their recipient's channel.
///
/// Delivery is fire and forget: an offline recipient, a full buffer,
/// or a serialization problem never surfaces to the sender, who has
/// already had the message persisted.
#[derive(Debug, Clone)]
pub struct LiveDispatcher {
    registry: Arc<ChannelRegistry>,
}

impl LiveDispatcher {
    /// Create a dispatcher over the shared registry.
    pub fn new(registry: Arc<ChannelRegistry>) -> Self {
        Self { registry }
    }

    /// Deliver the message to its recipient if they are connected.
    pub fn dispatch(&self, message: &MessageWithSender) {
        let Some(sink) = self.registry.lookup(message.to_user_id) else {
            debug!(
                to_user_id = %message.to_user_id,
                message_id = %message.id,
                "Recipient not connected, skipping push"
            );
            return;
        };

        let payload = match serde_json::to_string(message) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(message_id = %message.id, error = %e, "Failed to serialize message");
                return;
            }
        };

        if !sink.send(payload) {
            warn!(
                to_user_id = %message.to_user_id,
                message_id = %message.id,
                "Push delivery failed, recipient will see it in history"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelSink, SinkEvent};
    use chrono::Utc;
    use loopline_entity::message::MessageType;
    use loopline_entity::user::UserSummary;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn message(to_user_id: Uuid, text: &str) -> MessageWithSender {
        MessageWithSender {
            id: Uuid::new_v4(),
            from_user: UserSummary {
                id: Uuid::new_v4(),
                username: "mika".to_string(),
                full_name: "Mika Tanaka".to_string(),
                profile_picture: None,
            },
            to_user_id,
            text: Some(text.to_string()),
            media_url: None,
            message_type: MessageType::Text,
            seen: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn dispatch_pushes_to_connected_recipient_in_order() {
        let registry = Arc::new(ChannelRegistry::new());
        let dispatcher = LiveDispatcher::new(registry.clone());

        let recipient = Uuid::new_v4();
        let (tx, mut rx) = mpsc::channel(8);
        registry.register(recipient, ChannelSink::new(tx));

        dispatcher.dispatch(&message(recipient, "one"));
        dispatcher.dispatch(&message(recipient, "two"));

        let first = match rx.recv().await {
            Some(SinkEvent::Data(payload)) => payload,
            other => panic!("expected data event, got {other:?}"),
        };
        let second = match rx.recv().await {
            Some(SinkEvent::Data(payload)) => payload,
            other => panic!("expected data event, got {other:?}"),
        };

        assert!(first.contains("\"one\""));
        assert!(second.contains("\"two\""));

        // The payload carries the sender's display fields for routing.
        let parsed: MessageWithSender = serde_json::from_str(&first).unwrap();
        assert_eq!(parsed.from_user.username, "mika");
        assert_eq!(parsed.to_user_id, recipient);
    }

    #[tokio::test]
    async fn dispatch_to_offline_recipient_is_a_no_op() {
        let registry = Arc::new(ChannelRegistry::new());
        let dispatcher = LiveDispatcher::new(registry);

        // Nothing registered; must not panic or error.
        dispatcher.dispatch(&message(Uuid::new_v4(), "into the void"));
    }
}
