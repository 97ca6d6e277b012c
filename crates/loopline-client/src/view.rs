//! Client-side routing of inbound messages.
//!
//! One conversation can be open at a time. A message from the open
//! conversation's partner is appended to the visible thread; anything
//! else becomes a transient toast and never mutates thread state.

use std::sync::Mutex;

use uuid::Uuid;

use loopline_entity::message::MessageWithSender;

/// Routes one inbound message. Implemented by the view layer.
pub trait MessageRouter: Send + Sync + 'static {
    fn route(&self, message: MessageWithSender);
}

/// A transient notification about a message in a closed conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub from_user_id: Uuid,
    pub from_name: String,
    pub preview: String,
}

#[derive(Debug, Default)]
struct ViewState {
    open_conversation: Option<Uuid>,
    thread: Vec<MessageWithSender>,
    toasts: Vec<Toast>,
}

/// Default router: a single open conversation plus a toast queue.
#[derive(Debug, Default)]
pub struct ConversationView {
    state: Mutex<ViewState>,
}

impl ConversationView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the conversation with `partner_id`, seeding the thread
    /// with history fetched through the normal chat endpoint.
    pub fn open_conversation(&self, partner_id: Uuid, history: Vec<MessageWithSender>) {
        let mut state = self.lock();
        state.open_conversation = Some(partner_id);
        state.thread = history;
    }

    pub fn close_conversation(&self) {
        let mut state = self.lock();
        state.open_conversation = None;
        state.thread.clear();
    }

    /// Snapshot of the visible thread.
    pub fn thread(&self) -> Vec<MessageWithSender> {
        self.lock().thread.clone()
    }

    /// Drain pending toasts.
    pub fn take_toasts(&self) -> Vec<Toast> {
        std::mem::take(&mut self.lock().toasts)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MessageRouter for ConversationView {
    fn route(&self, message: MessageWithSender) {
        let mut state = self.lock();
        if state.open_conversation == Some(message.from_user.id) {
            state.thread.push(message);
        } else {
            state.toasts.push(Toast {
                from_user_id: message.from_user.id,
                from_name: message.from_user.full_name.clone(),
                preview: message
                    .text
                    .clone()
                    .unwrap_or_else(|| "Sent a photo".to_string()),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use loopline_entity::message::MessageType;
    use loopline_entity::user::UserSummary;

    fn message_from(sender_id: Uuid, text: &str) -> MessageWithSender {
        MessageWithSender {
            id: Uuid::new_v4(),
            from_user: UserSummary {
                id: sender_id,
                username: "mika".to_string(),
                full_name: "Mika Tanaka".to_string(),
                profile_picture: None,
            },
            to_user_id: Uuid::new_v4(),
            text: Some(text.to_string()),
            media_url: None,
            message_type: MessageType::Text,
            seen: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn open_conversation_appends_to_the_thread() {
        let view = ConversationView::new();
        let partner = Uuid::new_v4();
        view.open_conversation(partner, vec![message_from(partner, "earlier")]);

        view.route(message_from(partner, "hello"));

        let thread = view.thread();
        assert_eq!(thread.len(), 2);
        assert_eq!(thread[1].text.as_deref(), Some("hello"));
        assert!(view.take_toasts().is_empty());
    }

    #[test]
    fn other_senders_become_toasts() {
        let view = ConversationView::new();
        let partner = Uuid::new_v4();
        view.open_conversation(partner, Vec::new());

        view.route(message_from(Uuid::new_v4(), "psst"));

        assert!(view.thread().is_empty());
        let toasts = view.take_toasts();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].preview, "psst");
        // Draining empties the queue.
        assert!(view.take_toasts().is_empty());
    }

    #[test]
    fn no_open_conversation_means_everything_toasts() {
        let view = ConversationView::new();
        view.route(message_from(Uuid::new_v4(), "hi"));
        assert!(view.thread().is_empty());
        assert_eq!(view.take_toasts().len(), 1);
    }
}
