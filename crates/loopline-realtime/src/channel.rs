//! A single user's delivery channel.

use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

/// Event flowing through a channel sink toward the connected client.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    /// A serialized message payload to deliver.
    Data(String),
    /// Terminal signal: the channel was replaced or shut down and the
    /// consumer should end its stream.
    Close,
}

/// The write half of one user's delivery channel.
///
/// Backed by a bounded mpsc sender, so delivery order per recipient
/// follows send order. Cloning shares the same underlying channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    /// Identity of this sink, used to detect stale unregisters.
    id: Uuid,
    sender: mpsc::Sender<SinkEvent>,
}

impl ChannelSink {
    /// Create a sink over the given sender.
    pub fn new(sender: mpsc::Sender<SinkEvent>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
        }
    }

    /// This sink's identity.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Push a payload without blocking. A full buffer drops the
    /// payload; a closed receiver reports `false`.
    pub fn send(&self, payload: String) -> bool {
        match self.sender.try_send(SinkEvent::Data(payload)) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(sink_id = %self.id, "Channel buffer full, dropping payload");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Signal the consumer to end its stream. Best effort; a gone
    /// receiver already ended.
    pub fn close(&self) {
        let _ = self.sender.try_send(SinkEvent::Close);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_preserves_order() {
        let (tx, mut rx) = mpsc::channel(8);
        let sink = ChannelSink::new(tx);

        assert!(sink.send("first".to_string()));
        assert!(sink.send("second".to_string()));

        assert_eq!(rx.recv().await, Some(SinkEvent::Data("first".to_string())));
        assert_eq!(rx.recv().await, Some(SinkEvent::Data("second".to_string())));
    }

    #[tokio::test]
    async fn full_buffer_drops_payload() {
        let (tx, _rx) = mpsc::channel(1);
        let sink = ChannelSink::new(tx);

        assert!(sink.send("kept".to_string()));
        assert!(!sink.send("dropped".to_string()));
    }

    #[tokio::test]
    async fn send_to_closed_receiver_reports_false() {
        let (tx, rx) = mpsc::channel(1);
        let sink = ChannelSink::new(tx);
        drop(rx);

        assert!(!sink.send("lost".to_string()));
    }
}
