//! User id to channel sink registry.

use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use crate::channel::ChannelSink;

/// Maps each user to at most one active delivery channel.
///
/// Constructed once at server start and shared through the application
/// state; the DashMap makes per-key replacement safe under concurrent
/// subscribes.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    channels: DashMap<Uuid, ChannelSink>,
}

impl ChannelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Install a sink for the user. Any previously registered sink is
    /// closed so its stream terminates instead of lingering.
    pub fn register(&self, user_id: Uuid, sink: ChannelSink) {
        if let Some(old) = self.channels.insert(user_id, sink) {
            debug!(user_id = %user_id, old_sink = %old.id(), "Replacing existing channel");
            old.close();
        }
    }

    /// Remove the user's sink, but only if it is still the given one.
    /// A disconnect that races a newer subscription must not tear the
    /// newer channel down.
    pub fn unregister(&self, user_id: Uuid, sink_id: Uuid) {
        self.channels
            .remove_if(&user_id, |_, sink| sink.id() == sink_id);
    }

    /// The user's current sink, if connected.
    pub fn lookup(&self, user_id: Uuid) -> Option<ChannelSink> {
        self.channels.get(&user_id).map(|entry| entry.clone())
    }

    /// Number of connected users.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Whether no user is connected.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
