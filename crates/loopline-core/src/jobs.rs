//! Job kinds and payload types shared between the enqueue side (the
//! services) and the worker handlers.
//!
//! Payloads are stored as JSON in the jobs table, so both sides must
//! agree on their shape. Keeping them here avoids a dependency from
//! the services on the worker crate.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Job kind for the initial connection-request email.
pub const CONNECTION_REQUEST_MAIL: &str = "connection_request_mail";

/// Job kind for the delayed connection-request reminder.
pub const CONNECTION_REMINDER: &str = "connection_reminder";

/// Job kind for deleting a story after its time-to-live elapses.
pub const STORY_EXPIRY: &str = "story_expiry";

/// Job kind for the daily unseen-message aggregation. The cron
/// scheduler enqueues this; it fans out into [`DIGEST_SEND`] jobs.
pub const UNSEEN_DIGEST: &str = "unseen_digest";

/// Job kind for sending one unseen-message digest email.
pub const DIGEST_SEND: &str = "digest_send";

/// Payload for [`CONNECTION_REQUEST_MAIL`] and [`CONNECTION_REMINDER`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionMailPayload {
    /// The connection request the email concerns.
    pub connection_id: Uuid,
}

/// Payload for [`STORY_EXPIRY`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryExpiryPayload {
    /// The story to delete once its TTL has elapsed.
    pub story_id: Uuid,
}

/// Payload for [`DIGEST_SEND`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestSendPayload {
    /// The recipient of the digest.
    pub user_id: Uuid,
    /// How many unseen messages the recipient had at aggregation time.
    pub unseen_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_payload_round_trips_through_json() {
        let payload = DigestSendPayload {
            user_id: Uuid::new_v4(),
            unseen_count: 3,
        };
        let value = serde_json::to_value(&payload).unwrap();
        let back: DigestSendPayload = serde_json::from_value(value).unwrap();
        assert_eq!(back.user_id, payload.user_id);
        assert_eq!(back.unseen_count, 3);
    }
}
