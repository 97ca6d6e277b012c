//! Connection status enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a connection request. The only transitions are
/// pending to accepted and pending to rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "connection_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// Awaiting a decision from the recipient.
    Pending,
    /// Accepted by the recipient.
    Accepted,
    /// Rejected by the recipient.
    Rejected,
}

impl ConnectionStatus {
    /// Whether the request has been decided. A decided request gets no
    /// reminder email.
    pub fn is_decided(&self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected)
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
