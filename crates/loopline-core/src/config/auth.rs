//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// JWT and password hashing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to sign access tokens.
    pub jwt_secret: String,
    /// Access token time-to-live in hours.
    #[serde(default = "default_access_ttl")]
    pub jwt_access_ttl_hours: u64,
}

fn default_access_ttl() -> u64 {
    24
}
