//! Media attachment storage configuration.

use serde::{Deserialize, Serialize};

/// Local media store configuration for message and story attachments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Directory where uploaded media files are written.
    #[serde(default = "default_data_root")]
    pub data_root: String,
    /// URL path prefix under which stored media is served.
    #[serde(default = "default_public_prefix")]
    pub public_prefix: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            public_prefix: default_public_prefix(),
        }
    }
}

fn default_data_root() -> String {
    "data/media".to_string()
}

fn default_public_prefix() -> String {
    "/media".to_string()
}
