//! Live delivery channel configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the per-user live delivery channels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Buffer size of each channel sink. Pushes to a full sink are
    /// dropped rather than blocking the dispatcher.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// SSE keep-alive interval in seconds.
    #[serde(default = "default_keep_alive")]
    pub keep_alive_seconds: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: default_channel_buffer(),
            keep_alive_seconds: default_keep_alive(),
        }
    }
}

fn default_channel_buffer() -> usize {
    256
}

fn default_keep_alive() -> u64 {
    15
}
