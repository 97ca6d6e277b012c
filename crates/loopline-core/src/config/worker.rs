//! Background worker configuration.

use serde::{Deserialize, Serialize};

/// Background job worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the worker is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Number of concurrent job processing tasks.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Interval in seconds between job queue polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Delay in hours before the connection-request reminder fires.
    #[serde(default = "default_reminder_delay")]
    pub connection_reminder_hours: i64,
    /// Story time-to-live in hours before the expiry job deletes it.
    #[serde(default = "default_story_ttl")]
    pub story_ttl_hours: i64,
    /// Cron expression for the daily unseen-message digest.
    #[serde(default = "default_digest_cron")]
    pub digest_cron: String,
    /// Seconds a claimed job may stay `running` before it is treated as
    /// stranded by a dead worker and reclaimed.
    #[serde(default = "default_stale_job_timeout")]
    pub stale_job_timeout_seconds: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            concurrency: default_concurrency(),
            poll_interval_seconds: default_poll_interval(),
            connection_reminder_hours: default_reminder_delay(),
            story_ttl_hours: default_story_ttl(),
            digest_cron: default_digest_cron(),
            stale_job_timeout_seconds: default_stale_job_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_concurrency() -> usize {
    4
}

fn default_poll_interval() -> u64 {
    5
}

fn default_reminder_delay() -> i64 {
    24
}

fn default_story_ttl() -> i64 {
    24
}

fn default_digest_cron() -> String {
    // Every day at 09:00 server time.
    "0 0 9 * * *".to_string()
}

fn default_stale_job_timeout() -> u64 {
    600
}
