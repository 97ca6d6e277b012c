//! Job status and priority enumerations.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a background job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting to be claimed. A future `scheduled_at` keeps the job
    /// invisible to the poller until it comes due.
    Pending,
    /// Claimed and currently executing on a worker.
    Running,
    /// Finished successfully.
    Completed,
    /// Failed permanently or exhausted its retry budget.
    Failed,
    /// Manually cancelled.
    Cancelled,
}

/// Claim ordering among due jobs of the same queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobPriority {
    Low,
    Normal,
    High,
}

impl JobPriority {
    /// Numeric rank, higher claims first.
    pub fn numeric_priority(&self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Normal => 2,
            Self::High => 3,
        }
    }
}
