//! Job queue facade over the durable job store.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::Value;
use uuid::Uuid;

use loopline_core::error::AppError;
use loopline_database::traits::JobStore;
use loopline_entity::job::{CreateJob, Job};

/// Upper bound on the retry backoff.
const MAX_BACKOFF_SECONDS: i64 = 3600;

/// Enqueue and claim work on behalf of one worker process.
#[derive(Clone)]
pub struct JobQueue {
    store: Arc<dyn JobStore>,
    worker_id: String,
}

impl JobQueue {
    pub fn new(store: Arc<dyn JobStore>, worker_id: String) -> Self {
        Self { store, worker_id }
    }

    /// The identifier this queue claims jobs under.
    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Enqueue a new job.
    pub async fn enqueue(&self, data: &CreateJob) -> Result<Job, AppError> {
        let job = self.store.enqueue(data).await?;
        tracing::debug!(
            job_id = %job.id,
            kind = %job.kind,
            queue = %job.queue,
            "Enqueued job"
        );
        Ok(job)
    }

    /// Claim the next due job from the given queues, checked in order.
    pub async fn dequeue(&self, queues: &[&str]) -> Result<Option<Job>, AppError> {
        for queue in queues {
            if let Some(job) = self.store.claim_due(queue, &self.worker_id).await? {
                tracing::debug!(job_id = %job.id, kind = %job.kind, queue = %queue, "Claimed job");
                return Ok(Some(job));
            }
        }
        Ok(None)
    }

    /// Mark a job completed with an optional result document.
    pub async fn complete(&self, job_id: Uuid, result: Option<Value>) -> Result<(), AppError> {
        self.store.complete(job_id, result.as_ref()).await
    }

    /// Mark a job failed terminally.
    pub async fn fail(&self, job_id: Uuid, error: &str) -> Result<(), AppError> {
        self.store.fail(job_id, error).await
    }

    /// Put a job back to pending with an exponential backoff delay.
    pub async fn retry(&self, job_id: Uuid, attempts: i32, error: &str) -> Result<(), AppError> {
        let run_at = Utc::now() + retry_backoff(attempts);
        self.store.reschedule(job_id, run_at, error).await?;
        tracing::debug!(job_id = %job_id, run_at = %run_at, "Rescheduled job");
        Ok(())
    }

    /// Recover jobs left `running` by a worker that died mid-step. The
    /// attempt budget still applies: a stale job with no attempts left
    /// is failed instead of requeued.
    pub async fn reclaim_stale(&self, older_than_seconds: u64) -> Result<u64, AppError> {
        let cutoff = Utc::now() - Duration::seconds(older_than_seconds as i64);
        let reclaimed = self.store.reclaim_stale(cutoff).await?;
        if reclaimed > 0 {
            tracing::warn!(reclaimed, "Recovered jobs stranded by a dead worker");
        }
        Ok(reclaimed)
    }

    /// Jobs of `kind` created at or after `since`, any status.
    pub async fn recent_of_kind(
        &self,
        kind: &str,
        since: chrono::DateTime<Utc>,
    ) -> Result<Vec<Job>, AppError> {
        self.store.recent_of_kind(kind, since).await
    }
}

impl std::fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQueue")
            .field("worker_id", &self.worker_id)
            .finish()
    }
}

/// 30s, 60s, 120s, ... capped at one hour.
fn retry_backoff(attempts: i32) -> Duration {
    let exponent = attempts.saturating_sub(1).clamp(0, 16) as u32;
    let seconds = 30i64.saturating_mul(1 << exponent).min(MAX_BACKOFF_SECONDS);
    Duration::seconds(seconds)
}
