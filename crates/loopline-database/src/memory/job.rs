//! In-memory job store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use loopline_core::result::AppResult;
use loopline_entity::job::{CreateJob, Job, JobStatus};

use crate::traits::JobStore;

/// In-memory job store backed by a Tokio mutex.
#[derive(Debug, Clone, Default)]
pub struct MemoryJobStore {
    jobs: Arc<Mutex<Vec<Job>>>,
}

impl MemoryJobStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all stored jobs.
    pub async fn all(&self) -> Vec<Job> {
        self.jobs.lock().await.clone()
    }

    /// Jobs of the given kind, in insertion order.
    pub async fn of_kind(&self, kind: &str) -> Vec<Job> {
        self.jobs
            .lock()
            .await
            .iter()
            .filter(|j| j.kind == kind)
            .cloned()
            .collect()
    }

    /// Force a stored job's `scheduled_at`, to make a delayed job due
    /// without waiting.
    pub async fn make_due(&self, id: Uuid) {
        for job in self.jobs.lock().await.iter_mut() {
            if job.id == id {
                job.scheduled_at = Some(Utc::now() - chrono::Duration::seconds(1));
            }
        }
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn enqueue(&self, data: &CreateJob) -> AppResult<Job> {
        let now = Utc::now();
        let job = Job {
            id: Uuid::new_v4(),
            kind: data.kind.clone(),
            queue: data.queue.clone(),
            priority: data.priority,
            payload: data.payload.clone(),
            result: None,
            error_message: None,
            status: JobStatus::Pending,
            attempts: 0,
            max_attempts: data.max_attempts,
            scheduled_at: data.scheduled_at,
            started_at: None,
            completed_at: None,
            worker_id: None,
            created_at: now,
            updated_at: now,
        };
        self.jobs.lock().await.push(job.clone());
        Ok(job)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Job>> {
        Ok(self.jobs.lock().await.iter().find(|j| j.id == id).cloned())
    }

    async fn claim_due(&self, queue: &str, worker_id: &str) -> AppResult<Option<Job>> {
        let now = Utc::now();
        let mut jobs = self.jobs.lock().await;

        let mut due: Vec<&mut Job> = jobs
            .iter_mut()
            .filter(|j| {
                j.queue == queue
                    && j.status == JobStatus::Pending
                    && j.scheduled_at.map(|at| at <= now).unwrap_or(true)
            })
            .collect();
        due.sort_by(|a, b| {
            b.priority
                .numeric_priority()
                .cmp(&a.priority.numeric_priority())
                .then(a.created_at.cmp(&b.created_at))
        });

        let Some(job) = due.into_iter().next() else {
            return Ok(None);
        };

        job.status = JobStatus::Running;
        job.started_at = Some(now);
        job.worker_id = Some(worker_id.to_string());
        job.attempts += 1;
        job.updated_at = now;
        Ok(Some(job.clone()))
    }

    async fn complete(&self, id: Uuid, result: Option<&serde_json::Value>) -> AppResult<()> {
        for job in self.jobs.lock().await.iter_mut() {
            if job.id == id {
                job.status = JobStatus::Completed;
                job.result = result.cloned();
                job.completed_at = Some(Utc::now());
                job.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn fail(&self, id: Uuid, error_message: &str) -> AppResult<()> {
        for job in self.jobs.lock().await.iter_mut() {
            if job.id == id {
                job.status = JobStatus::Failed;
                job.error_message = Some(error_message.to_string());
                job.completed_at = Some(Utc::now());
                job.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn reschedule(
        &self,
        id: Uuid,
        run_at: DateTime<Utc>,
        error_message: &str,
    ) -> AppResult<()> {
        for job in self.jobs.lock().await.iter_mut() {
            if job.id == id {
                job.status = JobStatus::Pending;
                job.scheduled_at = Some(run_at);
                job.error_message = Some(error_message.to_string());
                job.started_at = None;
                job.worker_id = None;
                job.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn reclaim_stale(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let now = Utc::now();
        let mut touched = 0;
        for job in self.jobs.lock().await.iter_mut() {
            let stale = job.status == JobStatus::Running
                && job.started_at.map(|at| at <= cutoff).unwrap_or(false);
            if !stale {
                continue;
            }
            if job.attempts >= job.max_attempts {
                job.status = JobStatus::Failed;
                job.error_message = Some("Worker timed out".to_string());
                job.completed_at = Some(now);
            } else {
                job.status = JobStatus::Pending;
                job.started_at = None;
                job.worker_id = None;
            }
            job.updated_at = now;
            touched += 1;
        }
        Ok(touched)
    }

    async fn recent_of_kind(&self, kind: &str, since: DateTime<Utc>) -> AppResult<Vec<Job>> {
        Ok(self
            .jobs
            .lock()
            .await
            .iter()
            .filter(|j| j.kind == kind && j.created_at >= since)
            .cloned()
            .collect())
    }
}
