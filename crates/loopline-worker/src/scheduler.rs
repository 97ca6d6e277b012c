//! Cron scheduler for periodic tasks.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};

use loopline_core::error::AppError;
use loopline_core::jobs::UNSEEN_DIGEST;
use loopline_entity::job::{CreateJob, JobPriority};

use crate::queue::JobQueue;

/// Enqueues recurring jobs on a cron schedule. The only recurring task
/// today is the unseen-message digest aggregation.
pub struct CronScheduler {
    scheduler: JobScheduler,
    queue: Arc<JobQueue>,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler").finish()
    }
}

impl CronScheduler {
    pub async fn new(queue: Arc<JobQueue>) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self { scheduler, queue })
    }

    /// Register the daily digest aggregation on the given cron
    /// expression (seconds-resolution, e.g. `0 0 9 * * *`).
    pub async fn register_unseen_digest(&self, cron: &str) -> Result<(), AppError> {
        let queue = Arc::clone(&self.queue);
        let job = CronJob::new_async(cron, move |_uuid, _lock| {
            let queue = Arc::clone(&queue);
            Box::pin(async move {
                tracing::debug!("Scheduling unseen-message digest aggregation");
                let data = CreateJob {
                    kind: UNSEEN_DIGEST.to_string(),
                    queue: "default".to_string(),
                    priority: JobPriority::Normal,
                    payload: serde_json::json!({}),
                    max_attempts: 1,
                    scheduled_at: None,
                };
                if let Err(e) = queue.enqueue(&data).await {
                    tracing::error!(error = %e, "Failed to enqueue unseen_digest");
                }
            })
        })
        .map_err(|e| AppError::internal(format!("Invalid digest cron '{cron}': {e}")))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add digest schedule: {e}")))?;

        tracing::info!(cron = %cron, "Registered: unseen_digest");
        Ok(())
    }

    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        tracing::info!("Cron scheduler started");
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        tracing::info!("Cron scheduler shut down");
        Ok(())
    }
}
