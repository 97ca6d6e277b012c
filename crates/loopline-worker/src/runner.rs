//! Worker runner. Polls the job queue and executes claimed jobs.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Semaphore};
use tokio::time;

use loopline_core::config::WorkerConfig;
use loopline_entity::job::Job;

use crate::executor::{JobExecutionError, JobExecutor};
use crate::queue::JobQueue;

/// How often the poll loop sweeps for jobs stranded by a dead worker.
const RECLAIM_INTERVAL: Duration = Duration::from_secs(60);

/// Polls queues and executes jobs until cancelled.
#[derive(Debug)]
pub struct WorkerRunner {
    queue: Arc<JobQueue>,
    executor: Arc<JobExecutor>,
    config: WorkerConfig,
    queues: Vec<String>,
}

impl WorkerRunner {
    pub fn new(queue: Arc<JobQueue>, executor: Arc<JobExecutor>, config: WorkerConfig) -> Self {
        Self {
            queue,
            executor,
            config,
            queues: vec!["default".to_string()],
        }
    }

    /// Override the queues to poll, in priority order.
    pub fn with_queues(mut self, queues: Vec<String>) -> Self {
        self.queues = queues;
        self
    }

    /// Run until the cancel signal flips to `true`. In-flight jobs get
    /// up to 30 seconds to finish on shutdown.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        tracing::info!(
            worker_id = %self.queue.worker_id(),
            concurrency = self.config.concurrency,
            poll_interval_seconds = self.config.poll_interval_seconds,
            queues = ?self.queues,
            "Worker started"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let poll_interval = Duration::from_secs(self.config.poll_interval_seconds);

        // A previous process may have died mid-step; sweep before the
        // first poll and periodically after that.
        self.reclaim_stale().await;
        let mut last_reclaim = time::Instant::now();

        loop {
            if *cancel.borrow() {
                break;
            }

            if last_reclaim.elapsed() >= RECLAIM_INTERVAL {
                self.reclaim_stale().await;
                last_reclaim = time::Instant::now();
            }

            let claimed = self.poll_and_spawn(&semaphore).await;

            // Drain the backlog without sleeping between claims.
            if claimed {
                continue;
            }

            tokio::select! {
                _ = cancel.changed() => {
                    if *cancel.borrow() {
                        break;
                    }
                }
                _ = time::sleep(poll_interval) => {}
            }
        }

        tracing::info!(
            worker_id = %self.queue.worker_id(),
            "Worker shutting down, waiting for in-flight jobs"
        );

        let max_permits = self.config.concurrency as u32;
        let _ = time::timeout(Duration::from_secs(30), semaphore.acquire_many(max_permits)).await;

        tracing::info!(worker_id = %self.queue.worker_id(), "Worker stopped");
    }

    /// Reclaim jobs whose worker died mid-step. Errors are logged, the
    /// loop keeps polling.
    async fn reclaim_stale(&self) {
        if let Err(e) = self
            .queue
            .reclaim_stale(self.config.stale_job_timeout_seconds)
            .await
        {
            tracing::error!(error = %e, "Failed to reclaim stale jobs");
        }
    }

    /// Process due jobs inline until the queues are drained, sweeping
    /// for stranded jobs first. Returns how many jobs ran.
    pub async fn run_pending(&self) -> usize {
        self.reclaim_stale().await;
        let mut processed = 0;
        loop {
            let queues: Vec<&str> = self.queues.iter().map(|s| s.as_str()).collect();
            match self.queue.dequeue(&queues).await {
                Ok(Some(job)) => {
                    process_job(&self.queue, &self.executor, job).await;
                    processed += 1;
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to dequeue job");
                    break;
                }
            }
        }
        processed
    }

    /// Claim at most one job and execute it on a spawned task. Returns
    /// whether a job was claimed.
    async fn poll_and_spawn(&self, semaphore: &Arc<Semaphore>) -> bool {
        let permit = match semaphore.clone().try_acquire_owned() {
            Ok(p) => p,
            Err(_) => {
                tracing::trace!("All worker slots occupied");
                return false;
            }
        };

        let queues: Vec<&str> = self.queues.iter().map(|s| s.as_str()).collect();

        match self.queue.dequeue(&queues).await {
            Ok(Some(job)) => {
                let queue = Arc::clone(&self.queue);
                let executor = Arc::clone(&self.executor);
                tokio::spawn(async move {
                    let _permit = permit;
                    process_job(&queue, &executor, job).await;
                });
                true
            }
            Ok(None) => {
                drop(permit);
                false
            }
            Err(e) => {
                drop(permit);
                tracing::error!(error = %e, "Failed to dequeue job");
                false
            }
        }
    }
}

/// Execute one claimed job and record the outcome. A transient failure
/// reschedules the job while the attempt budget lasts, then fails it.
async fn process_job(queue: &JobQueue, executor: &JobExecutor, job: Job) {
    let job_id = job.id;
    let kind = job.kind.clone();

    match executor.execute(&job).await {
        Ok(result) => {
            if let Err(e) = queue.complete(job_id, result).await {
                tracing::error!(job_id = %job_id, error = %e, "Failed to mark job completed");
            } else {
                tracing::info!(job_id = %job_id, kind = %kind, "Job completed");
            }
        }
        Err(JobExecutionError::Permanent(msg)) => {
            tracing::error!(job_id = %job_id, kind = %kind, error = %msg, "Job failed permanently");
            if let Err(e) = queue.fail(job_id, &msg).await {
                tracing::error!(job_id = %job_id, error = %e, "Failed to mark job failed");
            }
        }
        Err(JobExecutionError::Transient(msg)) => {
            retry_or_fail(queue, &job, &msg).await;
        }
        Err(JobExecutionError::Internal(err)) => {
            retry_or_fail(queue, &job, &err.to_string()).await;
        }
    }
}

async fn retry_or_fail(queue: &JobQueue, job: &Job, msg: &str) {
    if job.can_retry() {
        tracing::warn!(
            job_id = %job.id,
            kind = %job.kind,
            attempt = job.attempts,
            max_attempts = job.max_attempts,
            error = %msg,
            "Job failed, will retry"
        );
        if let Err(e) = queue.retry(job.id, job.attempts, msg).await {
            tracing::error!(job_id = %job.id, error = %e, "Failed to reschedule job");
        }
    } else {
        tracing::error!(
            job_id = %job.id,
            kind = %job.kind,
            error = %msg,
            "Job exhausted its attempts"
        );
        if let Err(e) = queue.fail(job.id, msg).await {
            tracing::error!(job_id = %job.id, error = %e, "Failed to mark job failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use loopline_database::memory::MemoryJobStore;
    use loopline_database::traits::JobStore;
    use loopline_entity::job::{CreateJob, JobPriority, JobStatus};
    use serde_json::Value;

    use crate::executor::JobHandler;

    struct FlakyHandler {
        fail_first: i32,
    }

    #[async_trait]
    impl JobHandler for FlakyHandler {
        fn kind(&self) -> &str {
            "flaky"
        }

        async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
            if job.attempts <= self.fail_first {
                Err(JobExecutionError::Transient("relay unreachable".to_string()))
            } else {
                Ok(Some(serde_json::json!({"ok": true})))
            }
        }
    }

    fn create(kind: &str, max_attempts: i32) -> CreateJob {
        CreateJob {
            kind: kind.to_string(),
            queue: "default".to_string(),
            priority: JobPriority::Normal,
            payload: serde_json::json!({}),
            max_attempts,
            scheduled_at: None,
        }
    }

    fn runner(store: &MemoryJobStore, handler: Arc<dyn JobHandler>) -> WorkerRunner {
        runner_with_config(store, handler, WorkerConfig::default())
    }

    fn runner_with_config(
        store: &MemoryJobStore,
        handler: Arc<dyn JobHandler>,
        config: WorkerConfig,
    ) -> WorkerRunner {
        let queue = Arc::new(JobQueue::new(
            Arc::new(store.clone()),
            "test-worker".to_string(),
        ));
        let mut executor = JobExecutor::new();
        executor.register(handler);
        WorkerRunner::new(queue, Arc::new(executor), config)
    }

    fn reclaim_immediately() -> WorkerConfig {
        WorkerConfig {
            stale_job_timeout_seconds: 0,
            ..WorkerConfig::default()
        }
    }

    #[tokio::test]
    async fn transient_failure_is_retried_then_succeeds() {
        let store = MemoryJobStore::new();
        let runner = runner(&store, Arc::new(FlakyHandler { fail_first: 1 }));

        let job = store.enqueue(&create("flaky", 3)).await.unwrap();

        assert_eq!(runner.run_pending().await, 1);
        let after_first = store.find_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(after_first.status, JobStatus::Pending);
        assert_eq!(after_first.attempts, 1);
        assert!(after_first.scheduled_at.unwrap() > chrono::Utc::now());

        store.make_due(job.id).await;
        assert_eq!(runner.run_pending().await, 1);
        let done = store.find_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.attempts, 2);
        assert_eq!(done.result, Some(serde_json::json!({"ok": true})));
    }

    #[tokio::test]
    async fn transient_failure_exhausts_attempts() {
        let store = MemoryJobStore::new();
        let runner = runner(&store, Arc::new(FlakyHandler { fail_first: i32::MAX }));

        let job = store.enqueue(&create("flaky", 2)).await.unwrap();

        assert_eq!(runner.run_pending().await, 1);
        store.make_due(job.id).await;
        assert_eq!(runner.run_pending().await, 1);

        let failed = store.find_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.attempts, 2);
        assert_eq!(failed.error_message.as_deref(), Some("relay unreachable"));
    }

    #[tokio::test]
    async fn job_stranded_by_a_dead_worker_is_reclaimed_and_rerun() {
        let store = MemoryJobStore::new();
        let job = store.enqueue(&create("flaky", 3)).await.unwrap();

        // A worker claims the job and dies before reporting an outcome.
        let claimed = store.claim_due("default", "doomed-worker").await.unwrap();
        assert_eq!(claimed.unwrap().id, job.id);
        assert!(store
            .claim_due("default", "other-worker")
            .await
            .unwrap()
            .is_none());

        let runner = runner_with_config(
            &store,
            Arc::new(FlakyHandler { fail_first: 0 }),
            reclaim_immediately(),
        );
        assert_eq!(runner.run_pending().await, 1);

        let done = store.find_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.attempts, 2);
    }

    #[tokio::test]
    async fn reclaim_respects_the_attempt_budget() {
        let store = MemoryJobStore::new();
        let job = store.enqueue(&create("flaky", 1)).await.unwrap();
        store.claim_due("default", "doomed-worker").await.unwrap();

        let runner = runner_with_config(
            &store,
            Arc::new(FlakyHandler { fail_first: 0 }),
            reclaim_immediately(),
        );
        assert_eq!(runner.run_pending().await, 0);

        let failed = store.find_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.attempts, 1);
        assert_eq!(failed.error_message.as_deref(), Some("Worker timed out"));
    }

    #[tokio::test]
    async fn unknown_kind_fails_without_retry() {
        let store = MemoryJobStore::new();
        let runner = runner(&store, Arc::new(FlakyHandler { fail_first: 0 }));

        let job = store.enqueue(&create("mystery", 3)).await.unwrap();
        assert_eq!(runner.run_pending().await, 1);

        let failed = store.find_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.attempts, 1);
    }
}
