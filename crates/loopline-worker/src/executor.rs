//! Job executor that dispatches claimed jobs to registered handlers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use loopline_core::error::AppError;
use loopline_entity::job::Job;

/// One job kind's implementation.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// The job kind this handler processes.
    fn kind(&self) -> &str;

    /// Execute the job. A returned value is stored as the job result.
    async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError>;
}

/// Error from job execution.
#[derive(Debug, thiserror::Error)]
pub enum JobExecutionError {
    /// Do not retry.
    #[error("Permanent job failure: {0}")]
    Permanent(String),

    /// May retry until the attempt budget is exhausted.
    #[error("Transient job failure: {0}")]
    Transient(String),

    /// Unexpected internal error, treated like a transient failure.
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}

/// Deserialize a job payload. A malformed payload can never succeed,
/// so it fails permanently.
pub fn parse_payload<T: DeserializeOwned>(job: &Job) -> Result<T, JobExecutionError> {
    serde_json::from_value(job.payload.clone()).map_err(|e| {
        JobExecutionError::Permanent(format!("Invalid payload for job '{}': {e}", job.kind))
    })
}

/// Dispatches jobs to the handler registered for their kind.
#[derive(Default)]
pub struct JobExecutor {
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl JobExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for its kind, replacing any previous one.
    pub fn register(&mut self, handler: Arc<dyn JobHandler>) {
        let kind = handler.kind().to_string();
        tracing::info!(kind = %kind, "Registered job handler");
        self.handlers.insert(kind, handler);
    }

    /// Execute a job via its handler. An unregistered kind fails
    /// permanently.
    pub async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let handler = self.handlers.get(&job.kind).ok_or_else(|| {
            JobExecutionError::Permanent(format!("No handler registered for job '{}'", job.kind))
        })?;

        tracing::info!(
            job_id = %job.id,
            kind = %job.kind,
            attempt = job.attempts,
            max_attempts = job.max_attempts,
            "Executing job"
        );

        handler.execute(job).await
    }

    pub fn has_handler(&self, kind: &str) -> bool {
        self.handlers.contains_key(kind)
    }
}

impl std::fmt::Debug for JobExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobExecutor")
            .field("kinds", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use loopline_entity::job::{JobPriority, JobStatus};
    use uuid::Uuid;

    struct EchoHandler;

    #[async_trait]
    impl JobHandler for EchoHandler {
        fn kind(&self) -> &str {
            "echo"
        }

        async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
            Ok(Some(job.payload.clone()))
        }
    }

    fn job(kind: &str) -> Job {
        let now = Utc::now();
        Job {
            id: Uuid::new_v4(),
            kind: kind.to_string(),
            queue: "default".to_string(),
            priority: JobPriority::Normal,
            payload: serde_json::json!({"n": 1}),
            result: None,
            error_message: None,
            status: JobStatus::Running,
            attempts: 1,
            max_attempts: 3,
            scheduled_at: None,
            started_at: Some(now),
            completed_at: None,
            worker_id: Some("w1".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn dispatches_to_registered_handler() {
        let mut executor = JobExecutor::new();
        executor.register(Arc::new(EchoHandler));
        assert!(executor.has_handler("echo"));

        let result = executor.execute(&job("echo")).await.unwrap();
        assert_eq!(result, Some(serde_json::json!({"n": 1})));
    }

    #[tokio::test]
    async fn unknown_kind_fails_permanently() {
        let executor = JobExecutor::new();
        let err = executor.execute(&job("mystery")).await.unwrap_err();
        assert!(matches!(err, JobExecutionError::Permanent(_)));
    }
}
