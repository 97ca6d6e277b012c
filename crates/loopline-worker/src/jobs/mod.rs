//! Job handler implementations.

pub mod connection;
pub mod digest;
pub mod story;

pub use connection::{ConnectionMailHandler, ConnectionReminderHandler};
pub use digest::{DigestSendHandler, UnseenDigestHandler};
pub use story::StoryExpiryHandler;

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::Mutex;
    use uuid::Uuid;

    use loopline_core::error::AppError;
    use loopline_core::result::AppResult;
    use loopline_entity::job::{Job, JobPriority, JobStatus};
    use loopline_entity::user::User;
    use loopline_mailer::{Email, MailTransport};

    /// Records sent emails instead of delivering them.
    #[derive(Debug, Default, Clone)]
    pub struct RecordingMailer {
        sent: Arc<Mutex<Vec<Email>>>,
        fail: Arc<Mutex<bool>>,
    }

    impl RecordingMailer {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn sent(&self) -> Vec<Email> {
            self.sent.lock().await.clone()
        }

        /// Make every subsequent send fail with an external error.
        pub async fn break_transport(&self) {
            *self.fail.lock().await = true;
        }
    }

    #[async_trait]
    impl MailTransport for RecordingMailer {
        async fn send(&self, email: &Email) -> AppResult<()> {
            if *self.fail.lock().await {
                return Err(AppError::external_service("SMTP relay unreachable"));
            }
            self.sent.lock().await.push(email.clone());
            Ok(())
        }
    }

    pub fn user(username: &str, email: Option<&str>) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.map(String::from),
            password_hash: "x".to_string(),
            full_name: format!("{username} surname"),
            bio: None,
            profile_picture: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A claimed job carrying the given kind and payload.
    pub fn claimed_job(kind: &str, payload: serde_json::Value) -> Job {
        let now = Utc::now();
        Job {
            id: Uuid::new_v4(),
            kind: kind.to_string(),
            queue: "default".to_string(),
            priority: JobPriority::Normal,
            payload,
            result: None,
            error_message: None,
            status: JobStatus::Running,
            attempts: 1,
            max_attempts: 3,
            scheduled_at: None,
            started_at: Some(now),
            completed_at: None,
            worker_id: Some("test-worker".to_string()),
            created_at: now,
            updated_at: now,
        }
    }
}
