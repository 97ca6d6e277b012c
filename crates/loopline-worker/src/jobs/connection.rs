//! Connection request email and delayed reminder handlers.
//!
//! The request handler sends the initial email and, on success,
//! enqueues a reminder job delayed by the configured number of hours.
//! The reminder handler re-reads the connection when it finally runs
//! and sends nothing if the request has been decided in the meantime.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::Value;

use loopline_core::jobs::{ConnectionMailPayload, CONNECTION_REMINDER};
use loopline_database::traits::ConnectionStore;
use loopline_entity::connection::ConnectionWithUsers;
use loopline_entity::job::{CreateJob, Job, JobPriority};
use loopline_mailer::{templates, MailTransport};

use crate::executor::{parse_payload, JobExecutionError, JobHandler};
use crate::queue::JobQueue;

/// Sends the initial connection-request email.
pub struct ConnectionMailHandler {
    connections: Arc<dyn ConnectionStore>,
    mailer: Arc<dyn MailTransport>,
    queue: Arc<JobQueue>,
    frontend_url: String,
    reminder_hours: i64,
}

impl ConnectionMailHandler {
    pub fn new(
        connections: Arc<dyn ConnectionStore>,
        mailer: Arc<dyn MailTransport>,
        queue: Arc<JobQueue>,
        frontend_url: String,
        reminder_hours: i64,
    ) -> Self {
        Self {
            connections,
            mailer,
            queue,
            frontend_url,
            reminder_hours,
        }
    }
}

#[async_trait]
impl JobHandler for ConnectionMailHandler {
    fn kind(&self) -> &str {
        loopline_core::jobs::CONNECTION_REQUEST_MAIL
    }

    async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let payload: ConnectionMailPayload = parse_payload(job)?;

        let Some(connection) = load_connection(&self.connections, payload.connection_id).await?
        else {
            return Ok(Some(serde_json::json!({"skipped": "connection_missing"})));
        };
        if connection.status.is_decided() {
            // Decided before the email went out, nothing left to say.
            return Ok(Some(serde_json::json!({"skipped": "already_decided"})));
        }

        let Some(to_email) = recipient_email(&connection) else {
            return Ok(Some(serde_json::json!({"skipped": "no_email"})));
        };
        let email = templates::connection_request(
            to_email,
            &connection.to_user.full_name,
            &connection.from_user.full_name,
            &connection.from_user.username,
            &self.frontend_url,
        );

        self.mailer
            .send(&email)
            .await
            .map_err(|e| JobExecutionError::Transient(e.to_string()))?;

        let reminder_at = Utc::now() + Duration::hours(self.reminder_hours);
        self.queue
            .enqueue(&CreateJob {
                kind: CONNECTION_REMINDER.to_string(),
                queue: "default".to_string(),
                priority: JobPriority::Normal,
                payload: job.payload.clone(),
                max_attempts: 3,
                scheduled_at: Some(reminder_at),
            })
            .await?;

        tracing::info!(
            connection_id = %connection.id,
            reminder_at = %reminder_at,
            "Connection request email sent, reminder scheduled"
        );

        Ok(Some(serde_json::json!({
            "email_sent_to": to_email,
            "reminder_scheduled_at": reminder_at,
        })))
    }
}

/// Sends the reminder for a still-pending connection request.
pub struct ConnectionReminderHandler {
    connections: Arc<dyn ConnectionStore>,
    mailer: Arc<dyn MailTransport>,
    frontend_url: String,
}

impl ConnectionReminderHandler {
    pub fn new(
        connections: Arc<dyn ConnectionStore>,
        mailer: Arc<dyn MailTransport>,
        frontend_url: String,
    ) -> Self {
        Self {
            connections,
            mailer,
            frontend_url,
        }
    }
}

#[async_trait]
impl JobHandler for ConnectionReminderHandler {
    fn kind(&self) -> &str {
        CONNECTION_REMINDER
    }

    async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let payload: ConnectionMailPayload = parse_payload(job)?;

        let Some(connection) = load_connection(&self.connections, payload.connection_id).await?
        else {
            return Ok(Some(serde_json::json!({"skipped": "connection_missing"})));
        };
        if connection.status.is_decided() {
            tracing::debug!(
                connection_id = %connection.id,
                status = ?connection.status,
                "Reminder skipped, request already decided"
            );
            return Ok(Some(serde_json::json!({"skipped": "already_decided"})));
        }

        let Some(to_email) = recipient_email(&connection) else {
            return Ok(Some(serde_json::json!({"skipped": "no_email"})));
        };
        let email = templates::connection_reminder(
            to_email,
            &connection.to_user.full_name,
            &connection.from_user.full_name,
            &connection.from_user.username,
            &self.frontend_url,
        );

        self.mailer
            .send(&email)
            .await
            .map_err(|e| JobExecutionError::Transient(e.to_string()))?;

        tracing::info!(connection_id = %connection.id, "Connection reminder sent");
        Ok(Some(serde_json::json!({"email_sent_to": to_email})))
    }
}

/// A deleted connection or a recipient without an email makes the job
/// moot, so both are skips rather than failures. A failed job would
/// never succeed on retry anyway.
async fn load_connection(
    connections: &Arc<dyn ConnectionStore>,
    id: uuid::Uuid,
) -> Result<Option<ConnectionWithUsers>, JobExecutionError> {
    let connection = connections.find_with_users(id).await?;
    if connection.is_none() {
        tracing::warn!(connection_id = %id, "Connection gone, skipping email");
    }
    Ok(connection)
}

fn recipient_email(connection: &ConnectionWithUsers) -> Option<&str> {
    let email = connection.to_user.email.as_deref();
    if email.is_none() {
        tracing::warn!(
            user_id = %connection.to_user.id,
            "Recipient has no email address, skipping"
        );
    }
    email
}

#[cfg(test)]
mod tests {
    use super::*;
    use loopline_core::jobs::CONNECTION_REQUEST_MAIL;
    use loopline_database::memory::{MemoryConnectionStore, MemoryJobStore, MemoryUserStore};
    use loopline_entity::connection::ConnectionStatus;

    use crate::jobs::testing::{claimed_job, user, RecordingMailer};

    struct Fixture {
        connections: Arc<MemoryConnectionStore>,
        jobs: MemoryJobStore,
        mailer: RecordingMailer,
        connection_id: uuid::Uuid,
        recipient_email: String,
    }

    async fn fixture(recipient_email: Option<&str>) -> Fixture {
        let users = MemoryUserStore::new();
        let requester = user("mika", Some("mika@example.com"));
        let recipient = user("aki", recipient_email);
        users.insert(requester.clone()).await;
        users.insert(recipient.clone()).await;

        let connections = Arc::new(MemoryConnectionStore::new(users));
        let connection = connections
            .create(requester.id, recipient.id)
            .await
            .unwrap();

        Fixture {
            connections,
            jobs: MemoryJobStore::new(),
            mailer: RecordingMailer::new(),
            connection_id: connection.id,
            recipient_email: recipient_email.unwrap_or_default().to_string(),
        }
    }

    fn mail_handler(f: &Fixture) -> ConnectionMailHandler {
        ConnectionMailHandler::new(
            f.connections.clone(),
            Arc::new(f.mailer.clone()),
            Arc::new(JobQueue::new(
                Arc::new(f.jobs.clone()),
                "test-worker".to_string(),
            )),
            "https://app.example.com".to_string(),
            24,
        )
    }

    fn reminder_handler(f: &Fixture) -> ConnectionReminderHandler {
        ConnectionReminderHandler::new(
            f.connections.clone(),
            Arc::new(f.mailer.clone()),
            "https://app.example.com".to_string(),
        )
    }

    fn payload(connection_id: uuid::Uuid) -> serde_json::Value {
        serde_json::to_value(ConnectionMailPayload { connection_id }).unwrap()
    }

    #[tokio::test]
    async fn request_mail_sends_and_schedules_reminder() {
        let f = fixture(Some("aki@example.com")).await;
        let handler = mail_handler(&f);

        let before = Utc::now();
        let job = claimed_job(CONNECTION_REQUEST_MAIL, payload(f.connection_id));
        handler.execute(&job).await.unwrap();

        let sent = f.mailer.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, f.recipient_email);
        assert_eq!(sent[0].subject, "New Connection Request");

        let reminders = f.jobs.of_kind(CONNECTION_REMINDER).await;
        assert_eq!(reminders.len(), 1);
        let delay = reminders[0].scheduled_at.unwrap() - before;
        assert!(delay >= Duration::hours(23) && delay <= Duration::hours(25));
    }

    #[tokio::test]
    async fn transport_failure_is_transient_and_schedules_no_reminder() {
        let f = fixture(Some("aki@example.com")).await;
        f.mailer.break_transport().await;
        let handler = mail_handler(&f);

        let job = claimed_job(CONNECTION_REQUEST_MAIL, payload(f.connection_id));
        let err = handler.execute(&job).await.unwrap_err();
        assert!(matches!(err, JobExecutionError::Transient(_)));
        assert!(f.jobs.of_kind(CONNECTION_REMINDER).await.is_empty());
    }

    #[tokio::test]
    async fn missing_recipient_email_skips_without_reminder() {
        let f = fixture(None).await;
        let handler = mail_handler(&f);

        let job = claimed_job(CONNECTION_REQUEST_MAIL, payload(f.connection_id));
        let result = handler.execute(&job).await.unwrap();
        assert_eq!(result, Some(serde_json::json!({"skipped": "no_email"})));
        assert!(f.mailer.sent().await.is_empty());
        assert!(f.jobs.of_kind(CONNECTION_REMINDER).await.is_empty());
    }

    #[tokio::test]
    async fn missing_connection_skips() {
        let f = fixture(Some("aki@example.com")).await;
        let handler = mail_handler(&f);

        let job = claimed_job(CONNECTION_REQUEST_MAIL, payload(uuid::Uuid::new_v4()));
        let result = handler.execute(&job).await.unwrap();
        assert_eq!(
            result,
            Some(serde_json::json!({"skipped": "connection_missing"}))
        );
        assert!(f.mailer.sent().await.is_empty());
    }

    #[tokio::test]
    async fn reminder_skips_decided_requests() {
        for status in [ConnectionStatus::Accepted, ConnectionStatus::Rejected] {
            let f = fixture(Some("aki@example.com")).await;
            f.connections
                .decide(f.connection_id, status)
                .await
                .unwrap()
                .unwrap();

            let handler = reminder_handler(&f);
            let job = claimed_job(CONNECTION_REMINDER, payload(f.connection_id));
            let result = handler.execute(&job).await.unwrap();

            assert_eq!(
                result,
                Some(serde_json::json!({"skipped": "already_decided"}))
            );
            assert!(f.mailer.sent().await.is_empty());
        }
    }

    #[tokio::test]
    async fn reminder_sends_for_pending_request() {
        let f = fixture(Some("aki@example.com")).await;
        let handler = reminder_handler(&f);

        let job = claimed_job(CONNECTION_REMINDER, payload(f.connection_id));
        handler.execute(&job).await.unwrap();

        let sent = f.mailer.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Reminder: Connection Request Pending");
    }
}
