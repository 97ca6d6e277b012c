//! Daily unseen-message digest handlers.
//!
//! `unseen_digest` runs on the cron schedule, aggregates unseen counts
//! across all recipients, and fans out one `digest_send` job per
//! recipient. Splitting aggregation from delivery keeps one broken
//! mailbox from blocking everyone else's digest.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::Value;
use uuid::Uuid;

use loopline_core::jobs::{DigestSendPayload, DIGEST_SEND, UNSEEN_DIGEST};
use loopline_database::traits::{MessageStore, UserStore};
use loopline_entity::job::{CreateJob, Job, JobPriority};
use loopline_mailer::{templates, MailTransport};

use crate::executor::{parse_payload, JobExecutionError, JobHandler};
use crate::queue::JobQueue;

/// Fan-out dedupe lookback, just under the daily cadence.
const FANOUT_DEDUPE_HOURS: i64 = 20;

/// Aggregates unseen counts and fans out per-recipient send jobs.
pub struct UnseenDigestHandler {
    messages: Arc<dyn MessageStore>,
    queue: Arc<JobQueue>,
}

impl UnseenDigestHandler {
    pub fn new(messages: Arc<dyn MessageStore>, queue: Arc<JobQueue>) -> Self {
        Self { messages, queue }
    }
}

#[async_trait]
impl JobHandler for UnseenDigestHandler {
    fn kind(&self) -> &str {
        UNSEEN_DIGEST
    }

    async fn execute(&self, _job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let counts = self.messages.unseen_counts().await?;

        // A replayed aggregation must not re-mail users already fanned
        // out this cycle, so skip anyone with a recent send job.
        let since = Utc::now() - Duration::hours(FANOUT_DEDUPE_HOURS);
        let mut already_sent: HashSet<Uuid> = HashSet::new();
        for job in self.queue.recent_of_kind(DIGEST_SEND, since).await? {
            if let Ok(payload) = serde_json::from_value::<DigestSendPayload>(job.payload) {
                already_sent.insert(payload.user_id);
            }
        }

        let mut fanned_out = 0;
        let mut skipped = 0;
        for entry in counts.iter().filter(|c| c.count > 0) {
            if already_sent.contains(&entry.user_id) {
                skipped += 1;
                continue;
            }
            let payload = DigestSendPayload {
                user_id: entry.user_id,
                unseen_count: entry.count,
            };
            self.queue
                .enqueue(&CreateJob {
                    kind: DIGEST_SEND.to_string(),
                    queue: "default".to_string(),
                    priority: JobPriority::Normal,
                    payload: serde_json::to_value(&payload)
                        .map_err(|e| JobExecutionError::Permanent(e.to_string()))?,
                    max_attempts: 3,
                    scheduled_at: None,
                })
                .await?;
            fanned_out += 1;
        }

        tracing::info!(recipients = fanned_out, skipped, "Unseen-message digest fanned out");
        Ok(Some(
            serde_json::json!({"recipients": fanned_out, "skipped": skipped}),
        ))
    }
}

/// Sends one recipient's digest email.
pub struct DigestSendHandler {
    users: Arc<dyn UserStore>,
    mailer: Arc<dyn MailTransport>,
    frontend_url: String,
}

impl DigestSendHandler {
    pub fn new(
        users: Arc<dyn UserStore>,
        mailer: Arc<dyn MailTransport>,
        frontend_url: String,
    ) -> Self {
        Self {
            users,
            mailer,
            frontend_url,
        }
    }
}

#[async_trait]
impl JobHandler for DigestSendHandler {
    fn kind(&self) -> &str {
        DIGEST_SEND
    }

    async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let payload: DigestSendPayload = parse_payload(job)?;

        // A deleted account or one without an email is a skip, not a
        // failure: the aggregation ran on a snapshot.
        let Some(user) = self.users.find_by_id(payload.user_id).await? else {
            tracing::debug!(user_id = %payload.user_id, "Digest recipient gone, skipping");
            return Ok(Some(serde_json::json!({"skipped": "user_missing"})));
        };
        let Some(to_email) = user.email.as_deref() else {
            return Ok(Some(serde_json::json!({"skipped": "no_email"})));
        };

        let email = templates::unseen_digest(
            to_email,
            &user.full_name,
            payload.unseen_count,
            &self.frontend_url,
        );

        self.mailer
            .send(&email)
            .await
            .map_err(|e| JobExecutionError::Transient(e.to_string()))?;

        tracing::info!(
            user_id = %user.id,
            unseen_count = payload.unseen_count,
            "Digest email sent"
        );
        Ok(Some(serde_json::json!({"email_sent_to": to_email})))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loopline_database::memory::{MemoryJobStore, MemoryMessageStore, MemoryUserStore};
    use loopline_entity::message::{CreateMessage, MessageType};

    use crate::jobs::testing::{claimed_job, user, RecordingMailer};

    async fn send_text(messages: &MemoryMessageStore, from: uuid::Uuid, to: uuid::Uuid) {
        messages
            .create(&CreateMessage {
                from_user_id: from,
                to_user_id: to,
                text: Some("hi".to_string()),
                media_url: None,
                message_type: MessageType::Text,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn aggregation_fans_out_one_job_per_recipient_with_unseen() {
        let users = MemoryUserStore::new();
        let mika = user("mika", Some("mika@example.com"));
        let aki = user("aki", Some("aki@example.com"));
        users.insert(mika.clone()).await;
        users.insert(aki.clone()).await;

        let messages = MemoryMessageStore::new(users);
        // Three unseen for aki, none for mika.
        send_text(&messages, mika.id, aki.id).await;
        send_text(&messages, mika.id, aki.id).await;
        send_text(&messages, mika.id, aki.id).await;

        let jobs = MemoryJobStore::new();
        let handler = UnseenDigestHandler::new(
            Arc::new(messages),
            Arc::new(JobQueue::new(
                Arc::new(jobs.clone()),
                "test-worker".to_string(),
            )),
        );

        let result = handler
            .execute(&claimed_job(UNSEEN_DIGEST, serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(
            result,
            Some(serde_json::json!({"recipients": 1, "skipped": 0}))
        );

        let sends = jobs.of_kind(DIGEST_SEND).await;
        assert_eq!(sends.len(), 1);
        let payload: DigestSendPayload = serde_json::from_value(sends[0].payload.clone()).unwrap();
        assert_eq!(payload.user_id, aki.id);
        assert_eq!(payload.unseen_count, 3);
    }

    #[tokio::test]
    async fn replayed_aggregation_does_not_fan_out_twice() {
        let users = MemoryUserStore::new();
        let mika = user("mika", Some("mika@example.com"));
        let aki = user("aki", Some("aki@example.com"));
        users.insert(mika.clone()).await;
        users.insert(aki.clone()).await;

        let messages = MemoryMessageStore::new(users);
        send_text(&messages, mika.id, aki.id).await;

        let jobs = MemoryJobStore::new();
        let handler = UnseenDigestHandler::new(
            Arc::new(messages),
            Arc::new(JobQueue::new(
                Arc::new(jobs.clone()),
                "test-worker".to_string(),
            )),
        );
        let trigger = claimed_job(UNSEEN_DIGEST, serde_json::json!({}));

        handler.execute(&trigger).await.unwrap();
        // A retried or reclaimed aggregation sees the earlier send job
        // and leaves the recipient alone.
        let result = handler.execute(&trigger).await.unwrap();
        assert_eq!(
            result,
            Some(serde_json::json!({"recipients": 0, "skipped": 1}))
        );
        assert_eq!(jobs.of_kind(DIGEST_SEND).await.len(), 1);
    }

    #[tokio::test]
    async fn send_renders_count_into_the_email() {
        let users = MemoryUserStore::new();
        let aki = user("aki", Some("aki@example.com"));
        users.insert(aki.clone()).await;

        let mailer = RecordingMailer::new();
        let handler = DigestSendHandler::new(
            Arc::new(users),
            Arc::new(mailer.clone()),
            "https://app.example.com".to_string(),
        );

        let payload = serde_json::to_value(DigestSendPayload {
            user_id: aki.id,
            unseen_count: 3,
        })
        .unwrap();
        handler
            .execute(&claimed_job(DIGEST_SEND, payload))
            .await
            .unwrap();

        let sent = mailer.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "aki@example.com");
        assert_eq!(sent[0].subject, "You have 3 unseen messages");
        assert!(sent[0].html_body.contains("https://app.example.com/messages"));
    }

    #[tokio::test]
    async fn send_skips_recipients_without_email() {
        let users = MemoryUserStore::new();
        let aki = user("aki", None);
        users.insert(aki.clone()).await;

        let mailer = RecordingMailer::new();
        let handler = DigestSendHandler::new(
            Arc::new(users),
            Arc::new(mailer.clone()),
            "https://app.example.com".to_string(),
        );

        let payload = serde_json::to_value(DigestSendPayload {
            user_id: aki.id,
            unseen_count: 2,
        })
        .unwrap();
        let result = handler
            .execute(&claimed_job(DIGEST_SEND, payload))
            .await
            .unwrap();

        assert_eq!(result, Some(serde_json::json!({"skipped": "no_email"})));
        assert!(mailer.sent().await.is_empty());
    }
}
