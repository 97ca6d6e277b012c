//! Connection request lifecycle and notification scheduling.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use loopline_core::error::AppError;
use loopline_core::jobs::{ConnectionMailPayload, CONNECTION_REQUEST_MAIL};
use loopline_core::result::AppResult;
use loopline_database::traits::{ConnectionStore, JobStore, UserStore};
use loopline_entity::connection::{Connection, ConnectionStatus};
use loopline_entity::job::{CreateJob, JobPriority};

/// Default retry budget for notification jobs.
const MAIL_MAX_ATTEMPTS: i32 = 3;

/// Handles connection requests and their decisions.
///
/// Creating a request enqueues the notification mail job; the delayed
/// reminder is scheduled by the mail handler itself once the initial
/// email goes out.
#[derive(Clone)]
pub struct ConnectionService {
    connections: Arc<dyn ConnectionStore>,
    users: Arc<dyn UserStore>,
    jobs: Arc<dyn JobStore>,
}

impl ConnectionService {
    /// Creates a new connection service.
    pub fn new(
        connections: Arc<dyn ConnectionStore>,
        users: Arc<dyn UserStore>,
        jobs: Arc<dyn JobStore>,
    ) -> Self {
        Self {
            connections,
            users,
            jobs,
        }
    }

    /// Create a pending request from `from_user_id` to `to_user_id`.
    pub async fn request(&self, from_user_id: Uuid, to_user_id: Uuid) -> AppResult<Connection> {
        if from_user_id == to_user_id {
            return Err(AppError::validation("Cannot send a request to yourself"));
        }
        if self.users.find_by_id(to_user_id).await?.is_none() {
            return Err(AppError::not_found("User not found"));
        }

        let connection = self.connections.create(from_user_id, to_user_id).await?;

        let payload = ConnectionMailPayload {
            connection_id: connection.id,
        };
        self.jobs
            .enqueue(&CreateJob {
                kind: CONNECTION_REQUEST_MAIL.to_string(),
                queue: "default".to_string(),
                priority: JobPriority::Normal,
                payload: serde_json::to_value(&payload)?,
                max_attempts: MAIL_MAX_ATTEMPTS,
                scheduled_at: None,
            })
            .await?;

        info!(
            connection_id = %connection.id,
            from = %from_user_id,
            to = %to_user_id,
            "Connection requested"
        );
        Ok(connection)
    }

    /// Accept a pending request. Only the recipient may decide.
    pub async fn accept(&self, caller_id: Uuid, connection_id: Uuid) -> AppResult<Connection> {
        self.decide(caller_id, connection_id, ConnectionStatus::Accepted)
            .await
    }

    /// Reject a pending request. Only the recipient may decide.
    pub async fn reject(&self, caller_id: Uuid, connection_id: Uuid) -> AppResult<Connection> {
        self.decide(caller_id, connection_id, ConnectionStatus::Rejected)
            .await
    }

    async fn decide(
        &self,
        caller_id: Uuid,
        connection_id: Uuid,
        status: ConnectionStatus,
    ) -> AppResult<Connection> {
        let connection = self
            .connections
            .find_by_id(connection_id)
            .await?
            .ok_or_else(|| AppError::not_found("Connection not found"))?;

        if connection.to_user_id != caller_id {
            return Err(AppError::authorization(
                "Only the recipient can decide a connection request",
            ));
        }

        let decided = self
            .connections
            .decide(connection_id, status)
            .await?
            .ok_or_else(|| AppError::conflict("Connection request already decided"))?;

        info!(connection_id = %connection_id, status = %status, "Connection decided");
        Ok(decided)
    }

    /// All connections involving the caller.
    pub async fn list(&self, caller_id: Uuid) -> AppResult<Vec<Connection>> {
        self.connections.list_for_user(caller_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use loopline_database::memory::{MemoryConnectionStore, MemoryJobStore, MemoryUserStore};
    use loopline_entity::user::User;

    fn user(username: &str) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: Some(format!("{username}@example.com")),
            password_hash: "x".to_string(),
            full_name: username.to_string(),
            bio: None,
            profile_picture: None,
            created_at: now,
            updated_at: now,
        }
    }

    async fn setup() -> (ConnectionService, MemoryUserStore, MemoryJobStore) {
        let users = MemoryUserStore::new();
        let connections = MemoryConnectionStore::new(users.clone());
        let jobs = MemoryJobStore::new();
        let service = ConnectionService::new(
            Arc::new(connections),
            Arc::new(users.clone()),
            Arc::new(jobs.clone()),
        );
        (service, users, jobs)
    }

    #[tokio::test]
    async fn request_enqueues_mail_job() {
        let (service, users, jobs) = setup().await;
        let from = user("mika");
        let to = user("aki");
        users.insert(from.clone()).await;
        users.insert(to.clone()).await;

        let connection = service.request(from.id, to.id).await.unwrap();

        let queued = jobs.of_kind(CONNECTION_REQUEST_MAIL).await;
        assert_eq!(queued.len(), 1);
        let payload: ConnectionMailPayload =
            serde_json::from_value(queued[0].payload.clone()).unwrap();
        assert_eq!(payload.connection_id, connection.id);
        assert!(queued[0].scheduled_at.is_none());
    }

    #[tokio::test]
    async fn duplicate_request_conflicts() {
        let (service, users, _) = setup().await;
        let from = user("mika");
        let to = user("aki");
        users.insert(from.clone()).await;
        users.insert(to.clone()).await;

        service.request(from.id, to.id).await.unwrap();
        let err = service.request(from.id, to.id).await.unwrap_err();
        assert_eq!(err.kind, loopline_core::error::ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn only_recipient_can_accept() {
        let (service, users, _) = setup().await;
        let from = user("mika");
        let to = user("aki");
        users.insert(from.clone()).await;
        users.insert(to.clone()).await;

        let connection = service.request(from.id, to.id).await.unwrap();

        let err = service.accept(from.id, connection.id).await.unwrap_err();
        assert_eq!(err.kind, loopline_core::error::ErrorKind::Authorization);

        let accepted = service.accept(to.id, connection.id).await.unwrap();
        assert_eq!(accepted.status, ConnectionStatus::Accepted);

        // A second decision hits the already-decided guard.
        let err = service.reject(to.id, connection.id).await.unwrap_err();
        assert_eq!(err.kind, loopline_core::error::ErrorKind::Conflict);
    }
}
