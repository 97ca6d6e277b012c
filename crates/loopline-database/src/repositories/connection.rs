//! Connection repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use loopline_core::error::{AppError, ErrorKind};
use loopline_core::result::AppResult;
use loopline_entity::connection::{Connection, ConnectionStatus, ConnectionWithUsers};
use loopline_entity::user::User;

use crate::traits::ConnectionStore;

/// Repository for connection request persistence and transitions.
#[derive(Debug, Clone)]
pub struct ConnectionRepository {
    pool: PgPool,
}

impl ConnectionRepository {
    /// Create a new connection repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConnectionStore for ConnectionRepository {
    async fn create(&self, from_user_id: Uuid, to_user_id: Uuid) -> AppResult<Connection> {
        sqlx::query_as::<_, Connection>(
            "INSERT INTO connections (from_user_id, to_user_id, status) \
             VALUES ($1, $2, 'pending') RETURNING *",
        )
        .bind(from_user_id)
        .bind(to_user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db) if db.is_unique_violation() => {
                AppError::conflict("Connection request already exists")
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to create connection", e),
        })
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Connection>> {
        sqlx::query_as::<_, Connection>("SELECT * FROM connections WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find connection", e)
            })
    }

    async fn find_with_users(&self, id: Uuid) -> AppResult<Option<ConnectionWithUsers>> {
        let Some(connection) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        let users = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ANY($1)")
            .bind(vec![connection.from_user_id, connection.to_user_id])
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to load connection users", e)
            })?;

        let mut from_user = None;
        let mut to_user = None;
        for user in users {
            if user.id == connection.from_user_id {
                from_user = Some(user);
            } else if user.id == connection.to_user_id {
                to_user = Some(user);
            }
        }

        match (from_user, to_user) {
            (Some(from_user), Some(to_user)) => Ok(Some(ConnectionWithUsers {
                id: connection.id,
                from_user,
                to_user,
                status: connection.status,
                created_at: connection.created_at,
                updated_at: connection.updated_at,
            })),
            // A participant row vanished under the foreign key; treat
            // the connection as gone.
            _ => Ok(None),
        }
    }

    async fn decide(
        &self,
        id: Uuid,
        status: ConnectionStatus,
    ) -> AppResult<Option<Connection>> {
        sqlx::query_as::<_, Connection>(
            "UPDATE connections SET status = $2, updated_at = NOW() \
             WHERE id = $1 AND status = 'pending' RETURNING *",
        )
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to update connection", e)
        })
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Connection>> {
        sqlx::query_as::<_, Connection>(
            "SELECT * FROM connections \
             WHERE from_user_id = $1 OR to_user_id = $1 \
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list connections", e)
        })
    }
}
