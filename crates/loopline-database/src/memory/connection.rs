//! In-memory connection store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use loopline_core::error::AppError;
use loopline_core::result::AppResult;
use loopline_entity::connection::{Connection, ConnectionStatus, ConnectionWithUsers};

use crate::traits::{ConnectionStore, UserStore};

use super::user::MemoryUserStore;

/// In-memory connection store over the shared user store.
#[derive(Debug, Clone)]
pub struct MemoryConnectionStore {
    connections: Arc<Mutex<Vec<Connection>>>,
    users: MemoryUserStore,
}

impl MemoryConnectionStore {
    /// Creates an empty store over the given user store.
    pub fn new(users: MemoryUserStore) -> Self {
        Self {
            connections: Arc::new(Mutex::new(Vec::new())),
            users,
        }
    }

    /// Insert a pre-built connection.
    pub async fn insert(&self, connection: Connection) {
        self.connections.lock().await.push(connection);
    }

    /// Overwrite the status of a stored connection.
    pub async fn set_status(&self, id: Uuid, status: ConnectionStatus) {
        for connection in self.connections.lock().await.iter_mut() {
            if connection.id == id {
                connection.status = status;
                connection.updated_at = Utc::now();
            }
        }
    }
}

#[async_trait]
impl ConnectionStore for MemoryConnectionStore {
    async fn create(&self, from_user_id: Uuid, to_user_id: Uuid) -> AppResult<Connection> {
        let mut connections = self.connections.lock().await;
        if connections
            .iter()
            .any(|c| c.from_user_id == from_user_id && c.to_user_id == to_user_id)
        {
            return Err(AppError::conflict("Connection request already exists"));
        }

        let now = Utc::now();
        let connection = Connection {
            id: Uuid::new_v4(),
            from_user_id,
            to_user_id,
            status: ConnectionStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        connections.push(connection.clone());
        Ok(connection)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Connection>> {
        Ok(self
            .connections
            .lock()
            .await
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn find_with_users(&self, id: Uuid) -> AppResult<Option<ConnectionWithUsers>> {
        let Some(connection) = self.find_by_id(id).await? else {
            return Ok(None);
        };
        let from_user = self.users.find_by_id(connection.from_user_id).await?;
        let to_user = self.users.find_by_id(connection.to_user_id).await?;
        match (from_user, to_user) {
            (Some(from_user), Some(to_user)) => Ok(Some(ConnectionWithUsers {
                id: connection.id,
                from_user,
                to_user,
                status: connection.status,
                created_at: connection.created_at,
                updated_at: connection.updated_at,
            })),
            _ => Ok(None),
        }
    }

    async fn decide(
        &self,
        id: Uuid,
        status: ConnectionStatus,
    ) -> AppResult<Option<Connection>> {
        let mut connections = self.connections.lock().await;
        for connection in connections.iter_mut() {
            if connection.id == id && connection.status == ConnectionStatus::Pending {
                connection.status = status;
                connection.updated_at = Utc::now();
                return Ok(Some(connection.clone()));
            }
        }
        Ok(None)
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Connection>> {
        let mut result: Vec<Connection> = self
            .connections
            .lock()
            .await
            .iter()
            .filter(|c| c.from_user_id == user_id || c.to_user_id == user_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }
}
