//! Application state shared across handlers.

use std::sync::Arc;

use loopline_auth::JwtDecoder;
use loopline_core::config::AppConfig;
use loopline_database::traits::UserStore;
use loopline_database::DatabasePool;
use loopline_realtime::registry::ChannelRegistry;
use loopline_service::{AuthService, ConnectionService, MessageService, StoryService};

/// Shared dependencies, passed to every handler via `State`.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Database pool, used directly only by the health check.
    pub db: DatabasePool,
    /// User store for profile and search endpoints.
    pub users: Arc<dyn UserStore>,
    /// Signup and login.
    pub auth: AuthService,
    /// Direct messages.
    pub messages: MessageService,
    /// Connection requests.
    pub connections: ConnectionService,
    /// Stories.
    pub stories: StoryService,
    /// Live delivery channels, one per connected user.
    pub registry: Arc<ChannelRegistry>,
    /// Access token verification.
    pub jwt_decoder: Arc<JwtDecoder>,
}
