//! Shared helpers for the live-database integration tests.
//!
//! These tests exercise the full router against a real PostgreSQL
//! instance (see tests/fixtures/test_config.toml) and are marked
//! `#[ignore]` so the default test run stays hermetic. Run them with
//! `cargo test -- --ignored` against a prepared database.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::Router;
use http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use loopline_api::{build_router, AppState};
use loopline_auth::{JwtDecoder, JwtEncoder, PasswordHasher};
use loopline_core::config::AppConfig;
use loopline_database::repositories::{
    ConnectionRepository, JobRepository, MessageRepository, StoryRepository, UserRepository,
};
use loopline_database::traits::{ConnectionStore, JobStore, MessageStore, StoryStore, UserStore};
use loopline_database::{migration, DatabasePool};
use loopline_realtime::{ChannelRegistry, LiveDispatcher};
use loopline_service::{
    AuthService, ConnectionService, LocalMediaStore, MediaStore, MessageService, StoryService,
};

/// Test application context.
pub struct TestApp {
    /// The router for making in-process requests.
    pub router: Router,
    /// Pool for direct queries against the test database.
    pub db: DatabasePool,
    /// Live delivery registry, shared with the router.
    pub registry: Arc<ChannelRegistry>,
}

/// A decoded response.
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    /// Connect, migrate, wipe all tables, and build the router.
    pub async fn new() -> Self {
        let config = AppConfig::load_file("tests/fixtures/test_config")
            .expect("Failed to load test config");

        let db = DatabasePool::connect(&config.database)
            .await
            .expect("Failed to connect to test database");
        migration::run_migrations(db.pool())
            .await
            .expect("Failed to run migrations");
        Self::clean_database(&db).await;

        let users: Arc<dyn UserStore> = Arc::new(UserRepository::new(db.pool().clone()));
        let messages: Arc<dyn MessageStore> = Arc::new(MessageRepository::new(db.pool().clone()));
        let connections: Arc<dyn ConnectionStore> =
            Arc::new(ConnectionRepository::new(db.pool().clone()));
        let stories: Arc<dyn StoryStore> = Arc::new(StoryRepository::new(db.pool().clone()));
        let jobs: Arc<dyn JobStore> = Arc::new(JobRepository::new(db.pool().clone()));

        let media: Arc<dyn MediaStore> = Arc::new(
            LocalMediaStore::new(&config.media)
                .await
                .expect("Failed to init media store"),
        );

        let registry = Arc::new(ChannelRegistry::new());
        let dispatcher = LiveDispatcher::new(registry.clone());

        let state = AppState {
            config: Arc::new(config.clone()),
            db: db.clone(),
            users: users.clone(),
            auth: AuthService::new(
                users.clone(),
                PasswordHasher::new(),
                JwtEncoder::new(&config.auth),
            ),
            messages: MessageService::new(messages, users.clone(), media.clone(), dispatcher),
            connections: ConnectionService::new(connections, users, jobs.clone()),
            stories: StoryService::new(stories, jobs, media, config.worker.story_ttl_hours),
            registry: registry.clone(),
            jwt_decoder: Arc::new(JwtDecoder::new(&config.auth)),
        };

        let router = build_router(state);

        Self {
            router,
            db,
            registry,
        }
    }

    async fn clean_database(db: &DatabasePool) {
        let tables = [
            "jobs",
            "story_likes",
            "story_views",
            "stories",
            "connections",
            "messages",
            "users",
        ];
        for table in &tables {
            let query = format!("DELETE FROM {table}");
            let _ = sqlx::query(&query).execute(db.pool()).await;
        }
    }

    /// Make a JSON request against the router.
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }

        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        self.send(request).await
    }

    /// Make a multipart/form-data request with text fields only.
    pub async fn request_multipart(
        &self,
        path: &str,
        fields: &[(&str, &str)],
        token: &str,
    ) -> TestResponse {
        let boundary = "----loopline-test-boundary";
        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!("--{boundary}--\r\n"));

        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Authorization", format!("Bearer {token}"))
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .expect("Failed to build request");

        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }

    /// Sign up a fresh user and return their token and id.
    pub async fn signup(&self, username: &str) -> (String, Uuid) {
        let response = self
            .request(
                "POST",
                "/api/auth/signup",
                Some(serde_json::json!({
                    "username": username,
                    "full_name": format!("{username} Test"),
                    "email": format!("{username}@loopline.test"),
                    "password": "correct horse battery",
                })),
                None,
            )
            .await;
        assert_eq!(
            response.status,
            StatusCode::OK,
            "Signup failed: {:?}",
            response.body
        );

        let data = &response.body["data"];
        let token = data["token"].as_str().expect("No token").to_string();
        let user_id = data["user"]["id"]
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .expect("No user id");
        (token, user_id)
    }

    /// Kinds of all rows in the jobs table, oldest first.
    pub async fn job_kinds(&self) -> Vec<String> {
        sqlx::query_scalar::<_, String>("SELECT kind FROM jobs ORDER BY created_at ASC")
            .fetch_all(self.db.pool())
            .await
            .expect("Failed to query jobs")
    }
}
