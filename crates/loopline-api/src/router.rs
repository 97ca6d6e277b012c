//! Route definitions for the Loopline HTTP API.
//!
//! All routes live under `/api`. The router receives `AppState` and
//! threads it through every handler via Axum's `State` extractor.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::build_cors_layer;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let max_body = state.config.server.max_body_bytes;
    let cors = build_cors_layer(&state.config.server.cors);

    let api_routes = Router::new()
        .merge(auth_routes())
        .merge(user_routes())
        .merge(message_routes())
        .merge(connection_routes())
        .merge(story_routes())
        .route("/health", get(handlers::health::health));

    Router::new()
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(max_body))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(handlers::auth::signup))
        .route("/auth/login", post(handlers::auth::login))
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user/me", get(handlers::user::me))
        .route("/user/search", get(handlers::user::search))
}

/// The live stream route comes last so `/message/chat/...` and
/// `/message/recent` match before the `{user_id}` wildcard.
fn message_routes() -> Router<AppState> {
    Router::new()
        .route("/message/send", post(handlers::message::send))
        .route("/message/chat/{user_id}", get(handlers::message::chat))
        .route("/message/recent", get(handlers::message::recent))
        .route("/message/{user_id}", get(handlers::message::stream))
}

fn connection_routes() -> Router<AppState> {
    Router::new()
        .route("/connection/request", post(handlers::connection::request))
        .route("/connection/accept", post(handlers::connection::accept))
        .route("/connection/reject", post(handlers::connection::reject))
        .route("/connection/list", get(handlers::connection::list))
}

fn story_routes() -> Router<AppState> {
    Router::new()
        .route("/story/create", post(handlers::story::create))
        .route("/story/feed", get(handlers::story::feed))
        .route("/story/view", post(handlers::story::view))
        .route("/story/like", post(handlers::story::like))
        .route("/story/viewers/{story_id}", get(handlers::story::viewers))
}
