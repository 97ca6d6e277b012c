//! Health check handler.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::dto::response::HealthResponse;
use crate::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = state.db.health_check().await.unwrap_or(false);
    let status = if database {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status.0,
        Json(HealthResponse {
            status: status.1.to_string(),
            database,
        }),
    )
}
