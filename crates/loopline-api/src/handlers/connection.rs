//! Connection request handlers.

use axum::extract::State;
use axum::Json;

use loopline_entity::connection::Connection;

use crate::dto::request::{ConnectionDecisionBody, ConnectionRequestBody};
use crate::dto::response::ApiResponse;
use crate::error::ApiResult;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// POST /api/connection/request
pub async fn request(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<ConnectionRequestBody>,
) -> ApiResult<Json<ApiResponse<Connection>>> {
    let connection = state
        .connections
        .request(auth.user_id, body.to_user_id)
        .await?;
    Ok(Json(ApiResponse::ok(connection)))
}

/// POST /api/connection/accept
pub async fn accept(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<ConnectionDecisionBody>,
) -> ApiResult<Json<ApiResponse<Connection>>> {
    let connection = state
        .connections
        .accept(auth.user_id, body.connection_id)
        .await?;
    Ok(Json(ApiResponse::ok(connection)))
}

/// POST /api/connection/reject
pub async fn reject(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<ConnectionDecisionBody>,
) -> ApiResult<Json<ApiResponse<Connection>>> {
    let connection = state
        .connections
        .reject(auth.user_id, body.connection_id)
        .await?;
    Ok(Json(ApiResponse::ok(connection)))
}

/// GET /api/connection/list
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<ApiResponse<Vec<Connection>>>> {
    let connections = state.connections.list(auth.user_id).await?;
    Ok(Json(ApiResponse::ok(connections)))
}
