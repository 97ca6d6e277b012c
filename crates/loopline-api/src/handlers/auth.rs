//! Signup and login handlers.

use axum::extract::State;
use axum::Json;
use validator::Validate;

use loopline_core::error::AppError;

use crate::dto::request::{LoginRequest, SignupRequest};
use crate::dto::response::{ApiResponse, SessionResponse};
use crate::error::ApiResult;
use crate::state::AppState;

/// POST /api/auth/signup
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<Json<ApiResponse<SessionResponse>>> {
    req.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let session = state
        .auth
        .signup(
            &req.username,
            &req.full_name,
            req.email.as_deref(),
            &req.password,
        )
        .await?;

    Ok(Json(ApiResponse::ok(SessionResponse {
        token: session.token,
        expires_at: session.expires_at,
        user: session.user,
    })))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<ApiResponse<SessionResponse>>> {
    let session = state.auth.login(&req.username, &req.password).await?;

    Ok(Json(ApiResponse::ok(SessionResponse {
        token: session.token,
        expires_at: session.expires_at,
        user: session.user,
    })))
}
