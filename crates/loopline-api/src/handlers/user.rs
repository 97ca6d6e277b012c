//! User profile and search handlers.

use axum::extract::{Query, State};
use axum::Json;

use loopline_core::error::AppError;
use loopline_entity::user::{User, UserSummary};

use crate::dto::request::SearchQuery;
use crate::dto::response::ApiResponse;
use crate::error::ApiResult;
use crate::extractors::AuthUser;
use crate::state::AppState;

const SEARCH_LIMIT: i64 = 20;

/// GET /api/user/me
pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<ApiResponse<User>>> {
    let user = state
        .users
        .find_by_id(auth.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(Json(ApiResponse::ok(user)))
}

/// GET /api/user/search?q=
pub async fn search(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<ApiResponse<Vec<UserSummary>>>> {
    let q = query.q.trim();
    if q.is_empty() {
        return Ok(Json(ApiResponse::ok(Vec::new())));
    }

    let users = state.users.search(q, SEARCH_LIMIT).await?;
    Ok(Json(ApiResponse::ok(users)))
}
