//! `AuthUser` extractor. Pulls the bearer token from the Authorization
//! header and validates it.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use loopline_core::error::AppError;

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated caller, injected into handlers that require auth.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::authentication("Missing Authorization header"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::authentication("Invalid Authorization header format"))?;

        let claims = state.jwt_decoder.decode(token)?;

        Ok(AuthUser {
            user_id: claims.user_id(),
            username: claims.username,
        })
    }
}
