//! Signup and login on top of the user store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use loopline_auth::JwtEncoder;
use loopline_auth::PasswordHasher;
use loopline_core::error::AppError;
use loopline_core::result::AppResult;
use loopline_database::traits::UserStore;
use loopline_entity::user::{CreateUser, User};

/// A freshly issued session: the user plus their bearer token.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    encoder: JwtEncoder,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, hasher: PasswordHasher, encoder: JwtEncoder) -> Self {
        Self {
            users,
            hasher,
            encoder,
        }
    }

    /// Register a new account and log it in.
    pub async fn signup(
        &self,
        username: &str,
        full_name: &str,
        email: Option<&str>,
        password: &str,
    ) -> AppResult<Session> {
        let username = username.trim().to_lowercase();
        if username.len() < 3 {
            return Err(AppError::validation(
                "Username must be at least 3 characters",
            ));
        }
        if !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        {
            return Err(AppError::validation(
                "Username may only contain letters, digits, '_' and '.'",
            ));
        }
        if password.len() < 8 {
            return Err(AppError::validation(
                "Password must be at least 8 characters",
            ));
        }
        let full_name = full_name.trim();
        if full_name.is_empty() {
            return Err(AppError::validation("Full name is required"));
        }

        let password_hash = self.hasher.hash_password(password)?;
        let user = self
            .users
            .create(&CreateUser {
                username: username.clone(),
                email: email.map(|e| e.trim().to_lowercase()),
                password_hash,
                full_name: full_name.to_string(),
            })
            .await?;

        info!(user_id = %user.id, username = %user.username, "User registered");
        self.issue(user)
    }

    /// Verify credentials and issue a token.
    pub async fn login(&self, username: &str, password: &str) -> AppResult<Session> {
        let username = username.trim().to_lowercase();
        let user = self
            .users
            .find_by_username(&username)
            .await?
            .ok_or_else(|| AppError::authentication("Invalid username or password"))?;

        if !self.hasher.verify_password(password, &user.password_hash)? {
            return Err(AppError::authentication("Invalid username or password"));
        }

        info!(user_id = %user.id, "User logged in");
        self.issue(user)
    }

    fn issue(&self, user: User) -> AppResult<Session> {
        let (token, expires_at) = self.encoder.issue(user.id, &user.username)?;
        Ok(Session {
            user,
            token,
            expires_at,
        })
    }
}
