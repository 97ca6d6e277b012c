//! # loopline-auth
//!
//! JWT access token issuing and verification plus Argon2id password
//! hashing.

pub mod jwt;
pub mod password;

pub use jwt::{Claims, JwtDecoder, JwtEncoder};
pub use password::PasswordHasher;
