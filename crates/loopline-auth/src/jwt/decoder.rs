//! JWT token validation.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use loopline_core::config::AuthConfig;
use loopline_core::error::AppError;

use super::claims::Claims;

/// Validates JWT access tokens.
#[derive(Clone)]
pub struct JwtDecoder {
    /// HMAC secret key for verification.
    decoding_key: DecodingKey,
    /// Validation configuration.
    validation: Validation,
}

impl std::fmt::Debug for JwtDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtDecoder")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtDecoder {
    /// Creates a new decoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 5; // seconds of clock skew tolerance

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Decodes and validates an access token string.
    pub fn decode(&self, token: &str) -> Result<Claims, AppError> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        AppError::authentication("Token has expired")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidToken => {
                        AppError::authentication("Invalid token format")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                        AppError::authentication("Invalid token signature")
                    }
                    _ => AppError::authentication(format!("Token validation failed: {e}")),
                }
            })?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::encoder::JwtEncoder;
    use loopline_core::config::AuthConfig;
    use uuid::Uuid;

    fn config(secret: &str) -> AuthConfig {
        AuthConfig {
            jwt_secret: secret.to_string(),
            jwt_access_ttl_hours: 24,
        }
    }

    #[test]
    fn issued_token_decodes_back() {
        let cfg = config("test-secret-test-secret-test-secret");
        let encoder = JwtEncoder::new(&cfg);
        let decoder = JwtDecoder::new(&cfg);

        let user_id = Uuid::new_v4();
        let (token, _exp) = encoder.issue(user_id, "mika").unwrap();

        let claims = decoder.decode(&token).unwrap();
        assert_eq!(claims.user_id(), user_id);
        assert_eq!(claims.username, "mika");
        assert!(!claims.is_expired());
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let encoder = JwtEncoder::new(&config("secret-a-secret-a-secret-a-secret"));
        let decoder = JwtDecoder::new(&config("secret-b-secret-b-secret-b-secret"));

        let (token, _) = encoder.issue(Uuid::new_v4(), "mika").unwrap();
        assert!(decoder.decode(&token).is_err());
    }

    #[test]
    fn garbage_token_is_rejected() {
        let decoder = JwtDecoder::new(&config("test-secret-test-secret-test-secret"));
        assert!(decoder.decode("not-a-jwt").is_err());
    }
}
