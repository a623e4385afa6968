//! JWT token service
//!
//! Generation, validation and parsing of API session tokens. These are the
//! login sessions behind `Authorization: Bearer` - not the scannable
//! check-in credential, which lives in [`crate::credential`].

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::models::PatronRole;

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Signing secret (at least 32 bytes)
    pub secret: String,
    /// Token lifetime in minutes
    pub expiration_minutes: i64,
    pub issuer: String,
    pub audience: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        let secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            #[cfg(debug_assertions)]
            {
                tracing::warn!("JWT_SECRET not set, using development key");
                "cardroom-development-jwt-secret-key!".to_string()
            }
            #[cfg(not(debug_assertions))]
            {
                panic!("FATAL: JWT_SECRET environment variable must be set in production");
            }
        });

        Self {
            secret,
            expiration_minutes: std::env::var("JWT_EXPIRATION_MINUTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(720), // 12 hours, one venue shift
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "cardroom-server".to_string()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "cardroom-clients".to_string()),
        }
    }
}

/// JWT claims stored in the token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Patron uid (subject)
    pub sub: String,
    pub login_id: String,
    pub display_name: String,
    /// `patron` or `staff`
    pub role: String,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
    pub aud: String,
}

/// JWT errors
#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    ExpiredToken,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Token generation failed: {0}")]
    GenerationFailed(String),
}

/// JWT token service
#[derive(Clone)]
pub struct JwtService {
    pub config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new() -> Self {
        Self::with_config(JwtConfig::default())
    }

    pub fn with_config(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Generate a session token
    pub fn generate_token(
        &self,
        uid: &str,
        login_id: &str,
        display_name: &str,
        role: PatronRole,
    ) -> Result<String, JwtError> {
        let now = Utc::now();
        let expiration = now + Duration::minutes(self.config.expiration_minutes);

        let claims = Claims {
            sub: uid.to_string(),
            login_id: login_id.to_string(),
            display_name: display_name.to_string(),
            role: match role {
                PatronRole::Patron => "patron".to_string(),
                PatronRole::Staff => "staff".to_string(),
            },
            exp: expiration.timestamp(),
            iat: now.timestamp(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| JwtError::GenerationFailed(e.to_string()))
    }

    /// Validate and decode a token
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&self.config.audience]);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_required_spec_claims(&["sub", "exp", "iat", "iss", "aud"]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
                ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                _ => JwtError::InvalidToken(e.to_string()),
            }
        })?;

        Ok(token_data.claims)
    }

    /// Extract a token from the Authorization header
    pub fn extract_from_header(header: &str) -> Option<&str> {
        header.strip_prefix("Bearer ")
    }
}

impl Default for JwtService {
    fn default() -> Self {
        Self::new()
    }
}

/// Current caller context, parsed from JWT claims
///
/// Created by the auth middleware and injected into request extensions.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub login_id: String,
    pub display_name: String,
    pub role: String,
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            login_id: claims.login_id,
            display_name: claims.display_name,
            role: claims.role,
        }
    }
}

impl CurrentUser {
    /// Staff accounts drive the scanning terminal and reporting endpoints
    pub fn is_staff(&self) -> bool {
        self.role == "staff"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtService {
        JwtService::with_config(JwtConfig {
            secret: "test-jwt-secret-key-of-enough-length".to_string(),
            expiration_minutes: 60,
            issuer: "cardroom-server".to_string(),
            audience: "cardroom-clients".to_string(),
        })
    }

    #[test]
    fn test_generation_and_validation() {
        let service = service();
        let token = service
            .generate_token("u1", "u1_0101", "Alice", PatronRole::Patron)
            .expect("Failed to generate token");

        let claims = service
            .validate_token(&token)
            .expect("Failed to validate token");

        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.login_id, "u1_0101");
        assert_eq!(claims.role, "patron");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let service = service();
        let token = service
            .generate_token("u1", "u1_0101", "Alice", PatronRole::Staff)
            .unwrap();

        let other = JwtService::with_config(JwtConfig {
            secret: "another-jwt-secret-key-of-enough-len".to_string(),
            expiration_minutes: 60,
            issuer: "cardroom-server".to_string(),
            audience: "cardroom-clients".to_string(),
        });
        assert!(other.validate_token(&token).is_err());
    }

    #[test]
    fn test_extract_from_header() {
        assert_eq!(JwtService::extract_from_header("Bearer abc"), Some("abc"));
        assert_eq!(JwtService::extract_from_header("Basic abc"), None);
    }
}
