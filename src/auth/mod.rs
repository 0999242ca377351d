use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::{AdminCredentials, SecurityConfig};

/// The only role tokens are ever issued for.
pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(email: &str, role: &str, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: email.to_string(),
            email: email.to_string(),
            role: role.to_string(),
            iat: now.timestamp(),
            exp,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("Invalid JWT secret")]
    InvalidSecret,
    #[error("Invalid or expired token")]
    InvalidToken,
}

pub fn generate_jwt(claims: &Claims, security: &SecurityConfig) -> Result<String, JwtError> {
    if security.jwt_secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(security.jwt_secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

pub fn validate_jwt(token: &str, security: &SecurityConfig) -> Result<Claims, JwtError> {
    if security.jwt_secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(security.jwt_secret.as_bytes());
    decode::<Claims>(token, &decoding_key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!("Rejected token: {}", e);
            JwtError::InvalidToken
        })
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

/// Compare submitted credentials against the configured admin identity.
/// Both sides are hashed first so the comparison length never depends on
/// the input.
pub fn credentials_match(admin: &AdminCredentials, email: &str, password: &str) -> bool {
    let email_ok = digest(&email.trim().to_lowercase()) == digest(&admin.email.to_lowercase());
    let password_ok = digest(password) == digest(&admin.password);
    email_ok & password_ok
}

#[cfg(test)]
mod tests {
    use super::*;

    fn security() -> SecurityConfig {
        SecurityConfig {
            cors_origins: vec![],
            jwt_secret: "test-secret".to_string(),
            jwt_expiry_hours: 1,
        }
    }

    #[test]
    fn issued_tokens_validate() {
        let claims = Claims::new("admin@example.com", ADMIN_ROLE, 1);
        let token = generate_jwt(&claims, &security()).unwrap();

        let decoded = validate_jwt(&token, &security()).unwrap();
        assert_eq!(decoded.email, "admin@example.com");
        assert_eq!(decoded.role, ADMIN_ROLE);
        assert!(decoded.exp > decoded.iat);
    }

    #[test]
    fn tampered_and_foreign_tokens_fail() {
        let token = generate_jwt(&Claims::new("a@b.c", ADMIN_ROLE, 1), &security()).unwrap();
        let mut tampered = token.clone();
        tampered.push('x');
        assert!(matches!(
            validate_jwt(&tampered, &security()),
            Err(JwtError::InvalidToken)
        ));

        let other = SecurityConfig {
            jwt_secret: "other".to_string(),
            ..security()
        };
        assert!(validate_jwt(&token, &other).is_err());
    }

    #[test]
    fn expired_tokens_fail() {
        let mut claims = Claims::new("a@b.c", ADMIN_ROLE, 1);
        claims.iat -= 7200;
        claims.exp = claims.iat + 60;
        let token = generate_jwt(&claims, &security()).unwrap();
        assert!(validate_jwt(&token, &security()).is_err());
    }

    #[test]
    fn credentials_compare_case_insensitive_email_only() {
        let admin = AdminCredentials {
            email: "Admin@Example.com".to_string(),
            password: "s3cret".to_string(),
        };
        assert!(credentials_match(&admin, "admin@example.com", "s3cret"));
        assert!(!credentials_match(&admin, "admin@example.com", "S3CRET"));
        assert!(!credentials_match(&admin, "someone@example.com", "s3cret"));
    }
}
