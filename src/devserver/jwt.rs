//! Session token generation and validation
//!
//! Session tokens are HS256 JWTs whose subject is the wallet address.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Token encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Token decoding failed: {0}")]
    DecodingFailed(String),

    #[error("Token expired")]
    TokenExpired,
}

/// JWT claims for session tokens
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Wallet address
    pub sub: String,
    /// Challenge the token was issued for
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Issue a session token for a verified wallet
pub fn generate_session_token(
    wallet_address: &str,
    challenge_id: &str,
    secret: &str,
    ttl_seconds: i64,
) -> Result<String, JwtError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(ttl_seconds);

    let claims = Claims {
        sub: wallet_address.to_string(),
        jti: challenge_id.to_string(),
        iat: now.timestamp(),
        exp: exp.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| JwtError::EncodingFailed(e.to_string()))
}

/// Verify and decode a session token
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::TokenExpired,
        _ => JwtError::DecodingFailed(e.to_string()),
    })?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_session_token() {
        let token = generate_session_token("0xA1", "c1", "test-secret-key", 900).unwrap();
        let claims = verify_token(&token, "test-secret-key").unwrap();
        assert_eq!(claims.sub, "0xA1");
        assert_eq!(claims.jti, "c1");
    }

    #[test]
    fn test_wrong_secret() {
        let token = generate_session_token("0xA1", "c1", "secret1", 900).unwrap();
        assert!(verify_token(&token, "secret2").is_err());
    }

    #[test]
    fn test_expired_token() {
        // Past the default 60s leeway
        let token = generate_session_token("0xA1", "c1", "secret", -120).unwrap();
        assert!(matches!(
            verify_token(&token, "secret"),
            Err(JwtError::TokenExpired)
        ));
    }
}
