//! Error types for Erebrus wallet sign-in
//!
//! `AuthError` is the taxonomy the sign-in flow recovers from. `ApiError`
//! is what the development auth server answers with when a request cannot
//! even be interpreted.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::wallet::WalletError;

/// Sign-in failures. All of them are recoverable: the flow returns to signed-out.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    #[error("Signing rejected: {0}")]
    SigningRejected(String),

    #[error("Session storage error: {0}")]
    Storage(String),
}

impl AuthError {
    /// Get the error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::Network(_) => "NETWORK_ERROR",
            AuthError::Server(_) => "SERVER_ERROR",
            AuthError::VerificationFailed(_) => "VERIFICATION_FAILED",
            AuthError::SigningRejected(_) => "SIGNING_REJECTED",
            AuthError::Storage(_) => "STORAGE_ERROR",
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AuthError::Server(format!("Malformed response: {}", err))
        } else {
            AuthError::Network(err.to_string())
        }
    }
}

impl From<WalletError> for AuthError {
    fn from(err: WalletError) -> Self {
        AuthError::SigningRejected(err.to_string())
    }
}

impl From<std::io::Error> for AuthError {
    fn from(err: std::io::Error) -> Self {
        AuthError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        AuthError::Storage(format!("Corrupt session file: {}", err))
    }
}

/// Result type alias using AuthError
pub type AuthResult<T> = Result<T, AuthError>;

/// Development server error with HTTP status code mapping
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// JSON error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

/// Error details in the response
#[derive(Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();

        match &self {
            ApiError::InternalError(_) => {
                tracing::error!(error = %message, code = %error_code, "Server error occurred");
            }
            _ => {
                tracing::debug!(error = %message, code = %error_code, "Client error occurred");
            }
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code: error_code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AuthError::Network("timeout".to_string()).error_code(),
            "NETWORK_ERROR"
        );
        assert_eq!(
            AuthError::VerificationFailed("401".to_string()).error_code(),
            "VERIFICATION_FAILED"
        );
        assert_eq!(
            ApiError::BadRequest("test".to_string()).error_code(),
            "BAD_REQUEST"
        );
    }

    #[test]
    fn test_wallet_error_becomes_signing_rejected() {
        let err: AuthError = WalletError::Rejected.into();
        assert!(matches!(err, AuthError::SigningRejected(_)));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::BadRequest("test".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::InternalError("test".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
