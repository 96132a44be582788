//! Configuration management for Erebrus wallet sign-in
//!
//! Loads settings for both the sign-in client and the development auth
//! server from environment variables, with support for different
//! environments (development, staging, production).

use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid environment value: {0}")]
    InvalidValue(String),

    #[error("Invalid port number: {0}")]
    InvalidPort(String),
}

/// Application environment
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Parse environment from string
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue(format!(
                "Invalid environment: '{}'. Expected: dev, staging, or prod",
                s
            ))),
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

/// Polygon Mumbai testnet
pub const DEFAULT_CHAIN_ID: u64 = 80001;

pub const DEFAULT_EULA: &str =
    "By signing this message you agree to the Erebrus terms of service. Challenge: ";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Current environment
    pub environment: Environment,

    /// Base URL of the auth API (challenge and token endpoints)
    pub auth_api_url: String,

    /// Path of the challenge endpoint, relative to `auth_api_url`
    pub challenge_path: String,

    /// Path of the token endpoint, relative to `auth_api_url`
    pub token_path: String,

    /// Transport timeout for the challenge and token calls
    pub http_timeout: Duration,

    /// Chain the wallet must be connected to
    pub required_chain_id: u64,

    /// Session file; `None` keeps the session in memory only
    pub session_file: Option<PathBuf>,

    /// Dev server port
    pub port: u16,

    /// Log level (RUST_LOG)
    pub log_level: String,

    /// JWT secret for dev server token signing
    pub jwt_secret: String,

    /// Challenge lifetime on the dev server (default: 300 = 5 minutes)
    pub challenge_ttl_seconds: i64,

    /// Session token lifetime on the dev server (default: 3600)
    pub token_ttl_seconds: i64,

    /// Terms text prepended to every challenge id
    pub eula: String,

    /// Hex-encoded ed25519 seed for the local wallet; random when unset
    pub local_wallet_key: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .map(|s| Environment::parse(&s))
            .unwrap_or(Ok(Environment::Development))?;

        let auth_api_url = lookup("AUTH_API_URL")
            .unwrap_or_else(|| "http://127.0.0.1:3001".to_string())
            .trim_end_matches('/')
            .to_string();

        let challenge_path =
            lookup("AUTH_CHALLENGE_PATH").unwrap_or_else(|| "api/getChallengeId".to_string());

        let token_path = lookup("AUTH_TOKEN_PATH").unwrap_or_else(|| "api/getToken".to_string());

        let http_timeout = lookup("HTTP_TIMEOUT_SECONDS")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        let required_chain_id = lookup("REQUIRED_CHAIN_ID")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_CHAIN_ID);

        let session_file = lookup("SESSION_FILE")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let port = lookup("PORT")
            .unwrap_or_else(|| "3001".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort("PORT must be a valid number".to_string()))?;

        let log_level = lookup("RUST_LOG").unwrap_or_else(|| "info".to_string());

        let jwt_secret = lookup("JWT_SECRET")
            .unwrap_or_else(|| "development-secret-change-in-production".to_string());

        if environment.is_production() && jwt_secret == "development-secret-change-in-production" {
            return Err(ConfigError::InvalidValue(
                "JWT_SECRET must be set in production".to_string(),
            ));
        }

        let challenge_ttl_seconds = lookup("CHALLENGE_TTL_SECONDS")
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(300);

        let token_ttl_seconds = lookup("TOKEN_TTL_SECONDS")
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(3600);

        let eula = lookup("EULA_TEXT").unwrap_or_else(|| DEFAULT_EULA.to_string());

        let local_wallet_key = lookup("LOCAL_WALLET_KEY").filter(|s| !s.is_empty());

        Ok(Config {
            environment,
            auth_api_url,
            challenge_path,
            token_path,
            http_timeout,
            required_chain_id,
            session_file,
            port,
            log_level,
            jwt_secret,
            challenge_ttl_seconds,
            token_ttl_seconds,
            eula,
            local_wallet_key,
        })
    }

    /// Full URL of the challenge endpoint
    pub fn challenge_url(&self) -> String {
        join_url(&self.auth_api_url, &self.challenge_path)
    }

    /// Full URL of the token endpoint
    pub fn token_url(&self) -> String {
        join_url(&self.auth_api_url, &self.token_path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
