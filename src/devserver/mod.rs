//! Development auth server
//!
//! Serves the challenge and token endpoints the sign-in client talks to,
//! so the whole flow can run locally:
//! - Single-use challenges tied to one address, with a TTL
//! - ed25519 signature verification
//! - JWT session tokens

mod crypto;
mod handlers;
mod jwt;

pub use crypto::{verify_wallet_signature, CryptoError};
pub use jwt::{generate_session_token, verify_token, Claims, JwtError};

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Duration, Utc};
use tokio::net::TcpListener;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::middleware::request_tracing;

/// Challenge waiting for its signature
#[derive(Debug, Clone)]
pub struct PendingChallenge {
    pub wallet_address: String,
    pub message: String,
    pub expires_at: DateTime<Utc>,
}

/// Settings the handlers need
#[derive(Debug, Clone)]
pub struct DevServerSettings {
    pub eula: String,
    pub jwt_secret: String,
    pub challenge_ttl_seconds: i64,
    pub token_ttl_seconds: i64,
    pub challenge_path: String,
    pub token_path: String,
}

impl DevServerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            eula: config.eula.clone(),
            jwt_secret: config.jwt_secret.clone(),
            challenge_ttl_seconds: config.challenge_ttl_seconds,
            token_ttl_seconds: config.token_ttl_seconds,
            challenge_path: config.challenge_path.clone(),
            token_path: config.token_path.clone(),
        }
    }
}

/// Dev server state shared across handlers
#[derive(Clone)]
pub struct DevServerState {
    pub settings: Arc<DevServerSettings>,
    challenges: Arc<RwLock<HashMap<String, PendingChallenge>>>,
}

impl DevServerState {
    pub fn new(settings: DevServerSettings) -> Self {
        Self {
            settings: Arc::new(settings),
            challenges: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a challenge for `wallet_address`, returning its id and message
    pub async fn issue_challenge(&self, wallet_address: &str) -> (String, PendingChallenge) {
        let challenge_id = uuid::Uuid::new_v4().to_string();
        let pending = PendingChallenge {
            wallet_address: wallet_address.to_string(),
            message: format!("{}{}", self.settings.eula, challenge_id),
            expires_at: Utc::now() + Duration::seconds(self.settings.challenge_ttl_seconds),
        };

        let mut challenges = self.challenges.write().await;
        let now = Utc::now();
        challenges.retain(|_, c| c.expires_at > now);
        challenges.insert(challenge_id.clone(), pending.clone());

        (challenge_id, pending)
    }

    /// Remove and return a challenge; every id can be taken once
    pub async fn take_challenge(&self, challenge_id: &str) -> Option<PendingChallenge> {
        self.challenges.write().await.remove(challenge_id)
    }

    #[cfg(test)]
    pub(crate) async fn pending_count(&self) -> usize {
        self.challenges.read().await.len()
    }
}

fn route_path(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}

/// Build the dev server router
pub fn router(state: DevServerState) -> Router {
    let challenge_path = route_path(&state.settings.challenge_path);
    let token_path = route_path(&state.settings.token_path);

    Router::new()
        .route("/health", get(handlers::health))
        .route(&challenge_path, get(handlers::get_challenge))
        .route(&token_path, post(handlers::get_token))
        .with_state(state)
        .layer(axum::middleware::from_fn(request_tracing))
}

/// Serve until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: DevServerState, shutdown: F) -> std::io::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> DevServerSettings {
        DevServerSettings {
            eula: "I agree".to_string(),
            jwt_secret: "test-secret".to_string(),
            challenge_ttl_seconds: 300,
            token_ttl_seconds: 900,
            challenge_path: "api/getChallengeId".to_string(),
            token_path: "api/getToken".to_string(),
        }
    }

    #[tokio::test]
    async fn test_challenge_is_single_use() {
        let state = DevServerState::new(settings());
        let (id, pending) = state.issue_challenge("0xA1").await;
        assert_eq!(pending.message, format!("I agree{}", id));

        assert!(state.take_challenge(&id).await.is_some());
        assert!(state.take_challenge(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_expired_challenges_are_purged() {
        let state = DevServerState::new(DevServerSettings {
            challenge_ttl_seconds: -1,
            ..settings()
        });
        state.issue_challenge("0xA1").await;
        state.issue_challenge("0xA1").await;
        // Each issue purges what has already expired
        assert_eq!(state.pending_count().await, 1);
    }
}
