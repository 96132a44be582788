//! Challenge client
//!
//! Network boundary of the sign-in flow. Requests a challenge for an
//! address and trades a signed challenge for a session token. Nothing here
//! touches persisted state.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::config::Config;
use crate::error::{AuthError, AuthResult};
use crate::models::{
    Challenge, ChallengeQuery, ChallengeResponse, SessionToken, Signature, TokenRequest,
    TokenResponse, WalletAddress,
};

#[async_trait]
pub trait ChallengeApi: Send + Sync {
    /// Fetch a fresh challenge for `address`
    async fn request_challenge(&self, address: &WalletAddress) -> AuthResult<Challenge>;

    /// Exchange a signature over a challenge for a session token
    async fn verify(&self, signature: &Signature, challenge_id: &str) -> AuthResult<SessionToken>;
}

/// `ChallengeApi` over HTTP
#[derive(Clone)]
pub struct HttpChallengeClient {
    http_client: Client,
    challenge_url: String,
    token_url: String,
}

impl HttpChallengeClient {
    pub fn new(challenge_url: String, token_url: String, timeout: Duration) -> AuthResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            challenge_url,
            token_url,
        })
    }

    pub fn from_config(config: &Config) -> AuthResult<Self> {
        Self::new(config.challenge_url(), config.token_url(), config.http_timeout)
    }
}

#[async_trait]
impl ChallengeApi for HttpChallengeClient {
    async fn request_challenge(&self, address: &WalletAddress) -> AuthResult<Challenge> {
        tracing::debug!(address = %address, url = %self.challenge_url, "Requesting challenge");

        let response = self
            .http_client
            .get(&self.challenge_url)
            .query(&ChallengeQuery {
                wallet_address: address.to_string(),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Server(format!(
                "Challenge endpoint returned HTTP {}",
                status.as_u16()
            )));
        }

        let body: ChallengeResponse = response.json().await?;
        parse_challenge(body)
    }

    async fn verify(&self, signature: &Signature, challenge_id: &str) -> AuthResult<SessionToken> {
        tracing::debug!(challenge_id = %challenge_id, url = %self.token_url, "Submitting signature");

        let response = self
            .http_client
            .post(&self.token_url)
            .json(&TokenRequest {
                signature: signature.as_str().to_string(),
                challenge_id: challenge_id.to_string(),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::VerificationFailed(format!(
                "Token endpoint returned HTTP {}",
                status.as_u16()
            )));
        }

        let body: TokenResponse = response.json().await?;
        parse_token(body)
    }
}

/// Validate a challenge body. Both fields must be present and the id non-empty.
pub fn parse_challenge(body: ChallengeResponse) -> AuthResult<Challenge> {
    let eula = body
        .eula
        .ok_or_else(|| AuthError::Server("Challenge response missing eula".to_string()))?;

    let challenge_id = body
        .challange_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AuthError::Server("Challenge response missing challangeId".to_string()))?;

    Ok(Challenge::new(&eula, &challenge_id))
}

/// Validate a token body. Success is signalled by `status == 200` in the payload.
pub fn parse_token(body: TokenResponse) -> AuthResult<SessionToken> {
    if !body.is_success() {
        return Err(AuthError::VerificationFailed(format!(
            "Server reported status {}",
            body.status
        )));
    }

    body.token
        .filter(|token| !token.is_empty())
        .map(SessionToken::new)
        .ok_or_else(|| AuthError::Server("Token response missing token".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_challenge() {
        let challenge = parse_challenge(ChallengeResponse {
            eula: Some("I agree".to_string()),
            challange_id: Some("c1".to_string()),
        })
        .unwrap();
        assert_eq!(challenge.message, "I agreec1");
        assert_eq!(challenge.challenge_id, "c1");
    }

    #[test]
    fn test_parse_challenge_missing_fields() {
        let missing_id = parse_challenge(ChallengeResponse {
            eula: Some("I agree".to_string()),
            challange_id: None,
        });
        assert!(matches!(missing_id, Err(AuthError::Server(_))));

        let empty_id = parse_challenge(ChallengeResponse {
            eula: Some("I agree".to_string()),
            challange_id: Some(String::new()),
        });
        assert!(matches!(empty_id, Err(AuthError::Server(_))));

        let missing_eula = parse_challenge(ChallengeResponse {
            eula: None,
            challange_id: Some("c1".to_string()),
        });
        assert!(matches!(missing_eula, Err(AuthError::Server(_))));
    }

    #[test]
    fn test_parse_token() {
        let token = parse_token(TokenResponse {
            status: 200,
            token: Some("tokA1".to_string()),
        })
        .unwrap();
        assert_eq!(token.as_str(), "tokA1");
    }

    #[test]
    fn test_parse_token_rejected_status() {
        let result = parse_token(TokenResponse {
            status: 401,
            token: None,
        });
        assert!(matches!(result, Err(AuthError::VerificationFailed(_))));

        // A token alongside a failing status is still a failure
        let result = parse_token(TokenResponse {
            status: 500,
            token: Some("tok".to_string()),
        });
        assert!(matches!(result, Err(AuthError::VerificationFailed(_))));
    }

    #[test]
    fn test_parse_token_success_without_token() {
        let result = parse_token(TokenResponse {
            status: 200,
            token: Some(String::new()),
        });
        assert!(matches!(result, Err(AuthError::Server(_))));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        // Reserve a port, then free it so nothing is listening
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let client = HttpChallengeClient::new(
            format!("http://127.0.0.1:{}/api/getChallengeId", port),
            format!("http://127.0.0.1:{}/api/getToken", port),
            Duration::from_secs(2),
        )
        .unwrap();

        let result = client.request_challenge(&WalletAddress::from("0xA1")).await;
        assert!(matches!(result, Err(AuthError::Network(_))));
    }
}
