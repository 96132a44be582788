//! Authentication models for the challenge/token endpoints

use serde::{Deserialize, Serialize};

/// Challenge the wallet must sign
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub challenge_id: String,
    /// Text handed to the wallet: the EULA followed by the challenge id
    pub message: String,
}

impl Challenge {
    pub fn new(eula: &str, challenge_id: &str) -> Self {
        Self {
            challenge_id: challenge_id.to_string(),
            message: format!("{}{}", eula, challenge_id),
        }
    }
}

// ============================================================================
// Request/Response DTOs
// ============================================================================

/// Query string for the challenge endpoint
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeQuery {
    pub wallet_address: String,
}

/// Challenge endpoint response body. The field is spelled `challangeId` on the wire.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChallengeResponse {
    #[serde(default)]
    pub eula: Option<String>,
    #[serde(rename = "challangeId", default)]
    pub challange_id: Option<String>,
}

/// Token endpoint request body
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub signature: String,
    pub challenge_id: String,
}

/// Token endpoint response body; success is `status == 200` inside the payload
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl TokenResponse {
    pub const SUCCESS: u16 = 200;

    pub fn is_success(&self) -> bool {
        self.status == Self::SUCCESS
    }
}
