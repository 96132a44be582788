//! Dev server HTTP handlers

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;

use super::crypto::verify_wallet_signature;
use super::jwt::generate_session_token;
use super::DevServerState;
use crate::error::ApiError;
use crate::models::{ChallengeQuery, ChallengeResponse, TokenRequest, TokenResponse};

pub const STATUS_UNAUTHORIZED: u16 = 401;
pub const STATUS_NOT_FOUND: u16 = 404;
pub const STATUS_GONE: u16 = 410;

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}

/// GET challenge endpoint - issue a challenge for a wallet address
pub async fn get_challenge(
    State(state): State<DevServerState>,
    Query(query): Query<ChallengeQuery>,
) -> Result<Json<ChallengeResponse>, ApiError> {
    let wallet_address = query.wallet_address.trim();
    if wallet_address.is_empty() {
        return Err(ApiError::BadRequest(
            "walletAddress must not be empty".to_string(),
        ));
    }

    let (challenge_id, _) = state.issue_challenge(wallet_address).await;
    tracing::info!(address = %wallet_address, challenge_id = %challenge_id, "Challenge issued");

    Ok(Json(ChallengeResponse {
        eula: Some(state.settings.eula.clone()),
        challange_id: Some(challenge_id),
    }))
}

/// POST token endpoint - verify a signed challenge and issue a session token.
///
/// The outcome travels in the body `status`; the HTTP status stays 200.
pub async fn get_token(
    State(state): State<DevServerState>,
    Json(req): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Some(pending) = state.take_challenge(&req.challenge_id).await else {
        tracing::warn!(challenge_id = %req.challenge_id, "Unknown or used challenge");
        return Ok(Json(rejected(STATUS_NOT_FOUND)));
    };

    if pending.expires_at < Utc::now() {
        tracing::warn!(challenge_id = %req.challenge_id, "Challenge expired");
        return Ok(Json(rejected(STATUS_GONE)));
    }

    if let Err(e) = verify_wallet_signature(&pending.wallet_address, &pending.message, &req.signature)
    {
        tracing::warn!(
            challenge_id = %req.challenge_id,
            address = %pending.wallet_address,
            error = %e,
            "Signature rejected"
        );
        return Ok(Json(rejected(STATUS_UNAUTHORIZED)));
    }

    let token = generate_session_token(
        &pending.wallet_address,
        &req.challenge_id,
        &state.settings.jwt_secret,
        state.settings.token_ttl_seconds,
    )
    .map_err(|e| ApiError::InternalError(e.to_string()))?;

    tracing::info!(address = %pending.wallet_address, "Session token issued");

    Ok(Json(TokenResponse {
        status: TokenResponse::SUCCESS,
        token: Some(token),
    }))
}

fn rejected(status: u16) -> TokenResponse {
    TokenResponse {
        status,
        token: None,
    }
}
