//! Sign-in state machine
//!
//! Drives `SignedOut -> AwaitingChallenge -> Signing -> Verifying -> SignedIn`
//! from two event sources: wallet address changes and the explicit sign-in
//! action. Every await point is followed by a ticket check so a result that
//! belongs to a previous address, or to a superseded attempt, is dropped
//! before it can touch the session.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};

use super::client::ChallengeApi;
use crate::error::AuthError;
use crate::models::{Challenge, SessionToken, WalletAddress};
use crate::session::SessionStore;
use crate::wallet::Wallet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    SignedOut,
    AwaitingChallenge,
    Signing,
    Verifying,
    SignedIn,
}

impl AuthState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthState::SignedOut => "signed_out",
            AuthState::AwaitingChallenge => "awaiting_challenge",
            AuthState::Signing => "signing",
            AuthState::Verifying => "verifying",
            AuthState::SignedIn => "signed_in",
        }
    }
}

/// Read-only view of the machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSnapshot {
    pub state: AuthState,
    pub address: Option<WalletAddress>,
    /// A challenge is cached and ready to be signed
    pub has_challenge: bool,
}

/// Result of the explicit sign-in action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInOutcome {
    SignedIn(SessionToken),
    AlreadySignedIn,
    NoWallet,
    /// The address changed or a newer attempt started before this one finished
    Superseded,
    Failed(AuthError),
}

/// Identifies the address and attempt an in-flight operation belongs to
#[derive(Debug, Clone)]
pub struct ChallengeTicket {
    epoch: u64,
    attempt: u64,
    address: WalletAddress,
}

impl ChallengeTicket {
    pub fn address(&self) -> &WalletAddress {
        &self.address
    }
}

struct Inner {
    address: Option<WalletAddress>,
    state: AuthState,
    challenge: Option<Challenge>,
    token: Option<SessionToken>,
    /// Bumped on every address change
    epoch: u64,
    /// Bumped on every sign-in and sign-out
    attempt: u64,
}

impl Inner {
    fn is_current(&self, ticket: &ChallengeTicket) -> bool {
        self.epoch == ticket.epoch
            && self.attempt == ticket.attempt
            && self.address.as_ref() == Some(&ticket.address)
    }

    fn ticket(&self, address: WalletAddress) -> ChallengeTicket {
        ChallengeTicket {
            epoch: self.epoch,
            attempt: self.attempt,
            address,
        }
    }

    fn snapshot(&self) -> AuthSnapshot {
        AuthSnapshot {
            state: self.state,
            address: self.address.clone(),
            has_challenge: self.challenge.is_some(),
        }
    }
}

pub struct AuthMachine {
    api: Arc<dyn ChallengeApi>,
    wallet: Arc<dyn Wallet>,
    store: SessionStore,
    inner: Mutex<Inner>,
    state_tx: watch::Sender<AuthSnapshot>,
}

impl AuthMachine {
    /// Restore from the persisted session. Signed in only if the persisted
    /// address is exactly the wallet's current one and a token is present;
    /// otherwise whatever was persisted is cleared.
    pub fn new(api: Arc<dyn ChallengeApi>, wallet: Arc<dyn Wallet>, store: SessionStore) -> Self {
        let address = wallet.address();

        let persisted = store.load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to load persisted session");
            None
        });

        let (state, token) = match (&address, persisted) {
            (Some(current), Some((persisted_address, token))) if *current == persisted_address => {
                tracing::info!(
                    address = %current,
                    token = %token.fingerprint(),
                    "Restored persisted session"
                );
                (AuthState::SignedIn, Some(token))
            }
            (_, persisted) => {
                if let Some((persisted_address, _)) = persisted {
                    tracing::info!(
                        persisted = %persisted_address,
                        current = ?address,
                        "Discarding session of another wallet"
                    );
                }
                (AuthState::SignedOut, None)
            }
        };

        // A token may only stay persisted while signed in
        if state != AuthState::SignedIn {
            if let Err(e) = store.clear() {
                tracing::warn!(error = %e, code = e.error_code(), "Failed to clear session");
            }
        }

        let inner = Inner {
            address,
            state,
            challenge: None,
            token,
            epoch: 0,
            attempt: 0,
        };
        let (state_tx, _) = watch::channel(inner.snapshot());

        Self {
            api,
            wallet,
            store,
            inner: Mutex::new(inner),
            state_tx,
        }
    }

    pub async fn snapshot(&self) -> AuthSnapshot {
        self.inner.lock().await.snapshot()
    }

    /// Receiver notified after every transition
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.state_tx.subscribe()
    }

    /// Session token, present only while signed in
    pub async fn token(&self) -> Option<SessionToken> {
        self.inner.lock().await.token.clone()
    }

    fn publish(&self, inner: &Inner) {
        self.state_tx.send_replace(inner.snapshot());
    }

    fn clear_session(&self) {
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, code = e.error_code(), "Failed to clear session");
        }
    }

    /// Apply a wallet address event.
    ///
    /// Returns a ticket when a challenge prefetch should follow. The session
    /// is always cleared before a ticket is handed out.
    pub async fn apply_address(&self, address: Option<WalletAddress>) -> Option<ChallengeTicket> {
        let mut inner = self.inner.lock().await;

        if inner.address != address {
            tracing::info!(
                from = ?inner.address,
                to = ?address,
                state = inner.state.as_str(),
                "Wallet address changed"
            );
            inner.epoch += 1;
            inner.address = address;
            inner.challenge = None;
            inner.token = None;
            inner.state = AuthState::SignedOut;
        }

        if inner.state != AuthState::SignedIn {
            self.clear_session();
        }

        let ticket = match inner.address.clone() {
            Some(address)
                if inner.state == AuthState::SignedOut && inner.challenge.is_none() =>
            {
                let ticket = inner.ticket(address);
                inner.state = AuthState::AwaitingChallenge;
                Some(ticket)
            }
            _ => None,
        };

        self.publish(&inner);
        ticket
    }

    /// Fetch and cache a challenge ahead of the user's sign-in
    pub async fn prefetch_challenge(&self, ticket: ChallengeTicket) {
        let result = self.api.request_challenge(&ticket.address).await;

        let mut inner = self.inner.lock().await;
        if !inner.is_current(&ticket) || inner.state != AuthState::AwaitingChallenge {
            tracing::debug!(address = %ticket.address, "Discarding stale challenge");
            return;
        }

        match result {
            Ok(challenge) => {
                tracing::debug!(
                    address = %ticket.address,
                    challenge_id = %challenge.challenge_id,
                    "Challenge cached"
                );
                inner.challenge = Some(challenge);
            }
            Err(e) => {
                tracing::warn!(
                    address = %ticket.address,
                    error = %e,
                    code = e.error_code(),
                    "Challenge request failed"
                );
            }
        }
        inner.state = AuthState::SignedOut;
        self.publish(&inner);
    }

    /// Apply an address event and run the resulting prefetch inline
    pub async fn on_address_changed(&self, address: Option<WalletAddress>) {
        if let Some(ticket) = self.apply_address(address).await {
            self.prefetch_challenge(ticket).await;
        }
    }

    /// Follow the wallet's address until its channel closes.
    ///
    /// Prefetches are spawned so a later address change is applied without
    /// waiting on the network.
    pub async fn run(self: Arc<Self>) {
        let mut addresses = self.wallet.subscribe();

        loop {
            let address = addresses.borrow_and_update().clone();
            if let Some(ticket) = self.apply_address(address).await {
                let machine = Arc::clone(&self);
                tokio::spawn(async move {
                    machine.prefetch_challenge(ticket).await;
                });
            }

            if addresses.changed().await.is_err() {
                tracing::info!("Wallet address channel closed");
                break;
            }
        }
    }

    /// User-initiated sign-in
    pub async fn sign_in(&self) -> SignInOutcome {
        let (ticket, cached) = {
            let mut inner = self.inner.lock().await;
            let Some(address) = inner.address.clone() else {
                return SignInOutcome::NoWallet;
            };
            if inner.state == AuthState::SignedIn {
                return SignInOutcome::AlreadySignedIn;
            }

            inner.attempt += 1;
            let cached = inner.challenge.take();
            inner.state = if cached.is_some() {
                AuthState::Signing
            } else {
                AuthState::AwaitingChallenge
            };
            self.publish(&inner);
            (inner.ticket(address), cached)
        };

        tracing::info!(address = %ticket.address, "Sign-in started");

        let challenge = match cached {
            Some(challenge) => challenge,
            None => {
                let result = self.api.request_challenge(&ticket.address).await;
                match self.advance(&ticket, result, AuthState::Signing).await {
                    Ok(challenge) => challenge,
                    Err(outcome) => return outcome,
                }
            }
        };

        let signed = self
            .wallet
            .sign(&challenge.message)
            .await
            .map_err(AuthError::from);
        let signature = match self.advance(&ticket, signed, AuthState::Verifying).await {
            Ok(signature) => signature,
            Err(outcome) => return outcome,
        };

        let verified = self.api.verify(&signature, &challenge.challenge_id).await;

        let mut inner = self.inner.lock().await;
        if !inner.is_current(&ticket) {
            tracing::debug!(address = %ticket.address, "Discarding stale verification");
            return SignInOutcome::Superseded;
        }

        let outcome = match verified.and_then(|token| {
            self.store.save(&ticket.address, &token)?;
            Ok(token)
        }) {
            Ok(token) => {
                tracing::info!(
                    address = %ticket.address,
                    token = %token.fingerprint(),
                    "Signed in"
                );
                inner.token = Some(token.clone());
                inner.state = AuthState::SignedIn;
                SignInOutcome::SignedIn(token)
            }
            Err(e) => {
                if matches!(e, AuthError::Storage(_)) {
                    self.clear_session();
                }
                tracing::warn!(
                    address = %ticket.address,
                    error = %e,
                    code = e.error_code(),
                    "Sign-in failed"
                );
                inner.state = AuthState::SignedOut;
                SignInOutcome::Failed(e)
            }
        };
        self.publish(&inner);
        outcome
    }

    /// Move to `next` if `result` is current and successful, otherwise settle
    async fn advance<T>(
        &self,
        ticket: &ChallengeTicket,
        result: Result<T, AuthError>,
        next: AuthState,
    ) -> Result<T, SignInOutcome> {
        let mut inner = self.inner.lock().await;
        if !inner.is_current(ticket) {
            tracing::debug!(address = %ticket.address, "Discarding stale sign-in step");
            return Err(SignInOutcome::Superseded);
        }

        let outcome = match result {
            Ok(value) => {
                inner.state = next;
                Ok(value)
            }
            Err(e) => {
                tracing::warn!(
                    address = %ticket.address,
                    error = %e,
                    code = e.error_code(),
                    "Sign-in failed"
                );
                inner.state = AuthState::SignedOut;
                Err(SignInOutcome::Failed(e))
            }
        };
        self.publish(&inner);
        outcome
    }

    /// Drop the session and any in-flight attempt
    pub async fn sign_out(&self) {
        let mut inner = self.inner.lock().await;
        inner.attempt += 1;
        inner.challenge = None;
        inner.token = None;
        inner.state = AuthState::SignedOut;
        self.clear_session();
        tracing::info!(address = ?inner.address, "Signed out");
        self.publish(&inner);
    }
}
