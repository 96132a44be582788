//! Wallet collaborator
//!
//! The sign-in flow only needs four things from a wallet: the connected
//! address (and a way to be told when it changes), the chain it is on,
//! a network switch, and message signing.

mod local;

pub use local::LocalWallet;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;

use crate::models::{Signature, WalletAddress};

/// Errors reported by a wallet
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("User rejected the request")]
    Rejected,

    #[error("No wallet connected")]
    NotConnected,

    #[error("Unsupported network: {0}")]
    Unsupported(u64),

    #[error("Wallet error: {0}")]
    Other(String),
}

#[async_trait]
pub trait Wallet: Send + Sync {
    /// Currently connected address, if any
    fn address(&self) -> Option<WalletAddress>;

    /// Receiver notified on every connect, disconnect and account switch
    fn subscribe(&self) -> watch::Receiver<Option<WalletAddress>>;

    /// Chain the wallet is connected to, if any
    fn chain_id(&self) -> Option<u64>;

    async fn switch_network(&self, chain_id: u64) -> Result<(), WalletError>;

    /// Sign a human-readable message. May wait indefinitely on the user.
    async fn sign(&self, message: &str) -> Result<Signature, WalletError>;
}

/// Detects a wallet connected to the wrong chain and switches it
#[derive(Debug, Clone, Copy)]
pub struct NetworkGuard {
    required_chain_id: u64,
}

impl NetworkGuard {
    pub fn new(required_chain_id: u64) -> Self {
        Self { required_chain_id }
    }

    pub fn required_chain_id(&self) -> u64 {
        self.required_chain_id
    }

    /// True only when a wallet is connected on a different chain
    pub fn is_mismatched(&self, wallet: &dyn Wallet) -> bool {
        match (wallet.address(), wallet.chain_id()) {
            (Some(_), Some(chain_id)) => chain_id != self.required_chain_id,
            _ => false,
        }
    }

    pub async fn switch(&self, wallet: &dyn Wallet) -> Result<(), WalletError> {
        tracing::info!(chain_id = self.required_chain_id, "Requesting network switch");
        wallet.switch_network(self.required_chain_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_network_guard() {
        let guard = NetworkGuard::new(80001);
        let wallet = LocalWallet::generate(137);

        // Disconnected wallets are never mismatched
        assert!(!guard.is_mismatched(&wallet));

        wallet.connect();
        assert!(guard.is_mismatched(&wallet));

        guard.switch(&wallet).await.unwrap();
        assert!(!guard.is_mismatched(&wallet));
        assert_eq!(wallet.chain_id(), Some(80001));
    }

    #[tokio::test]
    async fn test_switch_requires_connection() {
        let guard = NetworkGuard::new(80001);
        let wallet = LocalWallet::generate(137);
        assert_eq!(guard.switch(&wallet).await, Err(WalletError::NotConnected));
    }
}
