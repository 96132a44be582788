//! In-process ed25519 wallet for development and tests

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;
use tokio::sync::watch;

use super::{Wallet, WalletError};
use crate::models::{Signature, WalletAddress};

/// Wallet holding its signing key in memory.
///
/// The address is `0x` followed by the hex-encoded public key, and
/// signatures are base64-encoded 64-byte ed25519 signatures.
pub struct LocalWallet {
    key: RwLock<SigningKey>,
    chain_id: u64,
    connected_chain: watch::Sender<Option<u64>>,
    address_tx: watch::Sender<Option<WalletAddress>>,
    reject_signing: AtomicBool,
}

impl LocalWallet {
    /// Disconnected wallet around an existing key
    pub fn new(key: SigningKey, chain_id: u64) -> Self {
        let (address_tx, _) = watch::channel(None);
        let (connected_chain, _) = watch::channel(None);
        Self {
            key: RwLock::new(key),
            chain_id,
            connected_chain,
            address_tx,
            reject_signing: AtomicBool::new(false),
        }
    }

    /// Disconnected wallet with a fresh random key
    pub fn generate(chain_id: u64) -> Self {
        Self::new(SigningKey::generate(&mut OsRng), chain_id)
    }

    /// Address derived from a signing key
    pub fn address_for(key: &SigningKey) -> WalletAddress {
        WalletAddress::new(format!("0x{}", hex::encode(key.verifying_key().to_bytes())))
    }

    pub fn connect(&self) {
        let address = self.key.read().ok().map(|key| Self::address_for(&key));
        tracing::debug!(address = ?address, "Local wallet connected");
        self.connected_chain.send_replace(Some(self.chain_id));
        self.address_tx.send_replace(address);
    }

    pub fn disconnect(&self) {
        tracing::debug!("Local wallet disconnected");
        self.connected_chain.send_replace(None);
        self.address_tx.send_replace(None);
    }

    /// Replace the key. A connected wallet announces the new address.
    pub fn switch_account(&self, key: SigningKey) -> Result<WalletAddress, WalletError> {
        let address = Self::address_for(&key);
        let mut current = self
            .key
            .write()
            .map_err(|_| WalletError::Other("Key lock poisoned".to_string()))?;
        *current = key;
        drop(current);

        if self.address_tx.borrow().is_some() {
            self.address_tx.send_replace(Some(address.clone()));
        }
        Ok(address)
    }

    /// Make every following `sign` call fail as if the user declined
    pub fn set_reject_signing(&self, reject: bool) {
        self.reject_signing.store(reject, Ordering::SeqCst);
    }
}

#[async_trait]
impl Wallet for LocalWallet {
    fn address(&self) -> Option<WalletAddress> {
        self.address_tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<WalletAddress>> {
        self.address_tx.subscribe()
    }

    fn chain_id(&self) -> Option<u64> {
        *self.connected_chain.borrow()
    }

    async fn switch_network(&self, chain_id: u64) -> Result<(), WalletError> {
        if self.address().is_none() {
            return Err(WalletError::NotConnected);
        }
        self.connected_chain.send_replace(Some(chain_id));
        Ok(())
    }

    async fn sign(&self, message: &str) -> Result<Signature, WalletError> {
        if self.address().is_none() {
            return Err(WalletError::NotConnected);
        }
        if self.reject_signing.load(Ordering::SeqCst) {
            return Err(WalletError::Rejected);
        }

        let key = self
            .key
            .read()
            .map_err(|_| WalletError::Other("Key lock poisoned".to_string()))?;
        let signature = key.sign(message.as_bytes());
        Ok(Signature::new(STANDARD.encode(signature.to_bytes())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::Verifier;

    #[tokio::test]
    async fn test_connect_publishes_address() {
        let wallet = LocalWallet::generate(80001);
        let mut rx = wallet.subscribe();
        assert!(wallet.address().is_none());

        wallet.connect();
        rx.changed().await.unwrap();
        let address = rx.borrow().clone().unwrap();
        assert!(address.as_str().starts_with("0x"));
        assert_eq!(address.as_str().len(), 66);

        wallet.disconnect();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_none());
    }

    #[tokio::test]
    async fn test_sign_produces_verifiable_signature() {
        let key = SigningKey::generate(&mut OsRng);
        let verifying_key = key.verifying_key();
        let wallet = LocalWallet::new(key, 80001);
        wallet.connect();

        let signature = wallet.sign("I agreec1").await.unwrap();
        let bytes = STANDARD.decode(signature.as_str()).unwrap();
        let signature = ed25519_dalek::Signature::from_slice(&bytes).unwrap();
        assert!(verifying_key.verify(b"I agreec1", &signature).is_ok());
    }

    #[tokio::test]
    async fn test_sign_requires_connection_and_consent() {
        let wallet = LocalWallet::generate(80001);
        assert_eq!(wallet.sign("msg").await, Err(WalletError::NotConnected));

        wallet.connect();
        wallet.set_reject_signing(true);
        assert_eq!(wallet.sign("msg").await, Err(WalletError::Rejected));
    }

    #[tokio::test]
    async fn test_switch_account_while_connected() {
        let wallet = LocalWallet::generate(80001);
        wallet.connect();
        let before = wallet.address().unwrap();

        let after = wallet
            .switch_account(SigningKey::generate(&mut OsRng))
            .unwrap();
        assert_ne!(before, after);
        assert_eq!(wallet.address(), Some(after));
    }
}
