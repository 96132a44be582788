//! Session persistence
//!
//! The authenticated `(address, token)` pair lives under two fixed keys of
//! a [`KeyValueStorage`]. Writes come only from the auth state machine.

mod storage;

pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};

use crate::config::Config;
use crate::error::AuthResult;
use crate::models::{SessionToken, WalletAddress};

pub const ADDRESS_KEY: &str = "address";
pub const TOKEN_KEY: &str = "token";

/// Persisted sign-in session
pub struct SessionStore {
    storage: Box<dyn KeyValueStorage>,
}

impl SessionStore {
    pub fn new(storage: impl KeyValueStorage + 'static) -> Self {
        Self {
            storage: Box::new(storage),
        }
    }

    /// In-memory session store
    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::new())
    }

    /// File-backed when `SESSION_FILE` is configured, in-memory otherwise
    pub fn from_config(config: &Config) -> Self {
        match &config.session_file {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Using file session storage");
                Self::new(FileStorage::new(path))
            }
            None => Self::in_memory(),
        }
    }

    /// Previously persisted pair, if both halves are present and the token is non-empty
    pub fn load(&self) -> AuthResult<Option<(WalletAddress, SessionToken)>> {
        let address = self.storage.get(ADDRESS_KEY)?;
        let token = self.storage.get(TOKEN_KEY)?;

        Ok(match (address, token) {
            (Some(address), Some(token)) if !token.is_empty() => {
                Some((WalletAddress::from(address), SessionToken::from(token.as_str())))
            }
            _ => None,
        })
    }

    /// Overwrite the persisted pair
    pub fn save(&self, address: &WalletAddress, token: &SessionToken) -> AuthResult<()> {
        self.storage.set(ADDRESS_KEY, address.as_str())?;
        self.storage.set(TOKEN_KEY, token.as_str())
    }

    /// Remove both persisted keys. The token goes first.
    pub fn clear(&self) -> AuthResult<()> {
        self.storage.remove(TOKEN_KEY)?;
        self.storage.remove(ADDRESS_KEY)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_load_clear() {
        let store = SessionStore::in_memory();
        assert!(store.load().unwrap().is_none());

        let address = WalletAddress::from("0xA1");
        let token = SessionToken::from("tokA1");
        store.save(&address, &token).unwrap();

        let (loaded_address, loaded_token) = store.load().unwrap().unwrap();
        assert_eq!(loaded_address, address);
        assert_eq!(loaded_token, token);

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_address_without_token_is_not_a_session() {
        let storage = MemoryStorage::new();
        storage.set(ADDRESS_KEY, "0xA1").unwrap();
        let store = SessionStore::new(storage);
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_empty_token_is_not_a_session() {
        let storage = MemoryStorage::new();
        storage.set(ADDRESS_KEY, "0xA1").unwrap();
        storage.set(TOKEN_KEY, "").unwrap();
        let store = SessionStore::new(storage);
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_overwrites() {
        let store = SessionStore::in_memory();
        store
            .save(&WalletAddress::from("0xA1"), &SessionToken::from("tokA1"))
            .unwrap();
        store
            .save(&WalletAddress::from("0xB2"), &SessionToken::from("tokB2"))
            .unwrap();

        let (address, token) = store.load().unwrap().unwrap();
        assert_eq!(address.as_str(), "0xB2");
        assert_eq!(token.as_str(), "tokB2");
    }
}
