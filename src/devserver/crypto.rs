//! Wallet signature verification
//!
//! Checks ed25519 signatures from wallets whose address is `0x` followed
//! by the hex-encoded public key.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use thiserror::Error;

/// Errors that can occur during signature verification
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Invalid wallet address format: {0}")]
    InvalidAddressFormat(String),

    #[error("Invalid signature format: {0}")]
    InvalidSignatureFormat(String),

    #[error("Signature verification failed")]
    VerificationFailed,

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),
}

/// Verify a base64 signature over `message` made by the key behind `address`
pub fn verify_wallet_signature(
    address: &str,
    message: &str,
    signature_base64: &str,
) -> Result<(), CryptoError> {
    let public_key_bytes = decode_wallet_address(address)?;

    let signature_bytes = STANDARD
        .decode(signature_base64.trim())
        .map_err(|e| CryptoError::InvalidSignatureFormat(e.to_string()))?;

    let signature = Signature::from_slice(&signature_bytes)
        .map_err(|e| CryptoError::InvalidSignatureFormat(e.to_string()))?;

    let verifying_key = VerifyingKey::from_bytes(&public_key_bytes)
        .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;

    verifying_key
        .verify(message.as_bytes(), &signature)
        .map_err(|_| CryptoError::VerificationFailed)
}

/// Decode the 32-byte public key from a `0x` address
fn decode_wallet_address(address: &str) -> Result<[u8; 32], CryptoError> {
    let hex_part = address.strip_prefix("0x").ok_or_else(|| {
        CryptoError::InvalidAddressFormat("Wallet addresses must start with '0x'".to_string())
    })?;

    let decoded = hex::decode(hex_part)
        .map_err(|e| CryptoError::InvalidAddressFormat(e.to_string()))?;

    decoded.try_into().map_err(|bytes: Vec<u8>| {
        CryptoError::InvalidAddressFormat(format!("Expected 32 bytes, got {}", bytes.len()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};
    use rand::rngs::OsRng;

    fn signed(message: &str) -> (String, String) {
        let key = SigningKey::generate(&mut OsRng);
        let address = format!("0x{}", hex::encode(key.verifying_key().to_bytes()));
        let signature = STANDARD.encode(key.sign(message.as_bytes()).to_bytes());
        (address, signature)
    }

    #[test]
    fn test_valid_signature() {
        let (address, signature) = signed("I agreec1");
        assert!(verify_wallet_signature(&address, "I agreec1", &signature).is_ok());
    }

    #[test]
    fn test_signature_over_other_message() {
        let (address, signature) = signed("I agreec1");
        let result = verify_wallet_signature(&address, "I agreec2", &signature);
        assert!(matches!(result, Err(CryptoError::VerificationFailed)));
    }

    #[test]
    fn test_invalid_address_format() {
        let (_, signature) = signed("msg");
        let result = verify_wallet_signature("GABC", "msg", &signature);
        assert!(matches!(result, Err(CryptoError::InvalidAddressFormat(_))));

        let result = verify_wallet_signature("0xabcd", "msg", &signature);
        assert!(matches!(result, Err(CryptoError::InvalidAddressFormat(_))));
    }

    #[test]
    fn test_invalid_signature_format() {
        let (address, _) = signed("msg");
        let result = verify_wallet_signature(&address, "msg", "not base64!");
        assert!(matches!(result, Err(CryptoError::InvalidSignatureFormat(_))));
    }
}
