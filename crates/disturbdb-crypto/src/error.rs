//! Cryptographic error types.

use thiserror::Error;

/// Cryptographic errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// The random source could not supply enough entropy
    #[error("random source failed: {0}")]
    RandomSource(String),

    /// Hex input could not be decoded
    #[error("failed to decode hex: {0}")]
    Decode(String),

    /// Decoded key has the wrong length for the scheme
    #[error("invalid key size: expected {expected} bytes, got {actual}")]
    InvalidKeySize {
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Signature value is not compatible with the verifying key's scheme
    #[error("invalid signature type: expected {expected} bytes for {scheme}, got {actual}")]
    InvalidSignatureType {
        /// Scheme name of the verifying key
        scheme: &'static str,
        /// Signature length for that scheme
        expected: usize,
        /// Length that was supplied
        actual: usize,
    },

    /// Bytes do not describe a valid public key point
    #[error("invalid public key")]
    InvalidPublicKey,

    /// JSON encoding failed
    #[error("json encoding failed: {0}")]
    Json(String),
}

impl From<hex::FromHexError> for CryptoError {
    fn from(err: hex::FromHexError) -> Self {
        CryptoError::Decode(err.to_string())
    }
}

impl From<serde_json::Error> for CryptoError {
    fn from(err: serde_json::Error) -> Self {
        CryptoError::Json(err.to_string())
    }
}
