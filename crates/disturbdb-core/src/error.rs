//! Error types for the disturbdb codecs.

use std::net::SocketAddr;
use thiserror::Error;

/// Core codec and address errors
#[derive(Debug, Error)]
pub enum Error {
    /// Binary decoding error
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Cryptographic error
    #[error("crypto error: {0}")]
    Crypto(#[from] disturbdb_crypto::CryptoError),

    /// Frame announced a body larger than the receiver accepts
    #[error("frame of {size} bytes exceeds limit of {max} bytes")]
    FrameTooLarge {
        /// Declared body size
        size: usize,
        /// Configured limit
        max: usize,
    },

    /// Address could not be parsed or resolved
    #[error("address error: {0}")]
    Address(String),

    /// Address resolved to a loopback or unspecified host
    #[error("unroutable address: {0}")]
    Unroutable(SocketAddr),

    /// JSON encoding failed
    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Underlying stream failed
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors produced while decoding untrusted bytes
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Input shorter than the fixed layout requires
    #[error("truncated input: expected at least {expected} bytes, got {actual}")]
    TruncatedInput {
        /// Minimum number of bytes required
        expected: usize,
        /// Number of bytes supplied
        actual: usize,
    },

    /// Embedded public key was rejected
    #[error("invalid public key: {0}")]
    PublicKey(#[from] disturbdb_crypto::CryptoError),
}
