//! # disturbdb Crypto
//!
//! Cryptographic identity primitives for disturbdb peers.
//!
//! This crate provides:
//! - Capability traits for signature schemes ([`PrivateKey`], [`PublicKey`], [`Signature`])
//! - The Ed25519 implementation of those traits
//! - Hex / JSON encodings of keys and signatures
//! - Secure random number generation
//!
//! ## Cryptographic Suite
//!
//! | Function | Algorithm | Sizes |
//! |----------|-----------|-------|
//! | Signatures | Ed25519 | 32-byte keys, 64-byte signatures |
//! | Randomness | OS CSPRNG | N/A |

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod error;
pub mod keys;
pub mod random;
pub mod signatures;

pub use error::CryptoError;
pub use keys::{PrivateKey, PublicKey, Signature};
pub use signatures::{Ed25519PrivateKey, Ed25519PublicKey, Ed25519Signature};

/// Ed25519 public key size
pub const ED25519_PUBLIC_KEY_SIZE: usize = 32;

/// Ed25519 secret key size (seed form)
pub const ED25519_SECRET_KEY_SIZE: usize = 32;

/// Ed25519 signature size
pub const ED25519_SIGNATURE_SIZE: usize = 64;
