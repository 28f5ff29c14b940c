//! Ed25519 digital signatures for peer identities.
//!
//! Provides the Ed25519 implementation of the [`keys`](crate::keys) traits:
//! - 64-byte signatures
//! - 32-byte public keys
//! - 32-byte private keys (seed form, zeroized on drop)
//! - Deterministic signature generation
//!
//! ## Usage
//!
//! ```
//! use disturbdb_crypto::{Ed25519PrivateKey, PrivateKey, PublicKey};
//! use rand_core::OsRng;
//!
//! let private_key = Ed25519PrivateKey::generate(&mut OsRng).unwrap();
//! let public_key = private_key.public_key();
//!
//! let message = b"authenticate this message";
//! let signature = private_key.sign(message);
//!
//! assert!(public_key.verify(message, &signature));
//! ```

use crate::keys::{PrivateKey, PublicKey, Signature};
use crate::{CryptoError, ED25519_PUBLIC_KEY_SIZE, ED25519_SECRET_KEY_SIZE, ED25519_SIGNATURE_SIZE};
use ed25519_dalek::{Signer, Verifier};
use rand_core::{CryptoRng, RngCore};
use std::fmt;
use std::hash::{Hash, Hasher};
use zeroize::{ZeroizeOnDrop, Zeroizing};

const SCHEME: &str = "ed25519";

/// Ed25519 signature (64 bytes)
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Ed25519Signature([u8; ED25519_SIGNATURE_SIZE]);

impl Ed25519Signature {
    /// Create a signature from raw bytes
    #[must_use]
    pub fn from_bytes(bytes: [u8; ED25519_SIGNATURE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw signature bytes
    #[must_use]
    pub fn to_bytes(&self) -> [u8; ED25519_SIGNATURE_SIZE] {
        self.0
    }

    fn to_dalek(self) -> ed25519_dalek::Signature {
        ed25519_dalek::Signature::from_bytes(&self.0)
    }
}

impl Signature for Ed25519Signature {
    const SCHEME: &'static str = SCHEME;
    const SIZE: usize = ED25519_SIGNATURE_SIZE;

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != ED25519_SIGNATURE_SIZE {
            return Err(CryptoError::InvalidSignatureType {
                scheme: SCHEME,
                expected: ED25519_SIGNATURE_SIZE,
                actual: bytes.len(),
            });
        }
        let mut out = [0u8; ED25519_SIGNATURE_SIZE];
        out.copy_from_slice(bytes);
        Ok(Self(out))
    }
}

impl fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Signature({})", hex::encode(&self.0[..8]))
    }
}

impl fmt::Display for Ed25519Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Ed25519 private key
///
/// Contains the secret seed used for signing.
/// Zeroized on drop to prevent key material from lingering in memory.
#[derive(ZeroizeOnDrop)]
pub struct Ed25519PrivateKey {
    inner: ed25519_dalek::SigningKey,
}

impl Ed25519PrivateKey {
    /// Create from raw 32-byte seed
    #[must_use]
    pub fn from_bytes(bytes: &[u8; ED25519_SECRET_KEY_SIZE]) -> Self {
        Self {
            inner: ed25519_dalek::SigningKey::from_bytes(bytes),
        }
    }
}

impl PrivateKey for Ed25519PrivateKey {
    type PublicKey = Ed25519PublicKey;
    const SIZE: usize = ED25519_SECRET_KEY_SIZE;

    fn generate<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> Result<Self, CryptoError> {
        let mut seed = Zeroizing::new([0u8; ED25519_SECRET_KEY_SIZE]);
        rng.try_fill_bytes(seed.as_mut())
            .map_err(|e| CryptoError::RandomSource(e.to_string()))?;
        Ok(Self::from_bytes(&seed))
    }

    fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let seed: &[u8; ED25519_SECRET_KEY_SIZE] =
            bytes.try_into().map_err(|_| CryptoError::InvalidKeySize {
                expected: ED25519_SECRET_KEY_SIZE,
                actual: bytes.len(),
            })?;
        Ok(Self::from_bytes(seed))
    }

    fn to_hex(&self) -> Zeroizing<String> {
        let seed = Zeroizing::new(self.inner.to_bytes());
        Zeroizing::new(hex::encode(seed.as_ref()))
    }

    fn sign(&self, data: &[u8]) -> Ed25519Signature {
        Ed25519Signature(self.inner.sign(data).to_bytes())
    }

    fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey {
            inner: self.inner.verifying_key(),
        }
    }
}

impl fmt::Debug for Ed25519PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ed25519PrivateKey")
            .field("public", &self.public_key())
            .finish_non_exhaustive()
    }
}

/// Ed25519 public key
///
/// Used to verify signatures created by the corresponding private key.
/// Can be safely shared publicly.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Ed25519PublicKey {
    inner: ed25519_dalek::VerifyingKey,
}

impl Ed25519PublicKey {
    /// Create from raw 32-byte public key
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidPublicKey`] if the bytes do not
    /// represent a valid Ed25519 public key point.
    pub fn from_bytes(bytes: &[u8; ED25519_PUBLIC_KEY_SIZE]) -> Result<Self, CryptoError> {
        let inner = ed25519_dalek::VerifyingKey::from_bytes(bytes)
            .map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self { inner })
    }

    /// Get the raw public key bytes
    #[must_use]
    pub fn to_bytes(&self) -> [u8; ED25519_PUBLIC_KEY_SIZE] {
        self.inner.to_bytes()
    }
}

impl PublicKey for Ed25519PublicKey {
    type Signature = Ed25519Signature;
    const SCHEME: &'static str = SCHEME;
    const SIZE: usize = ED25519_PUBLIC_KEY_SIZE;

    fn as_bytes(&self) -> &[u8] {
        self.inner.as_bytes()
    }

    fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let key: &[u8; ED25519_PUBLIC_KEY_SIZE] =
            bytes.try_into().map_err(|_| CryptoError::InvalidKeySize {
                expected: ED25519_PUBLIC_KEY_SIZE,
                actual: bytes.len(),
            })?;
        Self::from_bytes(key)
    }

    fn verify(&self, data: &[u8], signature: &Ed25519Signature) -> bool {
        self.inner.verify(data, &signature.to_dalek()).is_ok()
    }
}

impl Hash for Ed25519PublicKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.as_bytes().hash(state);
    }
}

impl fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519PublicKey({})", self.to_hex())
    }
}

impl fmt::Display for Ed25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
