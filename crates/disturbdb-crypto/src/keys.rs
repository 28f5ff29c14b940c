//! Capability traits for signature schemes.
//!
//! A scheme is described by three types: a private key that signs, a public
//! key that verifies, and the signature value passed between them. The
//! associated types tie the three together so a key can only be asked to
//! verify signatures from its own scheme; raw signature bytes arriving from
//! the network go through [`PublicKey::verify_bytes`], which reports
//! [`CryptoError::InvalidSignatureType`] for values that cannot belong to the
//! scheme.
//!
//! All string forms are lowercase hex of the raw bytes, and the JSON form is
//! that hex string quoted.

use crate::CryptoError;
use rand_core::{CryptoRng, RngCore};
use std::fmt::Debug;
use std::hash::Hash;
use zeroize::Zeroizing;

/// A fixed-size signature value.
pub trait Signature: Clone + Debug + Eq + Send + Sync + 'static {
    /// Human readable scheme name
    const SCHEME: &'static str;

    /// Encoded size in bytes
    const SIZE: usize;

    /// Raw signature bytes
    fn as_bytes(&self) -> &[u8];

    /// Copy a signature out of a byte slice.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidSignatureType`] if the slice length does
    /// not match [`Self::SIZE`].
    fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError>;

    /// Lowercase hex encoding
    fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }

    /// JSON encoding (a quoted hex string)
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Json`] if serialization fails.
    fn to_json(&self) -> Result<String, CryptoError> {
        Ok(serde_json::to_string(&self.to_hex())?)
    }
}

/// A public (verifying) key.
pub trait PublicKey: Clone + Debug + Eq + Hash + Send + Sync + 'static {
    /// Signature type produced by the matching private key
    type Signature: Signature;

    /// Human readable scheme name
    const SCHEME: &'static str;

    /// Encoded size in bytes
    const SIZE: usize;

    /// Raw key bytes
    fn as_bytes(&self) -> &[u8];

    /// Copy a public key out of a byte slice.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeySize`] on a length mismatch and
    /// [`CryptoError::InvalidPublicKey`] if the bytes are not a valid key.
    fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError>;

    /// Verify `signature` over `data`.
    ///
    /// A well-formed signature that does not match yields `false`.
    fn verify(&self, data: &[u8], signature: &Self::Signature) -> bool;

    /// Verify a signature supplied as raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidSignatureType`] if `signature` cannot be
    /// a signature of this scheme. A mismatching signature is `Ok(false)`.
    fn verify_bytes(&self, data: &[u8], signature: &[u8]) -> Result<bool, CryptoError> {
        let signature = Self::Signature::from_slice(signature)?;
        Ok(self.verify(data, &signature))
    }

    /// Lowercase hex encoding
    fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }

    /// Parse a hex encoded public key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Decode`] on invalid hex, otherwise the errors of
    /// [`Self::from_slice`].
    fn from_hex(hex_str: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(hex_str)?;
        Self::from_slice(&bytes)
    }

    /// JSON encoding (a quoted hex string)
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Json`] if serialization fails.
    fn to_json(&self) -> Result<String, CryptoError> {
        Ok(serde_json::to_string(&self.to_hex())?)
    }
}

/// A private (signing) key.
pub trait PrivateKey: Send + Sync + Sized + 'static {
    /// Public key type derived from this private key
    type PublicKey: PublicKey;

    /// Encoded size in bytes
    const SIZE: usize;

    /// Generate a fresh key from `rng`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::RandomSource`] if `rng` cannot supply entropy.
    fn generate<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> Result<Self, CryptoError>;

    /// Copy a private key out of a byte slice.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeySize`] if the length does not match
    /// [`Self::SIZE`].
    fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError>;

    /// Load a private key from its hex encoding.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Decode`] on invalid hex and
    /// [`CryptoError::InvalidKeySize`] on a length mismatch.
    fn from_hex(hex_str: &str) -> Result<Self, CryptoError> {
        let bytes = Zeroizing::new(hex::decode(hex_str.trim())?);
        Self::from_slice(&bytes)
    }

    /// Export the secret as lowercase hex.
    ///
    /// # Security
    ///
    /// This exposes the raw secret key bytes.
    fn to_hex(&self) -> Zeroizing<String>;

    /// Sign `data`. Deterministic for a given key and message.
    fn sign(&self, data: &[u8]) -> <Self::PublicKey as PublicKey>::Signature;

    /// Derive the matching public key
    fn public_key(&self) -> Self::PublicKey;
}
