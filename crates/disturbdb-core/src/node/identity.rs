//! Identity management for disturbdb nodes
//!
//! An [`Identity`] is the long-lived signing key of a node. The node's
//! [`PeerId`] is derived from its public key and the address it advertises.
//!
//! # Example
//!
//! ```
//! use disturbdb_core::node::identity::Identity;
//!
//! let identity: Identity = Identity::generate().expect("Failed to generate identity");
//! let restored: Identity = Identity::from_hex_secret(&identity.to_hex_secret()).unwrap();
//! assert_eq!(identity.public_key(), restored.public_key());
//! ```

use crate::node::error::Result;
use crate::peer::PeerId;
use disturbdb_crypto::{Ed25519PrivateKey, PrivateKey, PublicKey};
use rand_core::{CryptoRng, OsRng, RngCore};
use std::fmt;
use std::net::SocketAddr;
use zeroize::Zeroizing;

/// Signature scheme used by nodes
pub type NodeKey = Ed25519PrivateKey;

/// Public key type of [`NodeKey`]
pub type NodePublicKey = <NodeKey as PrivateKey>::PublicKey;

/// Signature type of [`NodeKey`]
pub type NodeSignature = <NodePublicKey as PublicKey>::Signature;

/// Node identity holding the signing key
///
/// # Security
///
/// The private key is zeroized when the identity is dropped.
pub struct Identity<K: PrivateKey = NodeKey> {
    key: K,
    public_key: K::PublicKey,
}

impl<K: PrivateKey> Identity<K> {
    /// Generate a random identity from the OS CSPRNG
    ///
    /// # Errors
    ///
    /// Returns an error if key generation fails (e.g., insufficient entropy).
    pub fn generate() -> Result<Self> {
        Self::generate_with(&mut OsRng)
    }

    /// Generate an identity from a caller-supplied RNG
    ///
    /// # Errors
    ///
    /// Returns an error if `rng` cannot supply entropy.
    pub fn generate_with<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> Result<Self> {
        Ok(Self::from_key(K::generate(rng)?))
    }

    /// Wrap an existing private key
    pub fn from_key(key: K) -> Self {
        let public_key = key.public_key();
        Self { key, public_key }
    }

    /// Load an identity from a hex-encoded secret key
    ///
    /// # Errors
    ///
    /// Returns an error on invalid hex or a wrong key size.
    pub fn from_hex_secret(secret: &str) -> Result<Self> {
        Ok(Self::from_key(K::from_hex(secret)?))
    }

    /// Export the secret key as hex
    pub fn to_hex_secret(&self) -> Zeroizing<String> {
        self.key.to_hex()
    }

    /// Public key of this identity
    pub fn public_key(&self) -> &K::PublicKey {
        &self.public_key
    }

    /// Sign `data` with the identity key
    pub fn sign(&self, data: &[u8]) -> <K::PublicKey as PublicKey>::Signature {
        self.key.sign(data)
    }

    /// Peer record advertising `addr`
    pub fn peer_id(&self, addr: SocketAddr) -> PeerId<K::PublicKey> {
        PeerId::from_socket_addr(self.public_key.clone(), addr)
    }
}

impl<K: PrivateKey> fmt::Debug for Identity<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("public_key", &self.public_key.to_hex())
            .finish_non_exhaustive()
    }
}
