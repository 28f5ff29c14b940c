//! Peer identity records.
//!
//! A [`PeerId`] binds a public key to the host and port the peer listens on.
//! It is exchanged during the handshake as a fixed-size record:
//!
//! ```text
//! ┌──────────────────┬──────────────────────┬──────────────┐
//! │ public key (K)   │ host (16, IPv6 form) │ port (2, BE) │
//! └──────────────────┴──────────────────────┴──────────────┘
//! ```
//!
//! IPv4 hosts are written as IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`)
//! and decode back to their IPv4 form, so a record always round-trips.
//!
//! Loopback and unspecified hosts are not identifying: [`PeerId::address`]
//! renders them with an empty host and [`PeerId::registry_key`] refuses them.

use crate::error::{DecodeError, Error};
use disturbdb_crypto::{Ed25519PublicKey, PublicKey};
use serde::Serialize;
use std::fmt;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};

/// Encoded host size (always IPv6 form)
pub const HOST_SIZE: usize = 16;

/// Encoded port size
pub const PORT_SIZE: usize = 2;

/// Identity of a peer: public key plus listening address.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PeerId<K: PublicKey = Ed25519PublicKey> {
    public_key: K,
    host: IpAddr,
    port: u16,
}

#[derive(Serialize)]
struct PeerIdJson {
    public_key: String,
    address: String,
}

impl<K: PublicKey> PeerId<K> {
    /// Create a peer identity.
    ///
    /// IPv4-mapped IPv6 hosts are stored in their IPv4 form.
    pub fn new(public_key: K, host: IpAddr, port: u16) -> Self {
        Self {
            public_key,
            host: host.to_canonical(),
            port,
        }
    }

    /// Create a peer identity from a socket address
    pub fn from_socket_addr(public_key: K, addr: SocketAddr) -> Self {
        Self::new(public_key, addr.ip(), addr.port())
    }

    /// Public key of the peer
    pub fn public_key(&self) -> &K {
        &self.public_key
    }

    /// Host the peer listens on
    pub fn host(&self) -> IpAddr {
        self.host
    }

    /// Port the peer listens on
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Host and port as a socket address
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Encoded record size for key type `K`
    pub const fn encoded_len() -> usize {
        K::SIZE + HOST_SIZE + PORT_SIZE
    }

    /// Encoded size of this record in bytes
    pub fn size(&self) -> usize {
        Self::encoded_len()
    }

    /// Append the binary record to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        let host = match self.host {
            IpAddr::V4(v4) => v4.to_ipv6_mapped(),
            IpAddr::V6(v6) => v6,
        };

        out.reserve(Self::encoded_len());
        out.extend_from_slice(self.public_key.as_bytes());
        out.extend_from_slice(&host.octets());
        out.extend_from_slice(&self.port.to_be_bytes());
    }

    /// Encode into a freshly allocated buffer
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::encoded_len());
        self.encode(&mut out);
        out
    }

    /// Decode a record from untrusted bytes.
    ///
    /// Bytes past the fixed record length are ignored. Routability of the
    /// decoded host is not checked here.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::TruncatedInput`] if `bytes` is shorter than
    /// [`Self::encoded_len`] and [`DecodeError::PublicKey`] if the key bytes
    /// are not a valid key.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let expected = Self::encoded_len();
        if bytes.len() < expected {
            return Err(DecodeError::TruncatedInput {
                expected,
                actual: bytes.len(),
            });
        }

        let (key_bytes, rest) = bytes.split_at(K::SIZE);
        let public_key = K::from_slice(key_bytes)?;

        let mut host = [0u8; HOST_SIZE];
        host.copy_from_slice(&rest[..HOST_SIZE]);
        let port = u16::from_be_bytes([rest[HOST_SIZE], rest[HOST_SIZE + 1]]);

        Ok(Self::new(public_key, IpAddr::V6(Ipv6Addr::from(host)), port))
    }

    /// Canonical `host:port` string.
    ///
    /// IPv6 hosts are bracketed. Loopback and unspecified hosts render as an
    /// empty host (`":3000"`).
    pub fn address(&self) -> String {
        match normalize_ip(self.host) {
            Some(ip) => SocketAddr::new(ip, self.port).to_string(),
            None => format!(":{}", self.port),
        }
    }

    /// Whether the host identifies a reachable peer
    pub fn is_routable(&self) -> bool {
        normalize_ip(self.host).is_some()
    }

    /// Key under which a connection to this peer is registered.
    ///
    /// `None` for non-identifying (loopback or unspecified) hosts.
    pub fn registry_key(&self) -> Option<String> {
        self.is_routable().then(|| self.address())
    }

    /// Human readable JSON form: `{"public_key":"<hex>","address":"<host>:<port>"}`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String, Error> {
        let rep = PeerIdJson {
            public_key: self.public_key.to_hex(),
            address: self.address(),
        };
        Ok(serde_json::to_string(&rep)?)
    }
}

impl<K: PublicKey> fmt::Debug for PeerId<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerId")
            .field("public_key", &self.public_key.to_hex())
            .field("address", &self.address())
            .finish()
    }
}

impl<K: PublicKey> fmt::Display for PeerId<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = self.public_key.to_hex();
        write!(f, "{}@{}", &key[..key.len().min(16)], self.address())
    }
}

/// Normalize an IP for use in peer addresses.
///
/// IPv4-mapped addresses become IPv4. Loopback and unspecified addresses are
/// not identifying and yield `None`.
pub fn normalize_ip(ip: IpAddr) -> Option<IpAddr> {
    let ip = ip.to_canonical();
    if ip.is_loopback() || ip.is_unspecified() {
        None
    } else {
        Some(ip)
    }
}

/// Resolve `host:port` through the system resolver to a canonical address.
///
/// # Errors
///
/// Returns [`Error::Address`] if the address cannot be resolved and
/// [`Error::Unroutable`] if it resolves to a loopback or unspecified host.
pub async fn resolve_address(address: &str) -> Result<String, Error> {
    let resolved = tokio::net::lookup_host(address)
        .await
        .map_err(|e| Error::Address(format!("failed to resolve {address}: {e}")))?
        .next()
        .ok_or_else(|| Error::Address(format!("no addresses found for {address}")))?;

    match normalize_ip(resolved.ip()) {
        Some(ip) => Ok(SocketAddr::new(ip, resolved.port()).to_string()),
        None => Err(Error::Unroutable(resolved)),
    }
}
