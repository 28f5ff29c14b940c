//! Error types for Node API
//!
//! Errors are categorized to support retry logic and proper error handling.
//!
//! # Error Categories
//!
//! - **Transient**: Temporary failures that may succeed on retry (network timeouts, full slots)
//! - **Permanent**: Failures that will not succeed without intervention (invalid config, protocol violations)
//! - **Retriable**: A subset of transient errors with specific retry semantics
//!
//! # Example
//!
//! ```no_run
//! use disturbdb_core::node::NodeError;
//!
//! fn handle_error(err: NodeError) {
//!     if err.is_transient() {
//!         // Consider retrying with backoff
//!         println!("Transient error, may retry: {}", err);
//!     } else {
//!         // Permanent failure, needs user intervention
//!         println!("Permanent error: {}", err);
//!     }
//! }
//! ```

use crate::node::slots::ConnectionDirection;
use std::borrow::Cow;
use thiserror::Error;

/// Errors that can occur in Node operations
#[derive(Debug, Error, Clone)]
pub enum NodeError {
    // ============ Transport Errors ============
    /// Transport operation failed
    #[error("Transport error: {0}")]
    Transport(Cow<'static, str>),

    /// Stream I/O error
    #[error("I/O error: {0}")]
    Io(String),

    /// Connection is closed
    #[error("Connection closed: {0}")]
    ConnectionClosed(Cow<'static, str>),

    // ============ Cryptographic & Protocol Errors ============
    /// Cryptographic operation failed
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Handshake failed
    #[error("Handshake failed: {0}")]
    Handshake(Cow<'static, str>),

    /// Untrusted bytes could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Peer announced a frame larger than we accept
    #[error("Message of {size} bytes exceeds limit of {max} bytes")]
    MessageTooLarge {
        /// Declared size
        size: usize,
        /// Configured limit
        max: usize,
    },

    /// Peer identity does not carry a routable address
    #[error("Unroutable peer address: {0}")]
    UnroutablePeer(String),

    // ============ Policy Errors ============
    /// No free connection slot in this direction
    #[error("Capacity exceeded: {limit} {direction} connections in use")]
    CapacityExceeded {
        /// Direction of the refused connection
        direction: ConnectionDirection,
        /// Configured limit for that direction
        limit: usize,
    },

    /// Every dial attempt failed
    #[error("Dial to {addr} failed after {attempts} attempts")]
    DialExhausted {
        /// Dialed address
        addr: String,
        /// Attempts made
        attempts: u32,
    },

    // ============ Dispatch Errors ============
    /// A response was already sent for this request
    #[error("Response already sent")]
    ResponseAlreadySent,

    // ============ Configuration & State Errors ============
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(Cow<'static, str>),

    /// Invalid state transition
    #[error("Invalid state: {0}")]
    InvalidState(Cow<'static, str>),

    // ============ Operational Errors ============
    /// Operation timed out
    #[error("Operation timed out: {0}")]
    Timeout(Cow<'static, str>),

    /// Task join error
    #[error("Task join error: {0}")]
    TaskJoin(Cow<'static, str>),
}

impl NodeError {
    /// Returns true if this error is transient and may succeed on retry
    ///
    /// Transient errors include:
    /// - Network timeouts
    /// - Transport and stream failures
    /// - Closed connections (a fresh dial may succeed)
    /// - Full connection slots (slots free up as peers leave)
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            NodeError::Timeout(_)
                | NodeError::Transport(_)
                | NodeError::Io(_)
                | NodeError::ConnectionClosed(_)
                | NodeError::CapacityExceeded { .. }
        )
    }

    /// Returns true if this error is permanent and will not succeed on retry
    ///
    /// Permanent errors include:
    /// - Invalid configuration or state
    /// - Protocol violations by the peer
    /// - Cryptographic failures
    /// - Duplicate responses
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            NodeError::InvalidConfig(_)
                | NodeError::InvalidState(_)
                | NodeError::Crypto(_)
                | NodeError::Handshake(_)
                | NodeError::Decode(_)
                | NodeError::MessageTooLarge { .. }
                | NodeError::UnroutablePeer(_)
                | NodeError::ResponseAlreadySent
        )
    }

    /// Returns true if this error should trigger a retry with exponential backoff
    #[must_use]
    pub fn should_retry(&self) -> bool {
        self.is_transient()
            && !matches!(
                self,
                NodeError::Timeout(_) | NodeError::CapacityExceeded { .. }
            )
    }

    /// Create a transport error with static context (zero allocation)
    #[must_use]
    pub const fn transport(context: &'static str) -> Self {
        NodeError::Transport(Cow::Borrowed(context))
    }

    /// Create a timeout error with static context (zero allocation)
    #[must_use]
    pub const fn timeout(context: &'static str) -> Self {
        NodeError::Timeout(Cow::Borrowed(context))
    }

    /// Create a handshake error with static context (zero allocation)
    #[must_use]
    pub const fn handshake(context: &'static str) -> Self {
        NodeError::Handshake(Cow::Borrowed(context))
    }

    /// Create an invalid state error with static context (zero allocation)
    #[must_use]
    pub const fn invalid_state(context: &'static str) -> Self {
        NodeError::InvalidState(Cow::Borrowed(context))
    }

    /// Create a connection closed error with static context (zero allocation)
    #[must_use]
    pub const fn connection_closed(context: &'static str) -> Self {
        NodeError::ConnectionClosed(Cow::Borrowed(context))
    }
}

impl From<disturbdb_crypto::CryptoError> for NodeError {
    fn from(err: disturbdb_crypto::CryptoError) -> Self {
        NodeError::Crypto(err.to_string())
    }
}

impl From<crate::error::DecodeError> for NodeError {
    fn from(err: crate::error::DecodeError) -> Self {
        NodeError::Decode(err.to_string())
    }
}

impl From<crate::error::Error> for NodeError {
    fn from(err: crate::error::Error) -> Self {
        use crate::error::Error;
        match err {
            Error::Decode(e) => e.into(),
            Error::Crypto(e) => e.into(),
            Error::FrameTooLarge { size, max } => NodeError::MessageTooLarge { size, max },
            Error::Address(e) => NodeError::Transport(Cow::Owned(e)),
            Error::Unroutable(addr) => NodeError::UnroutablePeer(addr.to_string()),
            Error::Json(e) => NodeError::Decode(e.to_string()),
            Error::Io(e) => e.into(),
        }
    }
}

impl From<std::io::Error> for NodeError {
    fn from(err: std::io::Error) -> Self {
        NodeError::Io(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for NodeError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        NodeError::timeout("deadline elapsed")
    }
}

impl From<tokio::task::JoinError> for NodeError {
    fn from(err: tokio::task::JoinError) -> Self {
        NodeError::TaskJoin(Cow::Owned(err.to_string()))
    }
}

/// Result type for Node operations
pub type Result<T> = std::result::Result<T, NodeError>;
