//! # disturbdb Core
//!
//! Peer identity and connection management for disturbdb nodes.
//!
//! This crate provides:
//! - Peer records (public key + advertised address) and their binary form
//! - Nonce-tagged wire messages and length-prefixed framing
//! - Address normalization and resolution
//! - Leveled, module-tagged logging
//! - The [`node::Node`] connection orchestrator
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           Node                                  │
//! │   (listener, dialer, registry, idle sweep, dispatch)            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                          Clients                                │
//! │   (one authenticated TCP connection per peer address)           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                          Frames                                 │
//! │   (u32 length prefix + nonce + payload)                         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod error;
pub mod logging;
pub mod message;
pub mod node;
pub mod peer;

pub use error::{DecodeError, Error};
pub use logging::{LogLevel, Logger, ParseLogLevelError};
pub use message::{
    FRAME_HEADER_SIZE, NONCE_SIZE, NOTIFICATION_NONCE, WireMessage, read_frame, write_frame,
};
pub use node::{Client, Node, NodeConfig, NodeError};
pub use peer::{HOST_SIZE, PORT_SIZE, PeerId, normalize_ip, resolve_address};
