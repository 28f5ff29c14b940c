//! Node orchestration layer for disturbdb
//!
//! This module provides the high-level Node API that coordinates peer
//! connections:
//! - Identity handshakes (Ed25519 via disturbdb-crypto)
//! - Inbound and outbound connection limits
//! - LRU connection registry keyed by peer address
//! - Request/response correlation and message dispatch
//! - Idle connection cleanup
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                     Node API                            │
//! │  (lifecycle, dial, accept loop, diagnostics)            │
//! ├─────────────────────────────────────────────────────────┤
//! │  Handshake  │  Registry  │  Slots  │  Dispatch          │
//! ├─────────────────────────────────────────────────────────┤
//! │  Client (reader/writer tasks)  │  Wire framing          │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use disturbdb_core::node::{Node, NodeConfig, NoopHandler};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let node = Node::new_random(NodeConfig::default(), Arc::new(NoopHandler))?;
//!     node.start().await?;
//!
//!     let peer = node.dial("10.0.0.2:3000".parse()?).await?;
//!     let reply = peer.request(b"ping".to_vec(), Duration::from_secs(5)).await?;
//!     println!("{} bytes back", reply.data.len());
//!
//!     node.stop().await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod handshake;
pub mod identity;
#[allow(clippy::module_inception)]
pub mod node;
pub mod registry;
pub mod slots;

pub use client::Client;
pub use config::{DEFAULT_PORT, LoggingConfig, NodeConfig, RetryConfig};
pub use dispatch::{DispatchContext, MessageHandler, NoopHandler};
pub use error::NodeError;
pub use identity::{Identity, NodeKey, NodePublicKey, NodeSignature};
pub use node::Node;
pub use registry::{ConnectionRegistry, Displaced, RegistryHandle};
pub use slots::{ConnectionDirection, ConnectionSlots, SlotGuard};
