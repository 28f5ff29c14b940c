//! Two-node test fixture for integration testing
//!
//! Provides a reusable test infrastructure for two-node scenarios over real
//! TCP sockets on the loopback interface. Loopback hosts are not identifying,
//! so each node advertises a private address (`10.0.0.x`) with the port of
//! its bound listener.
//!
//! # Example
//!
//! ```no_run
//! use disturbdb_integration_tests::fixtures::TwoNodeFixture;
//!
//! #[tokio::test]
//! async fn test_basic_request() {
//!     let fixture = TwoNodeFixture::new().await.unwrap();
//!     let client = fixture.connect().await.unwrap();
//!
//!     let reply = client
//!         .request(b"ping".to_vec(), std::time::Duration::from_secs(5))
//!         .await
//!         .unwrap();
//!     assert_eq!(reply.data, b"ping");
//!
//!     fixture.cleanup().await.unwrap();
//! }
//! ```

use async_trait::async_trait;
use disturbdb_core::node::{Client, DispatchContext, MessageHandler, Node, NodeConfig, NodeError};
use disturbdb_core::{PeerId, WireMessage};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

/// Host octet allocator so concurrent tests advertise distinct addresses
static NEXT_HOST: AtomicU8 = AtomicU8::new(1);

/// Config listening on an ephemeral loopback port and advertising a
/// routable `10.0.0.x` address with the bound port.
pub fn routable_config() -> NodeConfig {
    let host = NEXT_HOST.fetch_add(1, Ordering::Relaxed).max(1);
    NodeConfig {
        listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        advertise_addr: Some(SocketAddr::from(([10, 0, 0, host], 0))),
        ..Default::default()
    }
}

/// Poll `condition` every 10ms until it holds or `timeout` elapses.
///
/// Returns whether the condition was reached.
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Handler that forwards every inbound message to a channel and echoes
/// requests back to the sender.
pub struct Recorder {
    tx: mpsc::UnboundedSender<(PeerId, WireMessage)>,
}

impl Recorder {
    /// Create a recorder and the receiving end of its channel
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<(PeerId, WireMessage)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

#[async_trait]
impl MessageHandler for Recorder {
    async fn handle(&self, ctx: DispatchContext) -> Result<(), NodeError> {
        let _ = self.tx.send((ctx.id().clone(), ctx.message().clone()));
        if ctx.is_request() {
            ctx.respond(ctx.data().to_vec()).await?;
        }
        Ok(())
    }
}

/// Two-node test fixture
///
/// Both nodes are listening once constructed. `initiator` dials `responder`.
pub struct TwoNodeFixture {
    /// Dialing node
    pub initiator: Node,
    /// Listening node
    pub responder: Node,
    /// Messages received by the responder
    pub responder_inbox: mpsc::UnboundedReceiver<(PeerId, WireMessage)>,
}

impl TwoNodeFixture {
    /// Create a new two-node fixture with random identities
    ///
    /// # Errors
    ///
    /// Returns `NodeError::Transport` if a listener cannot be bound.
    pub async fn new() -> Result<Self, NodeError> {
        Self::new_with_config(routable_config(), routable_config()).await
    }

    /// Create a new two-node fixture with custom configurations
    ///
    /// # Errors
    ///
    /// Returns an error if either configuration is invalid or a listener
    /// cannot be bound.
    pub async fn new_with_config(
        initiator_config: NodeConfig,
        responder_config: NodeConfig,
    ) -> Result<Self, NodeError> {
        let (initiator_handler, _) = Recorder::new();
        let (responder_handler, responder_inbox) = Recorder::new();

        let initiator = Node::new_random(initiator_config, initiator_handler)?;
        let responder = Node::new_random(responder_config, responder_handler)?;

        initiator.start().await?;
        responder.start().await?;

        Ok(Self {
            initiator,
            responder,
            responder_inbox,
        })
    }

    /// Loopback address the responder listens on
    pub fn responder_addr(&self) -> SocketAddr {
        self.responder
            .local_addr()
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 0)))
    }

    /// Dial the responder from the initiator
    ///
    /// # Errors
    ///
    /// Returns the dial or handshake error.
    pub async fn connect(&self) -> Result<Client, NodeError> {
        self.initiator.dial(self.responder_addr()).await
    }

    /// Wait until the responder has registered the initiator
    pub async fn wait_for_responder(&self) -> bool {
        let key = self.initiator.local_id().address();
        wait_until(Duration::from_secs(5), || self.responder.client(&key).is_some()).await
    }

    /// Stop both nodes
    ///
    /// # Errors
    ///
    /// Returns an error if either node fails to stop cleanly.
    pub async fn cleanup(&self) -> Result<(), NodeError> {
        self.initiator.stop().await?;
        self.responder.stop().await?;
        Ok(())
    }
}
