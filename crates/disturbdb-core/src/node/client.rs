//! Handle to one established peer connection.
//!
//! A [`Client`] is cheap to clone. All clones share the connection's outbound
//! queue, close signal and pending-request table. Closing is idempotent: the
//! first call to [`Client::close`] wins and every later call is a no-op, so
//! the idle sweep, LRU eviction and connection teardown may all race to close
//! the same client safely.
//!
//! Each end numbers its requests in its own nonce space: the dialing side
//! uses odd nonces and the accepting side even ones. A response echoes the
//! request's nonce, so only an inbound message carrying a nonce from our own
//! space can complete one of our requests. Anything else is a request or
//! notification from the peer.

use crate::logging::Logger;
use crate::message::{NOTIFICATION_NONCE, WireMessage};
use crate::node::Node;
use crate::node::error::{NodeError, Result};
use crate::node::node::NodeInner;
use crate::node::registry::RegistryHandle;
use crate::node::slots::ConnectionDirection;
use crate::peer::PeerId;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot, watch};

/// Handle to an established peer connection
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    node: Weak<NodeInner>,
    id: PeerId,
    connection_id: u64,
    direction: ConnectionDirection,
    logger: Logger,
    outbound: mpsc::Sender<WireMessage>,
    shutdown: watch::Sender<bool>,
    closed: AtomicBool,
    last_activity: Mutex<Instant>,
    pending: DashMap<u64, oneshot::Sender<WireMessage>>,
    next_nonce: AtomicU64,
}

/// Everything a connection driver needs to build a [`Client`]
pub(crate) struct ClientParts {
    pub(crate) node: Weak<NodeInner>,
    pub(crate) id: PeerId,
    pub(crate) connection_id: u64,
    pub(crate) direction: ConnectionDirection,
    pub(crate) logger: Logger,
    pub(crate) outbound: mpsc::Sender<WireMessage>,
}

impl Client {
    pub(crate) fn new(parts: ClientParts) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(ClientInner {
                node: parts.node,
                id: parts.id,
                connection_id: parts.connection_id,
                direction: parts.direction,
                logger: parts.logger,
                outbound: parts.outbound,
                shutdown,
                closed: AtomicBool::new(false),
                last_activity: Mutex::new(Instant::now()),
                pending: DashMap::new(),
                next_nonce: AtomicU64::new(first_nonce(parts.direction)),
            }),
        }
    }

    /// Identity of the remote peer
    pub fn id(&self) -> &PeerId {
        &self.inner.id
    }

    /// Canonical address of the remote peer
    pub fn address(&self) -> String {
        self.inner.id.address()
    }

    /// Process-unique id of this connection
    pub fn connection_id(&self) -> u64 {
        self.inner.connection_id
    }

    /// Who initiated the connection
    pub fn direction(&self) -> ConnectionDirection {
        self.inner.direction
    }

    /// Logger tagged with this connection's module
    pub fn logger(&self) -> &Logger {
        &self.inner.logger
    }

    /// The node that owns this connection, if it is still alive
    pub fn node(&self) -> Option<Node> {
        self.inner.node.upgrade().map(|inner| Node { inner })
    }

    /// Whether the connection has been closed
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Time since the last frame was sent or received
    pub fn idle_for(&self) -> Duration {
        self.inner.last_activity.lock().elapsed()
    }

    pub(crate) fn touch(&self) {
        *self.inner.last_activity.lock() = Instant::now();
    }

    pub(crate) fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.inner.shutdown.subscribe()
    }

    /// Queue a message for the writer task.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::ConnectionClosed`] if the connection is closed.
    pub async fn send(&self, message: WireMessage) -> Result<()> {
        if self.is_closed() {
            return Err(NodeError::connection_closed("send on closed connection"));
        }
        self.inner
            .outbound
            .send(message)
            .await
            .map_err(|_| NodeError::connection_closed("writer task stopped"))
    }

    /// Send a notification (nonce 0). No response is expected.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::ConnectionClosed`] if the connection is closed.
    pub async fn notify(&self, data: impl Into<Vec<u8>>) -> Result<()> {
        self.send(WireMessage::notification(data)).await
    }

    /// Send a request and wait for the correlated response.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Timeout`] if no response arrives within
    /// `timeout` and [`NodeError::ConnectionClosed`] if the connection closes
    /// first.
    pub async fn request(&self, data: impl Into<Vec<u8>>, timeout: Duration) -> Result<WireMessage> {
        let nonce = self.next_nonce();
        let (tx, rx) = oneshot::channel();
        self.inner.pending.insert(nonce, tx);

        if let Err(e) = self.send(WireMessage::new(nonce, data)).await {
            self.inner.pending.remove(&nonce);
            return Err(e);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(NodeError::connection_closed(
                "connection closed before response",
            )),
            Err(_) => {
                self.inner.pending.remove(&nonce);
                Err(NodeError::timeout("request"))
            }
        }
    }

    fn next_nonce(&self) -> u64 {
        loop {
            let nonce = self.inner.next_nonce.fetch_add(NONCE_STRIDE, Ordering::Relaxed);
            if nonce != NOTIFICATION_NONCE {
                return nonce;
            }
        }
    }

    /// Whether `nonce` belongs to the space our own requests are drawn from
    fn owns_nonce(&self, nonce: u64) -> bool {
        nonce != NOTIFICATION_NONCE && nonce % NONCE_STRIDE == first_nonce(self.inner.direction)
    }

    /// Deliver `message` to a waiting [`Client::request`] if its nonce matches
    /// one. Returns the message back when nobody is waiting for it.
    pub(crate) fn complete_request(&self, message: WireMessage) -> Option<WireMessage> {
        if !self.owns_nonce(message.nonce) {
            return Some(message);
        }
        match self.inner.pending.remove(&message.nonce) {
            Some((_, waiter)) => {
                // A dropped receiver means the requester timed out
                let _ = waiter.send(message);
                None
            }
            None => Some(message),
        }
    }

    /// Number of requests awaiting a response
    pub fn pending_requests(&self) -> usize {
        self.inner.pending.len()
    }

    /// Close the connection. Returns `true` for the call that closed it.
    pub fn close(&self) -> bool {
        if self
            .inner
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        self.inner.shutdown.send_replace(true);
        // Dropping the waiters fails outstanding requests
        self.inner.pending.clear();
        self.inner
            .logger
            .debug("connection closed", format_args!("peer={}", self.inner.id));
        true
    }
}

/// Nonces advance by two so the two ends never collide
const NONCE_STRIDE: u64 = 2;

/// Dialers number requests 1, 3, 5, ... and acceptors 2, 4, 6, ...
const fn first_nonce(direction: ConnectionDirection) -> u64 {
    match direction {
        ConnectionDirection::Outbound => 1,
        ConnectionDirection::Inbound => 2,
    }
}

impl RegistryHandle for Client {
    fn release(&self) {
        self.close();
    }

    fn same_connection(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.inner.id)
            .field("connection_id", &self.inner.connection_id)
            .field("direction", &self.inner.direction)
            .field("closed", &self.is_closed())
            .finish()
    }
}
