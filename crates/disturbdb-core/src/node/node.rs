//! Node implementation - peer connection orchestrator
//!
//! The Node is the primary entry point for disturbdb peers. It owns the
//! listener, the node identity and the connection registry, and drives the
//! accept loop and the idle sweep.
//!
//! # Example
//!
//! ```no_run
//! use disturbdb_core::node::{Node, NodeConfig, NoopHandler};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let node = Node::new_random(NodeConfig::default(), Arc::new(NoopHandler))?;
//!     node.start().await?;
//!
//!     let peer = node.dial("10.0.0.2:3000".parse()?).await?;
//!     peer.notify(b"hello".to_vec()).await?;
//!
//!     node.stop().await?;
//!     Ok(())
//! }
//! ```

use crate::logging::Logger;
use crate::node::client::Client;
use crate::node::config::NodeConfig;
use crate::node::dispatch::MessageHandler;
use crate::node::error::{NodeError, Result};
use crate::node::identity::Identity;
use crate::node::registry::ConnectionRegistry;
use crate::node::slots::{ConnectionDirection, ConnectionSlots};
use crate::peer::{PeerId, normalize_ip};
use parking_lot::RwLock;
use std::borrow::Cow;
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Node inner state
pub(crate) struct NodeInner {
    /// Node identity
    pub(crate) identity: Identity,
    /// Node configuration
    pub(crate) config: NodeConfig,
    /// Node logger
    pub(crate) logger: Logger,
    /// Application message handler
    pub(crate) handler: Arc<dyn MessageHandler>,
    /// Our own peer record (address fixed up on bind)
    pub(crate) local_id: RwLock<PeerId>,
    /// Bound listener address while listening
    pub(crate) local_addr: RwLock<Option<SocketAddr>>,
    /// Active connections (address -> client)
    pub(crate) registry: ConnectionRegistry<Client>,
    /// Inbound/outbound connection slots
    pub(crate) slots: Arc<ConnectionSlots>,
    /// Node listening state
    pub(crate) listening: AtomicBool,
    /// Stop signal for background tasks
    pub(crate) shutdown: watch::Sender<bool>,
    /// Accept loop and idle sweep
    pub(crate) tasks: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
    /// Connection id generator
    pub(crate) next_connection_id: AtomicU64,
}

/// disturbdb peer node
///
/// The Node coordinates:
/// - Identity handshakes
/// - Inbound and outbound connection limits
/// - The LRU connection registry
/// - Idle connection cleanup
/// - Message dispatch to the application handler
#[derive(Clone)]
pub struct Node {
    pub(crate) inner: Arc<NodeInner>,
}

// ═══════════════════════════════════════════════════════════════════════════
// Constructors
// ═══════════════════════════════════════════════════════════════════════════

impl Node {
    /// Create node with random identity
    ///
    /// # Errors
    ///
    /// Returns an error if key generation fails or the configuration is invalid.
    pub fn new_random(config: NodeConfig, handler: Arc<dyn MessageHandler>) -> Result<Self> {
        Self::new(Identity::generate()?, config, handler)
    }

    /// Create node from an identity and configuration
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::InvalidConfig`] if the configuration is invalid.
    pub fn new(
        identity: Identity,
        config: NodeConfig,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Self> {
        config.validate()?;

        let capacity = NonZeroUsize::new(config.registry_capacity())
            .ok_or(NodeError::InvalidConfig(Cow::Borrowed(
                "registry capacity must be at least 1",
            )))?;
        let local_id =
            identity.peer_id(config.advertise_addr.unwrap_or(config.listen_addr));
        let logger = Logger::new("node", config.logging.level);
        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            inner: Arc::new(NodeInner {
                registry: ConnectionRegistry::new(capacity),
                slots: Arc::new(ConnectionSlots::new(
                    config.max_inbound_connections,
                    config.max_outbound_connections,
                )),
                identity,
                config,
                logger,
                handler,
                local_id: RwLock::new(local_id),
                local_addr: RwLock::new(None),
                listening: AtomicBool::new(false),
                shutdown,
                tasks: tokio::sync::Mutex::new(Vec::new()),
                next_connection_id: AtomicU64::new(1),
            }),
        })
    }

    /// Get the node identity
    pub fn identity(&self) -> &Identity {
        &self.inner.identity
    }

    /// Get the node configuration
    pub fn config(&self) -> &NodeConfig {
        &self.inner.config
    }

    /// Get the node logger
    pub fn logger(&self) -> &Logger {
        &self.inner.logger
    }

    /// The peer record this node presents during handshakes
    pub fn local_id(&self) -> PeerId {
        self.inner.local_id.read().clone()
    }

    /// Bound listener address, while listening
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.inner.local_addr.read()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Lifecycle Methods
// ═══════════════════════════════════════════════════════════════════════════

impl Node {
    /// Bind the listener and start the accept loop and idle sweep.
    ///
    /// A no-op if the node is already listening.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Transport`] if the listen address cannot be bound.
    pub async fn start(&self) -> Result<()> {
        if self
            .inner
            .listening
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(());
        }

        let listener = match self.bind().await {
            Ok(listener) => listener,
            Err(e) => {
                self.inner.listening.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        self.inner.shutdown.send_replace(false);
        let accept = {
            let node = self.clone();
            let shutdown = self.inner.shutdown.subscribe();
            tokio::spawn(async move { node.accept_loop(listener, shutdown).await })
        };
        let sweep = self.start_idle_sweep(self.inner.shutdown.subscribe());
        self.inner.tasks.lock().await.extend([accept, sweep]);

        self.inner
            .logger
            .info("node listening", format_args!("id={}", self.local_id()));
        Ok(())
    }

    async fn bind(&self) -> Result<TcpListener> {
        let listener = TcpListener::bind(self.inner.config.listen_addr)
            .await
            .map_err(|e| {
                NodeError::Transport(Cow::Owned(format!(
                    "Failed to bind {}: {e}",
                    self.inner.config.listen_addr
                )))
            })?;
        let bound = listener.local_addr()?;
        *self.inner.local_addr.write() = Some(bound);

        let advertised = match self.inner.config.advertise_addr {
            Some(addr) if addr.port() == 0 => SocketAddr::new(addr.ip(), bound.port()),
            Some(addr) => addr,
            None => bound,
        };
        *self.inner.local_id.write() = self.inner.identity.peer_id(advertised);
        Ok(listener)
    }

    /// Stop listening, wait for background tasks and close every connection.
    ///
    /// A no-op if the node is not listening.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::TaskJoin`] if a background task panicked.
    pub async fn stop(&self) -> Result<()> {
        if self
            .inner
            .listening
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(());
        }

        self.inner.shutdown.send_replace(true);

        let tasks = std::mem::take(&mut *self.inner.tasks.lock().await);
        let mut result = Ok(());
        for task in tasks {
            if let Err(e) = task.await {
                self.inner.logger.error("background task failed", &e);
                result = Err(e.into());
            }
        }

        let closed = self.disconnect_all();
        *self.inner.local_addr.write() = None;

        self.inner
            .logger
            .info("node stopped", format_args!("closed {closed} connections"));
        result
    }

    /// Check if node is listening
    pub fn is_listening(&self) -> bool {
        self.inner.listening.load(Ordering::SeqCst)
    }

    /// Close and unregister every connection. Returns how many were closed.
    pub fn disconnect_all(&self) -> usize {
        let drained = self.inner.registry.drain();
        let count = drained.len();
        for (_, client) in drained {
            client.close();
        }
        count
    }

    async fn accept_loop(self, listener: TcpListener, mut shutdown: watch::Receiver<bool>) {
        let workers = Arc::new(tokio::sync::Semaphore::new(self.inner.config.num_workers));

        loop {
            let permit = tokio::select! {
                _ = shutdown.wait_for(|stop| *stop) => break,
                permit = Arc::clone(&workers).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let (stream, remote) = tokio::select! {
                _ = shutdown.wait_for(|stop| *stop) => break,
                accepted = listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        self.inner.logger.warn("accept failed", e);
                        continue;
                    }
                },
            };

            let slot = match self.inner.slots.try_acquire(ConnectionDirection::Inbound) {
                Ok(slot) => slot,
                Err(e) => {
                    self.inner
                        .logger
                        .warn("capacity exceeded", format_args!("dropping {remote}: {e}"));
                    continue;
                }
            };
            let _ = stream.set_nodelay(true);

            let node = self.clone();
            tokio::spawn(async move {
                let _permit = permit;
                if let Err(e) = node.establish(stream, ConnectionDirection::Inbound, slot).await {
                    node.inner
                        .logger
                        .warn("inbound handshake failed", format_args!("{remote}: {e}"));
                }
            });
        }

        self.inner.logger.debug("accept loop stopped", "");
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Connection Methods
// ═══════════════════════════════════════════════════════════════════════════

impl Node {
    /// Connect to `addr`, reusing the registered connection if there is one.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::CapacityExceeded`] if every outbound slot is in
    /// use, [`NodeError::DialExhausted`] if no TCP connection could be made in
    /// `max_dial_attempts` attempts, and handshake errors.
    pub async fn dial(&self, addr: SocketAddr) -> Result<Client> {
        if let Some(existing) = self.registered_client(addr) {
            return Ok(existing);
        }

        let slot = self.inner.slots.try_acquire(ConnectionDirection::Outbound)?;
        let stream = self.connect_with_retry(addr).await?;
        self.establish(stream, ConnectionDirection::Outbound, slot)
            .await
    }

    fn registered_client(&self, addr: SocketAddr) -> Option<Client> {
        let ip = normalize_ip(addr.ip())?;
        let key = SocketAddr::new(ip, addr.port()).to_string();
        self.inner
            .registry
            .get(&key)
            .filter(|client| !client.is_closed())
    }

    async fn connect_with_retry(&self, addr: SocketAddr) -> Result<TcpStream> {
        let attempts = self.inner.config.max_dial_attempts;
        let dial_timeout = self.inner.config.dial_timeout;

        for attempt in 0..attempts {
            match tokio::time::timeout(dial_timeout, TcpStream::connect(addr)).await {
                Ok(Ok(stream)) => {
                    let _ = stream.set_nodelay(true);
                    return Ok(stream);
                }
                Ok(Err(e)) => self.inner.logger.debug(
                    "dial attempt failed",
                    format_args!("{addr} attempt {}: {e}", attempt + 1),
                ),
                Err(_) => self.inner.logger.debug(
                    "dial attempt timed out",
                    format_args!("{addr} attempt {}", attempt + 1),
                ),
            }

            if attempt + 1 < attempts {
                tokio::time::sleep(self.inner.config.retry.backoff_duration(attempt)).await;
            }
        }

        Err(NodeError::DialExhausted {
            addr: addr.to_string(),
            attempts,
        })
    }

    /// Run the handshake as the dialing side over an already connected stream.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::CapacityExceeded`] if every outbound slot is in
    /// use and handshake errors.
    pub async fn connect_stream<S>(&self, stream: S) -> Result<Client>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let slot = self.inner.slots.try_acquire(ConnectionDirection::Outbound)?;
        self.establish(stream, ConnectionDirection::Outbound, slot)
            .await
    }

    /// Run the handshake as the accepting side over an already connected stream.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::CapacityExceeded`] if every inbound slot is in use
    /// and handshake errors.
    pub async fn accept_stream<S>(&self, stream: S) -> Result<Client>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let slot = self.inner.slots.try_acquire(ConnectionDirection::Inbound)?;
        self.establish(stream, ConnectionDirection::Inbound, slot)
            .await
    }

    /// Registered client for a canonical `host:port` address (marks it used)
    pub fn client(&self, address: &str) -> Option<Client> {
        self.inner.registry.get(address)
    }

    /// Identities of all registered peers, most recently used first
    pub fn peers(&self) -> Vec<PeerId> {
        self.inner
            .registry
            .snapshot()
            .iter()
            .map(|client| client.id().clone())
            .collect()
    }

    /// Number of registered connections
    pub fn connection_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Inbound slots in use (handshakes included)
    pub fn inbound_count(&self) -> usize {
        self.inner.slots.inbound_count()
    }

    /// Outbound slots in use (handshakes included)
    pub fn outbound_count(&self) -> usize {
        self.inner.slots.outbound_count()
    }

    pub(crate) fn next_connection_id(&self) -> u64 {
        self.inner.next_connection_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.local_id())
            .field("listening", &self.is_listening())
            .field("connections", &self.connection_count())
            .finish()
    }
}
