//! Connection lifecycle management
//!
//! Runs the handshake on a fresh stream, registers the resulting [`Client`]
//! and drives its reader and writer tasks. Also owns the idle sweep that
//! closes connections with no recent traffic.

use crate::message::{WireMessage, read_frame, write_frame};
use crate::node::client::{Client, ClientParts};
use crate::node::dispatch::DispatchContext;
use crate::node::error::{NodeError, Result};
use crate::node::handshake;
use crate::node::node::NodeInner;
use crate::node::registry::{Displaced, RegistryHandle};
use crate::node::slots::{ConnectionDirection, SlotGuard};
use crate::node::Node;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::{mpsc, watch};
use tokio::time::interval;

/// Lower bound on the idle sweep period
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(10);

impl Node {
    /// Handshake over `stream`, register the peer and spawn its I/O tasks.
    ///
    /// The slot is held by the reader task for the life of the connection.
    /// A handshake that completes after [`Node::stop`] has begun is torn down
    /// instead of registered.
    pub(crate) async fn establish<S>(
        &self,
        stream: S,
        direction: ConnectionDirection,
        slot: SlotGuard,
    ) -> Result<Client>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (mut reader, mut writer) = tokio::io::split(stream);

        let own_id = self.local_id();
        let peer_id = tokio::time::timeout(
            self.inner.config.handshake_timeout,
            handshake::perform(&mut reader, &mut writer, &self.inner.identity, &own_id),
        )
        .await
        .map_err(|_| NodeError::timeout("handshake"))??;

        let key = peer_id
            .registry_key()
            .ok_or_else(|| NodeError::UnroutablePeer(peer_id.socket_addr().to_string()))?;

        let (outbound, rx) = mpsc::channel(self.inner.config.outbound_queue_size);
        let client = Client::new(ClientParts {
            node: Arc::downgrade(&self.inner),
            id: peer_id,
            connection_id: self.next_connection_id(),
            direction,
            logger: self.inner.logger.for_module("node.client"),
            outbound,
        });

        match self.inner.registry.put(key.clone(), client.clone()) {
            Displaced::Nothing => {}
            Displaced::Replaced(old) => self.inner.logger.debug(
                "replaced connection",
                format_args!("{key} (connection {})", old.connection_id()),
            ),
            Displaced::Evicted { address, .. } => self
                .inner
                .logger
                .debug("evicted least recently used connection", &address),
        }

        // `stop` signals before draining, so either the drain sees this entry
        // or this check sees the signal
        if *self.inner.shutdown.borrow() {
            self.inner
                .registry
                .remove_if(&key, |registered| registered.same_connection(&client));
            client.close();
            self.inner
                .logger
                .debug("dropped handshake completed during shutdown", client.id());
            return Err(NodeError::connection_closed("node stopped"));
        }

        self.inner.logger.info(
            "peer connected",
            format_args!("{} ({direction})", client.id()),
        );

        tokio::spawn(writer_task(client.clone(), writer, rx));
        tokio::spawn(reader_task(
            Arc::downgrade(&self.inner),
            client.clone(),
            key,
            reader,
            slot,
        ));

        Ok(client)
    }

    /// Start the idle sweep background task
    ///
    /// Returns a join handle for the background task.
    pub(crate) fn start_idle_sweep(
        &self,
        shutdown: watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let node = self.clone();
        tokio::spawn(async move {
            node.idle_sweep_loop(shutdown).await;
        })
    }

    async fn idle_sweep_loop(&self, mut shutdown: watch::Receiver<bool>) {
        let period = (self.inner.config.idle_timeout / 2).max(MIN_SWEEP_INTERVAL);
        let mut timer = interval(period);

        loop {
            tokio::select! {
                _ = shutdown.wait_for(|stop| *stop) => break,
                _ = timer.tick() => {
                    let closed = self.cleanup_idle_connections();
                    if closed > 0 {
                        self.inner
                            .logger
                            .debug("closed idle connections", closed);
                    }
                }
            }
        }
    }

    /// Close every registered connection idle for longer than `idle_timeout`.
    ///
    /// Returns the number of connections closed.
    pub fn cleanup_idle_connections(&self) -> usize {
        let idle_timeout = self.inner.config.idle_timeout;
        let mut closed = 0;

        for client in self.inner.registry.snapshot() {
            if client.idle_for() <= idle_timeout {
                continue;
            }
            self.inner
                .registry
                .remove_if(&client.address(), |c| c.same_connection(&client));
            if client.close() {
                closed += 1;
            }
        }

        closed
    }
}

async fn writer_task<W>(client: Client, mut writer: WriteHalf<W>, mut rx: mpsc::Receiver<WireMessage>)
where
    W: AsyncRead + AsyncWrite + Send,
{
    let mut shutdown = client.shutdown_signal();
    let mut buf = Vec::new();

    loop {
        let message = tokio::select! {
            _ = shutdown.wait_for(|stop| *stop) => break,
            message = rx.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };

        buf.clear();
        message.encode(&mut buf);
        if let Err(e) = write_frame(&mut writer, &buf).await {
            client.logger().debug("write failed", format_args!("{}: {e}", client.id()));
            break;
        }
        client.touch();
    }

    client.close();
    let _ = writer.shutdown().await;
}

async fn reader_task<R>(
    node: Weak<NodeInner>,
    client: Client,
    key: String,
    mut reader: ReadHalf<R>,
    _slot: SlotGuard,
) where
    R: AsyncRead + AsyncWrite + Send,
{
    let mut shutdown = client.shutdown_signal();
    let max_size = match node.upgrade() {
        Some(inner) => inner.config.max_recv_message_size,
        None => return,
    };

    loop {
        let frame = tokio::select! {
            _ = shutdown.wait_for(|stop| *stop) => break,
            frame = read_frame(&mut reader, max_size) => frame,
        };

        let body = match frame {
            Ok(Some(body)) => body,
            Ok(None) => break,
            Err(e) => {
                client.logger().warn("read failed", format_args!("{}: {e}", client.id()));
                break;
            }
        };
        client.touch();

        let message = match WireMessage::decode(&body) {
            Ok(message) => message,
            Err(e) => {
                client.logger().warn("malformed message", format_args!("{}: {e}", client.id()));
                break;
            }
        };

        let Some(message) = client.complete_request(message) else {
            continue;
        };

        let Some(inner) = node.upgrade() else {
            break;
        };
        let handler = Arc::clone(&inner.handler);
        drop(inner);

        if let Err(e) = handler
            .handle(DispatchContext::new(client.clone(), message))
            .await
        {
            client.logger().error("handler failed", &e);
        }
    }

    client.close();
    if let Some(inner) = node.upgrade() {
        inner
            .registry
            .remove_if(&key, |registered| registered.same_connection(&client));
        inner.logger.info("peer disconnected", client.id());
    }
}
