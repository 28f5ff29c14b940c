//! Inbound message dispatch.
//!
//! Every message that is not a response to one of our own requests is handed
//! to the node's [`MessageHandler`] wrapped in a [`DispatchContext`]. A
//! request may be answered at most once; the first response wins.

use crate::logging::Logger;
use crate::message::WireMessage;
use crate::node::client::Client;
use crate::node::error::{NodeError, Result};
use crate::peer::PeerId;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};

/// Application callback for inbound messages.
///
/// Handlers run inline on the connection's reader task, so messages from one
/// peer are processed in arrival order. Long-running work should be spawned.
///
/// While a handler runs, nothing else is read from that connection. A
/// handler that awaits `ctx.client().request(..)` to the same peer therefore
/// always times out: the response can only be read after the handler
/// returns. Spawn such follow-up requests instead of awaiting them inline.
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    /// Handle one inbound message
    async fn handle(&self, ctx: DispatchContext) -> Result<()>;
}

/// Handler that ignores every message
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandler;

#[async_trait]
impl MessageHandler for NoopHandler {
    async fn handle(&self, _ctx: DispatchContext) -> Result<()> {
        Ok(())
    }
}

/// One inbound message together with the connection it arrived on
#[derive(Debug)]
pub struct DispatchContext {
    client: Client,
    message: WireMessage,
    response_sent: AtomicBool,
}

impl DispatchContext {
    /// Wrap an inbound message
    pub fn new(client: Client, message: WireMessage) -> Self {
        Self {
            client,
            message,
            response_sent: AtomicBool::new(false),
        }
    }

    /// Identity of the sender
    pub fn id(&self) -> &PeerId {
        self.client.id()
    }

    /// Connection the message arrived on
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The decoded message
    pub fn message(&self) -> &WireMessage {
        &self.message
    }

    /// Message payload
    pub fn data(&self) -> &[u8] {
        &self.message.data
    }

    /// Message nonce
    pub fn nonce(&self) -> u64 {
        self.message.nonce
    }

    /// Whether the sender expects a response
    pub fn is_request(&self) -> bool {
        self.message.is_request()
    }

    /// Connection logger
    pub fn logger(&self) -> &Logger {
        self.client.logger()
    }

    /// Whether a response has been sent
    pub fn response_sent(&self) -> bool {
        self.response_sent.load(Ordering::Acquire)
    }

    /// Claim the single response slot.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::ResponseAlreadySent`] for every call after the
    /// first.
    pub fn mark_response_sent(&self) -> Result<()> {
        self.response_sent
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| NodeError::ResponseAlreadySent)
    }

    /// Answer the request with `data`.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::InvalidState`] for notifications,
    /// [`NodeError::ResponseAlreadySent`] if a response was already sent and
    /// [`NodeError::ConnectionClosed`] if the connection is gone.
    pub async fn respond(&self, data: impl Into<Vec<u8>>) -> Result<()> {
        if !self.is_request() {
            return Err(NodeError::invalid_state(
                "cannot respond to a notification",
            ));
        }
        self.mark_response_sent()?;
        self.client
            .send(WireMessage::new(self.message.nonce, data))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::client::tests::detached_client;

    #[test]
    fn test_mark_response_sent_once() {
        let (client, _rx) = detached_client(1);
        let ctx = DispatchContext::new(client, WireMessage::new(5, b"q".to_vec()));

        assert!(!ctx.response_sent());
        assert!(ctx.mark_response_sent().is_ok());
        assert!(matches!(
            ctx.mark_response_sent(),
            Err(NodeError::ResponseAlreadySent)
        ));
        assert!(ctx.response_sent());
    }

    #[tokio::test]
    async fn test_respond_uses_request_nonce() {
        let (client, mut rx) = detached_client(1);
        let ctx = DispatchContext::new(client, WireMessage::new(42, b"q".to_vec()));

        ctx.respond(b"a".to_vec()).await.unwrap();

        let sent = rx.recv().await.unwrap();
        assert_eq!(sent, WireMessage::new(42, b"a".to_vec()));
    }

    #[tokio::test]
    async fn test_second_respond_rejected() {
        let (client, mut rx) = detached_client(1);
        let ctx = DispatchContext::new(client, WireMessage::new(7, b"q".to_vec()));

        ctx.respond(b"first".to_vec()).await.unwrap();
        let err = ctx.respond(b"second".to_vec()).await.unwrap_err();
        assert!(matches!(err, NodeError::ResponseAlreadySent));

        assert_eq!(rx.recv().await.unwrap().data, b"first");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_respond_to_notification_rejected() {
        let (client, _rx) = detached_client(1);
        let ctx = DispatchContext::new(client, WireMessage::notification(b"n".to_vec()));

        let err = ctx.respond(b"a".to_vec()).await.unwrap_err();
        assert!(matches!(err, NodeError::InvalidState(_)));
        assert!(!ctx.response_sent());
    }

    #[test]
    fn test_accessors() {
        let (client, _rx) = detached_client(9);
        let expected_id = client.id().clone();
        let ctx = DispatchContext::new(client, WireMessage::new(3, b"payload".to_vec()));

        assert_eq!(ctx.id(), &expected_id);
        assert_eq!(ctx.data(), b"payload");
        assert_eq!(ctx.nonce(), 3);
        assert!(ctx.is_request());
        assert_eq!(ctx.client().connection_id(), 9);
        assert_eq!(ctx.logger().module(), "node.client");
    }

    #[tokio::test]
    async fn test_noop_handler() {
        let (client, _rx) = detached_client(1);
        let ctx = DispatchContext::new(client, WireMessage::notification(Vec::new()));
        assert!(NoopHandler.handle(ctx).await.is_ok());
    }
}
