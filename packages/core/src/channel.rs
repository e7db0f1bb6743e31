//! Message transport between a block and its embedder.
//!
//! A [`Channel`] is one end of an origin-scoped, bidirectional message bus.
//! Several service handlers may share one end: each subscribes and filters by
//! service name. [`MemoryChannel`] is the in-process implementation.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tracing::warn;

use crate::error::{Result, ServiceError};
use crate::message::Message;

/// A message tagged with the origin of the end that sent it.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub origin: String,
    pub message: Message,
}

/// One end of a block/embedder message bus.
pub trait Channel: Send + Sync {
    /// Origin stamped on every message sent from this end.
    fn origin(&self) -> &str;

    /// Send a message to the other end.
    fn send(&self, message: Message) -> Result<()>;

    /// Receive every message arriving at this end from now on.
    fn subscribe(&self) -> Subscription;

    /// Close the bus for both ends. Subscriptions end and sends fail.
    fn close(&self);

    fn is_closed(&self) -> bool;
}

/// A stream of envelopes arriving at one channel end.
pub struct Subscription {
    rx: broadcast::Receiver<Envelope>,
    closed: watch::Receiver<bool>,
}

impl Subscription {
    pub fn new(rx: broadcast::Receiver<Envelope>, closed: watch::Receiver<bool>) -> Self {
        Self { rx, closed }
    }

    /// The next envelope, or `None` once the channel is closed.
    ///
    /// A subscriber that falls behind skips what it missed and logs a warning.
    pub async fn recv(&mut self) -> Option<Envelope> {
        loop {
            tokio::select! {
                biased;
                _ = self.closed.wait_for(|closed| *closed) => return None,
                received = self.rx.recv() => match received {
                    Ok(envelope) => return Some(envelope),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "subscription lagged; messages were dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                },
            }
        }
    }
}

/// Default origin of the block end of a [`MemoryChannel::pair`].
pub const BLOCK_ORIGIN: &str = "block://local";

/// Default origin of the embedder end of a [`MemoryChannel::pair`].
pub const EMBEDDER_ORIGIN: &str = "embedder://local";

/// In-process channel end backed by tokio broadcast channels.
///
/// Cloning yields another handle to the same end.
#[derive(Clone)]
pub struct MemoryChannel {
    origin: String,
    /// Messages this end sends.
    outbound: broadcast::Sender<Envelope>,
    /// Messages arriving at this end.
    inbound: broadcast::Sender<Envelope>,
    closed: Arc<watch::Sender<bool>>,
}

impl MemoryChannel {
    /// Create a connected `(block, embedder)` pair with the default origins.
    pub fn pair(capacity: usize) -> (Self, Self) {
        Self::pair_with_origins(capacity, BLOCK_ORIGIN, EMBEDDER_ORIGIN)
    }

    /// Create a connected pair with explicit origins.
    pub fn pair_with_origins(
        capacity: usize,
        block_origin: impl Into<String>,
        embedder_origin: impl Into<String>,
    ) -> (Self, Self) {
        let (to_embedder, _) = broadcast::channel(capacity);
        let (to_block, _) = broadcast::channel(capacity);
        let closed = Arc::new(watch::channel(false).0);

        let block = Self {
            origin: block_origin.into(),
            outbound: to_embedder.clone(),
            inbound: to_block.clone(),
            closed: closed.clone(),
        };
        let embedder = Self {
            origin: embedder_origin.into(),
            outbound: to_block,
            inbound: to_embedder,
            closed,
        };
        (block, embedder)
    }

    /// Inject an envelope as though it had arrived from the other end.
    pub fn deliver(&self, envelope: Envelope) {
        let _ = self.inbound.send(envelope);
    }
}

impl Channel for MemoryChannel {
    fn origin(&self) -> &str {
        &self.origin
    }

    fn send(&self, message: Message) -> Result<()> {
        if self.is_closed() {
            return Err(ServiceError::ChannelClosed);
        }
        let envelope = Envelope {
            origin: self.origin.clone(),
            message,
        };
        // Dropped if nobody is subscribed on the other end.
        let _ = self.outbound.send(envelope);
        Ok(())
    }

    fn subscribe(&self) -> Subscription {
        Subscription::new(self.inbound.subscribe(), self.closed.subscribe())
    }

    fn close(&self) {
        self.closed.send_replace(true);
    }

    fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pair_delivers_both_ways_with_origin() {
        let (block, embedder) = MemoryChannel::pair(8);
        let mut at_embedder = embedder.subscribe();
        let mut at_block = block.subscribe();

        block.send(Message::new("graph", "init")).unwrap();
        let envelope = at_embedder.recv().await.unwrap();
        assert_eq!(envelope.origin, BLOCK_ORIGIN);
        assert_eq!(envelope.message.message_name, "init");

        embedder.send(Message::new("graph", "initResponse")).unwrap();
        let envelope = at_block.recv().await.unwrap();
        assert_eq!(envelope.origin, EMBEDDER_ORIGIN);
    }

    #[tokio::test]
    async fn close_ends_subscriptions_and_fails_sends() {
        let (block, embedder) = MemoryChannel::pair(8);
        let mut at_embedder = embedder.subscribe();

        embedder.close();
        assert!(block.is_closed());
        assert!(at_embedder.recv().await.is_none());
        assert!(matches!(
            block.send(Message::new("graph", "init")),
            Err(ServiceError::ChannelClosed)
        ));
    }

    #[tokio::test]
    async fn lagging_subscriber_skips_ahead() {
        let (block, embedder) = MemoryChannel::pair(2);
        let mut at_embedder = embedder.subscribe();
        for name in ["a", "b", "c", "d"] {
            block.send(Message::new("graph", name)).unwrap();
        }
        let envelope = at_embedder.recv().await.unwrap();
        assert_eq!(envelope.message.message_name, "c");
    }
}
