//! Subscription handle
//!
//! The receiving half of a session's delivery queue. Dropping it removes the
//! session from every channel it was registered under.

use futures_util::Stream;
use std::pin::Pin;
use std::sync::Weak;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

use super::hub::{Registry, SubscriberId};
use super::message::{ChannelSet, Message};

/// Delivery handle returned by [`Broker::subscribe`](super::Broker::subscribe)
///
/// Yields every message published to one of its channels after it was
/// registered, until it is closed or the broker shuts down.
pub struct Subscription {
    id: SubscriberId,
    channels: ChannelSet,
    receiver: mpsc::Receiver<Message>,
    registry: Weak<Registry>,
    closed: bool,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriberId,
        channels: ChannelSet,
        receiver: mpsc::Receiver<Message>,
        registry: Weak<Registry>,
    ) -> Self {
        Self {
            id,
            channels,
            receiver,
            registry,
            closed: false,
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn channels(&self) -> &ChannelSet {
        &self.channels
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Wait for the next message
    ///
    /// Returns `None` once the subscription is closed or the broker is gone.
    pub async fn recv(&mut self) -> Option<Message> {
        if self.closed {
            return None;
        }
        self.receiver.recv().await
    }

    /// Unregister from the broker. Calling this more than once is a no-op.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.receiver.close();

        // Broker already dropped: nothing left to unregister from
        if let Some(registry) = self.registry.upgrade() {
            if let Err(e) = registry.remove(self.id) {
                tracing::warn!(subscriber_id = %self.id, error = %e, "Failed to unregister subscriber");
            }
        }
    }
}

impl Stream for Subscription {
    type Item = Message;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Message>> {
        let this = self.get_mut();
        if this.closed {
            return Poll::Ready(None);
        }
        this.receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("channels", &self.channels)
            .field("closed", &self.closed)
            .finish()
    }
}
