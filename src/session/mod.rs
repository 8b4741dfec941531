//! Subscription Sessions
//!
//! One session per connected WebSocket client. A session subscribes to its
//! channels once the connection is upgraded, then relays every broker
//! message onto the socket as a `[<channel>] <payload>` text frame.
//!
//! ## Lifecycle
//!
//! ```text
//! upgrade → Broker::subscribe → relay loop ─┬─ peer closed / read error
//!                                           ├─ write failed
//!                                           ├─ broker closed (stream ended)
//!                                           └─ process shutdown (Close frame sent)
//!        → Subscription dropped → unregistered from every channel
//! ```

use axum::extract::ws::{close_code, CloseFrame, Message as WsMessage, WebSocket};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::watch;

use crate::broker::{Broker, ChannelSet};

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The broker refused the subscription
    Rejected,
    /// Client closed the connection or it failed on read
    PeerClosed,
    /// Writing a frame to the client failed
    WriteFailed,
    /// The broker shut down and ended the subscription
    BrokerClosed,
    /// The process is shutting down
    Shutdown,
}

/// A client's streaming session over one or more channels
pub struct Session {
    broker: Arc<Broker>,
    channels: ChannelSet,
    shutdown: watch::Receiver<bool>,
}

impl Session {
    pub fn new(broker: Arc<Broker>, channels: ChannelSet, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            broker,
            channels,
            shutdown,
        }
    }

    pub fn channels(&self) -> &ChannelSet {
        &self.channels
    }

    /// Run the session on an upgraded WebSocket until it closes
    pub async fn run(self, socket: WebSocket) -> SessionEnd {
        let (sender, receiver) = socket.split();
        self.relay(sender, receiver).await
    }

    /// Relay loop over any message sink / stream pair
    ///
    /// The subscription is released on every exit path when it goes out of
    /// scope at the end of this function.
    pub async fn relay<Tx, Rx, E>(mut self, mut sender: Tx, mut receiver: Rx) -> SessionEnd
    where
        Tx: Sink<WsMessage> + Unpin,
        Tx::Error: Display,
        Rx: Stream<Item = Result<WsMessage, E>> + Unpin,
        E: Display,
    {
        let mut subscription = match self.broker.subscribe(self.channels.clone()) {
            Ok(subscription) => subscription,
            Err(e) => {
                tracing::error!(channels = %self.channels, error = %e, "Subscription refused");
                let _ = sender.send(close_message(close_code::ERROR, e.to_string())).await;
                return SessionEnd::Rejected;
            }
        };

        let session_id = subscription.id();
        tracing::info!(session_id = %session_id, channels = %self.channels, "Client subscribed");

        let end = loop {
            tokio::select! {
                message = subscription.next() => {
                    let Some(message) = message else {
                        break SessionEnd::BrokerClosed;
                    };

                    if let Err(e) = sender.send(WsMessage::Text(message.to_frame())).await {
                        tracing::debug!(session_id = %session_id, error = %e, "WebSocket send failed");
                        break SessionEnd::WriteFailed;
                    }
                }
                frame = receiver.next() => match frame {
                    Some(Ok(WsMessage::Close(_))) | None => break SessionEnd::PeerClosed,
                    // Clients have nothing to say on a subscription
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(session_id = %session_id, error = %e, "WebSocket receive error");
                        break SessionEnd::PeerClosed;
                    }
                },
                _ = shutdown_requested(&mut self.shutdown) => {
                    let _ = sender
                        .send(close_message(close_code::AWAY, "server shutting down"))
                        .await;
                    break SessionEnd::Shutdown;
                }
            }
        };

        subscription.close();
        tracing::info!(session_id = %session_id, reason = ?end, "Client disconnected");
        end
    }
}

fn close_message(code: u16, reason: impl Into<String>) -> WsMessage {
    WsMessage::Close(Some(CloseFrame {
        code,
        reason: reason.into().into(),
    }))
}

/// Resolves once the shutdown flag is set; never if the sender goes away
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
