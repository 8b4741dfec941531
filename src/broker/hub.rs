//! Channel Broker
//!
//! Manages the channel → subscriber registry and message fan-out.
//! Each session gets a bounded tokio mpsc queue; the broker keeps only the
//! sending half and never waits on it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use super::error::BrokerError;
use super::message::{ChannelSet, Message};
use super::subscription::Subscription;

/// Unique identifier for a subscribed session
pub type SubscriberId = Uuid;

/// Configuration for the broker
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Capacity of each session's delivery queue
    pub subscriber_buffer: usize,
    /// Maximum number of concurrent subscriptions
    pub max_subscribers: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer: 256,
            max_subscribers: 10_000,
        }
    }
}

/// Outcome of a single publish
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReceipt {
    /// Sessions the message was queued for
    pub delivered: usize,
    /// Sessions whose queue was full; the message was dropped for them
    pub dropped: usize,
}

/// Delivery endpoint of one session on one channel
struct Endpoint {
    id: SubscriberId,
    sender: mpsc::Sender<Message>,
}

#[derive(Default)]
struct RegistryState {
    /// Channel → endpoints. The per-channel mutex serializes publishes to
    /// that channel only.
    channels: HashMap<String, Mutex<Vec<Endpoint>>>,
    /// Subscriber → channels it is registered under
    subscribers: HashMap<SubscriberId, ChannelSet>,
    closed: bool,
}

/// Shared registry. Subscriptions hold a weak reference to it.
pub(crate) struct Registry {
    state: RwLock<RegistryState>,
    config: BrokerConfig,
}

impl Registry {
    /// Remove a subscriber from every channel it is registered under.
    ///
    /// Returns false if it was not registered.
    pub(crate) fn remove(&self, id: SubscriberId) -> Result<bool, BrokerError> {
        let mut state = self.state.write().map_err(|_| BrokerError::Poisoned)?;

        let Some(channels) = state.subscribers.remove(&id) else {
            return Ok(false);
        };

        for channel in channels.iter() {
            let now_empty = match state.channels.get_mut(channel) {
                Some(entry) => {
                    let endpoints = entry.get_mut().map_err(|_| BrokerError::Poisoned)?;
                    endpoints.retain(|e| e.id != id);
                    endpoints.is_empty()
                }
                None => false,
            };

            // Channels only live as long as someone listens
            if now_empty {
                state.channels.remove(channel);
            }
        }

        tracing::debug!(subscriber_id = %id, channels = %channels, "Unsubscribed");
        Ok(true)
    }
}

/// Process-wide publish/subscribe broker
pub struct Broker {
    registry: Arc<Registry>,
}

impl Broker {
    /// Create a new broker
    pub fn new(config: BrokerConfig) -> Self {
        Self {
            registry: Arc::new(Registry {
                state: RwLock::new(RegistryState::default()),
                config,
            }),
        }
    }

    /// Publish a payload to every session currently subscribed to `channel`
    ///
    /// Never waits on a subscriber: a full queue drops the message for that
    /// session, a closed queue gets the session unregistered. Publishing to a
    /// channel without subscribers is a successful no-op.
    pub fn publish(&self, channel: &str, payload: &str) -> Result<PublishReceipt, BrokerError> {
        let mut receipt = PublishReceipt::default();
        let mut gone = Vec::new();

        {
            let state = self
                .registry
                .state
                .read()
                .map_err(|_| BrokerError::Poisoned)?;
            if state.closed {
                return Err(BrokerError::Closed);
            }

            if let Some(entry) = state.channels.get(channel) {
                let endpoints = entry.lock().map_err(|_| BrokerError::Poisoned)?;
                let message = Message::new(channel, payload);

                for endpoint in endpoints.iter() {
                    match endpoint.sender.try_send(message.clone()) {
                        Ok(()) => receipt.delivered += 1,
                        Err(TrySendError::Full(_)) => {
                            receipt.dropped += 1;
                            tracing::debug!(
                                channel = %channel,
                                subscriber_id = %endpoint.id,
                                "Subscriber queue full, message dropped"
                            );
                        }
                        Err(TrySendError::Closed(_)) => gone.push(endpoint.id),
                    }
                }
            }
        }

        for id in gone {
            self.registry.remove(id)?;
        }

        tracing::trace!(
            channel = %channel,
            delivered = receipt.delivered,
            dropped = receipt.dropped,
            "Published"
        );

        Ok(receipt)
    }

    /// Register a new session under every channel in `channels`
    ///
    /// Registration is atomic: a concurrent publish sees either all of the
    /// session's channels or none of them.
    pub fn subscribe(&self, channels: ChannelSet) -> Result<Subscription, BrokerError> {
        let config = &self.registry.config;
        let (sender, receiver) = mpsc::channel(config.subscriber_buffer.max(1));
        let id = Uuid::new_v4();

        {
            let mut state = self
                .registry
                .state
                .write()
                .map_err(|_| BrokerError::Poisoned)?;
            if state.closed {
                return Err(BrokerError::Closed);
            }
            if state.subscribers.len() >= config.max_subscribers {
                return Err(BrokerError::TooManySubscribers(config.max_subscribers));
            }

            for channel in channels.iter() {
                state
                    .channels
                    .entry(channel.to_string())
                    .or_default()
                    .get_mut()
                    .map_err(|_| BrokerError::Poisoned)?
                    .push(Endpoint {
                        id,
                        sender: sender.clone(),
                    });
            }
            state.subscribers.insert(id, channels.clone());
        }

        tracing::debug!(subscriber_id = %id, channels = %channels, "Subscribed");

        Ok(Subscription::new(
            id,
            channels,
            receiver,
            Arc::downgrade(&self.registry),
        ))
    }

    /// Remove a subscription from every channel. Idempotent.
    pub fn unsubscribe(&self, subscription: &mut Subscription) {
        subscription.close();
    }

    /// Shut the broker down
    ///
    /// Drops every delivery endpoint, which ends every open subscription
    /// stream. Later publishes and subscribes fail with [`BrokerError::Closed`].
    pub fn close(&self) -> Result<(), BrokerError> {
        let mut state = self
            .registry
            .state
            .write()
            .map_err(|_| BrokerError::Poisoned)?;
        if state.closed {
            return Ok(());
        }

        state.closed = true;
        let channels = std::mem::take(&mut state.channels);
        let subscribers = std::mem::take(&mut state.subscribers);
        drop(state);

        tracing::info!(
            channels = channels.len(),
            subscribers = subscribers.len(),
            "Broker closed"
        );
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.registry
            .state
            .read()
            .map(|s| s.closed)
            .unwrap_or(true)
    }

    /// Number of channels with at least one subscriber
    pub fn channel_count(&self) -> usize {
        self.registry
            .state
            .read()
            .map(|s| s.channels.len())
            .unwrap_or(0)
    }

    /// Number of active subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.registry
            .state
            .read()
            .map(|s| s.subscribers.len())
            .unwrap_or(0)
    }

    /// Number of subscriptions registered under one channel
    pub fn channel_subscriber_count(&self, channel: &str) -> usize {
        let Ok(state) = self.registry.state.read() else {
            return 0;
        };
        state
            .channels
            .get(channel)
            .and_then(|entry| entry.lock().ok().map(|e| e.len()))
            .unwrap_or(0)
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new(BrokerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{FutureExt, StreamExt};

    fn channels(names: &[&str]) -> ChannelSet {
        ChannelSet::new(names.iter().copied()).unwrap()
    }

    fn try_next(sub: &mut Subscription) -> Option<Message> {
        sub.recv().now_or_never().flatten()
    }

    #[test]
    fn test_default_config() {
        let config = BrokerConfig::default();
        assert_eq!(config.subscriber_buffer, 256);
        assert_eq!(config.max_subscribers, 10_000);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let broker = Broker::default();

        let receipt = broker.publish("room1", "hi").unwrap();
        assert_eq!(receipt, PublishReceipt::default());
        assert_eq!(broker.channel_count(), 0);
    }

    #[tokio::test]
    async fn test_fan_out_to_every_subscriber() {
        let broker = Broker::default();
        let mut a = broker.subscribe(channels(&["room1"])).unwrap();
        let mut b = broker.subscribe(channels(&["room1"])).unwrap();

        let receipt = broker.publish("room1", "hello").unwrap();
        assert_eq!(receipt.delivered, 2);

        assert_eq!(a.recv().await.unwrap().to_frame(), "[room1] hello");
        assert_eq!(b.recv().await.unwrap().to_frame(), "[room1] hello");
        assert!(try_next(&mut a).is_none());
        assert!(try_next(&mut b).is_none());
    }

    #[tokio::test]
    async fn test_multi_channel_subscription() {
        let broker = Broker::default();
        let mut sub = broker.subscribe(channels(&["room1", "room2"])).unwrap();

        broker.publish("room1", "a").unwrap();
        broker.publish("room3", "ignored").unwrap();
        broker.publish("room2", "b").unwrap();

        assert_eq!(sub.recv().await.unwrap().to_frame(), "[room1] a");
        assert_eq!(sub.recv().await.unwrap().to_frame(), "[room2] b");
        assert!(try_next(&mut sub).is_none());
    }

    #[tokio::test]
    async fn test_channels_are_case_sensitive() {
        let broker = Broker::default();
        let mut sub = broker.subscribe(channels(&["Room"])).unwrap();

        broker.publish("room", "lower").unwrap();
        assert!(try_next(&mut sub).is_none());
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_messages() {
        let broker = Broker::default();
        broker.publish("room1", "before").unwrap();

        let mut sub = broker.subscribe(channels(&["room1"])).unwrap();
        broker.publish("room1", "after").unwrap();

        assert_eq!(sub.recv().await.unwrap().payload(), "after");
        assert!(try_next(&mut sub).is_none());
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent() {
        let broker = Broker::default();
        let mut sub = broker.subscribe(channels(&["room1", "room2"])).unwrap();
        assert_eq!(broker.subscriber_count(), 1);
        assert_eq!(broker.channel_count(), 2);

        broker.unsubscribe(&mut sub);
        broker.unsubscribe(&mut sub);
        sub.close();

        assert!(sub.is_closed());
        assert_eq!(broker.subscriber_count(), 0);
        assert_eq!(broker.channel_count(), 0);

        let receipt = broker.publish("room1", "late").unwrap();
        assert_eq!(receipt.delivered, 0);
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let broker = Broker::default();
        let keep = broker.subscribe(channels(&["room1"])).unwrap();
        let gone = broker.subscribe(channels(&["room1", "room2"])).unwrap();
        assert_eq!(broker.channel_subscriber_count("room1"), 2);

        drop(gone);

        assert_eq!(broker.channel_subscriber_count("room1"), 1);
        assert_eq!(broker.channel_subscriber_count("room2"), 0);
        assert_eq!(broker.channel_count(), 1);
        drop(keep);
        assert_eq!(broker.channel_count(), 0);
    }

    #[tokio::test]
    async fn test_subscription_outlives_broker() {
        let broker = Broker::default();
        let mut sub = broker.subscribe(channels(&["room1"])).unwrap();

        drop(broker);

        assert!(sub.recv().await.is_none());
        sub.close();
    }

    #[tokio::test]
    async fn test_close_ends_streams_and_rejects_calls() {
        let broker = Broker::default();
        let mut sub = broker.subscribe(channels(&["room1"])).unwrap();

        broker.close().unwrap();
        broker.close().unwrap();

        assert!(broker.is_closed());
        assert!(sub.next().await.is_none());
        assert!(matches!(
            broker.publish("room1", "x"),
            Err(BrokerError::Closed)
        ));
        assert!(matches!(
            broker.subscribe(channels(&["room1"])),
            Err(BrokerError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_subscriber_limit() {
        let broker = Broker::new(BrokerConfig {
            subscriber_buffer: 8,
            max_subscribers: 2,
        });

        let _a = broker.subscribe(channels(&["a"])).unwrap();
        let b = broker.subscribe(channels(&["b"])).unwrap();
        let result = broker.subscribe(channels(&["c"]));
        assert!(matches!(result, Err(BrokerError::TooManySubscribers(2))));

        drop(b);
        assert!(broker.subscribe(channels(&["c"])).is_ok());
    }

    #[tokio::test]
    async fn test_slow_subscriber_drops_without_blocking_others() {
        let broker = Broker::new(BrokerConfig {
            subscriber_buffer: 2,
            max_subscribers: 10,
        });
        let mut slow = broker.subscribe(channels(&["room1"])).unwrap();
        let mut fast = broker.subscribe(channels(&["room1"])).unwrap();

        let mut receipts = Vec::new();
        for i in 0..4 {
            receipts.push(broker.publish("room1", &i.to_string()).unwrap());
            assert_eq!(fast.recv().await.unwrap().payload(), i.to_string());
        }

        assert_eq!(receipts[0], PublishReceipt { delivered: 2, dropped: 0 });
        assert_eq!(receipts[3], PublishReceipt { delivered: 1, dropped: 1 });

        assert_eq!(try_next(&mut slow).unwrap().payload(), "0");
        assert_eq!(try_next(&mut slow).unwrap().payload(), "1");
        assert!(try_next(&mut slow).is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_order_for_every_subscriber() {
        let broker = Arc::new(Broker::new(BrokerConfig {
            subscriber_buffer: 1024,
            max_subscribers: 10,
        }));
        let mut a = broker.subscribe(channels(&["room1"])).unwrap();
        let mut b = broker.subscribe(channels(&["room1"])).unwrap();

        let mut publishers = Vec::new();
        for p in 0..4 {
            let broker = Arc::clone(&broker);
            publishers.push(tokio::spawn(async move {
                for i in 0..100 {
                    broker.publish("room1", &format!("{p}-{i}")).unwrap();
                }
            }));
        }
        for handle in publishers {
            handle.await.unwrap();
        }

        let mut seen_a = Vec::new();
        let mut seen_b = Vec::new();
        for _ in 0..400 {
            seen_a.push(a.recv().await.unwrap());
            seen_b.push(b.recv().await.unwrap());
        }
        assert_eq!(seen_a, seen_b);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_disconnect_racing_publish() {
        let broker = Arc::new(Broker::default());

        let publisher = {
            let broker = Arc::clone(&broker);
            tokio::spawn(async move {
                for i in 0..1000 {
                    broker.publish("room1", &i.to_string()).unwrap();
                    tokio::task::yield_now().await;
                }
            })
        };

        for _ in 0..50 {
            let mut sub = broker.subscribe(channels(&["room1"])).unwrap();
            let _ = try_next(&mut sub);
            drop(sub);
            tokio::task::yield_now().await;
        }

        publisher.await.unwrap();
        assert_eq!(broker.subscriber_count(), 0);
        assert_eq!(broker.channel_count(), 0);
    }
}
