//! Channel Broker
//!
//! Process-wide publish/subscribe primitive. Maps channel names to the
//! delivery endpoints of the sessions subscribed to them.
//!
//! ## Architecture
//!
//! - **Broker**: channel registry, fan-out and lifecycle
//! - **Subscription**: per-session delivery handle, a `Stream` of messages
//! - **Message / ChannelSet**: the values flowing through the broker
//!
//! ## Delivery model
//!
//! ```text
//! publish(channel, payload)
//!   → read-lock channel map → lock channel entry
//!   → try_send to every endpoint (full queue = drop for that session)
//!   → unregister endpoints whose session is gone
//! ```
//!
//! Channels exist only while at least one subscription references them.

mod error;
mod hub;
mod message;
mod subscription;

pub use error::BrokerError;
pub use hub::{Broker, BrokerConfig, PublishReceipt, SubscriberId};
pub use message::{ChannelSet, Message};
pub use subscription::Subscription;
