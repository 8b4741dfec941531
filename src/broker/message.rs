//! Broker message types

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// A message in flight from a publisher to the subscribers of one channel.
///
/// Cheap to clone: both fields are shared, so fan-out to N sessions does not
/// copy the payload N times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    channel: Arc<str>,
    payload: Arc<str>,
}

impl Message {
    /// Create a new message
    pub fn new(channel: &str, payload: &str) -> Self {
        Self {
            channel: Arc::from(channel),
            payload: Arc::from(payload),
        }
    }

    /// Channel the message was published to
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Message body
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Render the text frame sent to subscribers: `[<channel>] <payload>`
    pub fn to_frame(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.channel, self.payload)
    }
}

/// Non-empty, duplicate-free set of channel names, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSet(Vec<String>);

impl ChannelSet {
    /// Build a channel set, skipping empty names and duplicates.
    ///
    /// Returns `None` when no usable channel name remains.
    pub fn new<I, S>(channels: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen: HashSet<String> = HashSet::new();
        let mut names: Vec<String> = Vec::new();
        for channel in channels {
            let channel = channel.into();
            if channel.is_empty() || !seen.insert(channel.clone()) {
                continue;
            }
            names.push(channel);
        }

        if names.is_empty() {
            None
        } else {
            Some(Self(names))
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn contains(&self, channel: &str) -> bool {
        self.0.iter().any(|c| c == channel)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Never true for a constructed set
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ChannelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(","))
    }
}
