//! Channel descriptors and canonical identifiers.
//!
//! A channel is selected by a parameter mapping such as
//! `{"channel": "ChatChannel", "room": 42}`. The serialized form of that
//! mapping is the identifier the server echoes back on every envelope, so it
//! must be canonical: two structurally equal mappings always serialize to
//! the same bytes. Parameters are kept in a `BTreeMap`, which makes the
//! serialization key-sorted and therefore stable.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// The parameter key that names the channel class on the server.
pub const CHANNEL_KEY: &str = "channel";

/// A channel selector: the parameter mapping that picks one logical channel
/// on the server.
///
/// A bare channel name wraps into a single-key mapping:
///
/// ```
/// use cableway_core::channel::ChannelId;
///
/// let chat = ChannelId::from("ChatChannel");
/// assert_eq!(chat.identifier().as_str(), r#"{"channel":"ChatChannel"}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ChannelId {
    params: BTreeMap<String, Value>,
}

impl ChannelId {
    /// Creates a selector for the named channel with no extra parameters.
    #[must_use]
    pub fn new(channel: impl Into<String>) -> Self {
        let mut params = BTreeMap::new();
        params.insert(CHANNEL_KEY.to_string(), Value::String(channel.into()));
        Self { params }
    }

    /// Adds a parameter to the selector.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Returns the channel class name, if the selector carries one.
    #[must_use]
    pub fn channel(&self) -> Option<&str> {
        self.params.get(CHANNEL_KEY).and_then(Value::as_str)
    }

    /// Returns the full parameter mapping.
    #[must_use]
    pub fn params(&self) -> &BTreeMap<String, Value> {
        &self.params
    }

    /// Returns the canonical identifier for this selector.
    #[must_use]
    pub fn identifier(&self) -> Identifier {
        // BTreeMap<String, Value> serialization cannot fail: keys are
        // strings and Value is always representable as JSON.
        let raw = serde_json::to_string(&self.params)
            .expect("channel params always serialize to JSON");
        Identifier(raw)
    }
}

impl From<&str> for ChannelId {
    fn from(channel: &str) -> Self {
        Self::new(channel)
    }
}

impl From<String> for ChannelId {
    fn from(channel: String) -> Self {
        Self::new(channel)
    }
}

impl From<BTreeMap<String, Value>> for ChannelId {
    fn from(params: BTreeMap<String, Value>) -> Self {
        Self { params }
    }
}

/// Canonical serialized form of a channel selector; the multiplexing key.
///
/// The server echoes identifiers byte-for-byte, so equality is plain string
/// equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Wraps an identifier string received off the wire.
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
