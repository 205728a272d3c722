//! Wire envelope and command types.
//!
//! The protocol is JSON over text frames. The server pushes envelopes typed
//! by an optional `type` field; an absent `type` marks a data message for a
//! channel. The client sends commands tagged by a `command` field.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::channel::Identifier;

/// Default subprotocol list offered during the handshake.
///
/// All entries but the last are dialects the client speaks; the final entry
/// is the fallback sentinel a server selects when it supports none of them.
pub const DEFAULT_SUBPROTOCOLS: [&str; 2] = ["actioncable-v1-json", "actioncable-unsupported"];

/// Default mount path of the cable endpoint.
pub const DEFAULT_MOUNT_PATH: &str = "/cable";

/// Inbound envelope types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Connection accepted; subscriptions must be replayed.
    Welcome,
    /// Server liveness ping.
    Ping,
    /// A subscribe command was accepted.
    ConfirmSubscription,
    /// A subscribe command was refused; terminal for that identifier.
    RejectSubscription,
    /// A `type` string this client does not know; treated as a data message.
    #[serde(other)]
    Unknown,
}

/// A parsed inbound envelope.
///
/// `type` is optional: its absence signals a data message, which requires
/// `identifier` and carries the payload in `message`.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    /// Envelope type; `None` for data messages.
    #[serde(rename = "type")]
    pub message_type: Option<MessageType>,
    /// Identifier of the channel the envelope addresses, if any.
    pub identifier: Option<String>,
    /// Payload for data messages and pings.
    pub message: Option<Value>,
}

impl Envelope {
    /// Parses a text frame into an envelope.
    ///
    /// # Errors
    ///
    /// Returns the underlying JSON error when the frame is not a valid
    /// envelope. Malformed frames are a per-frame condition: callers drop
    /// and log them rather than tearing the connection down.
    pub fn parse(text: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Returns true if this envelope is a data message for a channel.
    #[must_use]
    pub fn is_data(&self) -> bool {
        matches!(self.message_type, None | Some(MessageType::Unknown))
    }
}

/// An outbound command.
///
/// Serialized field order is `command`, `identifier`[, `data`], which is the
/// canonical wire shape tests assert against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Register interest in a channel.
    Subscribe {
        /// Channel identifier.
        identifier: Identifier,
    },
    /// Withdraw interest in a channel.
    Unsubscribe {
        /// Channel identifier.
        identifier: Identifier,
    },
    /// Deliver an action payload to a channel.
    Message {
        /// Channel identifier.
        identifier: Identifier,
        /// JSON-encoded `{action, ...params}` payload.
        data: String,
    },
}

impl Command {
    /// Creates a subscribe command.
    #[must_use]
    pub fn subscribe(identifier: Identifier) -> Self {
        Self::Subscribe { identifier }
    }

    /// Creates an unsubscribe command.
    #[must_use]
    pub fn unsubscribe(identifier: Identifier) -> Self {
        Self::Unsubscribe { identifier }
    }

    /// Creates a message command carrying an already-encoded payload.
    #[must_use]
    pub fn message(identifier: Identifier, data: String) -> Self {
        Self::Message { identifier, data }
    }

    /// Returns the identifier the command addresses.
    #[must_use]
    pub fn identifier(&self) -> &Identifier {
        match self {
            Self::Subscribe { identifier }
            | Self::Unsubscribe { identifier }
            | Self::Message { identifier, .. } => identifier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelId;

    #[test]
    fn test_subscribe_wire_shape() {
        let command = Command::subscribe(ChannelId::new("Chat").param("room", 1).identifier());
        let wire = serde_json::to_string(&command).unwrap();
        assert_eq!(
            wire,
            r#"{"command":"subscribe","identifier":"{\"channel\":\"Chat\",\"room\":1}"}"#
        );
    }

    #[test]
    fn test_message_wire_shape() {
        let command = Command::message(
            ChannelId::new("Chat").identifier(),
            r#"{"action":"speak","body":"hi"}"#.to_string(),
        );
        let wire = serde_json::to_string(&command).unwrap();
        assert!(wire.starts_with(r#"{"command":"message","#));
        assert!(wire.contains(r#""data":"{\"action\":\"speak\""#));
    }

    #[test]
    fn test_parse_typed_envelopes() {
        let welcome = Envelope::parse(r#"{"type":"welcome"}"#).unwrap();
        assert_eq!(welcome.message_type, Some(MessageType::Welcome));
        assert!(!welcome.is_data());

        let ping = Envelope::parse(r#"{"type":"ping","message":1700000000}"#).unwrap();
        assert_eq!(ping.message_type, Some(MessageType::Ping));

        let confirm =
            Envelope::parse(r#"{"type":"confirm_subscription","identifier":"{}"}"#).unwrap();
        assert_eq!(confirm.message_type, Some(MessageType::ConfirmSubscription));
        assert_eq!(confirm.identifier.as_deref(), Some("{}"));

        let reject =
            Envelope::parse(r#"{"type":"reject_subscription","identifier":"{}"}"#).unwrap();
        assert_eq!(reject.message_type, Some(MessageType::RejectSubscription));
    }

    #[test]
    fn test_absent_type_is_data() {
        let data = Envelope::parse(r#"{"identifier":"{}","message":{"body":"hi"}}"#).unwrap();
        assert_eq!(data.message_type, None);
        assert!(data.is_data());
        assert_eq!(data.message.unwrap()["body"], "hi");
    }

    #[test]
    fn test_unknown_type_is_data() {
        let envelope = Envelope::parse(r#"{"type":"disconnect","identifier":"{}"}"#).unwrap();
        assert_eq!(envelope.message_type, Some(MessageType::Unknown));
        assert!(envelope.is_data());
    }

    #[test]
    fn test_malformed_frame_errors() {
        assert!(Envelope::parse("not json").is_err());
        assert!(Envelope::parse(r#"{"type":[]}"#).is_err());
    }

    #[test]
    fn test_subprotocol_list_shape() {
        assert!(DEFAULT_SUBPROTOCOLS.len() >= 2);
        assert_eq!(
            DEFAULT_SUBPROTOCOLS.last().copied(),
            Some("actioncable-unsupported")
        );
    }
}
