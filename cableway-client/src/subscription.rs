//! Per-channel subscription handle and lifecycle callbacks.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Weak};
use tracing::warn;

use cableway_core::channel::{ChannelId, Identifier};

use crate::subscriptions::Subscriptions;

/// Lifecycle callbacks for one channel subscription.
///
/// Every method has a no-op default, so implementors override only the
/// events they care about.
#[async_trait]
pub trait ChannelHandler: Send + Sync {
    /// The subscription was created locally; no server round-trip yet.
    async fn initialized(&self) {}

    /// The server confirmed the subscription.
    async fn connected(&self) {}

    /// The transport was lost. `will_reconnect` reports whether the monitor
    /// is still running and will try to restore the connection.
    async fn disconnected(&self, will_reconnect: bool) {
        let _ = will_reconnect;
    }

    /// The server refused the subscription. Terminal: the subscription is
    /// no longer tracked and receives no further dispatch.
    async fn rejected(&self) {}

    /// A data message arrived for this channel.
    async fn received(&self, message: Value) {
        let _ = message;
    }
}

/// A lifecycle event dispatched to a [`ChannelHandler`].
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// Local creation.
    Initialized,
    /// Server confirmation.
    Connected,
    /// Transport loss.
    Disconnected {
        /// Whether the monitor will attempt a reconnect.
        will_reconnect: bool,
    },
    /// Server rejection; terminal.
    Rejected,
    /// Data message payload.
    Received(Value),
}

/// Handle for one channel subscription.
///
/// Created by [`Subscriptions::create`] and owned by the registry until it
/// is removed; a handle kept after removal stays callable but every send
/// reports failure.
pub struct Subscription {
    channel: ChannelId,
    identifier: Identifier,
    handler: Arc<dyn ChannelHandler>,
    registry: Weak<Subscriptions>,
}

impl Subscription {
    pub(crate) fn new(
        channel: ChannelId,
        handler: Arc<dyn ChannelHandler>,
        registry: Weak<Subscriptions>,
    ) -> Self {
        let identifier = channel.identifier();
        Self {
            channel,
            identifier,
            handler,
            registry,
        }
    }

    /// Returns the channel selector this subscription was created with.
    #[must_use]
    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    /// Returns the canonical identifier.
    #[must_use]
    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// Sends an action to the channel: `action` is merged into `params` and
    /// the result goes out as a `message` command.
    ///
    /// Returns whether the write was attempted. `params` must be a JSON
    /// object or `null`.
    pub fn perform(&self, action: &str, params: Value) -> bool {
        let mut data = match params {
            Value::Object(map) => map,
            Value::Null => serde_json::Map::new(),
            other => {
                warn!(
                    identifier = %self.identifier,
                    params = %other,
                    "action params must be a JSON object"
                );
                return false;
            }
        };
        data.insert("action".to_string(), Value::String(action.to_string()));
        self.send(Value::Object(data))
    }

    /// Sends a raw data payload to the channel.
    ///
    /// Returns false without wire traffic when the subscription is no
    /// longer tracked (removed or rejected).
    pub fn send(&self, data: Value) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.send_message(self, data),
            None => false,
        }
    }

    /// Removes this subscription from the registry. The wire `unsubscribe`
    /// goes out only when no other subscription shares the identifier.
    pub fn unsubscribe(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self);
        }
    }

    /// Invokes the handler method matching the event.
    pub(crate) async fn dispatch(&self, event: ChannelEvent) {
        match event {
            ChannelEvent::Initialized => self.handler.initialized().await,
            ChannelEvent::Connected => self.handler.connected().await,
            ChannelEvent::Disconnected { will_reconnect } => {
                self.handler.disconnected(will_reconnect).await;
            }
            ChannelEvent::Rejected => self.handler.rejected().await,
            ChannelEvent::Received(message) => self.handler.received(message).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;

    #[async_trait]
    impl ChannelHandler for Silent {}

    #[tokio::test]
    async fn test_default_handler_methods_are_noops() {
        // Exercises every default body; nothing to assert beyond not hanging.
        let handler = Silent;
        handler.initialized().await;
        handler.connected().await;
        handler.disconnected(true).await;
        handler.rejected().await;
        handler.received(Value::Null).await;
    }

    #[tokio::test]
    async fn test_send_without_registry_fails() {
        let subscription = Subscription::new(
            ChannelId::new("Chat"),
            Arc::new(Silent),
            Weak::new(),
        );
        assert!(!subscription.send(serde_json::json!({"body": "hi"})));
        assert!(!subscription.perform("speak", Value::Null));
    }

    #[tokio::test]
    async fn test_perform_rejects_non_object_params() {
        let subscription = Subscription::new(
            ChannelId::new("Chat"),
            Arc::new(Silent),
            Weak::new(),
        );
        assert!(!subscription.perform("speak", Value::String("nope".into())));
    }
}
