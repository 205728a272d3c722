//! Inbound envelope parsing and dispatch.

use std::sync::Weak;
use tracing::{debug, warn};

use cableway_core::channel::Identifier;
use cableway_core::error::TransportError;
use cableway_core::protocol::{Envelope, MessageType};

use crate::connection::Connection;
use crate::subscription::ChannelEvent;

/// Routes transport events and inbound frames to the monitor and the
/// subscription registry.
pub(crate) struct MessageRouter {
    connection: Weak<Connection>,
}

impl MessageRouter {
    pub(crate) fn new(connection: Weak<Connection>) -> Self {
        Self { connection }
    }

    /// Handles one inbound text frame.
    ///
    /// All frames are refused while the negotiated subprotocol is the
    /// unsupported sentinel: the payload shape cannot be trusted. Malformed
    /// JSON is dropped and logged; one corrupt frame is not worth the
    /// connection.
    pub(crate) async fn handle_message(&self, text: &str) {
        let Some(connection) = self.connection.upgrade() else {
            return;
        };
        if !connection.is_protocol_supported() {
            return;
        }

        let envelope = match Envelope::parse(text) {
            Ok(envelope) => envelope,
            Err(error) => {
                warn!(%error, "dropping malformed inbound frame");
                return;
            }
        };

        match envelope.message_type {
            Some(MessageType::Welcome) => {
                connection.monitor().record_connect();
                if let Some(registry) = connection.registry() {
                    registry.reload();
                }
            }
            Some(MessageType::Ping) => connection.monitor().record_ping(),
            Some(MessageType::ConfirmSubscription) => {
                let Some(identifier) = envelope.identifier else {
                    warn!("subscription confirmation without identifier");
                    return;
                };
                if let Some(registry) = connection.registry() {
                    registry
                        .notify_identifier(&Identifier::from_raw(identifier), ChannelEvent::Connected)
                        .await;
                }
            }
            Some(MessageType::RejectSubscription) => {
                let Some(identifier) = envelope.identifier else {
                    warn!("subscription rejection without identifier");
                    return;
                };
                if let Some(registry) = connection.registry() {
                    registry.reject(&Identifier::from_raw(identifier)).await;
                }
            }
            // Data message: no type, or a type this client does not know.
            None | Some(MessageType::Unknown) => {
                let Some(identifier) = envelope.identifier else {
                    warn!("data envelope without identifier");
                    return;
                };
                if let Some(registry) = connection.registry() {
                    registry
                        .notify_identifier(
                            &Identifier::from_raw(identifier),
                            ChannelEvent::Received(envelope.message.unwrap_or_default()),
                        )
                        .await;
                }
            }
        }
    }

    /// Handles transport open: clear the disconnect latch and verify the
    /// negotiated subprotocol. A mismatch forces a non-reconnecting close;
    /// retrying cannot help when the peer speaks no compatible dialect.
    pub(crate) async fn handle_open(&self) {
        let Some(connection) = self.connection.upgrade() else {
            return;
        };
        debug!(protocol = ?connection.protocol(), "socket opened");
        connection.clear_disconnected();
        if !connection.is_protocol_supported() {
            warn!(
                protocol = ?connection.protocol(),
                "negotiated subprotocol is unsupported; closing permanently"
            );
            if let Err(error) = connection.close(false) {
                debug!(%error, "failed to close socket after subprotocol mismatch");
            }
        }
    }

    /// Handles transport closure: record the disconnect once and broadcast
    /// it to every tracked subscription, noting whether the monitor will
    /// attempt a reconnect.
    pub(crate) async fn handle_close(&self) {
        let Some(connection) = self.connection.upgrade() else {
            return;
        };
        if connection.latch_disconnected() {
            return;
        }
        debug!("socket closed");
        connection.monitor().record_disconnect();
        let will_reconnect = connection.monitor().is_running();
        if let Some(registry) = connection.registry() {
            registry
                .notify_all(ChannelEvent::Disconnected { will_reconnect })
                .await;
        }
    }

    /// Handles a transport error. Log only; the closure that follows is
    /// reported separately.
    pub(crate) fn handle_error(&self, error: &TransportError) {
        warn!(%error, "socket error");
    }
}
