//! Socket transport abstraction.
//!
//! The engine talks to a message-oriented, full-duplex text-frame socket
//! through the [`Transport`] trait. Production code uses the
//! tokio-tungstenite implementation ([`WsConnector`]); tests substitute an
//! in-memory fake through [`TransportFactory`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use cableway_core::error::TransportError;

mod ws;

pub use ws::{WsConnector, WsTransport};

/// Ready state of a socket transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadyState {
    /// Handshake in progress.
    Connecting,
    /// Connected; frames flow in both directions.
    Open,
    /// Close requested; waiting for the peer.
    Closing,
    /// Fully closed.
    Closed,
}

impl ReadyState {
    /// Returns true if frames can be written.
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns true if the transport is open or still connecting.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Connecting | Self::Open)
    }

    /// Returns the state as a static lowercase name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Lifecycle and frame events delivered by a transport.
///
/// Exactly one handler is installed per transport; a replaced transport's
/// events are discarded as a unit by the connection's generation guard.
#[async_trait]
pub trait TransportEvents: Send + Sync {
    /// The handshake completed and the socket is open.
    async fn on_open(&self);

    /// A text frame arrived.
    async fn on_message(&self, text: String);

    /// The socket closed (either side, any reason). Fired exactly once.
    async fn on_close(&self);

    /// A transport-level error occurred.
    async fn on_error(&self, error: TransportError);
}

/// A message-oriented, full-duplex text-frame socket.
pub trait Transport: Send + Sync {
    /// Returns the current ready state.
    fn ready_state(&self) -> ReadyState;

    /// Returns the subprotocol the server negotiated, once open.
    fn protocol(&self) -> Option<String>;

    /// Writes a text frame. Returns true if and only if the write was
    /// handed to the socket while it was open; never blocks or queues.
    fn send(&self, text: &str) -> bool;

    /// Requests a close. The eventual closure is reported via
    /// [`TransportEvents::on_close`].
    fn close(&self) -> Result<(), TransportError>;
}

/// Creates transports from an endpoint and a subprotocol offer.
pub trait TransportFactory: Send + Sync {
    /// Opens a new transport. Returns immediately with the transport in the
    /// [`ReadyState::Connecting`] state; the handshake completes
    /// asynchronously and is reported through `events`.
    fn open(
        &self,
        url: &str,
        subprotocols: &[String],
        events: Arc<dyn TransportEvents>,
    ) -> Arc<dyn Transport>;
}
