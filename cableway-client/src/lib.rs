//! # Cableway Client
//!
//! Client engine for a multiplexed pub/sub protocol carried over a single
//! persistent WebSocket. One physical connection carries many logical
//! channels; the server pushes typed envelopes that are routed to per-channel
//! handlers.
//!
//! The engine is four cooperating components:
//! - [`connection::Connection`] - socket lifecycle and subprotocol negotiation
//! - [`monitor::ConnectionMonitor`] - liveness polling and reconnection backoff
//! - `MessageRouter` - envelope parsing and dispatch (internal)
//! - [`subscriptions::Subscriptions`] - channel multiplexing and callback dispatch
//!
//! # Example
//!
//! ```ignore
//! use cableway_client::{Cable, ChannelHandler};
//! use cableway_core::channel::ChannelId;
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! #[async_trait::async_trait]
//! impl ChannelHandler for Printer {
//!     async fn received(&self, message: serde_json::Value) {
//!         println!("got: {message}");
//!     }
//! }
//!
//! let consumer = Cable::new().create_consumer(Some("wss://example.com/cable"))?;
//! let room = consumer
//!     .subscriptions()
//!     .create(ChannelId::new("ChatChannel").param("room", 1), Arc::new(Printer))
//!     .await;
//! room.perform("speak", serde_json::json!({ "body": "hello" }));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

/// Top-level entry point
pub mod cable;

/// Socket lifecycle and subprotocol negotiation
pub mod connection;

/// Consumer facade over one connection and its registry
pub mod consumer;

/// Host environment abstraction (settings, foreground visibility)
pub mod host;

/// Liveness monitoring and reconnection backoff
pub mod monitor;

/// Per-channel subscription handle and callbacks
pub mod subscription;

/// Subscription registry and dispatch
pub mod subscriptions;

/// Socket transport abstraction and production WebSocket implementation
pub mod transport;

mod router;

pub use cable::Cable;
pub use consumer::Consumer;
pub use subscription::{ChannelEvent, ChannelHandler, Subscription};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cable::Cable;
    pub use crate::connection::Connection;
    pub use crate::consumer::Consumer;
    pub use crate::host::{HostEnvironment, NullHost};
    pub use crate::monitor::ConnectionMonitor;
    pub use crate::subscription::{ChannelEvent, ChannelHandler, Subscription};
    pub use crate::subscriptions::Subscriptions;
    pub use crate::transport::{ReadyState, Transport, TransportEvents, TransportFactory};
    pub use cableway_core::prelude::*;
}
