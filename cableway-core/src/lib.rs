//! # Cableway Core
//!
//! Protocol data model for the cableway client: an async Rust client for the
//! Action Cable pub/sub wire protocol.
//!
//! This crate provides:
//! - Inbound envelope and outbound command types for the JSON wire format
//! - Canonical channel identifiers (the multiplexing key)
//! - Error types and handling
//! - Client configuration with serde support and a builder
//!
//! Everything here is transport-agnostic; the socket machinery lives in
//! `cableway-client`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

/// Channel descriptors and canonical identifiers
pub mod channel;

/// Client configuration
pub mod config;

/// Error types and handling
pub mod error;

/// Wire envelope and command types
pub mod protocol;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::channel::{ChannelId, Identifier};
    pub use crate::config::{ClientConfig, ClientConfigBuilder};
    pub use crate::error::{CableError, ConfigError, Result, TransportError};
    pub use crate::protocol::{Command, Envelope, MessageType};
}
