//! Transport-level error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Transport error covering socket connect failures, timeouts, TLS faults,
/// and protocol negotiation problems.
///
/// # Examples
///
/// ```
/// use cableway_core::error::TransportError;
///
/// let error = TransportError::ConnectionFailed {
///     reason: "connection refused".to_string(),
/// };
/// assert!(error.to_string().contains("connection refused"));
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportError {
    /// Connection to the remote endpoint failed.
    #[error("[Transport] Connection failed: {reason}")]
    ConnectionFailed {
        /// Reason for the connection failure.
        reason: String,
    },

    /// Connect handshake timed out.
    #[error("[Transport] Connect timeout after {timeout_ms}ms")]
    Timeout {
        /// Timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// TLS/SSL error occurred.
    #[error("[Transport] TLS error: {reason}")]
    Tls {
        /// Reason for the TLS error.
        reason: String,
    },

    /// WebSocket-level error occurred on an established connection.
    #[error("[Transport] WebSocket error: {reason}")]
    WebSocket {
        /// Reason for the WebSocket error.
        reason: String,
    },

    /// Connection was closed.
    #[error("[Transport] Connection closed: {reason}")]
    Closed {
        /// Reason for the closure.
        reason: String,
    },

    /// The server negotiated a subprotocol the client does not speak.
    #[error("[Transport] Unsupported subprotocol: {negotiated:?}")]
    UnsupportedProtocol {
        /// The subprotocol the server selected, if any.
        negotiated: Option<String>,
    },
}

impl TransportError {
    /// Returns true if this error is recoverable (can be retried).
    ///
    /// A subprotocol mismatch is permanent: the peer does not speak a
    /// compatible dialect, so reconnecting cannot help.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. }
                | Self::Timeout { .. }
                | Self::WebSocket { .. }
                | Self::Closed { .. }
        )
    }
}
