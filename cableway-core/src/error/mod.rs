//! Error types and handling.
//!
//! Nothing in this client is fatal to the host process: send and open
//! attempts against an unready socket report `false` instead of erroring,
//! and server-side subscription rejections surface through callbacks. The
//! error types here cover the remaining failure surface — transport-level
//! faults and configuration problems.

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod config;
mod transport;

pub use config::ConfigError;
pub use transport::TransportError;

/// Top-level error type for the cableway client.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CableError {
    /// Transport-level error.
    #[error("{0}")]
    Transport(#[from] TransportError),

    /// Configuration error.
    #[error("{0}")]
    Config(#[from] ConfigError),
}

impl CableError {
    /// Returns true if this error is recoverable (can be retried).
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_recoverable(),
            Self::Config(_) => false,
        }
    }

    /// Returns the error category as a string.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Config(_) => "config",
        }
    }

    /// Returns the inner transport error, if this is a transport error.
    #[must_use]
    pub fn as_transport_error(&self) -> Option<&TransportError> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Config(_) => None,
        }
    }
}

/// A specialized Result type for cableway operations.
pub type Result<T> = std::result::Result<T, CableError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_conversion() {
        let transport_err = TransportError::Timeout { timeout_ms: 5000 };
        let err: CableError = transport_err.clone().into();
        assert_eq!(err.category(), "transport");
        assert_eq!(err.as_transport_error(), Some(&transport_err));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_config_error_is_not_recoverable() {
        let err: CableError = ConfigError::InvalidEndpoint {
            url: "cable".to_string(),
            reason: "relative URL without a base".to_string(),
        }
        .into();
        assert_eq!(err.category(), "config");
        assert!(!err.is_recoverable());
        assert!(err.as_transport_error().is_none());
    }

    #[test]
    fn test_serde_roundtrip() {
        let err = CableError::Transport(TransportError::Closed {
            reason: "server went away".to_string(),
        });
        let json = serde_json::to_string(&err).unwrap();
        let parsed: CableError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, parsed);
    }
}
