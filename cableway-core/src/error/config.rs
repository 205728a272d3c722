//! Configuration error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error for client setup problems.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigError {
    /// The endpoint URL could not be parsed or is not usable.
    #[error("[Config] Invalid endpoint `{url}`: {reason}")]
    InvalidEndpoint {
        /// The offending URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A configuration field holds an unusable value.
    #[error("[Config] Invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// The offending field.
        field: String,
        /// Why it was rejected.
        reason: String,
    },
}
