//! Client configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;
use crate::protocol::DEFAULT_SUBPROTOCOLS;

/// Configuration for the cableway client.
///
/// Contains the subprotocol offer and the timing knobs of the reconnection
/// machinery. Every field has a serde default, so a config deserialized from
/// an empty document matches [`ClientConfig::default`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Subprotocols offered during the handshake; all but the last are
    /// supported dialects, the last is the unsupported fallback sentinel.
    #[serde(default = "default_subprotocols")]
    pub subprotocols: Vec<String>,

    /// Connect handshake timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Delay between closing a live socket and reopening it, in milliseconds.
    #[serde(default = "default_reopen_delay_ms")]
    pub reopen_delay_ms: u64,

    /// Seconds without a ping before the connection counts as stale.
    #[serde(default = "default_stale_threshold_secs")]
    pub stale_threshold_secs: f64,

    /// Lower clamp of the liveness poll interval, in seconds.
    #[serde(default = "default_poll_interval_min_secs")]
    pub poll_interval_min_secs: f64,

    /// Upper clamp of the liveness poll interval, in seconds.
    #[serde(default = "default_poll_interval_max_secs")]
    pub poll_interval_max_secs: f64,

    /// Settle delay after a foreground regain before re-checking liveness,
    /// in milliseconds.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

fn default_subprotocols() -> Vec<String> {
    DEFAULT_SUBPROTOCOLS.iter().map(ToString::to_string).collect()
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_reopen_delay_ms() -> u64 {
    500
}

fn default_stale_threshold_secs() -> f64 {
    6.0
}

fn default_poll_interval_min_secs() -> f64 {
    3.0
}

fn default_poll_interval_max_secs() -> f64 {
    30.0
}

fn default_settle_delay_ms() -> u64 {
    200
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            subprotocols: default_subprotocols(),
            connect_timeout_ms: default_connect_timeout_ms(),
            reopen_delay_ms: default_reopen_delay_ms(),
            stale_threshold_secs: default_stale_threshold_secs(),
            poll_interval_min_secs: default_poll_interval_min_secs(),
            poll_interval_max_secs: default_poll_interval_max_secs(),
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

impl ClientConfig {
    /// Creates a new builder for `ClientConfig`.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Returns the connect timeout as a Duration.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Returns the reopen delay as a Duration.
    #[must_use]
    pub fn reopen_delay(&self) -> Duration {
        Duration::from_millis(self.reopen_delay_ms)
    }

    /// Returns the stale threshold as a Duration.
    #[must_use]
    pub fn stale_threshold(&self) -> Duration {
        Duration::from_secs_f64(self.stale_threshold_secs)
    }

    /// Returns the foreground settle delay as a Duration.
    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Validates internal consistency of the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.subprotocols.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "subprotocols".to_string(),
                reason: "at least one subprotocol is required".to_string(),
            });
        }
        if self.poll_interval_min_secs <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "poll_interval_min_secs".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.poll_interval_min_secs > self.poll_interval_max_secs {
            return Err(ConfigError::InvalidValue {
                field: "poll_interval_min_secs".to_string(),
                reason: "must not exceed poll_interval_max_secs".to_string(),
            });
        }
        if self.stale_threshold_secs <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "stale_threshold_secs".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Builder for `ClientConfig`.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    subprotocols: Option<Vec<String>>,
    connect_timeout_ms: Option<u64>,
    reopen_delay_ms: Option<u64>,
    stale_threshold_secs: Option<f64>,
    poll_interval_min_secs: Option<f64>,
    poll_interval_max_secs: Option<f64>,
    settle_delay_ms: Option<u64>,
}

impl ClientConfigBuilder {
    /// Sets the subprotocol offer.
    #[must_use]
    pub fn subprotocols(mut self, subprotocols: Vec<String>) -> Self {
        self.subprotocols = Some(subprotocols);
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Sets the reopen delay.
    #[must_use]
    pub fn reopen_delay(mut self, delay: Duration) -> Self {
        self.reopen_delay_ms = Some(delay.as_millis() as u64);
        self
    }

    /// Sets the stale threshold in seconds.
    #[must_use]
    pub fn stale_threshold_secs(mut self, secs: f64) -> Self {
        self.stale_threshold_secs = Some(secs);
        self
    }

    /// Sets the poll interval clamp in seconds.
    #[must_use]
    pub fn poll_interval_secs(mut self, min: f64, max: f64) -> Self {
        self.poll_interval_min_secs = Some(min);
        self.poll_interval_max_secs = Some(max);
        self
    }

    /// Sets the foreground settle delay.
    #[must_use]
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay_ms = Some(delay.as_millis() as u64);
        self
    }

    /// Builds the `ClientConfig`.
    #[must_use]
    pub fn build(self) -> ClientConfig {
        ClientConfig {
            subprotocols: self.subprotocols.unwrap_or_else(default_subprotocols),
            connect_timeout_ms: self
                .connect_timeout_ms
                .unwrap_or_else(default_connect_timeout_ms),
            reopen_delay_ms: self.reopen_delay_ms.unwrap_or_else(default_reopen_delay_ms),
            stale_threshold_secs: self
                .stale_threshold_secs
                .unwrap_or_else(default_stale_threshold_secs),
            poll_interval_min_secs: self
                .poll_interval_min_secs
                .unwrap_or_else(default_poll_interval_min_secs),
            poll_interval_max_secs: self
                .poll_interval_max_secs
                .unwrap_or_else(default_poll_interval_max_secs),
            settle_delay_ms: self.settle_delay_ms.unwrap_or_else(default_settle_delay_ms),
        }
    }
}
