//! Top-level entry point.

use std::sync::Arc;

use cableway_core::config::ClientConfig;
use cableway_core::error::{CableError, ConfigError, Result};
use cableway_core::protocol::DEFAULT_MOUNT_PATH;
use url::Url;

use crate::consumer::Consumer;
use crate::host::{HostEnvironment, NullHost};
use crate::transport::{TransportFactory, WsConnector};

/// Factory for [`Consumer`] handles.
///
/// Carries the client configuration, the transport factory, and the host
/// environment. The defaults give a production WebSocket client with no
/// host integration:
///
/// ```
/// use cableway_client::Cable;
///
/// let consumer = Cable::new()
///     .create_consumer(Some("https://example.com/cable"))
///     .unwrap();
/// assert_eq!(consumer.connection().url(), "wss://example.com/cable");
/// ```
#[derive(Default)]
pub struct Cable {
    config: ClientConfig,
    factory: Option<Arc<dyn TransportFactory>>,
    host: Option<Arc<dyn HostEnvironment>>,
}

impl Cable {
    /// Creates an entry point with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the client configuration.
    #[must_use]
    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the transport factory; tests use this to substitute an
    /// in-memory transport.
    #[must_use]
    pub fn with_transport_factory(mut self, factory: Arc<dyn TransportFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Replaces the host environment.
    #[must_use]
    pub fn with_host(mut self, host: Arc<dyn HostEnvironment>) -> Self {
        self.host = Some(host);
        self
    }

    /// Creates a consumer for the endpoint.
    ///
    /// With no explicit URL the host environment's `"url"` setting is
    /// consulted, then the default mount path. `http`/`https` schemes are
    /// rewritten to `ws`/`wss`; relative or otherwise unusable endpoints
    /// are a [`ConfigError`].
    pub fn create_consumer(&self, url: Option<&str>) -> Result<Consumer> {
        self.config.validate().map_err(CableError::from)?;

        let host: Arc<dyn HostEnvironment> = self
            .host
            .clone()
            .unwrap_or_else(|| Arc::new(NullHost));
        let raw = url
            .map(str::to_string)
            .or_else(|| host.setting("url"))
            .unwrap_or_else(|| DEFAULT_MOUNT_PATH.to_string());
        let endpoint = web_socket_url(&raw)?;

        let factory: Arc<dyn TransportFactory> = self
            .factory
            .clone()
            .unwrap_or_else(|| Arc::new(WsConnector::new(self.config.connect_timeout())));

        Ok(Consumer::new(endpoint, self.config.clone(), factory, host))
    }
}

/// Normalizes an endpoint to a WebSocket URL.
fn web_socket_url(raw: &str) -> std::result::Result<String, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEndpoint {
        url: raw.to_string(),
        reason,
    };

    let mut parsed = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "ws" | "wss" => {}
        "http" => parsed
            .set_scheme("ws")
            .map_err(|()| invalid("cannot rewrite scheme to ws".to_string()))?,
        "https" => parsed
            .set_scheme("wss")
            .map_err(|()| invalid("cannot rewrite scheme to wss".to_string()))?,
        other => return Err(invalid(format!("unsupported scheme `{other}`"))),
    }
    Ok(parsed.to_string())
}
