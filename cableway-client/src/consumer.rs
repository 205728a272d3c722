//! Consumer facade: one connection plus its subscription registry.

use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use cableway_core::config::ClientConfig;

use crate::connection::Connection;
use crate::host::HostEnvironment;
use crate::subscriptions::Subscriptions;
use crate::transport::TransportFactory;

/// Handle for one logical cable connection.
///
/// Cheap to clone; all clones share the same connection and registry. The
/// socket is opened lazily: either explicitly through [`connect`], or by the
/// first subscription created through [`subscriptions`].
///
/// [`connect`]: Consumer::connect
/// [`subscriptions`]: Consumer::subscriptions
#[derive(Clone)]
pub struct Consumer {
    connection: Arc<Connection>,
    subscriptions: Arc<Subscriptions>,
}

impl Consumer {
    pub(crate) fn new(
        url: String,
        config: ClientConfig,
        factory: Arc<dyn TransportFactory>,
        host: Arc<dyn HostEnvironment>,
    ) -> Self {
        let connection = Connection::new(url, config, factory, host);
        let subscriptions = Subscriptions::new(Arc::downgrade(&connection));
        connection.bind_registry(&subscriptions);
        Self {
            connection,
            subscriptions,
        }
    }

    /// Returns the subscription registry.
    #[must_use]
    pub fn subscriptions(&self) -> &Arc<Subscriptions> {
        &self.subscriptions
    }

    /// Returns the underlying connection.
    #[must_use]
    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    /// Serializes and sends an arbitrary payload over the connection.
    /// Returns whether the write was attempted.
    pub fn send<T: Serialize + ?Sized>(&self, payload: &T) -> bool {
        self.connection.send(payload)
    }

    /// Opens the connection. Returns false when already open or connecting.
    pub fn connect(&self) -> bool {
        self.connection.open()
    }

    /// Closes the connection with reconnection disabled. The only
    /// unrecoverable outcome in the engine: no automatic reopen follows.
    pub fn disconnect(&self) {
        if let Err(error) = self.connection.close(false) {
            debug!(%error, "error closing connection on disconnect");
        }
    }

    /// Opens the connection unless it is already active. Returns whether a
    /// new open was initiated.
    pub fn ensure_active_connection(&self) -> bool {
        if self.connection.is_active() {
            false
        } else {
            self.connection.open()
        }
    }
}
