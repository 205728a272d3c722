//! Socket lifecycle and subprotocol negotiation.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use tracing::{debug, warn};

use cableway_core::config::ClientConfig;
use cableway_core::error::TransportError;

use crate::host::HostEnvironment;
use crate::monitor::ConnectionMonitor;
use crate::router::MessageRouter;
use crate::subscriptions::Subscriptions;
use crate::transport::{ReadyState, Transport, TransportEvents, TransportFactory};

/// Owns the socket transport for one consumer.
///
/// At most one non-terminated transport is live per connection; reopening
/// always closes and recreates. The connection owns exactly one
/// [`ConnectionMonitor`], created once and reused across reopens.
pub struct Connection {
    url: String,
    config: ClientConfig,
    supported_protocols: Vec<String>,
    factory: Arc<dyn TransportFactory>,
    transport: RwLock<Option<Arc<dyn Transport>>>,
    /// Bumped on every open; events from older transports are discarded.
    generation: Arc<AtomicU64>,
    /// Latch so a transport loss is recorded and broadcast only once.
    disconnected: AtomicBool,
    monitor: Arc<ConnectionMonitor>,
    router: Arc<MessageRouter>,
    registry: OnceLock<Weak<Subscriptions>>,
    weak: Weak<Connection>,
}

impl Connection {
    /// Creates a connection. The socket is not opened until [`open`] is
    /// called (directly, or through the registry's first subscription).
    ///
    /// [`open`]: Connection::open
    pub(crate) fn new(
        url: String,
        config: ClientConfig,
        factory: Arc<dyn TransportFactory>,
        host: Arc<dyn HostEnvironment>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Self>| {
            let monitor = ConnectionMonitor::new(weak.clone(), &config, host);
            let router = Arc::new(MessageRouter::new(weak.clone()));
            let supported_protocols = supported_subset(&config.subprotocols);
            Self {
                url,
                config,
                supported_protocols,
                factory,
                transport: RwLock::new(None),
                generation: Arc::new(AtomicU64::new(0)),
                disconnected: AtomicBool::new(true),
                monitor,
                router,
                registry: OnceLock::new(),
                weak: weak.clone(),
            }
        })
    }

    /// Opens a new transport and starts the monitor.
    ///
    /// Returns false without side effects when a transport is already open
    /// or connecting; true when a new attempt was initiated. Opening is
    /// asynchronous: true does not mean connected yet.
    pub fn open(&self) -> bool {
        if self.is_active() {
            debug!(state = self.state_name(), "socket already active; not opening");
            return false;
        }
        debug!(
            state = self.state_name(),
            subprotocols = ?self.config.subprotocols,
            "opening socket"
        );

        // Invalidate the previous handler generation as a unit, then close
        // and discard whatever transport is left. The slot lock is held
        // until the replacement is stored, so no event handler can observe
        // a half-swapped transport.
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut slot = self.transport.write();
            if let Some(previous) = slot.take() {
                let _ = previous.close();
            }
            let handler: Arc<dyn TransportEvents> = Arc::new(GenerationGuard {
                generation,
                current: Arc::clone(&self.generation),
                router: Arc::clone(&self.router),
            });
            *slot = Some(
                self.factory
                    .open(&self.url, &self.config.subprotocols, handler),
            );
        }
        self.monitor.start();
        true
    }

    /// Serializes the payload and writes it if and only if the transport is
    /// open. Returns whether the write was attempted; nothing is queued.
    pub fn send<T: Serialize + ?Sized>(&self, payload: &T) -> bool {
        if !self.is_open() {
            return false;
        }
        let text = match serde_json::to_string(payload) {
            Ok(text) => text,
            Err(error) => {
                warn!(%error, "failed to serialize outbound payload");
                return false;
            }
        };
        self.transport
            .read()
            .as_ref()
            .is_some_and(|transport| transport.send(&text))
    }

    /// Requests a transport close.
    ///
    /// With `allow_reconnect` false the monitor is stopped first, so no
    /// automatic reopen will follow.
    pub fn close(&self, allow_reconnect: bool) -> Result<(), TransportError> {
        if !allow_reconnect {
            self.monitor.stop();
        }
        if self.is_active() {
            if let Some(transport) = self.transport.read().as_ref() {
                return transport.close();
            }
        }
        Ok(())
    }

    /// Closes the live transport and reopens after the configured delay; an
    /// inactive connection reopens immediately.
    ///
    /// A close failure is logged and swallowed and the delayed reopen is
    /// scheduled regardless. The delayed open aborts if the monitor was
    /// stopped in the meantime, so an intentional disconnect cannot be
    /// resurrected by an in-flight timer.
    pub fn reopen(&self) {
        debug!(state = self.state_name(), "reopening socket");
        if self.is_active() {
            if let Err(error) = self.close(true) {
                debug!(%error, "failed to close socket before reopen");
            }
            let delay = self.config.reopen_delay();
            debug!(delay_ms = delay.as_millis() as u64, "scheduling delayed reopen");
            let weak = self.weak.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if let Some(connection) = weak.upgrade() {
                    if connection.monitor.is_running() {
                        connection.open();
                    }
                }
            });
        } else {
            self.open();
        }
    }

    /// Returns the transport's ready state, if a transport exists.
    #[must_use]
    pub fn ready_state(&self) -> Option<ReadyState> {
        self.transport
            .read()
            .as_ref()
            .map(|transport| transport.ready_state())
    }

    /// Returns true while the transport is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.ready_state().is_some_and(|state| state.is_open())
    }

    /// Returns true while the transport is open or connecting.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.ready_state().is_some_and(|state| state.is_active())
    }

    pub(crate) fn state_name(&self) -> &'static str {
        self.ready_state().map_or("none", |state| state.name())
    }

    /// Returns the negotiated subprotocol, once open.
    #[must_use]
    pub fn protocol(&self) -> Option<String> {
        self.transport
            .read()
            .as_ref()
            .and_then(|transport| transport.protocol())
    }

    /// Returns true when the negotiated subprotocol is one of the supported
    /// dialects (every configured subprotocol except the trailing fallback
    /// sentinel).
    #[must_use]
    pub fn is_protocol_supported(&self) -> bool {
        self.protocol()
            .is_some_and(|negotiated| self.supported_protocols.iter().any(|p| *p == negotiated))
    }

    /// Returns the endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the connection's monitor.
    #[must_use]
    pub fn monitor(&self) -> &Arc<ConnectionMonitor> {
        &self.monitor
    }

    pub(crate) fn bind_registry(&self, registry: &Arc<Subscriptions>) {
        let _ = self.registry.set(Arc::downgrade(registry));
    }

    pub(crate) fn registry(&self) -> Option<Arc<Subscriptions>> {
        self.registry.get().and_then(Weak::upgrade)
    }

    /// Clears the disconnect latch; called when a socket opens.
    pub(crate) fn clear_disconnected(&self) {
        self.disconnected.store(false, Ordering::SeqCst);
    }

    /// Sets the disconnect latch, returning the previous value. A true
    /// return means the loss was already handled.
    pub(crate) fn latch_disconnected(&self) -> bool {
        self.disconnected.swap(true, Ordering::SeqCst)
    }
}

/// Supported dialects: every offered subprotocol except the trailing
/// fallback sentinel. A single-entry offer has no supported dialects.
fn supported_subset(subprotocols: &[String]) -> Vec<String> {
    if subprotocols.len() >= 2 {
        subprotocols[..subprotocols.len() - 1].to_vec()
    } else {
        Vec::new()
    }
}

/// Pins transport events to the generation that installed them, so a
/// replaced socket cannot deliver stale events through the current handler.
struct GenerationGuard {
    generation: u64,
    current: Arc<AtomicU64>,
    router: Arc<MessageRouter>,
}

impl GenerationGuard {
    fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.generation
    }
}

#[async_trait]
impl TransportEvents for GenerationGuard {
    async fn on_open(&self) {
        if self.is_current() {
            self.router.handle_open().await;
        }
    }

    async fn on_message(&self, text: String) {
        if self.is_current() {
            self.router.handle_message(&text).await;
        }
    }

    async fn on_close(&self) {
        if self.is_current() {
            self.router.handle_close().await;
        }
    }

    async fn on_error(&self, error: TransportError) {
        if self.is_current() {
            self.router.handle_error(&error);
        }
    }
}
