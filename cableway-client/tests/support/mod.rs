//! In-memory transport, host, and handler fakes for engine tests.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use cableway_client::host::HostEnvironment;
use cableway_client::transport::{ReadyState, Transport, TransportEvents, TransportFactory};
use cableway_core::error::TransportError;

/// Subprotocol the mock server speaks.
pub const SUPPORTED: &str = "actioncable-v1-json";

/// The fallback sentinel.
pub const UNSUPPORTED: &str = "actioncable-unsupported";

/// One fake socket. Starts in `Connecting`; tests drive the handshake and
/// inbound frames explicitly.
pub struct MockTransport {
    state: Mutex<ReadyState>,
    protocol: Mutex<Option<String>>,
    sent: Mutex<Vec<String>>,
    close_calls: AtomicUsize,
    events: Mutex<Option<Arc<dyn TransportEvents>>>,
}

impl MockTransport {
    fn new(events: Arc<dyn TransportEvents>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ReadyState::Connecting),
            protocol: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            close_calls: AtomicUsize::new(0),
            events: Mutex::new(Some(events)),
        })
    }

    fn events(&self) -> Option<Arc<dyn TransportEvents>> {
        self.events.lock().clone()
    }

    /// Completes the handshake with the given negotiated subprotocol.
    pub async fn accept(&self, protocol: &str) {
        *self.protocol.lock() = Some(protocol.to_string());
        *self.state.lock() = ReadyState::Open;
        if let Some(events) = self.events() {
            events.on_open().await;
        }
    }

    /// Delivers an inbound text frame.
    pub async fn deliver(&self, text: &str) {
        if let Some(events) = self.events() {
            events.on_message(text.to_string()).await;
        }
    }

    /// Kills the socket and reports the closure.
    pub async fn drop_connection(&self) {
        *self.state.lock() = ReadyState::Closed;
        if let Some(events) = self.events() {
            events.on_close().await;
        }
    }

    /// Returns every frame written so far.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    /// Forgets recorded frames.
    pub fn clear_sent(&self) {
        self.sent.lock().clear();
    }

    /// Returns how many times `close` was requested.
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

impl Transport for MockTransport {
    fn ready_state(&self) -> ReadyState {
        *self.state.lock()
    }

    fn protocol(&self) -> Option<String> {
        self.protocol.lock().clone()
    }

    fn send(&self, text: &str) -> bool {
        if !self.ready_state().is_open() {
            return false;
        }
        self.sent.lock().push(text.to_string());
        true
    }

    fn close(&self) -> Result<(), TransportError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        *self.state.lock() = ReadyState::Closed;
        Ok(())
    }
}

/// Factory that records every transport it creates.
#[derive(Default)]
pub struct MockConnector {
    transports: Mutex<Vec<Arc<MockTransport>>>,
}

impl MockConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns the most recently created transport.
    pub fn latest(&self) -> Arc<MockTransport> {
        self.transports
            .lock()
            .last()
            .cloned()
            .expect("no transport opened yet")
    }

    /// Returns how many transports have been opened.
    pub fn open_count(&self) -> usize {
        self.transports.lock().len()
    }
}

impl TransportFactory for MockConnector {
    fn open(
        &self,
        _url: &str,
        _subprotocols: &[String],
        events: Arc<dyn TransportEvents>,
    ) -> Arc<dyn Transport> {
        let transport = MockTransport::new(events);
        self.transports.lock().push(Arc::clone(&transport));
        transport
    }
}

/// Host that can emit foreground-regain events on demand.
#[derive(Default)]
pub struct FakeHost {
    senders: Mutex<Vec<mpsc::UnboundedSender<()>>>,
}

impl FakeHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Signals a background-to-foreground transition.
    pub fn regain_foreground(&self) {
        for sender in self.senders.lock().iter() {
            let _ = sender.send(());
        }
    }
}

impl HostEnvironment for FakeHost {
    fn foreground_regained(&self) -> mpsc::UnboundedReceiver<()> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.lock().push(tx);
        rx
    }
}

/// Handler that counts every callback invocation.
#[derive(Default)]
pub struct CountingHandler {
    pub initialized: AtomicUsize,
    pub connected: AtomicUsize,
    pub rejected: AtomicUsize,
    pub received: AtomicUsize,
    pub disconnected: AtomicUsize,
    pub last_will_reconnect: Mutex<Option<bool>>,
    pub last_message: Mutex<Option<Value>>,
}

impl CountingHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl cableway_client::ChannelHandler for CountingHandler {
    async fn initialized(&self) {
        self.initialized.fetch_add(1, Ordering::SeqCst);
    }

    async fn connected(&self) {
        self.connected.fetch_add(1, Ordering::SeqCst);
    }

    async fn disconnected(&self, will_reconnect: bool) {
        self.disconnected.fetch_add(1, Ordering::SeqCst);
        *self.last_will_reconnect.lock() = Some(will_reconnect);
    }

    async fn rejected(&self) {
        self.rejected.fetch_add(1, Ordering::SeqCst);
    }

    async fn received(&self, message: Value) {
        self.received.fetch_add(1, Ordering::SeqCst);
        *self.last_message.lock() = Some(message);
    }
}
