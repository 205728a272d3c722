//! Connection liveness monitoring and reconnection backoff.
//!
//! The server is expected to ping periodically. The monitor polls the time
//! since the last ping (or since its own start, before the first ping ever
//! arrives) and reopens the connection when that gap exceeds the stale
//! threshold. The poll interval grows logarithmically with the number of
//! reconnect attempts and is clamped, so retries on a dead link back off
//! without ever going fully quiet.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use cableway_core::config::ClientConfig;

use crate::connection::Connection;
use crate::host::HostEnvironment;

/// Liveness state machine for one [`Connection`].
///
/// Created once per connection and reused across reopens. Running means a
/// start was recorded with no stop after it; `start` on a running monitor
/// and `stop` on a stopped one are no-ops.
pub struct ConnectionMonitor {
    connection: Weak<Connection>,
    host: Arc<dyn HostEnvironment>,
    stale_threshold: Duration,
    poll_min_secs: f64,
    poll_max_secs: f64,
    settle_delay: Duration,
    state: Mutex<MonitorState>,
    weak: Weak<ConnectionMonitor>,
}

#[derive(Default)]
struct MonitorState {
    started_at: Option<Instant>,
    stopped_at: Option<Instant>,
    pinged_at: Option<Instant>,
    disconnected_at: Option<Instant>,
    reconnect_attempts: u32,
    poll_stop: Option<mpsc::Sender<()>>,
    visibility_stop: Option<mpsc::Sender<()>>,
}

impl MonitorState {
    fn is_running(&self) -> bool {
        self.started_at.is_some() && self.stopped_at.is_none()
    }
}

impl ConnectionMonitor {
    /// Creates a monitor for the given connection.
    pub(crate) fn new(
        connection: Weak<Connection>,
        config: &ClientConfig,
        host: Arc<dyn HostEnvironment>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Self>| Self {
            connection,
            host,
            stale_threshold: config.stale_threshold(),
            poll_min_secs: config.poll_interval_min_secs,
            poll_max_secs: config.poll_interval_max_secs,
            settle_delay: config.settle_delay(),
            state: Mutex::new(MonitorState::default()),
            weak: weak.clone(),
        })
    }

    /// Starts polling and foreground-visibility listening. No-op if already
    /// running.
    pub fn start(&self) {
        let mut state = self.state.lock();
        if state.is_running() {
            return;
        }
        state.started_at = Some(Instant::now());
        state.stopped_at = None;

        let (poll_tx, poll_rx) = mpsc::channel(1);
        state.poll_stop = Some(poll_tx);
        tokio::spawn(Self::poll_loop(self.weak.clone(), poll_rx));

        let (visibility_tx, visibility_rx) = mpsc::channel(1);
        state.visibility_stop = Some(visibility_tx);
        let events = self.host.foreground_regained();
        tokio::spawn(Self::visibility_loop(
            self.weak.clone(),
            events,
            visibility_rx,
        ));

        let interval_ms = self.poll_interval_ms(state.reconnect_attempts);
        debug!(poll_interval_ms = interval_ms, "connection monitor started");
    }

    /// Stops polling and visibility listening. No-op if not running.
    ///
    /// Dropping the stop senders ends both loops deterministically; no
    /// further reopen is initiated by this monitor until the next `start`.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if !state.is_running() {
            return;
        }
        state.stopped_at = Some(Instant::now());
        state.poll_stop = None;
        state.visibility_stop = None;
        debug!("connection monitor stopped");
    }

    /// Returns true while the monitor is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state.lock().is_running()
    }

    /// Records an inbound liveness ping.
    pub fn record_ping(&self) {
        self.state.lock().pinged_at = Some(Instant::now());
    }

    /// Records a successful (re)connect: attempts reset, the moment counts
    /// as fresh liveness, and any recorded disconnect is cleared.
    pub fn record_connect(&self) {
        let mut state = self.state.lock();
        state.reconnect_attempts = 0;
        state.pinged_at = Some(Instant::now());
        state.disconnected_at = None;
        debug!("connection monitor recorded connect");
    }

    /// Records a transport loss.
    pub fn record_disconnect(&self) {
        self.state.lock().disconnected_at = Some(Instant::now());
        debug!("connection monitor recorded disconnect");
    }

    /// Returns the number of reconnect attempts since the last successful
    /// connect.
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.state.lock().reconnect_attempts
    }

    /// Returns the current poll interval.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms(self.reconnect_attempts()))
    }

    /// Interval formula: `clamp(5 * ln(attempts + 1), min, max)` seconds,
    /// rounded to whole milliseconds.
    fn poll_interval_ms(&self, attempts: u32) -> u64 {
        let raw = 5.0 * f64::from(attempts.saturating_add(1)).ln();
        let clamped = raw.clamp(self.poll_min_secs, self.poll_max_secs);
        (clamped * 1000.0).round() as u64
    }

    /// Returns true when the gap since the last ping (or since start, if no
    /// ping was ever recorded) strictly exceeds the stale threshold.
    #[must_use]
    pub fn connection_is_stale(&self) -> bool {
        let state = self.state.lock();
        let reference = state.pinged_at.or(state.started_at);
        reference.is_some_and(|at| at.elapsed() > self.stale_threshold)
    }

    fn disconnected_recently(&self) -> bool {
        self.state
            .lock()
            .disconnected_at
            .is_some_and(|at| at.elapsed() < self.stale_threshold)
    }

    /// One poll tick: if the connection is stale, count the attempt and
    /// reopen, unless the disconnect was recorded so recently that the link
    /// may still heal on its own.
    fn reconnect_if_stale(&self) {
        if !self.is_running() || !self.connection_is_stale() {
            return;
        }

        let attempts = {
            let mut state = self.state.lock();
            state.reconnect_attempts = state.reconnect_attempts.saturating_add(1);
            state.reconnect_attempts
        };
        warn!(
            reconnect_attempts = attempts,
            poll_interval_ms = self.poll_interval_ms(attempts),
            stale_threshold_secs = self.stale_threshold.as_secs_f64(),
            "stale connection detected"
        );

        if self.disconnected_recently() {
            debug!("skipping reopen after recent disconnect");
        } else if let Some(connection) = self.connection.upgrade() {
            info!("reopening stale connection");
            connection.reopen();
        }
    }

    async fn poll_loop(monitor: Weak<Self>, mut stop: mpsc::Receiver<()>) {
        loop {
            let Some(interval) = monitor.upgrade().map(|m| m.poll_interval()) else {
                return;
            };
            tokio::select! {
                _ = stop.recv() => return,
                () = sleep(interval) => {}
            }
            let Some(monitor) = monitor.upgrade() else {
                return;
            };
            monitor.reconnect_if_stale();
        }
    }

    async fn visibility_loop(
        monitor: Weak<Self>,
        mut events: mpsc::UnboundedReceiver<()>,
        mut stop: mpsc::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                _ = stop.recv() => return,
                event = events.recv() => {
                    if event.is_none() {
                        return;
                    }
                }
            }
            let Some(monitor) = monitor.upgrade() else {
                return;
            };
            sleep(monitor.settle_delay).await;
            if !monitor.is_running() {
                continue;
            }
            let Some(connection) = monitor.connection.upgrade() else {
                return;
            };
            if monitor.connection_is_stale() || !connection.is_open() {
                info!("reopening connection after foreground regain");
                connection.reopen();
            }
        }
    }
}
