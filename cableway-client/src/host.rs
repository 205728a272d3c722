//! Host environment abstraction.
//!
//! The engine needs two things from whatever is hosting it: named string
//! settings (for endpoint discovery) and a signal that the process regained
//! foreground visibility, after which a platform may have silently killed
//! the socket without a close event ever firing. Both are injected through
//! [`HostEnvironment`]; headless hosts use [`NullHost`].

use tokio::sync::mpsc;

/// Capabilities provided by the hosting process.
pub trait HostEnvironment: Send + Sync {
    /// Resolves a named configuration setting, such as `"url"`.
    fn setting(&self, name: &str) -> Option<String> {
        let _ = name;
        None
    }

    /// Returns a stream that yields whenever the host transitions from
    /// background to foreground. The default stream is already closed, so
    /// listeners exit immediately.
    fn foreground_regained(&self) -> mpsc::UnboundedReceiver<()> {
        let (_tx, rx) = mpsc::unbounded_channel();
        rx
    }
}

/// Host environment with no settings and no visibility signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHost;

impl HostEnvironment for NullHost {}
