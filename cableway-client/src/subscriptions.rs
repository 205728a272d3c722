//! Subscription registry: channel multiplexing and callback dispatch.

use parking_lot::RwLock;
use serde_json::Value;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

use cableway_core::channel::{ChannelId, Identifier};
use cableway_core::protocol::Command;

use crate::connection::Connection;
use crate::subscription::{ChannelEvent, ChannelHandler, Subscription};

/// Ordered collection of the consumer's active subscriptions.
///
/// Identifiers are not unique: several independent listeners may share one
/// channel. The wire `unsubscribe` is refcounted — it goes out only when
/// the last sharer of an identifier is removed. Insertion order is
/// preserved because [`reload`] replays `subscribe` commands in it.
///
/// [`reload`]: Subscriptions::reload
pub struct Subscriptions {
    connection: Weak<Connection>,
    entries: RwLock<Vec<Arc<Subscription>>>,
    weak: Weak<Subscriptions>,
}

impl Subscriptions {
    pub(crate) fn new(connection: Weak<Connection>) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Self>| Self {
            connection,
            entries: RwLock::new(Vec::new()),
            weak: weak.clone(),
        })
    }

    /// Creates a subscription for the given channel selector.
    ///
    /// The connection is opened if it is not already active, the handler's
    /// `initialized` fires immediately, and a `subscribe` command is sent
    /// optimistically — confirmation or rejection arrives asynchronously.
    pub async fn create(
        &self,
        channel: impl Into<ChannelId>,
        handler: Arc<dyn ChannelHandler>,
    ) -> Arc<Subscription> {
        let subscription = Arc::new(Subscription::new(
            channel.into(),
            handler,
            self.weak.clone(),
        ));
        self.entries.write().push(Arc::clone(&subscription));
        self.ensure_active_connection();
        subscription.dispatch(ChannelEvent::Initialized).await;
        self.send_command(&Command::subscribe(subscription.identifier().clone()));
        subscription
    }

    /// Detaches a subscription. The wire `unsubscribe` is sent only when no
    /// other tracked subscription shares its identifier.
    pub fn remove(&self, subscription: &Subscription) {
        self.forget(subscription);
        if self.find_all(subscription.identifier()).is_empty() {
            self.send_command(&Command::unsubscribe(subscription.identifier().clone()));
        }
    }

    /// Detaches every subscription with the identifier and fires `rejected`
    /// on each. Terminal: a rejected identifier receives no further
    /// dispatch.
    pub async fn reject(&self, identifier: &Identifier) {
        let rejected: Vec<Arc<Subscription>> = {
            let mut entries = self.entries.write();
            let mut kept = Vec::with_capacity(entries.len());
            let mut matched = Vec::new();
            for entry in entries.drain(..) {
                if entry.identifier() == identifier {
                    matched.push(entry);
                } else {
                    kept.push(entry);
                }
            }
            *entries = kept;
            matched
        };

        if !rejected.is_empty() {
            debug!(identifier = %identifier, count = rejected.len(), "subscription rejected");
        }
        for subscription in &rejected {
            subscription.dispatch(ChannelEvent::Rejected).await;
        }
    }

    /// Replays `subscribe` for every tracked subscription, in insertion
    /// order. Used after a welcome to restore server-side state lost on
    /// reconnect; the server tolerates subscribes for channels it already
    /// tracks.
    pub fn reload(&self) {
        let entries: Vec<Arc<Subscription>> = self.entries.read().clone();
        debug!(count = entries.len(), "replaying subscribe commands");
        for subscription in &entries {
            self.send_command(&Command::subscribe(subscription.identifier().clone()));
        }
    }

    /// Returns every tracked subscription sharing the identifier.
    #[must_use]
    pub fn find_all(&self, identifier: &Identifier) -> Vec<Arc<Subscription>> {
        self.entries
            .read()
            .iter()
            .filter(|entry| entry.identifier() == identifier)
            .cloned()
            .collect()
    }

    /// Returns the number of tracked subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true when no subscriptions are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Dispatches an event to every subscription sharing the identifier
    /// (zero, one, or many).
    pub async fn notify_identifier(&self, identifier: &Identifier, event: ChannelEvent) {
        for subscription in self.find_all(identifier) {
            subscription.dispatch(event.clone()).await;
        }
    }

    /// Dispatches an event to every tracked subscription; used for global
    /// events such as a transport loss.
    pub async fn notify_all(&self, event: ChannelEvent) {
        let entries: Vec<Arc<Subscription>> = self.entries.read().clone();
        for subscription in &entries {
            subscription.dispatch(event.clone()).await;
        }
    }

    /// Sends a data payload for a subscription, refusing untracked senders.
    pub(crate) fn send_message(&self, subscription: &Subscription, data: Value) -> bool {
        let tracked = self
            .entries
            .read()
            .iter()
            .any(|entry| std::ptr::eq(Arc::as_ptr(entry), subscription));
        if !tracked {
            debug!(
                identifier = %subscription.identifier(),
                "dropping send for untracked subscription"
            );
            return false;
        }

        let data = match serde_json::to_string(&data) {
            Ok(data) => data,
            Err(error) => {
                warn!(%error, "failed to encode action payload");
                return false;
            }
        };
        self.send_command(&Command::message(subscription.identifier().clone(), data))
    }

    /// Sends a command over the connection. Returns whether the underlying
    /// socket accepted the write attempt.
    fn send_command(&self, command: &Command) -> bool {
        self.connection
            .upgrade()
            .is_some_and(|connection| connection.send(command))
    }

    fn ensure_active_connection(&self) {
        if let Some(connection) = self.connection.upgrade() {
            if !connection.is_active() {
                connection.open();
            }
        }
    }

    fn forget(&self, subscription: &Subscription) {
        self.entries
            .write()
            .retain(|entry| !std::ptr::eq(Arc::as_ptr(entry), subscription));
    }
}
