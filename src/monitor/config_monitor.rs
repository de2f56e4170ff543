//! Configuration change monitor.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::MonitorError;
use super::handoff::{Delivery, Handoff};
use super::stream::ChangeStream;
use crate::store::{ChangeBatch, ChangeSink, DynamicStore, Snapshot};

/// Lifecycle of the monitor's single subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// No subscription yet; `subscribe` may be called.
    Idle,
    /// Registered with the store; a [`ChangeStream`] is live.
    Active,
    /// Closed, or subscription setup failed. Terminal.
    Closed,
}

/// Watches configuration keys in a [`DynamicStore`] and re-exposes changes
/// as a pull-based stream.
///
/// A monitor owns at most one subscription for its whole life. Closing it,
/// explicitly through [`close`](Self::close) or by dropping it, deregisters
/// from the store and ends the stream. Snapshot queries work in every state.
///
/// # Example
///
/// ```
/// use scdns::monitor::ConfigMonitor;
/// use scdns::store::MemoryStore;
/// use tokio_stream::StreamExt;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let monitor = ConfigMonitor::new(MemoryStore::new());
/// let mut changes = monitor.subscribe(&["State:/Network/Interface/[^/]+/IPv6".to_string()])?;
///
/// monitor.close();
/// assert!(changes.next().await.is_none());
/// # Ok(())
/// # }
/// ```
pub struct ConfigMonitor<S: DynamicStore> {
    store: S,
    handoff: Arc<Handoff>,
    state: Mutex<State>,
}

impl<S: DynamicStore> std::fmt::Debug for ConfigMonitor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigMonitor")
            .field("state", &*self.lock_state())
            .finish_non_exhaustive()
    }
}

impl<S: DynamicStore> ConfigMonitor<S> {
    /// Creates a monitor over `store` with no active subscription.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            handoff: Arc::new(Handoff::new()),
            state: Mutex::new(State::Idle),
        }
    }

    /// Subscribes to changes of keys matching `watch_keys`.
    ///
    /// Consumes the monitor's single subscription: the returned stream is the
    /// only consumer for the monitor's lifetime.
    ///
    /// # Errors
    ///
    /// - [`MonitorError::CannotCreate`] if the store cannot establish
    ///   notifications; the monitor is closed afterwards.
    /// - [`MonitorError::AlreadySubscribed`] if a subscription exists.
    /// - [`MonitorError::Closed`] if the monitor has been closed.
    pub fn subscribe(&self, watch_keys: &[String]) -> Result<ChangeStream, MonitorError> {
        let mut state = self.lock_state();
        match *state {
            State::Idle => {}
            State::Active => return Err(MonitorError::AlreadySubscribed),
            State::Closed => return Err(MonitorError::Closed),
        }

        let handoff = Arc::clone(&self.handoff);
        let sink: ChangeSink = Arc::new(move |batch: ChangeBatch| hand_off(&handoff, batch));

        if let Err(e) = self.store.register(watch_keys, sink) {
            tracing::error!("Failed to register for configuration changes: {e}");
            self.handoff.close();
            *state = State::Closed;
            return Err(MonitorError::CannotCreate(e));
        }

        *state = State::Active;
        tracing::info!(keys = ?watch_keys, "Watching configuration keys");
        Ok(ChangeStream::new(Arc::clone(&self.handoff)))
    }

    /// Reads the current records of every key matching `key_patterns`.
    ///
    /// Independent of subscription state.
    pub fn query(&self, key_patterns: &[String]) -> Snapshot {
        self.store.query(key_patterns)
    }

    /// Deregisters from the store and ends the change stream.
    ///
    /// Idempotent and callable from any thread.
    pub fn close(&self) {
        let mut state = self.lock_state();
        if *state == State::Closed {
            return;
        }

        if *state == State::Active {
            self.store.deregister();
        }
        self.handoff.close();
        *state = State::Closed;
        tracing::info!("Configuration monitor closed");
    }

    /// Returns true once the monitor is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.lock_state() == State::Closed
    }

    /// Returns true if the change stream is currently waiting for a batch.
    #[must_use]
    pub fn is_consumer_waiting(&self) -> bool {
        self.handoff.has_waiter()
    }

    /// Returns the underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: DynamicStore> Drop for ConfigMonitor<S> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Store callback: passes `batch` to the waiting consumer.
fn hand_off(handoff: &Handoff, batch: ChangeBatch) {
    tracing::debug!(keys = ?batch, "Configuration keys changed");
    match handoff.deliver(batch) {
        Delivery::Delivered => tracing::debug!("Change batch delivered"),
        Delivery::NoWaiter => tracing::warn!("No consumer waiting, dropping change batch"),
        Delivery::Closed => tracing::debug!("Monitor closed, dropping change batch"),
    }
}
