//! Store abstraction and the snapshot types it produces.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::StoreError;

/// Keys reported changed by a single store notification, in the order reported.
pub type ChangeBatch = Vec<String>;

/// Named properties of one configuration entry.
///
/// Values are loosely typed as the host store delivers them; an interface
/// IPv6 entry carries parallel arrays such as `Addresses`, `Flags` and
/// `PrefixLength`.
pub type PropertyRecord = Map<String, Value>;

/// Point-in-time read of configuration entries, keyed by store key.
///
/// Iteration is lexicographic by key, which makes "first match" scans
/// deterministic regardless of the host store's ordering.
pub type Snapshot = BTreeMap<String, PropertyRecord>;

/// Callback invoked by a store with every change batch.
///
/// Stores call this from their own notification context; it must not block.
pub type ChangeSink = Arc<dyn Fn(ChangeBatch) + Send + Sync>;

/// A callback-driven configuration store.
///
/// # Design
///
/// - Wraps the host's dynamic configuration store behind a small surface
/// - Enables dependency injection for testing with [`super::MemoryStore`]
/// - Platform-specific implementations provided in [`super::platform`]
///
/// Key patterns are regular expressions matched against whole keys.
pub trait DynamicStore: Send + Sync {
    /// Starts delivering change notifications for keys matching `patterns` to `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CannotCreate`] if the notification source cannot be
    /// established, [`StoreError::AlreadyRegistered`] if a registration is active,
    /// or [`StoreError::InvalidPattern`] for patterns the store rejects.
    fn register(&self, patterns: &[String], sink: ChangeSink) -> Result<(), StoreError>;

    /// Stops delivering change notifications.
    ///
    /// Idempotent; once this returns, `sink` is no longer invoked.
    fn deregister(&self);

    /// Lists the keys currently matching `pattern`.
    fn key_list(&self, pattern: &str) -> Vec<String>;

    /// Returns the current record stored under `key`, if any.
    fn value(&self, key: &str) -> Option<PropertyRecord>;

    /// Reads a snapshot of every key matching any of `patterns`.
    ///
    /// Keys without a resolvable record are omitted. A key matched by several
    /// patterns appears once.
    fn query(&self, patterns: &[String]) -> Snapshot {
        let mut snapshot = Snapshot::new();
        for pattern in patterns {
            for key in self.key_list(pattern) {
                if snapshot.contains_key(&key) {
                    continue;
                }
                if let Some(record) = self.value(&key) {
                    snapshot.insert(key, record);
                }
            }
        }
        snapshot
    }
}

impl<S: DynamicStore + ?Sized> DynamicStore for Arc<S> {
    fn register(&self, patterns: &[String], sink: ChangeSink) -> Result<(), StoreError> {
        (**self).register(patterns, sink)
    }

    fn deregister(&self) {
        (**self).deregister();
    }

    fn key_list(&self, pattern: &str) -> Vec<String> {
        (**self).key_list(pattern)
    }

    fn value(&self, key: &str) -> Option<PropertyRecord> {
        (**self).value(key)
    }
}

impl<S: DynamicStore + ?Sized> DynamicStore for Box<S> {
    fn register(&self, patterns: &[String], sink: ChangeSink) -> Result<(), StoreError> {
        (**self).register(patterns, sink)
    }

    fn deregister(&self) {
        (**self).deregister();
    }

    fn key_list(&self, pattern: &str) -> Vec<String> {
        (**self).key_list(pattern)
    }

    fn value(&self, key: &str) -> Option<PropertyRecord> {
        (**self).value(key)
    }
}
