//! In-process configuration store.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use regex::Regex;

use super::{ChangeBatch, ChangeSink, DynamicStore, PropertyRecord, Snapshot, StoreError};

/// A [`DynamicStore`] held entirely in memory.
///
/// Used to replay a captured snapshot file and to drive the monitor in tests.
/// Mutations notify the registered sink synchronously, on the calling thread,
/// with the changed keys that match a watched pattern.
///
/// # Example
///
/// ```
/// use scdns::store::{DynamicStore, MemoryStore};
///
/// let store = MemoryStore::from_json(r#"{
///     "State:/Network/Interface/en0/IPv6": {"Addresses": ["fe80::1"]}
/// }"#).unwrap();
///
/// let keys = store.key_list("State:/Network/Interface/[^/]+/IPv6");
/// assert_eq!(keys, vec!["State:/Network/Interface/en0/IPv6"]);
/// ```
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    entries: Snapshot,
    watch: Option<Watch>,
}

struct Watch {
    patterns: Vec<Regex>,
    sink: ChangeSink,
}

impl Watch {
    fn matches(&self, key: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(key))
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("MemoryStore")
            .field("entries", &inner.entries.len())
            .field("watching", &inner.watch.is_some())
            .finish()
    }
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `entries`.
    #[must_use]
    pub fn with_entries(entries: Snapshot) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries,
                watch: None,
            }),
        }
    }

    /// Parses a JSON object mapping keys to property records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SnapshotParse`] if the content is not such an object.
    pub fn from_json(content: &str) -> Result<Self, StoreError> {
        let entries: Snapshot = serde_json::from_str(content)?;
        Ok(Self::with_entries(entries))
    }

    /// Loads a JSON snapshot file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path).map_err(|e| StoreError::SnapshotRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&content)
    }

    /// Stores `record` under `key` and notifies watchers.
    pub fn set(&self, key: impl Into<String>, record: PropertyRecord) {
        self.apply(vec![(key.into(), Some(record))]);
    }

    /// Removes `key` and notifies watchers if it existed.
    pub fn remove(&self, key: &str) {
        self.apply(vec![(key.to_string(), None)]);
    }

    /// Applies several updates and reports them as one change batch.
    ///
    /// `None` removes the key. Keys are reported in the order given.
    pub fn apply(&self, updates: Vec<(String, Option<PropertyRecord>)>) {
        let notification = {
            let mut inner = self.lock();
            let mut changed = ChangeBatch::new();

            for (key, record) in updates {
                let existed = match record {
                    Some(record) => {
                        inner.entries.insert(key.clone(), record);
                        true
                    }
                    None => inner.entries.remove(&key).is_some(),
                };
                if existed {
                    changed.push(key);
                }
            }

            inner.watch.as_ref().and_then(|watch| {
                let batch: ChangeBatch =
                    changed.into_iter().filter(|k| watch.matches(k)).collect();
                (!batch.is_empty()).then(|| (Arc::clone(&watch.sink), batch))
            })
        };

        // Sink runs outside the lock so it may query the store.
        if let Some((sink, batch)) = notification {
            tracing::trace!(keys = ?batch, "Memory store notifying change");
            sink(batch);
        }
    }

    /// Returns true if a notification registration is active.
    #[must_use]
    pub fn is_watching(&self) -> bool {
        self.lock().watch.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DynamicStore for MemoryStore {
    fn register(&self, patterns: &[String], sink: ChangeSink) -> Result<(), StoreError> {
        let patterns = patterns
            .iter()
            .map(|p| compile_pattern(p))
            .collect::<Result<Vec<_>, _>>()?;

        let mut inner = self.lock();
        if inner.watch.is_some() {
            return Err(StoreError::AlreadyRegistered);
        }
        inner.watch = Some(Watch { patterns, sink });
        Ok(())
    }

    fn deregister(&self) {
        self.lock().watch = None;
    }

    fn key_list(&self, pattern: &str) -> Vec<String> {
        let regex = match compile_pattern(pattern) {
            Ok(regex) => regex,
            Err(e) => {
                tracing::warn!("Ignoring key pattern: {e}");
                return Vec::new();
            }
        };

        self.lock()
            .entries
            .keys()
            .filter(|key| regex.is_match(key))
            .cloned()
            .collect()
    }

    fn value(&self, key: &str) -> Option<PropertyRecord> {
        self.lock().entries.get(key).cloned()
    }
}

/// Compiles a key pattern anchored to the whole key.
fn compile_pattern(pattern: &str) -> Result<Regex, StoreError> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|source| StoreError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}
