//! macOS configuration store backed by the System Configuration dynamic store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use core_foundation::array::CFArray;
use core_foundation::base::{CFType, TCFType};
use core_foundation::boolean::CFBoolean;
use core_foundation::dictionary::CFDictionary;
use core_foundation::number::CFNumber;
use core_foundation::runloop::{CFRunLoop, kCFRunLoopCommonModes, kCFRunLoopDefaultMode};
use core_foundation::string::CFString;
use serde_json::{Number, Value};
use system_configuration::dynamic_store::{
    SCDynamicStore, SCDynamicStoreBuilder, SCDynamicStoreCallBackContext,
};

use crate::store::{ChangeSink, DynamicStore, PropertyRecord, StoreError};

/// How long the notification thread runs its loop before rechecking the stop flag.
const RUN_LOOP_SLICE: Duration = Duration::from_millis(500);

/// [`DynamicStore`] implementation over `SCDynamicStore`.
///
/// Queries go through a session created at construction. Notifications use a
/// second session owned by a dedicated thread running a `CFRunLoop`; the
/// store invokes the change callback on that thread.
///
/// # Example
///
/// ```no_run
/// use scdns::store::DynamicStore;
/// use scdns::store::platform::SystemStore;
///
/// let store = SystemStore::new("com.example.scdns").expect("store");
/// let snapshot = store.query(&["State:/Network/Interface/[^/]+/IPv6".to_string()]);
/// for key in snapshot.keys() {
///     println!("{key}");
/// }
/// ```
pub struct SystemStore {
    name: String,
    session: SCDynamicStore,
    registration: Mutex<Option<Registration>>,
}

// SAFETY: SCDynamicStore sessions may be used from any thread; the
// notification session never leaves its own thread.
unsafe impl Send for SystemStore {}
// SAFETY: see above; queries take `&self` and do not mutate the session.
unsafe impl Sync for SystemStore {}

impl std::fmt::Debug for SystemStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registered = self
            .registration
            .lock()
            .is_ok_and(|registration| registration.is_some());
        f.debug_struct("SystemStore")
            .field("name", &self.name)
            .field("registered", &registered)
            .finish_non_exhaustive()
    }
}

/// Handle to the notification thread.
///
/// Stops the run loop and joins the thread when dropped.
struct Registration {
    run_loop: RunLoopHandle,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        self.run_loop.0.stop();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("Notification thread panicked during shutdown");
            }
        }
    }
}

struct RunLoopHandle(CFRunLoop);

// SAFETY: CFRunLoopStop may be called from any thread; it is the only
// operation performed on the handle outside its owning thread.
unsafe impl Send for RunLoopHandle {}

impl SystemStore {
    /// Opens a query session named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CannotCreate`] if the session cannot be created.
    pub fn new(name: impl Into<String>) -> Result<Self, StoreError> {
        let name = name.into();
        let session = SCDynamicStoreBuilder::new(name.as_str())
            .build()
            .ok_or_else(|| StoreError::cannot_create(format!("session '{name}'")))?;

        Ok(Self {
            name,
            session,
            registration: Mutex::new(None),
        })
    }
}

impl DynamicStore for SystemStore {
    fn register(&self, patterns: &[String], sink: ChangeSink) -> Result<(), StoreError> {
        let mut registration = self
            .registration
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if registration.is_some() {
            return Err(StoreError::AlreadyRegistered);
        }

        let (ready_tx, ready_rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let name = format!("{}.notifications", self.name);
        let patterns = patterns.to_vec();

        let thread = std::thread::Builder::new()
            .name("scdns-notify".to_string())
            .spawn(move || run_notifications(&name, &patterns, sink, &thread_stop, &ready_tx))
            .map_err(StoreError::cannot_create)?;

        match ready_rx.recv() {
            Ok(Ok(run_loop)) => {
                *registration = Some(Registration {
                    run_loop,
                    stop,
                    thread: Some(thread),
                });
                tracing::debug!(store = %self.name, "Notification thread started");
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(StoreError::cannot_create("notification thread exited"))
            }
        }
    }

    fn deregister(&self) {
        let registration = self
            .registration
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        // Dropping outside the lock joins the notification thread.
        drop(registration);
    }

    fn key_list(&self, pattern: &str) -> Vec<String> {
        self.session
            .get_keys(pattern)
            .map(|keys| keys.iter().map(|key| key.to_string()).collect())
            .unwrap_or_default()
    }

    fn value(&self, key: &str) -> Option<PropertyRecord> {
        let plist = self.session.get(key)?;
        match cf_to_json(&plist.as_CFType()) {
            Some(Value::Object(record)) => Some(record),
            _ => {
                tracing::debug!(key, "Store value is not a dictionary, skipping");
                None
            }
        }
    }
}

impl Drop for SystemStore {
    fn drop(&mut self) {
        self.deregister();
    }
}

/// Body of the notification thread.
///
/// Creates the notification session, reports readiness (or the failure) over
/// `ready`, then runs the run loop until `stop` is set.
///
/// Excluded from coverage - requires a live configuration daemon.
#[cfg(not(tarpaulin_include))]
fn run_notifications(
    name: &str,
    patterns: &[String],
    sink: ChangeSink,
    stop: &AtomicBool,
    ready: &mpsc::Sender<Result<RunLoopHandle, StoreError>>,
) {
    let context = SCDynamicStoreCallBackContext {
        callout: on_keys_changed,
        info: sink,
    };

    let Some(session) = SCDynamicStoreBuilder::new(name)
        .callback_context(context)
        .build()
    else {
        let _ = ready.send(Err(StoreError::cannot_create(format!(
            "notification session '{name}'"
        ))));
        return;
    };

    let no_keys = CFArray::<CFString>::from_CFTypes(&[]);
    let watched = patterns
        .iter()
        .map(|p| CFString::new(p))
        .collect::<Vec<_>>();
    let watched = CFArray::from_CFTypes(&watched);

    if !session.set_notification_keys(&no_keys, &watched) {
        let _ = ready.send(Err(StoreError::cannot_create(
            "failed to set notification keys",
        )));
        return;
    }

    let source = session.create_run_loop_source();
    let run_loop = CFRunLoop::get_current();
    // SAFETY: kCFRunLoopCommonModes is an immutable CoreFoundation constant.
    run_loop.add_source(&source, unsafe { kCFRunLoopCommonModes });

    if ready.send(Ok(RunLoopHandle(run_loop.clone()))).is_err() {
        return;
    }

    while !stop.load(Ordering::Acquire) {
        // SAFETY: kCFRunLoopDefaultMode is an immutable CoreFoundation constant.
        CFRunLoop::run_in_mode(unsafe { kCFRunLoopDefaultMode }, RUN_LOOP_SLICE, false);
    }

    let _ = session.set_notification_keys(&no_keys, &no_keys);
    // SAFETY: as above.
    run_loop.remove_source(&source, unsafe { kCFRunLoopCommonModes });
}

/// Change callback registered with the notification session.
///
/// Excluded from coverage - only invoked by the configuration daemon.
#[cfg(not(tarpaulin_include))]
fn on_keys_changed(
    _store: SCDynamicStore,
    changed_keys: CFArray<CFString>,
    sink: &mut ChangeSink,
) {
    let batch = changed_keys.iter().map(|key| key.to_string()).collect();
    sink(batch);
}

/// Converts a CoreFoundation property list value into JSON.
///
/// Values with no JSON counterpart (dates, data) become `null` so array
/// positions are preserved.
fn cf_to_json(value: &CFType) -> Option<Value> {
    if let Some(string) = value.downcast::<CFString>() {
        return Some(Value::String(string.to_string()));
    }
    if let Some(boolean) = value.downcast::<CFBoolean>() {
        return Some(Value::Bool(boolean.into()));
    }
    if let Some(number) = value.downcast::<CFNumber>() {
        return number
            .to_i64()
            .map(Value::from)
            .or_else(|| number.to_f64().and_then(Number::from_f64).map(Value::Number));
    }
    if let Some(array) = value.downcast::<CFArray>() {
        let items = array
            .get_all_values()
            .into_iter()
            .map(|item| {
                // SAFETY: the array retains its items for the duration of this call.
                let item = unsafe { CFType::wrap_under_get_rule(item) };
                cf_to_json(&item).unwrap_or(Value::Null)
            })
            .collect();
        return Some(Value::Array(items));
    }
    if let Some(dictionary) = value.downcast::<CFDictionary>() {
        let (keys, values) = dictionary.get_keys_and_values();
        let mut record = PropertyRecord::new();
        for (key, value) in keys.into_iter().zip(values) {
            // SAFETY: the dictionary retains its keys and values for the duration of this call.
            let (key, value) = unsafe {
                (
                    CFType::wrap_under_get_rule(key),
                    CFType::wrap_under_get_rule(value),
                )
            };
            if let Some(key) = key.downcast::<CFString>() {
                record.insert(key.to_string(), cf_to_json(&value).unwrap_or(Value::Null));
            }
        }
        return Some(Value::Object(record));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_address_array() {
        let addresses = CFArray::from_CFTypes(&[CFString::new("fe80::1"), CFString::new("fd00::1")]);

        assert_eq!(
            cf_to_json(&addresses.as_CFType()),
            Some(json!(["fe80::1", "fd00::1"]))
        );
    }

    #[test]
    fn converts_integer_array() {
        let flags = CFArray::from_CFTypes(&[CFNumber::from(0_i32), CFNumber::from(1088_i32)]);

        assert_eq!(cf_to_json(&flags.as_CFType()), Some(json!([0, 1088])));
    }

    #[test]
    fn converts_dictionary_of_arrays() {
        let prefix_lengths = CFArray::from_CFTypes(&[CFNumber::from(64_i32)]);
        let record = CFDictionary::from_CFType_pairs(&[(
            CFString::new("PrefixLength").as_CFType(),
            prefix_lengths.as_CFType(),
        )]);

        assert_eq!(
            cf_to_json(&record.as_CFType()),
            Some(json!({"PrefixLength": [64]}))
        );
    }

    #[test]
    fn converts_boolean() {
        assert_eq!(
            cf_to_json(&CFBoolean::true_value().as_CFType()),
            Some(json!(true))
        );
    }

    #[test]
    fn opens_query_session() {
        let store = SystemStore::new("scdns-test").unwrap();

        // Query sessions work without a registration.
        let _ = store.key_list("State:/Network/Global/.*");
        assert!(format!("{store:?}").contains("registered: false"));
    }
}
