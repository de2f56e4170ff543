//! Tests for `ConfigMonitor` and its change stream.

use super::*;
use crate::store::{ChangeSink, DynamicStore, MemoryStore, PropertyRecord, StoreError};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::StreamExt;

const EN0: &str = "State:/Network/Interface/en0/IPv6";
const BRIDGE: &str = "State:/Network/Interface/bridge100/IPv6";
const IPV6_PATTERN: &str = "State:/Network/Interface/[^/]+/IPv6";

fn watch_keys() -> Vec<String> {
    vec![IPV6_PATTERN.to_string()]
}

fn record() -> PropertyRecord {
    json!({"Addresses": ["fe80::1"], "Flags": [0], "PrefixLength": [64]})
        .as_object()
        .cloned()
        .unwrap()
}

/// Yields until the change stream has registered as the waiting consumer.
async fn wait_for_consumer<S: DynamicStore>(monitor: &ConfigMonitor<S>) {
    while !monitor.is_consumer_waiting() {
        tokio::task::yield_now().await;
    }
}

/// Store whose notification source can never be established.
struct UnavailableStore;

impl DynamicStore for UnavailableStore {
    fn register(&self, _patterns: &[String], _sink: ChangeSink) -> Result<(), StoreError> {
        Err(StoreError::cannot_create("permission denied"))
    }

    fn deregister(&self) {}

    fn key_list(&self, _pattern: &str) -> Vec<String> {
        vec![EN0.to_string()]
    }

    fn value(&self, _key: &str) -> Option<PropertyRecord> {
        Some(record())
    }
}

mod delivery {
    use super::*;

    #[tokio::test]
    async fn delivers_batch_to_waiting_consumer() {
        let store = Arc::new(MemoryStore::new());
        let monitor = ConfigMonitor::new(Arc::clone(&store));
        let mut changes = monitor.subscribe(&watch_keys()).unwrap();

        let consumer = tokio::spawn(async move { changes.next().await });
        wait_for_consumer(&monitor).await;
        store.set(EN0, record());

        assert_eq!(consumer.await.unwrap(), Some(vec![EN0.to_string()]));
    }

    #[tokio::test]
    async fn delivers_batch_from_notification_thread() {
        let store = Arc::new(MemoryStore::new());
        let monitor = ConfigMonitor::new(Arc::clone(&store));
        let mut changes = monitor.subscribe(&watch_keys()).unwrap();

        let consumer = tokio::spawn(async move { changes.next().await });
        wait_for_consumer(&monitor).await;

        let writer = Arc::clone(&store);
        std::thread::spawn(move || writer.set(BRIDGE, record()))
            .join()
            .unwrap();

        assert_eq!(consumer.await.unwrap(), Some(vec![BRIDGE.to_string()]));
    }

    #[tokio::test]
    async fn batches_arrive_in_reported_order() {
        let store = Arc::new(MemoryStore::new());
        let monitor = ConfigMonitor::new(Arc::clone(&store));
        let changes = monitor.subscribe(&watch_keys()).unwrap();

        let consumer = tokio::spawn(async move { changes.take(3).collect::<Vec<_>>().await });

        for key in [EN0, BRIDGE, EN0] {
            wait_for_consumer(&monitor).await;
            store.set(key, record());
        }

        assert_eq!(
            consumer.await.unwrap(),
            vec![
                vec![EN0.to_string()],
                vec![BRIDGE.to_string()],
                vec![EN0.to_string()],
            ]
        );
    }

    #[tokio::test]
    async fn multi_key_batch_is_kept_whole() {
        let store = Arc::new(MemoryStore::new());
        let monitor = ConfigMonitor::new(Arc::clone(&store));
        let mut changes = monitor.subscribe(&watch_keys()).unwrap();

        let consumer = tokio::spawn(async move { changes.next().await });
        wait_for_consumer(&monitor).await;
        store.apply(vec![
            (BRIDGE.to_string(), Some(record())),
            (EN0.to_string(), Some(record())),
        ]);

        assert_eq!(
            consumer.await.unwrap(),
            Some(vec![BRIDGE.to_string(), EN0.to_string()])
        );
    }

    #[tokio::test]
    async fn batch_without_waiting_consumer_is_dropped() {
        let store = Arc::new(MemoryStore::new());
        let monitor = ConfigMonitor::new(Arc::clone(&store));
        let mut changes = monitor.subscribe(&watch_keys()).unwrap();

        // Nobody is polling yet.
        store.set(EN0, record());

        let consumer = tokio::spawn(async move { changes.next().await });
        wait_for_consumer(&monitor).await;
        store.set(BRIDGE, record());

        assert_eq!(consumer.await.unwrap(), Some(vec![BRIDGE.to_string()]));
    }

    #[tokio::test]
    async fn unwatched_keys_do_not_wake_consumer() {
        let store = Arc::new(MemoryStore::new());
        let monitor = ConfigMonitor::new(Arc::clone(&store));
        let mut changes = monitor.subscribe(&watch_keys()).unwrap();

        let consumer = tokio::spawn(async move { changes.next().await });
        wait_for_consumer(&monitor).await;
        store.set("State:/Network/Global/DNS", record());
        assert!(monitor.is_consumer_waiting());

        store.set(EN0, record());
        assert_eq!(consumer.await.unwrap(), Some(vec![EN0.to_string()]));
    }

    #[tokio::test]
    async fn timed_out_wait_keeps_consumer_attached() {
        let store = Arc::new(MemoryStore::new());
        let monitor = ConfigMonitor::new(Arc::clone(&store));
        let mut changes = monitor.subscribe(&watch_keys()).unwrap();

        let timed_out = tokio::time::timeout(Duration::from_millis(10), changes.next()).await;
        assert!(timed_out.is_err());
        assert!(monitor.is_consumer_waiting());

        store.set(EN0, record());
        assert_eq!(changes.next().await, Some(vec![EN0.to_string()]));
    }

    #[tokio::test]
    async fn dropping_stream_detaches_consumer() {
        let store = Arc::new(MemoryStore::new());
        let monitor = ConfigMonitor::new(Arc::clone(&store));
        let mut changes = monitor.subscribe(&watch_keys()).unwrap();

        let _ = tokio::time::timeout(Duration::from_millis(1), changes.next()).await;
        assert!(monitor.is_consumer_waiting());

        drop(changes);
        assert!(!monitor.is_consumer_waiting());
    }
}

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn close_ends_waiting_stream() {
        let store = Arc::new(MemoryStore::new());
        let monitor = ConfigMonitor::new(Arc::clone(&store));
        let mut changes = monitor.subscribe(&watch_keys()).unwrap();

        let consumer = tokio::spawn(async move {
            let first = changes.next().await;
            (first, changes.is_terminated())
        });
        wait_for_consumer(&monitor).await;
        monitor.close();

        assert_eq!(consumer.await.unwrap(), (None, true));
    }

    #[tokio::test]
    async fn closed_monitor_yields_nothing_further() {
        let store = Arc::new(MemoryStore::new());
        let monitor = ConfigMonitor::new(Arc::clone(&store));
        let mut changes = monitor.subscribe(&watch_keys()).unwrap();

        monitor.close();
        store.set(EN0, record());

        assert_eq!(changes.next().await, None);
        assert_eq!(changes.next().await, None);
    }

    #[tokio::test]
    async fn dropping_monitor_ends_stream_and_deregisters() {
        let store = Arc::new(MemoryStore::new());
        let monitor = ConfigMonitor::new(Arc::clone(&store));
        let mut changes = monitor.subscribe(&watch_keys()).unwrap();
        assert!(store.is_watching());

        drop(monitor);

        assert!(!store.is_watching());
        assert_eq!(changes.next().await, None);
    }

    #[test]
    fn close_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let monitor = ConfigMonitor::new(Arc::clone(&store));
        let _changes = monitor.subscribe(&watch_keys()).unwrap();

        monitor.close();
        monitor.close();

        assert!(monitor.is_closed());
        assert!(!store.is_watching());
    }

    #[test]
    fn close_from_another_thread() {
        let store = Arc::new(MemoryStore::new());
        let monitor = Arc::new(ConfigMonitor::new(Arc::clone(&store)));
        let _changes = monitor.subscribe(&watch_keys()).unwrap();

        let remote = Arc::clone(&monitor);
        std::thread::spawn(move || remote.close()).join().unwrap();

        assert!(monitor.is_closed());
    }

    #[test]
    fn close_without_subscription() {
        let monitor = ConfigMonitor::new(MemoryStore::new());
        monitor.close();
        assert!(monitor.is_closed());
    }

    #[test]
    fn second_subscription_is_rejected() {
        let monitor = ConfigMonitor::new(MemoryStore::new());
        let _changes = monitor.subscribe(&watch_keys()).unwrap();

        let result = monitor.subscribe(&watch_keys());
        assert!(matches!(result, Err(MonitorError::AlreadySubscribed)));
    }

    #[test]
    fn subscribe_after_close_fails() {
        let monitor = ConfigMonitor::new(MemoryStore::new());
        monitor.close();

        let result = monitor.subscribe(&watch_keys());
        assert!(matches!(result, Err(MonitorError::Closed)));
    }

    #[test]
    fn unavailable_store_reports_cannot_create() {
        let monitor = ConfigMonitor::new(UnavailableStore);

        let result = monitor.subscribe(&watch_keys());

        assert!(matches!(result, Err(MonitorError::CannotCreate(_))));
        assert!(monitor.is_closed());
    }

    #[test]
    fn failed_monitor_cannot_resubscribe() {
        let monitor = ConfigMonitor::new(UnavailableStore);
        let _ = monitor.subscribe(&watch_keys());

        let result = monitor.subscribe(&watch_keys());
        assert!(matches!(result, Err(MonitorError::Closed)));
    }

    #[test]
    fn invalid_watch_pattern_reports_cannot_create() {
        let monitor = ConfigMonitor::new(MemoryStore::new());

        let result = monitor.subscribe(&["(".to_string()]);

        assert!(matches!(
            result,
            Err(MonitorError::CannotCreate(StoreError::InvalidPattern { .. }))
        ));
    }

    #[test]
    fn debug_shows_state() {
        let monitor = ConfigMonitor::new(MemoryStore::new());
        let debug_str = format!("{monitor:?}");
        assert!(debug_str.contains("ConfigMonitor"));
        assert!(debug_str.contains("Idle"));
    }

    #[test]
    fn change_stream_is_send_and_unpin() {
        fn assert_send<T: Send>() {}
        fn assert_unpin<T: Unpin>() {}
        assert_send::<ChangeStream>();
        assert_unpin::<ChangeStream>();
    }
}

mod queries {
    use super::*;

    #[test]
    fn query_without_subscription() {
        let store = MemoryStore::new();
        store.set(EN0, record());
        let monitor = ConfigMonitor::new(store);

        let snapshot = monitor.query(&watch_keys());

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[EN0], record());
    }

    #[test]
    fn query_after_close() {
        let store = MemoryStore::new();
        store.set(EN0, record());
        let monitor = ConfigMonitor::new(store);
        monitor.close();

        assert_eq!(monitor.query(&watch_keys()).len(), 1);
    }

    #[test]
    fn query_on_failed_monitor() {
        let monitor = ConfigMonitor::new(UnavailableStore);
        let _ = monitor.subscribe(&watch_keys());

        assert_eq!(monitor.query(&watch_keys()).len(), 1);
    }

    #[test]
    fn query_returns_fresh_copies() {
        let store = Arc::new(MemoryStore::new());
        store.set(EN0, record());
        let monitor = ConfigMonitor::new(Arc::clone(&store));

        let before = monitor.query(&watch_keys());
        store.remove(EN0);
        let after = monitor.query(&watch_keys());

        assert_eq!(before.len(), 1);
        assert!(after.is_empty());
    }
}
