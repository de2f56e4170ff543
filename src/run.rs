//! Application execution logic.
//!
//! This module contains the one-shot lookup and the async watch loop that
//! re-locates the DNS proxy whenever watched configuration keys change.

use std::future::Future;

use thiserror::Error;
use tokio::signal;
use tokio_stream::StreamExt;

use scdns::config::ValidatedConfig;
use scdns::locator::{DnsProxy, DnsProxyLocator};
use scdns::monitor::{ChangeStream, ConfigMonitor, MonitorError};
use scdns::store::{DynamicStore, MemoryStore, StoreError};

#[cfg(target_os = "macos")]
use scdns::store::platform::PlatformStore;

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;

/// Name the process registers with the system configuration store.
#[cfg(target_os = "macos")]
const STORE_NAME: &str = "scdns";

/// Type alias for the application's store, chosen at startup.
type AppStore = Box<dyn DynamicStore>;

/// Error type for runtime execution failures.
#[derive(Debug, Error)]
pub enum RunError {
    /// Failed to open the configuration store.
    #[error("Failed to open configuration store: {0}")]
    Store(#[source] StoreError),

    /// Failed to subscribe to configuration changes.
    #[error("Failed to subscribe to configuration changes: {0}")]
    Subscribe(#[source] MonitorError),

    /// No system store exists on this platform.
    #[error("No system configuration store on this platform, use --snapshot-file")]
    NoStore,

    /// Unexpected stream termination.
    #[error("Monitor stream terminated unexpectedly")]
    StreamTerminated,
}

/// Change in the located DNS proxy between two lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Transition {
    Unchanged,
    Found(DnsProxy),
    Moved { from: DnsProxy, to: DnsProxy },
    Lost(DnsProxy),
}

/// Compares two lookup results.
fn transition(previous: Option<&DnsProxy>, current: Option<&DnsProxy>) -> Transition {
    match (previous, current) {
        (None, None) => Transition::Unchanged,
        (None, Some(to)) => Transition::Found(to.clone()),
        (Some(from), None) => Transition::Lost(from.clone()),
        (Some(from), Some(to)) if from == to => Transition::Unchanged,
        (Some(from), Some(to)) => Transition::Moved {
            from: from.clone(),
            to: to.clone(),
        },
    }
}

fn log_transition(transition: &Transition) {
    match transition {
        Transition::Unchanged => tracing::debug!("DNS proxy unchanged"),
        Transition::Found(proxy) => tracing::info!("+ DNS proxy {proxy}"),
        Transition::Moved { from, to } => tracing::info!("~ DNS proxy {from} -> {to}"),
        Transition::Lost(proxy) => tracing::warn!("- DNS proxy {proxy} no longer available"),
    }
}

/// Opens the store selected by the configuration.
///
/// A snapshot file takes precedence over the system store.
fn open_store(config: &ValidatedConfig) -> Result<AppStore, RunError> {
    if let Some(ref path) = config.snapshot_file {
        tracing::info!("Reading configuration snapshot: {}", path.display());
        let store = MemoryStore::load(path).map_err(RunError::Store)?;
        return Ok(Box::new(store));
    }

    open_system_store()
}

#[cfg(target_os = "macos")]
fn open_system_store() -> Result<AppStore, RunError> {
    let store = PlatformStore::new(STORE_NAME).map_err(RunError::Store)?;
    Ok(Box::new(store))
}

#[cfg(not(target_os = "macos"))]
fn open_system_store() -> Result<AppStore, RunError> {
    Err(RunError::NoStore)
}

/// Queries the store and locates the DNS proxy.
fn lookup<S: DynamicStore>(
    monitor: &ConfigMonitor<S>,
    locator: &DnsProxyLocator,
    query_patterns: &[String],
) -> Option<DnsProxy> {
    let snapshot = monitor.query(query_patterns);
    tracing::debug!("Queried {} configuration entries", snapshot.len());
    locator.locate(&snapshot)
}

/// Locates the DNS proxy once.
///
/// # Errors
///
/// Returns an error if the store cannot be opened.
pub fn locate_once(config: &ValidatedConfig) -> Result<Option<DnsProxy>, RunError> {
    let store = open_store(config)?;
    let snapshot = store.query(&config.query_patterns);
    tracing::debug!("Queried {} configuration entries", snapshot.len());
    Ok(config.locator().locate(&snapshot))
}

/// Executes the watch loop until a shutdown signal.
///
/// # Errors
///
/// Returns an error if:
/// - The store cannot be opened or subscribed to
/// - The change stream terminates unexpectedly
///
/// # Coverage Note
///
/// This function is excluded from coverage because it requires
/// real signal handling; the loop itself is covered by [`watch_changes`].
#[cfg(not(tarpaulin_include))]
pub async fn execute(config: ValidatedConfig) -> Result<(), RunError> {
    let store = open_store(&config)?;
    let monitor = ConfigMonitor::new(store);
    let changes = monitor
        .subscribe(&config.watch_keys)
        .map_err(RunError::Subscribe)?;

    let locator = config.locator();
    let result = watch_changes(
        &monitor,
        changes,
        &locator,
        &config.query_patterns,
        shutdown_signal(),
    )
    .await;

    monitor.close();
    result.map(|_| ())
}

/// Locates the DNS proxy initially and again after every change batch.
///
/// Returns the last located proxy once `shutdown` completes.
async fn watch_changes<S, F>(
    monitor: &ConfigMonitor<S>,
    mut changes: ChangeStream,
    locator: &DnsProxyLocator,
    query_patterns: &[String],
    shutdown: F,
) -> Result<Option<DnsProxy>, RunError>
where
    S: DynamicStore,
    F: Future<Output = ()>,
{
    let mut current = lookup(monitor, locator, query_patterns);
    match current {
        Some(ref proxy) => tracing::info!("DNS proxy {proxy}"),
        None => tracing::info!("No DNS proxy in {} yet", locator.prefix()),
    }

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            () = &mut shutdown => {
                tracing::info!("Shutdown signal received, stopping...");
                return Ok(current);
            }

            batch = changes.next() => {
                let Some(keys) = batch else {
                    return Err(RunError::StreamTerminated);
                };
                tracing::debug!("{} key(s) changed", keys.len());

                let next = lookup(monitor, locator, query_patterns);
                log_transition(&transition(current.as_ref(), next.as_ref()));
                current = next;
            }
        }
    }
}

/// Returns a future that completes when a shutdown signal is received.
///
/// Excluded from coverage - requires OS signal handling.
#[cfg(not(tarpaulin_include))]
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
