//! Error types for the monitor layer.

use crate::store::StoreError;
use thiserror::Error;

/// Error type for monitor subscriptions.
///
/// None of these are retried internally; callers decide whether to build a
/// new monitor.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The store's notification source could not be established.
    ///
    /// Unrecoverable for this monitor instance; construct a new one.
    #[error("Cannot create change subscription: {0}")]
    CannotCreate(#[source] StoreError),

    /// A subscription is already active on this monitor.
    #[error("Monitor already has an active subscription")]
    AlreadySubscribed,

    /// The monitor has been closed and cannot subscribe again.
    #[error("Monitor is closed")]
    Closed,
}
