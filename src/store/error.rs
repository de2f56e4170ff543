//! Error types for the store layer.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for configuration store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The notification source could not be established.
    ///
    /// Typically resource exhaustion or a permission failure in the host.
    #[error("Cannot create configuration store: {reason}")]
    CannotCreate {
        /// Description of the underlying failure.
        reason: String,
    },

    /// A notification registration is already active on this store.
    #[error("Notification keys already registered")]
    AlreadyRegistered,

    /// A key pattern is not a valid regular expression.
    #[error("Invalid key pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The rejected pattern
        pattern: String,
        /// Underlying regex error
        #[source]
        source: regex::Error,
    },

    /// Failed to read a snapshot file.
    #[error("Failed to read snapshot file '{}': {source}", path.display())]
    SnapshotRead {
        /// Path to the snapshot file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Snapshot content is not a JSON object of records.
    #[error("Failed to parse snapshot: {0}")]
    SnapshotParse(#[from] serde_json::Error),
}

impl StoreError {
    /// Creates a `CannotCreate` error from any displayable reason.
    #[must_use]
    pub fn cannot_create(reason: impl std::fmt::Display) -> Self {
        Self::CannotCreate {
            reason: reason.to_string(),
        }
    }
}
