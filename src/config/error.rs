//! Error types for configuration parsing and validation.

use std::path::PathBuf;

use thiserror::Error;

use crate::cidr::CidrError;

/// Error type for configuration operations.
///
/// Covers errors from parsing, validation, and file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("Failed to read config file '{}': {source}", path.display())]
    FileRead {
        /// Path to the config file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("Failed to parse TOML config: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to write configuration file (for init command).
    #[error("Failed to write config file '{}': {source}", path.display())]
    FileWrite {
        /// Path to the config file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Missing required field that must be provided by CLI or config file.
    #[error("Missing required field: {field}. {hint}")]
    MissingRequired {
        /// Name of the missing field
        field: &'static str,
        /// Hint for how to provide the value
        hint: &'static str,
    },

    /// The target prefix could not be parsed.
    #[error(transparent)]
    InvalidPrefix(#[from] CidrError),

    /// Invalid regex pattern for configuration keys.
    #[error("Invalid key pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The invalid pattern
        pattern: String,
        /// Underlying regex error
        #[source]
        source: regex::Error,
    },

    /// A key pattern list resolved to no patterns.
    #[error("No {field} configured")]
    EmptyKeys {
        /// Name of the empty list
        field: &'static str,
    },
}

/// Well-known field names for `MissingRequired` and `EmptyKeys` errors.
///
/// Use these constants for compile-time safety when matching field names.
pub mod field {
    /// The target prefix field.
    pub const PREFIX: &str = "prefix";
    /// The watch key pattern list.
    pub const WATCH_KEYS: &str = "watch_keys";
    /// The query pattern list.
    pub const QUERY_PATTERNS: &str = "query_patterns";
}

impl ConfigError {
    /// Creates a `MissingRequired` error for a required field.
    #[must_use]
    pub const fn missing(field: &'static str, hint: &'static str) -> Self {
        Self::MissingRequired { field, hint }
    }
}
