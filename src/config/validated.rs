//! Validated configuration after merging CLI and TOML sources.
//!
//! This module contains the final, validated configuration that is used
//! by the application. All validation is performed during construction.

use std::fmt;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::cidr::Cidr;
use crate::locator::{DnsProxyLocator, IndexMatching};

use super::cli::Cli;
use super::defaults;
use super::error::{ConfigError, field};
use super::toml::TomlConfig;

/// Fully validated configuration ready for use by the application.
///
/// # Construction
///
/// Use [`ValidatedConfig::from_raw`] to create from CLI args and optional TOML config.
/// The function validates all inputs and returns errors for invalid configurations.
#[derive(Debug)]
pub struct ValidatedConfig {
    /// Target network prefix (required)
    pub prefix: Cidr,

    /// How prefix and flag matches combine within an entry
    pub matching: IndexMatching,

    /// Key patterns to watch for changes
    pub watch_keys: Vec<String>,

    /// Key patterns read into each snapshot
    pub query_patterns: Vec<String>,

    /// JSON snapshot standing in for the system store.
    /// If `None`, the platform store is used.
    pub snapshot_file: Option<PathBuf>,

    /// Verbose logging enabled
    pub verbose: bool,
}

impl fmt::Display for ValidatedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = self
            .snapshot_file
            .as_ref()
            .map_or_else(|| "system".to_string(), |p| p.display().to_string());

        write!(
            f,
            "Config {{ prefix: {}, matching: {:?}, watch_keys: {}, query_patterns: {}, store: {} }}",
            self.prefix,
            self.matching,
            self.watch_keys.len(),
            self.query_patterns.len(),
            source,
        )
    }
}

impl ValidatedConfig {
    /// Creates a validated configuration from CLI arguments and optional TOML config.
    ///
    /// CLI arguments take precedence over TOML config values.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The prefix is missing or invalid
    /// - A key pattern is not a valid regex
    /// - A key pattern list is empty
    pub fn from_raw(cli: &Cli, toml: Option<&TomlConfig>) -> Result<Self, ConfigError> {
        let prefix = Self::resolve_prefix(cli, toml)?;

        // Flags only enable: true in either source wins
        let strict_index = cli.strict_index || toml.is_some_and(|t| t.locator.strict_index);
        let matching = if strict_index {
            IndexMatching::SameIndex
        } else {
            IndexMatching::Independent
        };

        let watch_keys = resolve_patterns(
            field::WATCH_KEYS,
            &cli.watch_keys,
            toml.and_then(|t| t.monitor.watch_keys.as_deref()),
            defaults::watch_keys,
        )?;

        let query_patterns = resolve_patterns(
            field::QUERY_PATTERNS,
            &cli.query_patterns,
            toml.and_then(|t| t.monitor.query_patterns.as_deref()),
            defaults::query_patterns,
        )?;

        Ok(Self {
            prefix,
            matching,
            watch_keys,
            query_patterns,
            snapshot_file: cli.snapshot_file.clone(),
            verbose: cli.verbose,
        })
    }

    /// Loads and merges configuration from CLI and optional config file.
    ///
    /// If `cli.config` is set, loads the TOML file from that path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config file cannot be read or parsed
    /// - The merged configuration is invalid
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let toml = if let Some(ref path) = cli.config {
            Some(TomlConfig::load(path)?)
        } else {
            None
        };

        Self::from_raw(cli, toml.as_ref())
    }

    /// Builds the locator for the configured prefix and matching mode.
    #[must_use]
    pub fn locator(&self) -> DnsProxyLocator {
        DnsProxyLocator::new(self.prefix).with_matching(self.matching)
    }

    fn resolve_prefix(cli: &Cli, toml: Option<&TomlConfig>) -> Result<Cidr, ConfigError> {
        // CLI takes precedence
        let prefix = cli
            .prefix
            .as_deref()
            .or_else(|| toml.and_then(|t| t.locator.prefix.as_deref()))
            .ok_or_else(|| {
                ConfigError::missing(
                    field::PREFIX,
                    "Use --prefix or set locator.prefix in config file",
                )
            })?;

        prefix.parse::<Cidr>().map_err(ConfigError::from)
    }
}

/// Picks CLI patterns, else TOML patterns, else defaults, and validates them.
///
/// CLI patterns replace TOML patterns entirely.
fn resolve_patterns(
    name: &'static str,
    cli: &[String],
    toml: Option<&[String]>,
    default: fn() -> Vec<String>,
) -> Result<Vec<String>, ConfigError> {
    let patterns = if !cli.is_empty() {
        cli.to_vec()
    } else if let Some(toml) = toml {
        toml.to_vec()
    } else {
        default()
    };

    if patterns.is_empty() {
        return Err(ConfigError::EmptyKeys { field: name });
    }

    for pattern in &patterns {
        Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
            pattern: pattern.clone(),
            source: e,
        })?;
    }

    Ok(patterns)
}

/// Writes the default configuration template to a file.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    let template = super::toml::default_config_template();
    std::fs::write(path, template).map_err(|e| ConfigError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })
}
