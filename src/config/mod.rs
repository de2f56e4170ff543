//! Configuration layer for scdns.
//!
//! This module provides:
//! - CLI argument parsing ([`Cli`], [`Command`])
//! - TOML configuration file parsing ([`TomlConfig`])
//! - Validated configuration ([`ValidatedConfig`])
//! - Configuration file generation ([`write_default_config`])
//! - Default values ([`defaults`])
//!
//! # Priority
//!
//! Configuration values are resolved with the following priority (highest to lowest):
//!
//! 1. **Explicit CLI arguments** - Values explicitly passed via command line
//! 2. **TOML config file** - Values from the configuration file
//! 3. **Built-in defaults** - Hardcoded default values
//!
//! The target `prefix` has no default and must come from CLI or TOML.
//!
//! For key patterns (`watch_keys`, `query_patterns`), CLI patterns **replace**
//! TOML patterns entirely (not merged). Each list is handled independently.
//! An explicitly empty TOML list is an error rather than a fallback to defaults.
//!
//! # Boolean Flag Semantics
//!
//! `--strict-index` uses OR semantics: if set in either CLI or TOML, it is on.
//!
//! # CLI-Only Options
//!
//! `--snapshot-file` and `--verbose` are not read from the config file.

mod cli;
pub mod defaults;
mod error;
mod toml;
mod validated;

#[cfg(test)]
mod toml_tests;

pub use cli::{Cli, Command};
pub use error::{ConfigError, field};
pub use toml::{LocatorSection, MonitorSection, TomlConfig, default_config_template};
pub use validated::{ValidatedConfig, write_default_config};
