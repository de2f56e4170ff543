//! TOML configuration file parsing.
//!
//! Defines the structure of the configuration file with serde.

use std::path::Path;

use serde::Deserialize;

use super::ConfigError;

/// Root configuration structure from TOML file.
///
/// All fields are optional to allow partial configuration
/// that can be merged with CLI arguments.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    /// DNS proxy lookup configuration
    #[serde(default)]
    pub locator: LocatorSection,

    /// Change monitoring configuration
    #[serde(default)]
    pub monitor: MonitorSection,
}

/// DNS proxy lookup section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocatorSection {
    /// Target IPv6 network prefix in `addr/len` form
    pub prefix: Option<String>,

    /// Require prefix and flag matches on the same address
    #[serde(default)]
    pub strict_index: bool,
}

/// Change monitoring section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorSection {
    /// Regex patterns of keys to watch
    pub watch_keys: Option<Vec<String>>,

    /// Regex patterns of keys to read on each change
    pub query_patterns: Option<Vec<String>>,
}

impl TomlConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::from)
    }
}

/// Generates a default configuration file with comments.
#[must_use]
pub fn default_config_template() -> String {
    r#"# scdns Configuration File

[locator]
# Target IPv6 network prefix (required)
# prefix = "fd97:7b15:d62e:75ac::/64"

# Require the in-prefix address to also carry the DNS proxy flags
# (default: false, prefix and flags may match different addresses)
# strict_index = false

[monitor]
# Regex patterns of configuration keys to watch
# Note: CLI patterns REPLACE these entirely (not merged)
watch_keys = ["State:/Network/Interface/[^/]+/IPv6"]

# Regex patterns of configuration keys read on each change
# Note: CLI patterns REPLACE these entirely (not merged)
query_patterns = ["State:/Network/Interface/[^/]+/IPv6"]
"#
    .to_string()
}
