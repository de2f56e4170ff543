//! CLI argument parsing using clap.
//!
//! Defines the command-line interface with all options and subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// scdns: DNS proxy locator for host network configuration
///
/// Watches the host's dynamic network configuration and reports the IPv6
/// address of the DNS proxy serving a network prefix.
#[derive(Debug, Parser)]
#[command(name = "scdns")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run (default: watch for changes)
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Target IPv6 network prefix, e.g. fd97:7b15:d62e:75ac::/64 (required)
    #[arg(long, global = true, value_name = "ADDR/LEN")]
    pub prefix: Option<String>,

    /// Regex pattern of configuration keys to watch (can be specified multiple times)
    #[arg(long = "watch-key", value_name = "PATTERN", global = true)]
    pub watch_keys: Vec<String>,

    /// Regex pattern of configuration keys to query (can be specified multiple times)
    #[arg(long = "query-pattern", value_name = "PATTERN", global = true)]
    pub query_patterns: Vec<String>,

    /// Read configuration from a JSON snapshot file instead of the system store
    #[arg(long = "snapshot-file", global = true)]
    pub snapshot_file: Option<PathBuf>,

    /// Require the in-prefix address and the proxy-flagged address to be the same
    #[arg(long = "strict-index", global = true)]
    pub strict_index: bool,

    /// Path to configuration file
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

/// Subcommands for scdns
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a default configuration file
    Init {
        /// Output path for the configuration file
        #[arg(long, short, default_value = "scdns.toml")]
        output: PathBuf,
    },

    /// Locate the DNS proxy once and exit
    Locate,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Parses CLI arguments from an iterator (useful for testing).
    pub fn parse_from_iter<I, T>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::parse_from(iter)
    }

    /// Returns true if this is the init command.
    #[must_use]
    pub const fn is_init(&self) -> bool {
        matches!(self.command, Some(Command::Init { .. }))
    }

    /// Returns true if this is the one-shot locate command.
    #[must_use]
    pub const fn is_locate(&self) -> bool {
        matches!(self.command, Some(Command::Locate))
    }
}
