//! scdns: DNS proxy locator for host network configuration
//!
//! Entry point for the scdns application.

use scdns::config::{Cli, Command, ValidatedConfig, write_default_config};
use std::process::ExitCode;

mod app;
mod run;

use app::{exit_code, print_config_hint, setup_tracing};

/// Main entry point.
///
/// Excluded from coverage as it's the thin wrapper around testable components.
#[cfg(not(tarpaulin_include))]
fn main() -> ExitCode {
    let cli = Cli::parse_args();

    // Handle init subcommand
    if let Some(Command::Init { output }) = &cli.command {
        return handle_init(output);
    }

    // Load and validate configuration
    let config = match ValidatedConfig::load(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            print_config_hint(&e);
            return exit_code::CONFIG_ERROR;
        }
    };

    setup_tracing(config.verbose);
    tracing::debug!("{config}");

    if cli.is_locate() {
        return handle_locate(&config);
    }

    tracing::info!("{config}");
    run_application(config)
}

/// Handles the `init` subcommand.
fn handle_init(output: &std::path::Path) -> ExitCode {
    match write_default_config(output) {
        Ok(()) => {
            println!("Configuration template written to: {}", output.display());
            exit_code::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            exit_code::CONFIG_ERROR
        }
    }
}

/// Handles the `locate` subcommand.
///
/// Prints the proxy address on stdout so it can be captured by scripts.
fn handle_locate(config: &ValidatedConfig) -> ExitCode {
    match run::locate_once(config) {
        Ok(Some(proxy)) => {
            tracing::info!("DNS proxy {proxy}");
            println!("{}", proxy.address);
            exit_code::SUCCESS
        }
        Ok(None) => {
            eprintln!("No DNS proxy found in {}", config.prefix);
            exit_code::not_found()
        }
        Err(e) => {
            tracing::error!("Lookup failed: {e}");
            exit_code::runtime_error()
        }
    }
}

/// Runs the watch loop with the given configuration.
///
/// Excluded from coverage - requires async runtime.
#[cfg(not(tarpaulin_include))]
fn run_application(config: ValidatedConfig) -> ExitCode {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to create Tokio runtime: {e}");
            return exit_code::runtime_error();
        }
    };

    match runtime.block_on(run::execute(config)) {
        Ok(()) => exit_code::SUCCESS,
        Err(e) => {
            tracing::error!("Application error: {e}");
            exit_code::runtime_error()
        }
    }
}
