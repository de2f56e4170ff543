//! Monitor layer for configuration store changes.
//!
//! This module provides:
//! - The monitor owning a store subscription ([`ConfigMonitor`])
//! - The consumer-pulled stream of change batches ([`ChangeStream`])
//! - The single-slot callback handoff ([`Handoff`], [`Delivery`])
//! - Error handling ([`MonitorError`])

mod config_monitor;
mod error;
mod handoff;
mod stream;

#[cfg(test)]
mod config_monitor_tests;

pub use config_monitor::ConfigMonitor;
pub use error::MonitorError;
pub use handoff::{Delivery, Handoff};
pub use stream::ChangeStream;
