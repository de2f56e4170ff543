//! Configuration store layer.
//!
//! This module provides types and traits for:
//! - Loosely-typed configuration records ([`PropertyRecord`], [`Snapshot`])
//! - The store abstraction the monitor subscribes to ([`DynamicStore`], [`ChangeSink`])
//! - An in-process store for fixtures and tests ([`MemoryStore`])
//! - Platform-specific stores ([`platform`])

mod error;
mod memory;
pub mod platform;
mod snapshot;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use snapshot::{ChangeBatch, ChangeSink, DynamicStore, PropertyRecord, Snapshot};
