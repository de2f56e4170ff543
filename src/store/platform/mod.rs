//! Platform-specific configuration store implementations.
//!
//! This module provides conditional compilation for platform-specific
//! implementations of the [`DynamicStore`](super::DynamicStore) trait.
//!
//! # Platform Support
//!
//! - **macOS**: Uses the System Configuration dynamic store via the
//!   `system-configuration` crate.
//! - **Other platforms**: No native store; replay a snapshot file through
//!   [`MemoryStore`](super::MemoryStore).

#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "macos")]
pub use macos::SystemStore;

// Re-export platform-specific store as PlatformStore for convenience
#[cfg(target_os = "macos")]
pub use macos::SystemStore as PlatformStore;
