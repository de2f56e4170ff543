//! scdns: network configuration monitor and DNS proxy locator
//!
//! A library for watching a host's dynamic network configuration store and
//! locating the IPv6 address of the DNS proxy serving a network prefix.

pub mod cidr;
pub mod config;
pub mod locator;
pub mod monitor;
pub mod store;
