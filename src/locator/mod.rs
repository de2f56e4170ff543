//! DNS proxy locator.
//!
//! Scans a configuration [`Snapshot`](crate::store::Snapshot) of interface
//! IPv6 records for the address of the DNS proxy serving a given network
//! prefix.
//!
//! # Matching
//!
//! An address belongs to the prefix when its own network, built from
//! `Addresses[i]/PrefixLength[i]`, lies entirely inside the target. The proxy
//! address is the one whose `Flags[i]` equals [`DNS_PROXY_FLAGS`]. How these
//! two criteria combine is selected by [`IndexMatching`].

mod locate;
mod record;


pub use locate::{DNS_PROXY_FLAGS, DnsProxy, DnsProxyLocator, IndexMatching, locate, locate_with};
pub use record::{ADDRESSES, AddressEntry, FLAGS, MalformedRecord, PREFIX_LENGTH, parse_record};
