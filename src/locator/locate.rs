//! DNS proxy lookup over a configuration snapshot.

use std::fmt;
use std::net::Ipv6Addr;

use super::record::{AddressEntry, parse_record};
use crate::cidr::Cidr;
use crate::store::Snapshot;

/// Flag mask of the secured, temporary address the DNS proxy listens on.
pub const DNS_PROXY_FLAGS: u32 = 1088;

/// How prefix and flag criteria combine within one entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IndexMatching {
    /// Some address must lie inside the target prefix; the result is the
    /// first address carrying [`DNS_PROXY_FLAGS`], which need not be the
    /// same address.
    #[default]
    Independent,
    /// A single address must both lie inside the target prefix and carry
    /// [`DNS_PROXY_FLAGS`].
    SameIndex,
}

/// A located DNS proxy address and the entry it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsProxy {
    pub address: Ipv6Addr,
    pub key: String,
}

impl fmt::Display for DnsProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.address, self.key)
    }
}

/// Finds the DNS proxy address for `target` using [`IndexMatching::Independent`].
///
/// See [`locate_with`].
#[must_use]
pub fn locate(snapshot: &Snapshot, target: &Cidr) -> Option<DnsProxy> {
    locate_with(snapshot, target, IndexMatching::Independent)
}

/// Finds the DNS proxy address for `target`.
///
/// Entries are scanned in snapshot order and the first that yields an address
/// wins. Malformed entries are skipped with a warning. Never fails.
#[must_use]
pub fn locate_with(snapshot: &Snapshot, target: &Cidr, matching: IndexMatching) -> Option<DnsProxy> {
    snapshot.iter().find_map(|(key, record)| {
        tracing::debug!(key = %key, "Looking for DNS proxy");

        let entries = match parse_record(record) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(key = %key, "Skipping malformed record: {e}");
                return None;
            }
        };

        let address = match matching {
            IndexMatching::Independent => independent_match(&entries, target),
            IndexMatching::SameIndex => same_index_match(&entries, target),
        }?;

        Some(DnsProxy {
            address,
            key: key.clone(),
        })
    })
}

fn independent_match(entries: &[AddressEntry], target: &Cidr) -> Option<Ipv6Addr> {
    if !entries.iter().any(|entry| is_prefix_match(entry, target)) {
        tracing::debug!(prefix = %target, "No address inside prefix");
        return None;
    }

    let Some(flagged) = entries.iter().find(|entry| is_flag_match(entry)) else {
        tracing::debug!(prefix = %target, "Prefix found with non-secured flags");
        return None;
    };

    let address = flagged.ipv6();
    if address.is_none() {
        tracing::debug!(address = %flagged.address, "Cannot parse DNS proxy address");
    }
    address
}

fn same_index_match(entries: &[AddressEntry], target: &Cidr) -> Option<Ipv6Addr> {
    let address = entries
        .iter()
        .find(|entry| is_prefix_match(entry, target) && is_flag_match(entry))
        .and_then(AddressEntry::ipv6);
    if address.is_none() {
        tracing::debug!(prefix = %target, "No secured address inside prefix");
    }
    address
}

fn is_prefix_match(entry: &AddressEntry, target: &Cidr) -> bool {
    entry
        .cidr()
        .is_some_and(|candidate| target.contains_range(&candidate))
}

fn is_flag_match(entry: &AddressEntry) -> bool {
    entry.flags == Some(DNS_PROXY_FLAGS)
}

/// Locator bound to a target prefix and matching mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DnsProxyLocator {
    prefix: Cidr,
    matching: IndexMatching,
}

impl DnsProxyLocator {
    /// Creates a locator for `prefix` with the default matching mode.
    #[must_use]
    pub fn new(prefix: Cidr) -> Self {
        Self {
            prefix,
            matching: IndexMatching::default(),
        }
    }

    /// Sets the matching mode.
    #[must_use]
    pub const fn with_matching(mut self, matching: IndexMatching) -> Self {
        self.matching = matching;
        self
    }

    /// Returns the target prefix.
    #[must_use]
    pub const fn prefix(&self) -> &Cidr {
        &self.prefix
    }

    /// Returns the matching mode.
    #[must_use]
    pub const fn matching(&self) -> IndexMatching {
        self.matching
    }

    /// Finds the DNS proxy address in `snapshot`.
    #[must_use]
    pub fn locate(&self, snapshot: &Snapshot) -> Option<DnsProxy> {
        locate_with(snapshot, &self.prefix, self.matching)
    }
}
