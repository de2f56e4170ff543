//! Typed view of an interface IPv6 record.

use std::net::Ipv6Addr;

use serde_json::Value;
use thiserror::Error;

use crate::cidr::Cidr;
use crate::store::PropertyRecord;

/// Property holding the interface's address strings.
pub const ADDRESSES: &str = "Addresses";

/// Property holding per-address flag bitmasks.
pub const FLAGS: &str = "Flags";

/// Property holding per-address prefix lengths.
pub const PREFIX_LENGTH: &str = "PrefixLength";

/// Why a record could not be turned into address entries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedRecord {
    /// A required property is absent.
    #[error("Missing property '{0}'")]
    Missing(&'static str),

    /// A property is not an array of the expected element type.
    #[error("Property '{0}' has an unexpected type")]
    WrongType(&'static str),

    /// The parallel arrays disagree in length.
    #[error(
        "Property arrays differ in length: {addresses} addresses, {flags} flags, {prefix_lengths} prefix lengths"
    )]
    LengthMismatch {
        addresses: usize,
        flags: usize,
        prefix_lengths: usize,
    },
}

impl MalformedRecord {
    /// Name of the offending property, if the error concerns a single one.
    #[must_use]
    pub const fn property(&self) -> Option<&'static str> {
        match self {
            Self::Missing(name) | Self::WrongType(name) => Some(name),
            Self::LengthMismatch { .. } => None,
        }
    }
}

/// One logical address of an interface: `Addresses[i]`, `Flags[i]`, `PrefixLength[i]`.
///
/// Numeric values that are not non-negative integers in range are kept as
/// `None`, which makes the entry fail the corresponding match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressEntry {
    pub address: String,
    pub flags: Option<u32>,
    pub prefix_len: Option<u8>,
}

impl AddressEntry {
    /// The address parsed as IPv6, if valid.
    #[must_use]
    pub fn ipv6(&self) -> Option<Ipv6Addr> {
        self.address.parse().ok()
    }

    /// The candidate network `address/prefix_len`, if both parts are valid.
    #[must_use]
    pub fn cidr(&self) -> Option<Cidr> {
        Cidr::new(self.ipv6()?, self.prefix_len?).ok()
    }
}

/// Converts a loosely-typed record into address entries.
///
/// # Errors
///
/// Returns [`MalformedRecord`] if a property is missing, is not an array of
/// the expected element type, or the arrays differ in length.
pub fn parse_record(record: &PropertyRecord) -> Result<Vec<AddressEntry>, MalformedRecord> {
    let addresses = string_array(record, ADDRESSES)?;
    let flags = number_array(record, FLAGS)?;
    let prefix_lengths = number_array(record, PREFIX_LENGTH)?;

    if addresses.len() != flags.len() || addresses.len() != prefix_lengths.len() {
        return Err(MalformedRecord::LengthMismatch {
            addresses: addresses.len(),
            flags: flags.len(),
            prefix_lengths: prefix_lengths.len(),
        });
    }

    Ok(addresses
        .into_iter()
        .zip(flags)
        .zip(prefix_lengths)
        .map(|((address, flags), prefix_len)| AddressEntry {
            address: address.to_string(),
            flags: flags.as_u64().and_then(|n| u32::try_from(n).ok()),
            prefix_len: prefix_len.as_u64().and_then(|n| u8::try_from(n).ok()),
        })
        .collect())
}

fn array<'a>(record: &'a PropertyRecord, name: &'static str) -> Result<&'a [Value], MalformedRecord> {
    record
        .get(name)
        .ok_or(MalformedRecord::Missing(name))?
        .as_array()
        .map(Vec::as_slice)
        .ok_or(MalformedRecord::WrongType(name))
}

fn string_array<'a>(
    record: &'a PropertyRecord,
    name: &'static str,
) -> Result<Vec<&'a str>, MalformedRecord> {
    array(record, name)?
        .iter()
        .map(|value| value.as_str().ok_or(MalformedRecord::WrongType(name)))
        .collect()
}

fn number_array<'a>(
    record: &'a PropertyRecord,
    name: &'static str,
) -> Result<Vec<&'a serde_json::Number>, MalformedRecord> {
    array(record, name)?
        .iter()
        .map(|value| value.as_number().ok_or(MalformedRecord::WrongType(name)))
        .collect()
}
