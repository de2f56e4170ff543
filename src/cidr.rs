//! IPv6 network prefixes and containment checks.

use std::fmt;
use std::net::Ipv6Addr;
use std::str::FromStr;

use ipnet::Ipv6Net;
use thiserror::Error;

/// Error returned when a prefix cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CidrError {
    /// The address did not parse or the prefix length is outside 0–128.
    #[error("Invalid IPv6 prefix '{value}': {reason}")]
    InvalidPrefix {
        /// The rejected input, as text.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl CidrError {
    fn invalid(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPrefix {
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// An IPv6 address with a prefix length.
///
/// The address keeps its host bits, so `fd97::1/64` displays as written.
/// The range it covers is the closed interval [`lower`](Self::lower) ..=
/// [`upper`](Self::upper).
///
/// # Example
///
/// ```
/// use scdns::cidr::Cidr;
///
/// let prefix: Cidr = "fd97:7b15:d62e:75ac::/64".parse().unwrap();
/// assert!(prefix.contains("fd97:7b15:d62e:75ac:4fa:6b2d:4f21:fd01".parse().unwrap()));
/// assert!(!prefix.contains("fe80::1".parse().unwrap()));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cidr {
    net: Ipv6Net,
}

impl Cidr {
    /// Creates a prefix from an address and a prefix length.
    ///
    /// # Errors
    ///
    /// Returns [`CidrError::InvalidPrefix`] if `prefix_len` exceeds 128.
    pub fn new(address: Ipv6Addr, prefix_len: u8) -> Result<Self, CidrError> {
        Ipv6Net::new(address, prefix_len)
            .map(|net| Self { net })
            .map_err(|e| CidrError::invalid(format!("{address}/{prefix_len}"), e.to_string()))
    }

    /// The address as given, host bits included.
    #[must_use]
    pub fn address(&self) -> Ipv6Addr {
        self.net.addr()
    }

    /// Number of leading network bits.
    #[must_use]
    pub fn prefix_len(&self) -> u8 {
        self.net.prefix_len()
    }

    /// First address of the range (host bits cleared).
    #[must_use]
    pub fn lower(&self) -> Ipv6Addr {
        self.net.network()
    }

    /// Last address of the range (host bits set).
    #[must_use]
    pub fn upper(&self) -> Ipv6Addr {
        self.net.broadcast()
    }

    /// Returns true if the top `prefix_len` bits of `address` match this prefix.
    #[must_use]
    pub fn contains(&self, address: Ipv6Addr) -> bool {
        self.net.contains(&address)
    }

    /// Returns true if the whole range of `other` lies inside this prefix.
    ///
    /// Overlap is not enough: `fd00::/8` does not nest inside `fd00::/16`.
    #[must_use]
    pub fn contains_range(&self, other: &Self) -> bool {
        self.contains(other.lower()) && self.contains(other.upper())
    }
}

impl FromStr for Cidr {
    type Err = CidrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (address, prefix_len) = s
            .split_once('/')
            .ok_or_else(|| CidrError::invalid(s, "expected '<address>/<prefix length>'"))?;

        let address: Ipv6Addr = address
            .parse()
            .map_err(|_| CidrError::invalid(s, "not an IPv6 address"))?;

        let prefix_len: u8 = prefix_len
            .parse()
            .map_err(|_| CidrError::invalid(s, "prefix length must be between 0 and 128"))?;

        if prefix_len > 128 {
            return Err(CidrError::invalid(
                s,
                "prefix length must be between 0 and 128",
            ));
        }

        Self::new(address, prefix_len)
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address(), self.prefix_len())
    }
}
