// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network Value Objects with Validation Invariants
//!
//! Ranges and interface addresses wrap [`ipnet::IpNet`]. Address set
//! arithmetic works on the unsigned integer form of an address: IPv4
//! addresses live in the low 32 bits of a `u128`, IPv6 addresses use all 128.

use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use thiserror::Error;

/// Network validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Invalid IP address format: {0}")]
    InvalidIpAddress(String),

    #[error("Invalid CIDR notation: {0}")]
    InvalidCidr(String),

    #[error("Invalid prefix length: {length} (must be 0-{max} for {family})")]
    InvalidPrefixLength {
        length: u8,
        max: u8,
        family: AddressFamily,
    },
}

/// IP address family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    /// Width of an address in bits
    pub fn bits(&self) -> u8 {
        match self {
            Self::V4 => 32,
            Self::V6 => 128,
        }
    }

    /// Protocol version number (4 or 6)
    pub fn version(&self) -> u8 {
        match self {
            Self::V4 => 4,
            Self::V6 => 6,
        }
    }

    /// Family of a standard library address
    pub fn of(address: &IpAddr) -> Self {
        match address {
            IpAddr::V4(_) => Self::V4,
            IpAddr::V6(_) => Self::V6,
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4 => write!(f, "IPv4"),
            Self::V6 => write!(f, "IPv6"),
        }
    }
}

pub(crate) fn address_to_int(address: &IpAddr) -> u128 {
    match address {
        IpAddr::V4(v4) => u128::from(u32::from(*v4)),
        IpAddr::V6(v6) => u128::from(*v6),
    }
}

pub(crate) fn int_to_address(family: AddressFamily, value: u128) -> IpAddr {
    match family {
        // v4 values never exceed 32 bits, the truncation is exact
        AddressFamily::V4 => IpAddr::V4(Ipv4Addr::from(value as u32)),
        AddressFamily::V6 => IpAddr::V6(Ipv6Addr::from(value)),
    }
}

/// Pair `address` with a mask, rejecting lengths past the family width
fn net_with_length(address: IpAddr, prefix_length: u8) -> Result<IpNet, NetworkError> {
    IpNet::new(address, prefix_length).map_err(|_| {
        let family = AddressFamily::of(&address);
        NetworkError::InvalidPrefixLength {
            length: prefix_length,
            max: family.bits(),
            family,
        }
    })
}

fn split_cidr(cidr: &str) -> Result<(IpAddr, Option<u8>), NetworkError> {
    let cidr = cidr.trim();
    match cidr.split_once('/') {
        Some((addr_str, prefix_str)) => {
            let address = IpAddr::from_str(addr_str)
                .map_err(|_| NetworkError::InvalidIpAddress(addr_str.to_string()))?;
            let prefix_length = prefix_str
                .parse::<u8>()
                .map_err(|_| NetworkError::InvalidCidr(cidr.to_string()))?;
            Ok((address, Some(prefix_length)))
        }
        None => {
            let address = IpAddr::from_str(cidr)
                .map_err(|_| NetworkError::InvalidIpAddress(cidr.to_string()))?;
            Ok((address, None))
        }
    }
}

/// A CIDR network: base address plus prefix length
///
/// Invariants:
/// - Host bits of the base address are always zero (canonical form)
/// - Prefix length within 0-32 for IPv4, 0-128 for IPv6
///
/// A `/0` is representable here so that parsing never loses information;
/// aggregates, prefixes and addresses reject it during validation.
///
/// Ordering is by family, then base address, then prefix length, so that
/// sorting a list of ranges yields the scan order used by allocation.
///
/// # Examples
///
/// ```rust
/// use cim_ipam::domain::AddressRange;
///
/// let range: AddressRange = "10.1.2.3/16".parse().unwrap();
/// assert_eq!(range.to_string(), "10.1.0.0/16");
/// assert_eq!(range.size(), 65536);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AddressRange(IpNet);

impl AddressRange {
    /// Create a range, clearing any host bits set in `address`
    pub fn new(address: IpAddr, prefix_length: u8) -> Result<Self, NetworkError> {
        Ok(Self(net_with_length(address, prefix_length)?.trunc()))
    }

    /// Single-address range (`/32` or `/128`)
    pub fn host(address: IpAddr) -> Self {
        Self(IpNet::from(address))
    }

    /// Return the canonical form of this range
    ///
    /// Ranges are canonical by construction, so this is the identity; it
    /// exists so callers holding a range can state the intent explicitly.
    pub fn canonicalize(&self) -> Self {
        Self(self.0.trunc())
    }

    /// The underlying `ipnet` network
    pub fn as_net(&self) -> IpNet {
        self.0
    }

    pub fn family(&self) -> AddressFamily {
        match self.0 {
            IpNet::V4(_) => AddressFamily::V4,
            IpNet::V6(_) => AddressFamily::V6,
        }
    }

    pub fn prefix_length(&self) -> u8 {
        self.0.prefix_len()
    }

    /// Base (network) address
    pub fn network(&self) -> IpAddr {
        self.0.network()
    }

    /// First address in the range (same as the network address)
    pub fn first(&self) -> IpAddr {
        self.network()
    }

    /// Last address in the range (the broadcast address for IPv4)
    pub fn last(&self) -> IpAddr {
        self.0.broadcast()
    }

    pub(crate) fn start(&self) -> u128 {
        address_to_int(&self.network())
    }

    pub(crate) fn end(&self) -> u128 {
        address_to_int(&self.last())
    }

    /// Literal address count; saturates for an IPv6 `/0`
    pub fn size(&self) -> u128 {
        (self.end() - self.start()).saturating_add(1)
    }

    pub fn is_ipv4(&self) -> bool {
        self.family() == AddressFamily::V4
    }

    pub fn is_ipv6(&self) -> bool {
        self.family() == AddressFamily::V6
    }

    /// `other` lies inside this range (equal ranges contain each other)
    pub fn contains(&self, other: &AddressRange) -> bool {
        self.0.contains(&other.0)
    }

    /// `other` lies inside this range and is not the same range
    pub fn strictly_contains(&self, other: &AddressRange) -> bool {
        self.contains(other) && self.prefix_length() < other.prefix_length()
    }

    /// The two ranges share at least one address
    ///
    /// CIDR blocks either nest or are disjoint.
    pub fn overlaps(&self, other: &AddressRange) -> bool {
        self.contains(other) || other.contains(self)
    }

    /// `address` falls within this range
    pub fn contains_address(&self, address: &IpAddr) -> bool {
        self.0.contains(address)
    }
}

impl From<IpNet> for AddressRange {
    fn from(net: IpNet) -> Self {
        Self(net.trunc())
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AddressRange {
    type Err = NetworkError;

    /// Parse CIDR notation; a bare address parses as a host range
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match split_cidr(s)? {
            (address, Some(prefix_length)) => Self::new(address, prefix_length),
            (address, None) => Ok(Self::host(address)),
        }
    }
}

impl TryFrom<String> for AddressRange {
    type Error = NetworkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AddressRange> for String {
    fn from(range: AddressRange) -> Self {
        range.to_string()
    }
}

/// IP Address with CIDR notation value object
///
/// Represents a single interface address together with the mask configured
/// alongside it. The mask says nothing about where the address sits in the
/// prefix hierarchy; only the host address matters for containment.
///
/// # Examples
///
/// ```rust
/// use cim_ipam::domain::IpAddressWithCidr;
///
/// let ip = IpAddressWithCidr::new("192.168.1.10/24").unwrap();
/// assert_eq!(ip.address().to_string(), "192.168.1.10");
/// assert_eq!(ip.prefix_length(), 24);
/// assert_eq!(ip.network().to_string(), "192.168.1.0/24");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IpAddressWithCidr(IpNet);

impl IpAddressWithCidr {
    /// Parse `address/length`; a bare address gets a full-length mask
    pub fn new(cidr: impl AsRef<str>) -> Result<Self, NetworkError> {
        match split_cidr(cidr.as_ref())? {
            (address, Some(prefix_length)) => Self::from_parts(address, prefix_length),
            (address, None) => Ok(Self(IpNet::from(address))),
        }
    }

    /// Create from separate address and prefix
    pub fn from_parts(address: IpAddr, prefix_length: u8) -> Result<Self, NetworkError> {
        Ok(Self(net_with_length(address, prefix_length)?))
    }

    /// Get the host address
    pub fn address(&self) -> IpAddr {
        self.0.addr()
    }

    pub fn prefix_length(&self) -> u8 {
        self.0.prefix_len()
    }

    pub fn family(&self) -> AddressFamily {
        AddressFamily::of(&self.address())
    }

    /// The network this address's mask describes
    pub fn network(&self) -> AddressRange {
        AddressRange::from(self.0)
    }

    /// The host address as a single-address range
    pub fn host_range(&self) -> AddressRange {
        AddressRange::host(self.address())
    }

    /// Get as CIDR notation string
    pub fn as_cidr(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for IpAddressWithCidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_cidr())
    }
}

impl FromStr for IpAddressWithCidr {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for IpAddressWithCidr {
    type Error = NetworkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<IpAddressWithCidr> for String {
    fn from(ip: IpAddressWithCidr) -> Self {
        ip.as_cidr()
    }
}
