// Copyright (c) 2025 - Cowboy AI, Inc.
//! Allocation Engine
//!
//! Free space and utilization are computed with set arithmetic over
//! [`AddressSet`]: the prefix's own range minus whatever the containment
//! queries report as occupied.
//!
//! # Usable Addresses
//!
//! Every address of an IPv6 prefix, a pool, or an IPv4 `/31`/`/32` is
//! usable. For any other IPv4 prefix the network and broadcast addresses
//! are not.
//!
//! # Examples
//!
//! ```rust
//! use cim_ipam::allocation::Utilization;
//!
//! assert_eq!(Utilization::from_counts(64, 256).percent(), 25);
//! assert_eq!(Utilization::from_counts(1, 0).percent(), 100);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{AddressRange, AddressSet, Aggregate, IpAddressWithCidr, Placement, Prefix};
use crate::errors::IpamResult;
use crate::query::{addresses_within, descendants_of};
use crate::store::{IpamTransaction, PrefixFilter, RangePredicate, ScopeFilter};

/// Whole-number percentage in `0..=100`, truncated
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Utilization(u8);

impl Utilization {
    pub const EMPTY: Utilization = Utilization(0);
    pub const FULL: Utilization = Utilization(100);

    /// `used / capacity`, truncated and clamped to 100
    ///
    /// Zero capacity reads as full when anything is used, empty otherwise.
    pub fn from_counts(used: u128, capacity: u128) -> Self {
        if capacity == 0 {
            return if used > 0 { Self::FULL } else { Self::EMPTY };
        }
        if used >= capacity {
            return Self::FULL;
        }

        // Scale both down until the multiplication fits
        let (mut used, mut capacity) = (used, capacity);
        while used.checked_mul(100).is_none() {
            used >>= 1;
            capacity >>= 1;
        }
        Self((used * 100 / capacity).min(100) as u8)
    }

    pub fn percent(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for Utilization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Whether the network and broadcast addresses are withheld
fn reserves_edges(prefix: &Prefix) -> bool {
    prefix.range.is_ipv4() && prefix.range.prefix_length() < 31 && !prefix.is_pool
}

/// Number of addresses in `prefix` that can be assigned
pub fn usable_address_count(prefix: &Prefix) -> u128 {
    if reserves_edges(prefix) {
        prefix.range.size().saturating_sub(2)
    } else {
        prefix.range.size()
    }
}

/// Space inside `prefix` not covered by any descendant prefix
pub async fn available_prefixes(
    txn: &mut dyn IpamTransaction,
    prefix: &Prefix,
) -> IpamResult<AddressSet> {
    let children = descendants_of(txn, &prefix.placement(), false).await?;
    let occupied = AddressSet::from_ranges(children.iter().map(|child| &child.range));
    Ok(AddressSet::from_range(&prefix.range).difference(&occupied))
}

/// First free CIDR block inside `prefix`, in address order
pub async fn first_available_prefix(
    txn: &mut dyn IpamTransaction,
    prefix: &Prefix,
) -> IpamResult<Option<AddressRange>> {
    Ok(available_prefixes(txn, prefix).await?.first_cidr())
}

/// Unassigned usable host addresses inside `prefix`
pub async fn available_addresses(
    txn: &mut dyn IpamTransaction,
    prefix: &Prefix,
) -> IpamResult<AddressSet> {
    let used = used_addresses(txn, &prefix.placement()).await?;
    let mut available = AddressSet::from_range(&prefix.range).difference(&used);
    if reserves_edges(prefix) {
        let edges = AddressSet::from_addresses([prefix.range.first(), prefix.range.last()]);
        available = available.difference(&edges);
    }
    Ok(available)
}

/// Lowest available address, carrying the prefix's own mask
pub async fn first_available_address(
    txn: &mut dyn IpamTransaction,
    prefix: &Prefix,
) -> IpamResult<Option<IpAddressWithCidr>> {
    let available = available_addresses(txn, prefix).await?;
    match available.first_address() {
        Some(address) => Ok(Some(IpAddressWithCidr::from_parts(
            address,
            prefix.range.prefix_length(),
        )?)),
        None => Ok(None),
    }
}

/// Utilization of a prefix
///
/// Containers count the space covered by descendant prefixes; everything
/// else counts distinct assigned host addresses against usable capacity.
pub async fn prefix_utilization(
    txn: &mut dyn IpamTransaction,
    prefix: &Prefix,
) -> IpamResult<Utilization> {
    if prefix.is_container() {
        let children = descendants_of(txn, &prefix.placement(), false).await?;
        let covered = AddressSet::from_ranges(children.iter().map(|child| &child.range));
        return Ok(Utilization::from_counts(covered.size(), prefix.range.size()));
    }

    let used = used_addresses(txn, &prefix.placement()).await?;
    Ok(Utilization::from_counts(
        used.size(),
        usable_address_count(prefix),
    ))
}

/// Utilization of an aggregate by prefixes of any scope inside it
pub async fn aggregate_utilization(
    txn: &mut dyn IpamTransaction,
    aggregate: &Aggregate,
) -> IpamResult<Utilization> {
    let filter = PrefixFilter::new()
        .range(RangePredicate::Within {
            range: aggregate.range,
            include_equal: true,
        })
        .scope(ScopeFilter::Any);
    let prefixes = txn.select_prefixes(&filter).await?;
    let covered = AddressSet::from_ranges(prefixes.iter().map(|p| &p.range));
    Ok(Utilization::from_counts(
        covered.size(),
        aggregate.range.size(),
    ))
}

async fn used_addresses(
    txn: &mut dyn IpamTransaction,
    placement: &Placement,
) -> IpamResult<AddressSet> {
    let addresses = addresses_within(txn, placement).await?;
    Ok(AddressSet::from_addresses(
        addresses.iter().map(|ip| ip.host()),
    ))
}
