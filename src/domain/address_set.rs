// Copyright (c) 2025 - Cowboy AI, Inc.
//! Address Set Algebra
//!
//! An [`AddressSet`] is a set of addresses stored as a sorted list of
//! disjoint, non-adjacent inclusive intervals. Union and difference are
//! interval merges, so a set covering a whole `/1` costs the same as a set
//! covering one address.
//!
//! CIDR decomposition of an interval is `ipnet`'s subnet walk, which emits
//! the largest aligned block at each step starting from the lowest address.
//! Blocks therefore come out in address order, which is what "first
//! available" allocation relies on.

use ipnet::{IpNet, Ipv4Subnets, Ipv6Subnets};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use super::network::{address_to_int, int_to_address, AddressFamily, AddressRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Interval {
    family: AddressFamily,
    start: u128,
    end: u128,
}

impl Interval {
    fn of(range: &AddressRange) -> Self {
        Self {
            family: range.family(),
            start: range.start(),
            end: range.end(),
        }
    }

    fn len(&self) -> u128 {
        (self.end - self.start).saturating_add(1)
    }

    /// Minimal CIDR cover of this interval, lowest block first
    fn blocks(&self) -> Box<dyn Iterator<Item = AddressRange>> {
        match self.family {
            // v4 interval bounds never exceed 32 bits
            AddressFamily::V4 => Box::new(
                Ipv4Subnets::new(
                    Ipv4Addr::from(self.start as u32),
                    Ipv4Addr::from(self.end as u32),
                    0,
                )
                .map(|net| AddressRange::from(IpNet::V4(net))),
            ),
            AddressFamily::V6 => Box::new(
                Ipv6Subnets::new(Ipv6Addr::from(self.start), Ipv6Addr::from(self.end), 0)
                    .map(|net| AddressRange::from(IpNet::V6(net))),
            ),
        }
    }
}

/// Set of IPv4 and/or IPv6 addresses
///
/// # Examples
///
/// ```rust
/// use cim_ipam::domain::{AddressRange, AddressSet};
///
/// let parent: AddressRange = "10.0.0.0/16".parse().unwrap();
/// let used: AddressRange = "10.0.0.0/24".parse().unwrap();
///
/// let free = AddressSet::from_range(&parent).difference(&AddressSet::from_range(&used));
/// assert_eq!(free.first_cidr().unwrap().to_string(), "10.0.1.0/24");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressSet {
    intervals: Vec<Interval>,
}

impl AddressSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set holding every address of `range`
    pub fn from_range(range: &AddressRange) -> Self {
        Self {
            intervals: vec![Interval::of(range)],
        }
    }

    /// Union of the given ranges
    pub fn from_ranges<'a>(ranges: impl IntoIterator<Item = &'a AddressRange>) -> Self {
        Self {
            intervals: normalize(ranges.into_iter().map(Interval::of).collect()),
        }
    }

    /// Set of individual host addresses; duplicates collapse
    pub fn from_addresses(addresses: impl IntoIterator<Item = IpAddr>) -> Self {
        let intervals = addresses
            .into_iter()
            .map(|address| {
                let value = address_to_int(&address);
                Interval {
                    family: AddressFamily::of(&address),
                    start: value,
                    end: value,
                }
            })
            .collect();
        Self {
            intervals: normalize(intervals),
        }
    }

    /// Add every address of `range` to the set
    pub fn insert(&mut self, range: &AddressRange) {
        self.intervals.push(Interval::of(range));
        self.intervals = normalize(std::mem::take(&mut self.intervals));
    }

    pub fn union(&self, other: &AddressSet) -> AddressSet {
        let mut intervals = self.intervals.clone();
        intervals.extend_from_slice(&other.intervals);
        Self {
            intervals: normalize(intervals),
        }
    }

    /// Addresses in `self` that are not in `other`
    pub fn difference(&self, other: &AddressSet) -> AddressSet {
        let subtrahend = &other.intervals;
        let mut out = Vec::with_capacity(self.intervals.len());
        let mut j = 0;

        for a in &self.intervals {
            while j < subtrahend.len()
                && (subtrahend[j].family, subtrahend[j].end) < (a.family, a.start)
            {
                j += 1;
            }

            let mut start = a.start;
            let mut remainder = true;
            let mut k = j;
            while k < subtrahend.len()
                && subtrahend[k].family == a.family
                && subtrahend[k].start <= a.end
            {
                let b = subtrahend[k];
                if b.start > start {
                    out.push(Interval {
                        family: a.family,
                        start,
                        end: b.start - 1,
                    });
                }
                if b.end >= a.end {
                    remainder = false;
                    break;
                }
                start = b.end + 1;
                k += 1;
            }

            if remainder {
                out.push(Interval {
                    family: a.family,
                    start,
                    end: a.end,
                });
            }
        }

        Self { intervals: out }
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Number of addresses in the set (saturating)
    pub fn size(&self) -> u128 {
        self.intervals
            .iter()
            .fold(0u128, |acc, interval| acc.saturating_add(interval.len()))
    }

    pub fn contains_address(&self, address: &IpAddr) -> bool {
        let family = AddressFamily::of(address);
        let value = address_to_int(address);
        self.intervals
            .iter()
            .any(|iv| iv.family == family && iv.start <= value && value <= iv.end)
    }

    /// Every address of `range` is in the set
    pub fn contains_range(&self, range: &AddressRange) -> bool {
        let target = Interval::of(range);
        self.intervals.iter().any(|iv| {
            iv.family == target.family && iv.start <= target.start && target.end <= iv.end
        })
    }

    /// No address of `range` is in the set
    pub fn is_disjoint_from(&self, range: &AddressRange) -> bool {
        let target = Interval::of(range);
        !self.intervals.iter().any(|iv| {
            iv.family == target.family && iv.start <= target.end && target.start <= iv.end
        })
    }

    /// Lowest address in the set
    pub fn first_address(&self) -> Option<IpAddr> {
        self.intervals
            .first()
            .map(|iv| int_to_address(iv.family, iv.start))
    }

    /// Minimal CIDR cover of the set, in address order
    pub fn iter_cidrs(&self) -> Vec<AddressRange> {
        self.intervals.iter().flat_map(Interval::blocks).collect()
    }

    /// First block of the CIDR decomposition (lowest address, not largest block)
    pub fn first_cidr(&self) -> Option<AddressRange> {
        self.intervals.first().and_then(|iv| iv.blocks().next())
    }

    /// Inclusive `(first, last)` address pairs of each interval
    pub fn intervals(&self) -> impl Iterator<Item = (IpAddr, IpAddr)> + '_ {
        self.intervals.iter().map(|iv| {
            (
                int_to_address(iv.family, iv.start),
                int_to_address(iv.family, iv.end),
            )
        })
    }
}

impl From<&AddressRange> for AddressSet {
    fn from(range: &AddressRange) -> Self {
        Self::from_range(range)
    }
}

impl fmt::Display for AddressSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cidrs: Vec<String> = self.iter_cidrs().iter().map(|c| c.to_string()).collect();
        write!(f, "{{{}}}", cidrs.join(", "))
    }
}

impl Serialize for AddressSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter_cidrs())
    }
}

impl<'de> Deserialize<'de> for AddressSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let ranges = Vec::<AddressRange>::deserialize(deserializer)?;
        Ok(Self::from_ranges(&ranges))
    }
}

/// Sort and merge overlapping or adjacent intervals of the same family
fn normalize(mut intervals: Vec<Interval>) -> Vec<Interval> {
    intervals.sort();
    let mut out: Vec<Interval> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        if let Some(last) = out.last_mut() {
            if last.family == interval.family && interval.start <= last.end.saturating_add(1) {
                if interval.end > last.end {
                    last.end = interval.end;
                }
                continue;
            }
        }
        out.push(interval);
    }
    out
}
