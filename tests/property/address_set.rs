// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Address Ranges and Sets
//!
//! Ranges are drawn from inside 10.0.0.0/16 so that random pairs nest and
//! overlap often enough to exercise every branch.

use cim_ipam::domain::{AddressRange, AddressSet};
use cim_ipam::Utilization;
use proptest::prelude::*;
use std::net::{IpAddr, Ipv4Addr};

// ============================================================================
// Property Test Strategies
// ============================================================================

const BASE: u32 = 0x0a00_0000;

/// A range somewhere inside 10.0.0.0/16
fn inner_range() -> impl Strategy<Value = AddressRange> {
    (0u32..65_536, 16u8..=28).prop_map(|(offset, length)| {
        let address = IpAddr::V4(Ipv4Addr::from(BASE | offset));
        AddressRange::new(address, length).unwrap()
    })
}

fn range_list() -> impl Strategy<Value = Vec<AddressRange>> {
    prop::collection::vec(inner_range(), 0..12)
}

fn base() -> AddressRange {
    "10.0.0.0/16".parse().unwrap()
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Property: Parsing the display form gives the same range back
    #[test]
    fn prop_canonical_form_round_trips(range in inner_range()) {
        let reparsed: AddressRange = range.to_string().parse().unwrap();
        prop_assert_eq!(reparsed, range);
        prop_assert_eq!(range.canonicalize(), range);
    }

    /// Property: Mutual containment is equality
    #[test]
    fn prop_containment_antisymmetric(a in inner_range(), b in inner_range()) {
        prop_assert_eq!(a.contains(&b) && b.contains(&a), a == b);
        if a.strictly_contains(&b) {
            prop_assert!(a.contains(&b));
            prop_assert!(!b.contains(&a));
        }
    }

    /// Property: CIDR ranges overlap only by nesting
    #[test]
    fn prop_overlap_means_nesting(a in inner_range(), b in inner_range()) {
        prop_assert_eq!(a.overlaps(&b), a.contains(&b) || b.contains(&a));
    }

    /// Property: Free space and used space partition the parent
    #[test]
    fn prop_difference_partitions(used in range_list()) {
        let used_set = AddressSet::from_ranges(&used);
        let free = AddressSet::from_range(&base()).difference(&used_set);

        prop_assert_eq!(free.size() + used_set.size(), base().size());
        for range in &used {
            prop_assert!(free.is_disjoint_from(range));
        }
    }

    /// Property: The CIDR decomposition covers the set exactly
    #[test]
    fn prop_cidrs_cover_set(used in range_list()) {
        let free = AddressSet::from_range(&base()).difference(&AddressSet::from_ranges(&used));
        let cidrs = free.iter_cidrs();

        let total: u128 = cidrs.iter().map(|c| c.size()).sum();
        prop_assert_eq!(total, free.size());
        for pair in cidrs.windows(2) {
            prop_assert!(!pair[0].overlaps(&pair[1]));
        }
        for cidr in &cidrs {
            prop_assert!(free.contains_range(cidr));
        }
    }

    /// Property: The first available block is free and starts the set
    #[test]
    fn prop_first_cidr_is_free(used in range_list()) {
        let free = AddressSet::from_range(&base()).difference(&AddressSet::from_ranges(&used));

        match free.first_cidr() {
            Some(first) => {
                prop_assert!(free.contains_range(&first));
                prop_assert_eq!(Some(first.first()), free.first_address());
                for range in &used {
                    prop_assert!(!first.overlaps(range));
                }
            }
            None => prop_assert!(free.is_empty()),
        }
    }

    /// Property: Utilization never leaves 0..=100
    #[test]
    fn prop_utilization_bounded(used in any::<u128>(), capacity in any::<u128>()) {
        let percent = Utilization::from_counts(used, capacity).percent();
        prop_assert!(percent <= 100);
        if used >= capacity && used > 0 {
            prop_assert_eq!(percent, 100);
        }
    }

    /// Property: Using more never lowers utilization
    #[test]
    fn prop_utilization_monotonic(
        a in 0u128..1_000_000,
        b in 0u128..1_000_000,
        capacity in 1u128..1_000_000
    ) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(
            Utilization::from_counts(low, capacity) <= Utilization::from_counts(high, capacity)
        );
    }
}
