// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for the Prefix Hierarchy
//!
//! Random sequences of prefix creates, moves and deletes are applied
//! through the service. Afterwards the stored counters of every live
//! prefix must equal a brute-force recomputation over the live set.

use cim_ipam::domain::{AddressRange, Aggregate, Prefix, PrefixId, PrefixStatus, Rir, Scope, Vrf};
use cim_ipam::{IpamConfig, IpamError, IpamService, MemoryStore, StoreIpamService};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

// ============================================================================
// Test Model
// ============================================================================

#[derive(Debug, Clone)]
struct Shape {
    range: AddressRange,
    in_vrf: bool,
    container: bool,
}

#[derive(Debug, Clone)]
enum Mutation {
    Create(Shape),
    Update(usize, Shape),
    Delete(usize),
}

fn service() -> StoreIpamService {
    let config = IpamConfig::default().with_hierarchy_batch_size(3);
    StoreIpamService::new(Arc::new(MemoryStore::from_config(&config)), config).unwrap()
}

fn apply_shape(mut prefix: Prefix, shape: &Shape, vrf: &Vrf) -> Prefix {
    prefix.range = shape.range;
    prefix.scope = if shape.in_vrf {
        vrf.scope()
    } else {
        Scope::Global
    };
    prefix.status = if shape.container {
        PrefixStatus::Container
    } else {
        PrefixStatus::Active
    };
    prefix
}

fn related(ancestor: &Prefix, descendant: &Prefix) -> bool {
    ancestor.range.strictly_contains(&descendant.range)
        && (ancestor.scope == descendant.scope
            || (ancestor.is_container() && ancestor.scope.is_global()))
}

/// `(depth, children)` recomputed from scratch
fn expected_counters(prefix: &Prefix, live: &[Prefix]) -> (u32, u32) {
    let depth: BTreeSet<_> = live
        .iter()
        .filter(|other| related(other, prefix))
        .map(|other| other.range)
        .collect();
    let children: BTreeSet<_> = live
        .iter()
        .filter(|other| related(prefix, other))
        .map(|other| other.range)
        .collect();
    (depth.len() as u32, children.len() as u32)
}

async fn run(mutations: Vec<Mutation>) -> Vec<(Prefix, (u32, u32))> {
    let service = service();
    let vrf = service.save_vrf(Vrf::new("blue").with_enforce_unique(false)).await.unwrap();

    let mut ids: Vec<PrefixId> = Vec::new();
    for mutation in mutations {
        match mutation {
            Mutation::Create(shape) => {
                let candidate = apply_shape(Prefix::new(shape.range), &shape, &vrf);
                let saved = service.save_prefix(candidate).await.unwrap();
                ids.push(saved.id);
            }
            Mutation::Update(index, shape) if !ids.is_empty() => {
                let id = ids[index % ids.len()];
                let current = service.get_prefix(id).await.unwrap();
                service
                    .save_prefix(apply_shape(current, &shape, &vrf))
                    .await
                    .unwrap();
            }
            Mutation::Delete(index) if !ids.is_empty() => {
                let id = ids.remove(index % ids.len());
                service.delete_prefix(id).await.unwrap();
            }
            _ => {}
        }
    }

    let mut live = Vec::with_capacity(ids.len());
    for id in ids {
        live.push(service.get_prefix(id).await.unwrap());
    }
    live.iter()
        .map(|prefix| (prefix.clone(), expected_counters(prefix, &live)))
        .collect()
}

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Ranges clustered at the start of 10.0.0.0/8 so they nest often
fn nested_range() -> impl Strategy<Value = AddressRange> {
    (0u32..4, 0u32..4, prop::sample::select(vec![8u8, 12, 16, 20, 24])).prop_map(
        |(second, third, length)| {
            let address = IpAddr::V4(Ipv4Addr::new(10, second as u8, third as u8, 0));
            AddressRange::new(address, length).unwrap()
        },
    )
}

fn shape() -> impl Strategy<Value = Shape> {
    (nested_range(), any::<bool>(), prop::bool::weighted(0.3)).prop_map(
        |(range, in_vrf, container)| Shape {
            range,
            in_vrf,
            container,
        },
    )
}

fn mutation() -> impl Strategy<Value = Mutation> {
    prop_oneof![
        3 => shape().prop_map(Mutation::Create),
        2 => (any::<usize>(), shape()).prop_map(|(i, s)| Mutation::Update(i, s)),
        1 => any::<usize>().prop_map(Mutation::Delete),
    ]
}

fn aggregate_range() -> impl Strategy<Value = AddressRange> {
    (0u32..256, 8u8..=24).prop_map(|(second, length)| {
        let address = IpAddr::V4(Ipv4Addr::new(10, second as u8, 0, 0));
        AddressRange::new(address, length).unwrap()
    })
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: Cached counters equal a fresh recomputation
    ///
    /// Holds after any sequence of creates, range/scope/status changes
    /// and deletes.
    #[test]
    fn prop_counters_match_recomputation(
        mutations in prop::collection::vec(mutation(), 1..20)
    ) {
        let results = tokio_test::block_on(run(mutations));
        for (prefix, (depth, children)) in results {
            prop_assert_eq!(
                (prefix.depth, prefix.children),
                (depth, children),
                "counters of {} in {}",
                prefix.range,
                prefix.scope
            );
        }
    }

    /// Property: Saved aggregates never overlap one another
    #[test]
    fn prop_aggregates_never_overlap(
        ranges in prop::collection::vec(aggregate_range(), 1..16)
    ) {
        let saved = tokio_test::block_on(async {
            let service = service();
            let rir = service.save_rir(Rir::new("RFC 1918").private()).await.unwrap();
            let mut saved: Vec<Aggregate> = Vec::new();
            for range in ranges {
                match service.save_aggregate(Aggregate::new(range, rir.id)).await {
                    Ok(aggregate) => saved.push(aggregate),
                    Err(IpamError::OverlapViolation { .. }) => {}
                    Err(other) => panic!("unexpected error: {:?}", other),
                }
            }
            saved
        });

        prop_assert!(!saved.is_empty());
        for (i, a) in saved.iter().enumerate() {
            for b in &saved[i + 1..] {
                prop_assert!(!a.range.overlaps(&b.range), "{} overlaps {}", a.range, b.range);
            }
        }
    }
}
