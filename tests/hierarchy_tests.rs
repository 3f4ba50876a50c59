// Copyright (c) 2025 - Cowboy AI, Inc.
//! Prefix hierarchy counter tests
//!
//! Every scenario starts from a three-level chain (`/8 > /16 > /24` for
//! IPv4, `/32 > /40 > /48` for IPv6) and checks the stored `depth` and
//! `children` of each prefix after one mutation.

mod fixtures;

use fixtures::*;
use pretty_assertions::assert_eq;
use test_case::test_case;

use cim_ipam::domain::{Prefix, PrefixStatus, Scope};
use cim_ipam::{IpamError, IpamService, StoreIpamService};

const V4: [&str; 3] = ["10.0.0.0/8", "10.0.0.0/16", "10.0.0.0/24"];
const V6: [&str; 3] = ["2001:db8::/32", "2001:db8::/40", "2001:db8::/48"];

async fn chain(service: &StoreIpamService, ranges: [&str; 3]) -> Vec<Prefix> {
    save_prefixes(service, ranges.iter().map(|r| prefix(r)).collect()).await
}

#[test_case(V4 ; "ipv4")]
#[test_case(V6 ; "ipv6")]
#[tokio::test]
async fn test_chain_counters(ranges: [&str; 3]) {
    let service = service();
    let prefixes = chain(&service, ranges).await;

    assert_eq!(
        counters(&service, &[&prefixes[0], &prefixes[1], &prefixes[2]]).await,
        vec![
            row(ranges[0], 0, 2),
            row(ranges[1], 1, 1),
            row(ranges[2], 2, 0),
        ]
    );
}

#[test_case(V4, "10.0.0.0/12" ; "ipv4")]
#[test_case(V6, "2001:db8::/36" ; "ipv6")]
#[tokio::test]
async fn test_create_intermediate_prefix(ranges: [&str; 3], middle: &str) {
    let service = service();
    let prefixes = chain(&service, ranges).await;

    let inserted = service.save_prefix(prefix(middle)).await.unwrap();
    assert_eq!((inserted.depth, inserted.children), (1, 2));

    assert_eq!(
        counters(&service, &[&prefixes[0], &inserted, &prefixes[1], &prefixes[2]]).await,
        vec![
            row(ranges[0], 0, 3),
            row(middle, 1, 2),
            row(ranges[1], 2, 1),
            row(ranges[2], 3, 0),
        ]
    );
}

#[test_case(V4, "10.0.0.0/12" ; "ipv4")]
#[test_case(V6, "2001:db8::/36" ; "ipv6")]
#[tokio::test]
async fn test_update_prefix_range(ranges: [&str; 3], moved_to: &str) {
    let service = service();
    let prefixes = chain(&service, ranges).await;

    // The innermost prefix becomes the middle of the chain
    let mut moved = prefixes[2].clone();
    moved.range = range(moved_to);
    let moved = service.save_prefix(moved).await.unwrap();

    assert_eq!(
        counters(&service, &[&prefixes[0], &moved, &prefixes[1]]).await,
        vec![
            row(ranges[0], 0, 2),
            row(moved_to, 1, 1),
            row(ranges[1], 2, 0),
        ]
    );
}

#[test_case(V4 ; "ipv4")]
#[test_case(V6 ; "ipv6")]
#[tokio::test]
async fn test_update_prefix_vrf(ranges: [&str; 3]) {
    let service = seeded_service(Default::default()).await;
    let prefixes = chain(&service, ranges).await;

    let moved = service
        .save_prefix(prefixes[1].clone().with_scope(vrf_a().id))
        .await
        .unwrap();
    assert_eq!(moved.scope, Scope::Vrf(vrf_a().id));

    assert_eq!(
        counters(&service, &[&prefixes[0], &prefixes[2], &moved]).await,
        vec![
            row(ranges[0], 0, 1),
            row(ranges[2], 1, 0),
            row(ranges[1], 0, 0),
        ]
    );
}

#[test_case(V4 ; "ipv4")]
#[test_case(V6 ; "ipv6")]
#[tokio::test]
async fn test_delete_prefix(ranges: [&str; 3]) {
    let service = service();
    let prefixes = chain(&service, ranges).await;

    service.delete_prefix(prefixes[1].id).await.unwrap();

    assert_eq!(
        counters(&service, &[&prefixes[0], &prefixes[2]]).await,
        vec![row(ranges[0], 0, 1), row(ranges[2], 1, 0)]
    );
    assert!(matches!(
        service.get_prefix(prefixes[1].id).await,
        Err(IpamError::NotFound { .. })
    ));
}

#[test_case(V4 ; "ipv4")]
#[test_case(V6 ; "ipv6")]
#[tokio::test]
async fn test_duplicate_prefix_collapses(ranges: [&str; 3]) {
    let service = service();
    let prefixes = chain(&service, ranges).await;

    let duplicate = service.save_prefix(prefix(ranges[1])).await.unwrap();

    // Two records, one range: the duplicate counts once above and below
    assert_eq!(
        counters(
            &service,
            &[&prefixes[0], &prefixes[1], &duplicate, &prefixes[2]]
        )
        .await,
        vec![
            row(ranges[0], 0, 2),
            row(ranges[1], 1, 1),
            row(ranges[1], 1, 1),
            row(ranges[2], 2, 0),
        ]
    );

    let duplicates = service.prefix_duplicates(prefixes[1].id).await.unwrap();
    assert_eq!(duplicates.len(), 1);
    assert_eq!(duplicates[0].id, duplicate.id);

    // Removing one of the pair leaves the counters unchanged
    service.delete_prefix(duplicate.id).await.unwrap();
    assert_eq!(
        counters(&service, &[&prefixes[0], &prefixes[1], &prefixes[2]]).await,
        vec![
            row(ranges[0], 0, 2),
            row(ranges[1], 1, 1),
            row(ranges[2], 2, 0),
        ]
    );
}

#[tokio::test]
async fn test_global_container_spans_vrfs() {
    let service = seeded_service(Default::default()).await;
    let top = service.save_prefix(container("10.0.0.0/8")).await.unwrap();
    let in_a = service
        .save_prefix(prefix("10.1.0.0/16").with_scope(vrf_a().id))
        .await
        .unwrap();
    let in_b = service
        .save_prefix(prefix("10.1.0.0/16").with_scope(vrf_b().id))
        .await
        .unwrap();
    let inner_a = service
        .save_prefix(prefix("10.1.1.0/24").with_scope(vrf_a().id))
        .await
        .unwrap();

    // The two /16s share a range, so the container sees two distinct ranges
    assert_eq!(
        counters(&service, &[&top, &in_a, &in_b, &inner_a]).await,
        vec![
            row("10.0.0.0/8", 0, 2),
            row("10.1.0.0/16", 1, 1),
            row("10.1.0.0/16", 1, 0),
            row("10.1.1.0/24", 2, 0),
        ]
    );

    let parents = service.prefix_parents(inner_a.id).await.unwrap();
    let parent_ids: Vec<_> = parents.iter().map(|p| p.id).collect();
    assert_eq!(parent_ids, vec![top.id, in_a.id]);

    let children = service.child_prefixes(top.id).await.unwrap();
    assert_eq!(children.len(), 3);
}

#[tokio::test]
async fn test_container_status_flip_rebuilds_other_scopes() {
    let service = seeded_service(Default::default()).await;
    let top = service.save_prefix(prefix("10.0.0.0/8")).await.unwrap();
    let in_vrf = service
        .save_prefix(prefix("10.1.0.0/16").with_scope(vrf_a().id))
        .await
        .unwrap();

    assert_eq!(
        counters(&service, &[&top, &in_vrf]).await,
        vec![row("10.0.0.0/8", 0, 0), row("10.1.0.0/16", 0, 0)]
    );

    let top = service
        .save_prefix(top.with_status(PrefixStatus::Container))
        .await
        .unwrap();
    assert_eq!(
        counters(&service, &[&top, &in_vrf]).await,
        vec![row("10.0.0.0/8", 0, 1), row("10.1.0.0/16", 1, 0)]
    );

    let top = service
        .save_prefix(top.with_status(PrefixStatus::Reserved))
        .await
        .unwrap();
    assert_eq!(
        counters(&service, &[&top, &in_vrf]).await,
        vec![row("10.0.0.0/8", 0, 0), row("10.1.0.0/16", 0, 0)]
    );
}

#[tokio::test]
async fn test_unrelated_update_keeps_counters() {
    let service = service();
    let prefixes = chain(&service, V4).await;

    let mut renamed = prefixes[1].clone();
    renamed.description = "core".to_string();
    let renamed = service.save_prefix(renamed).await.unwrap();

    assert_eq!((renamed.depth, renamed.children), (1, 1));
    assert_eq!(renamed.created, prefixes[1].created);
    assert_eq!(renamed.description, "core");
}

#[tokio::test]
async fn test_rebuild_hierarchy_is_idempotent() {
    let service = service();
    let prefixes = chain(&service, V4).await;

    let stats = service.rebuild_hierarchy().await.unwrap();
    assert_eq!((stats.children_updated, stats.depth_updated), (0, 0));
    assert_eq!(
        counters(&service, &[&prefixes[0], &prefixes[1], &prefixes[2]]).await,
        vec![row(V4[0], 0, 2), row(V4[1], 1, 1), row(V4[2], 2, 0)]
    );
}

#[tokio::test]
async fn test_families_do_not_mix() {
    let service = service();
    let v4 = chain(&service, V4).await;
    let v6 = chain(&service, V6).await;

    assert_eq!(
        counters(&service, &[&v4[0], &v6[0]]).await,
        vec![row(V4[0], 0, 2), row(V6[0], 0, 2)]
    );
}
