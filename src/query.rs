// Copyright (c) 2025 - Cowboy AI, Inc.
//! Containment Query Layer
//!
//! Read-only containment queries over the live record set. One scope rule
//! holds everywhere:
//!
//! - a prefix relates to prefixes and addresses in its own scope
//! - a **global container** prefix additionally relates to every VRF
//!
//! So the ancestors of a VRF prefix are the covering prefixes in that VRF
//! plus covering global containers, and the descendants of a global
//! container are the contained prefixes of every scope.
//!
//! With `include_self`, containment is loose: the placement's own record
//! and any duplicates of its range are returned too. Without it,
//! containment is strict and equal ranges are excluded.
//!
//! Results come back ascending by range (then scope, then id), which the
//! allocation engine relies on for deterministic "first available" answers.

use std::collections::BTreeSet;

use crate::domain::{AddressRange, IpAddress, Placement, Prefix};
use crate::errors::IpamResult;
use crate::store::{
    AddressFilter, HostPredicate, IpamTransaction, PrefixFilter, RangePredicate, ScopeFilter,
};

/// Prefixes whose range contains `placement`
pub async fn ancestors_of(
    txn: &mut dyn IpamTransaction,
    placement: &Placement,
    include_self: bool,
) -> IpamResult<Vec<Prefix>> {
    let filter = PrefixFilter::new()
        .range(RangePredicate::Covering {
            range: placement.range,
            include_equal: include_self,
        })
        .scope(ScopeFilter::ExactlyOrGlobalContainer(placement.scope));
    txn.select_prefixes(&filter).await
}

/// Prefixes whose range lies inside `placement`
pub async fn descendants_of(
    txn: &mut dyn IpamTransaction,
    placement: &Placement,
    include_self: bool,
) -> IpamResult<Vec<Prefix>> {
    let filter = PrefixFilter::new()
        .range(RangePredicate::Within {
            range: placement.range,
            include_equal: include_self,
        })
        .scope(descendant_scope(placement));
    txn.select_prefixes(&filter).await
}

/// Addresses whose host address lies inside `placement`, masks ignored
pub async fn addresses_within(
    txn: &mut dyn IpamTransaction,
    placement: &Placement,
) -> IpamResult<Vec<IpAddress>> {
    let mut filter = AddressFilter::new().host(HostPredicate::Within(placement.range));
    if !placement.spans_all_scopes() {
        filter = filter.scope(placement.scope);
    }
    txn.select_addresses(&filter).await
}

/// Other prefixes with the same scope and range
pub async fn prefix_duplicates(
    txn: &mut dyn IpamTransaction,
    prefix: &Prefix,
) -> IpamResult<Vec<Prefix>> {
    let filter = PrefixFilter::new()
        .range(RangePredicate::Exact(prefix.range))
        .scope(ScopeFilter::Exactly(prefix.scope))
        .excluding(prefix.id);
    txn.select_prefixes(&filter).await
}

/// Other addresses with the same scope and host address
pub async fn address_duplicates(
    txn: &mut dyn IpamTransaction,
    address: &IpAddress,
) -> IpamResult<Vec<IpAddress>> {
    let filter = AddressFilter::new()
        .host(HostPredicate::Equals(address.host()))
        .scope(address.scope)
        .excluding(address.id);
    txn.select_addresses(&filter).await
}

/// Number of distinct ranges among `prefixes`
///
/// Duplicate ranges collapse to one; containment is by value, not identity.
pub fn distinct_ranges<'a>(prefixes: impl IntoIterator<Item = &'a Prefix>) -> usize {
    prefixes
        .into_iter()
        .map(|p| p.range)
        .collect::<BTreeSet<AddressRange>>()
        .len()
}

fn descendant_scope(placement: &Placement) -> ScopeFilter {
    if placement.spans_all_scopes() {
        ScopeFilter::Any
    } else {
        ScopeFilter::Exactly(placement.scope)
    }
}
