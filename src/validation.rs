// Copyright (c) 2025 - Cowboy AI, Inc.
//! Uniqueness & Overlap Validator
//!
//! Runs inside the write transaction, before any row is written. Each
//! validator takes a candidate record and returns its cleaned form (canonical
//! range, lower-cased DNS name) or the first rule it breaks.
//!
//! # Rules
//!
//! - **Aggregate**: no `/0`; no other aggregate may contain it or be
//!   contained by it, equal ranges included
//! - **Prefix**: no `/0`; where uniqueness is enforced, no other prefix with
//!   the same scope and range
//! - **IP address**: no `/0`; family-restricted statuses; where uniqueness
//!   is enforced, a shared host address is allowed only when every address
//!   sharing it carries a non-unique role; NAT inside must exist, must not
//!   be itself and must not already have an outside address; a primary IP
//!   must stay assigned to the device/VM using it
//!
//! Uniqueness is enforced in the global table when `enforce_global_unique`
//! is set, and in a VRF when that VRF's `enforce_unique` flag is set.
//! Switching a VRF's flag on requires the rows already in it to comply.

use crate::domain::invariants::{
    collision_permitted, normalize_dns_name, validate_address_mask, validate_mask_length,
    validate_status_family, ValidationError,
};
use crate::domain::{Aggregate, IpAddress, Prefix, RecordKind, Scope, Vrf};
use crate::errors::{IpamError, IpamResult};
use crate::query::{address_duplicates, prefix_duplicates};
use crate::references::{AssignmentResolver, PrimaryIpRegistry};
use crate::store::{
    AddressFilter, AggregateFilter, IpamTransaction, PrefixFilter, RangePredicate, ScopeFilter,
};

/// Validate an aggregate against every other aggregate
pub async fn validate_aggregate(
    txn: &mut dyn IpamTransaction,
    candidate: &Aggregate,
) -> IpamResult<Aggregate> {
    let mut aggregate = candidate.clone();
    aggregate.range = aggregate.range.canonicalize();
    validate_mask_length(&aggregate.range)?;

    if txn.get_rir(aggregate.rir).await?.is_none() {
        return Err(IpamError::not_found(RecordKind::Rir, aggregate.rir));
    }

    // Covering and covered are both checked; equal ranges count as overlap
    let covering = AggregateFilter::new()
        .range(RangePredicate::Covering {
            range: aggregate.range,
            include_equal: true,
        })
        .excluding(aggregate.id);
    let covered = AggregateFilter::new()
        .range(RangePredicate::Within {
            range: aggregate.range,
            include_equal: true,
        })
        .excluding(aggregate.id);

    for filter in [covering, covered] {
        if let Some(existing) = txn.select_aggregates(&filter).await?.into_iter().next() {
            return Err(IpamError::OverlapViolation {
                candidate: aggregate.range,
                existing: existing.range,
            });
        }
    }

    Ok(aggregate)
}

/// Validate a prefix against duplicates in its scope
pub async fn validate_prefix(
    txn: &mut dyn IpamTransaction,
    candidate: &Prefix,
    enforce_global_unique: bool,
) -> IpamResult<Prefix> {
    let mut prefix = candidate.clone();
    prefix.range = prefix.range.canonicalize();
    validate_mask_length(&prefix.range)?;

    let vrf = resolve_scope(txn, &prefix.scope).await?;
    if prefix.scope.enforces_unique(vrf.as_ref(), enforce_global_unique) {
        if let Some(existing) = prefix_duplicates(txn, &prefix).await?.into_iter().next() {
            return Err(IpamError::DuplicateViolation {
                kind: RecordKind::Prefix,
                scope: prefix.scope,
                existing: existing.range.to_string(),
            });
        }
    }

    Ok(prefix)
}

/// Validate an IP address against duplicates, NAT and primary-IP rules
pub async fn validate_ip_address(
    txn: &mut dyn IpamTransaction,
    resolver: &dyn AssignmentResolver,
    registry: &dyn PrimaryIpRegistry,
    candidate: &IpAddress,
    enforce_global_unique: bool,
) -> IpamResult<IpAddress> {
    let mut address = candidate.clone();
    address.dns_name = normalize_dns_name(&address.dns_name)?;
    validate_address_mask(&address.address)?;
    validate_status_family(address.status, address.family())?;

    let vrf = resolve_scope(txn, &address.scope).await?;
    if address.scope.enforces_unique(vrf.as_ref(), enforce_global_unique) {
        let duplicates = address_duplicates(txn, &address).await?;
        let roles: Vec<_> = duplicates.iter().map(|dup| dup.role).collect();
        if !collision_permitted(address.role, &roles) {
            if let Some(existing) = duplicates.first() {
                return Err(IpamError::DuplicateViolation {
                    kind: RecordKind::IpAddress,
                    scope: address.scope,
                    existing: existing.address.to_string(),
                });
            }
        }
    }

    validate_nat_inside(txn, &address).await?;
    validate_primary_assignment(resolver, registry, &address).await?;

    Ok(address)
}

/// Check that the rows already in `scope` satisfy the uniqueness rules
///
/// Run before a VRF's `enforce_unique` flag is switched on.
pub async fn validate_scope_unique(txn: &mut dyn IpamTransaction, scope: Scope) -> IpamResult<()> {
    let prefixes = txn
        .select_prefixes(&PrefixFilter::new().scope(ScopeFilter::Exactly(scope)))
        .await?;
    for prefix in &prefixes {
        if let Some(existing) = prefix_duplicates(txn, prefix).await?.into_iter().next() {
            return Err(IpamError::DuplicateViolation {
                kind: RecordKind::Prefix,
                scope,
                existing: existing.range.to_string(),
            });
        }
    }

    let addresses = txn
        .select_addresses(&AddressFilter::new().scope(scope))
        .await?;
    for address in &addresses {
        let duplicates = address_duplicates(txn, address).await?;
        let roles: Vec<_> = duplicates.iter().map(|dup| dup.role).collect();
        if !collision_permitted(address.role, &roles) {
            return Err(IpamError::DuplicateViolation {
                kind: RecordKind::IpAddress,
                scope,
                existing: address.address.to_string(),
            });
        }
    }

    Ok(())
}

async fn validate_nat_inside(txn: &mut dyn IpamTransaction, address: &IpAddress) -> IpamResult<()> {
    let Some(inside) = address.nat_inside else {
        return Ok(());
    };
    if inside == address.id {
        return Err(ValidationError::SelfNat.into());
    }
    let inside_address = txn
        .get_address(inside)
        .await?
        .ok_or_else(|| IpamError::not_found(RecordKind::IpAddress, inside))?;

    let other_outside = AddressFilter::new().nat_inside(inside).excluding(address.id);
    if let Some(existing) = txn.select_addresses(&other_outside).await?.into_iter().next() {
        return Err(IpamError::ConsistencyViolation(format!(
            "{} is already the NAT inside address of {}",
            inside_address.address, existing.address
        )));
    }
    Ok(())
}

async fn validate_primary_assignment(
    resolver: &dyn AssignmentResolver,
    registry: &dyn PrimaryIpRegistry,
    address: &IpAddress,
) -> IpamResult<()> {
    let Some(holder) = registry.holder_of(address.id).await? else {
        return Ok(());
    };
    let owner = match &address.assigned_object {
        Some(object) => resolver.owner_of(object).await?,
        None => None,
    };
    if owner.is_some_and(|owner| owner.same_holder(&holder)) {
        return Ok(());
    }
    Err(IpamError::ConsistencyViolation(format!(
        "IP address {} is primary for {} but not assigned to it",
        address.address, holder
    )))
}

/// Load the VRF a scope names; the global table has none
async fn resolve_scope(txn: &mut dyn IpamTransaction, scope: &Scope) -> IpamResult<Option<Vrf>> {
    match scope.vrf_id() {
        None => Ok(None),
        Some(id) => txn
            .get_vrf(id)
            .await?
            .map(Some)
            .ok_or_else(|| IpamError::not_found(RecordKind::Vrf, id)),
    }
}
