// Copyright (c) 2025 - Cowboy AI, Inc.
//! In-memory reference backend
//!
//! Transactions are serialised by a single `tokio` mutex held for the life
//! of the transaction. Writes go to a working copy of the tables which
//! replaces the shared tables on commit, after the unique, foreign-key and
//! exclusion constraints have been checked against it.

use async_trait::async_trait;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

use super::{
    AddressFilter, AggregateFilter, IpamStore, IpamTransaction, PrefixCounter, PrefixFilter,
};
use crate::config::IpamConfig;
use crate::domain::{
    AddressRange, Aggregate, AggregateId, IpAddress, IpAddressId, Prefix, PrefixId, Rir, RirId,
    Scope, Vrf, VrfId,
};
use crate::errors::{IpamError, IpamResult};

#[derive(Debug, Clone, Default)]
struct Tables {
    vrfs: HashMap<VrfId, Vrf>,
    rirs: HashMap<RirId, Rir>,
    aggregates: HashMap<AggregateId, Aggregate>,
    prefixes: HashMap<PrefixId, Prefix>,
    addresses: HashMap<IpAddressId, IpAddress>,
}

impl Tables {
    fn enforces_unique(&self, scope: &Scope, enforce_global_unique: bool) -> bool {
        let vrf = scope.vrf_id().and_then(|id| self.vrfs.get(&id));
        scope.enforces_unique(vrf, enforce_global_unique)
    }

    fn check_constraints(&self, enforce_global_unique: bool) -> IpamResult<()> {
        self.check_foreign_keys()?;
        self.check_aggregate_exclusion()?;
        self.check_prefix_unique(enforce_global_unique)?;
        self.check_address_unique(enforce_global_unique)?;
        self.check_nat_one_to_one()
    }

    fn check_foreign_keys(&self) -> IpamResult<()> {
        let scope_exists =
            |scope: &Scope| scope.vrf_id().map_or(true, |id| self.vrfs.contains_key(&id));

        if let Some(aggregate) = self
            .aggregates
            .values()
            .find(|a| !self.rirs.contains_key(&a.rir))
        {
            return Err(constraint(format!(
                "aggregate {} references missing RIR {}",
                aggregate.range, aggregate.rir
            )));
        }
        if let Some(prefix) = self.prefixes.values().find(|p| !scope_exists(&p.scope)) {
            return Err(constraint(format!(
                "prefix {} references missing {}",
                prefix.range, prefix.scope
            )));
        }
        if let Some(address) = self.addresses.values().find(|a| !scope_exists(&a.scope)) {
            return Err(constraint(format!(
                "IP address {} references missing {}",
                address.address, address.scope
            )));
        }
        if let Some(address) = self.addresses.values().find(|a| {
            a.nat_inside
                .is_some_and(|inside| !self.addresses.contains_key(&inside))
        }) {
            return Err(constraint(format!(
                "IP address {} references a missing NAT inside address",
                address.address
            )));
        }
        Ok(())
    }

    /// Sorted by start, any overlap shows up between neighbours
    fn check_aggregate_exclusion(&self) -> IpamResult<()> {
        let mut ranges: Vec<AddressRange> = self.aggregates.values().map(|a| a.range).collect();
        ranges.sort();
        for pair in ranges.windows(2) {
            if pair[0].overlaps(&pair[1]) {
                return Err(constraint(format!(
                    "aggregates {} and {} overlap",
                    pair[0], pair[1]
                )));
            }
        }
        Ok(())
    }

    fn check_prefix_unique(&self, enforce_global_unique: bool) -> IpamResult<()> {
        let mut seen: HashMap<(Scope, AddressRange), PrefixId> = HashMap::new();
        for prefix in self.prefixes.values() {
            if !self.enforces_unique(&prefix.scope, enforce_global_unique) {
                continue;
            }
            if seen.insert((prefix.scope, prefix.range), prefix.id).is_some() {
                return Err(constraint(format!(
                    "duplicate prefix {} in {}",
                    prefix.range, prefix.scope
                )));
            }
        }
        Ok(())
    }

    fn check_address_unique(&self, enforce_global_unique: bool) -> IpamResult<()> {
        let mut groups: HashMap<(Scope, IpAddr), Vec<&IpAddress>> = HashMap::new();
        for address in self.addresses.values() {
            if self.enforces_unique(&address.scope, enforce_global_unique) {
                groups
                    .entry((address.scope, address.host()))
                    .or_default()
                    .push(address);
            }
        }
        for ((scope, host), members) in groups {
            if members.len() > 1 && !members.iter().all(|a| a.has_non_unique_role()) {
                return Err(constraint(format!(
                    "duplicate IP address {} in {}",
                    host, scope
                )));
            }
        }
        Ok(())
    }

    fn check_nat_one_to_one(&self) -> IpamResult<()> {
        let mut outside_of: HashMap<IpAddressId, IpAddressId> = HashMap::new();
        for address in self.addresses.values() {
            if let Some(inside) = address.nat_inside {
                if outside_of.insert(inside, address.id).is_some() {
                    return Err(constraint(format!(
                        "NAT inside address {} has more than one outside address",
                        inside
                    )));
                }
            }
        }
        Ok(())
    }
}

fn constraint(detail: String) -> IpamError {
    IpamError::StorageFailure(format!("constraint violated: {}", detail))
}

fn sorted<T, K: Ord>(mut rows: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    rows.sort_by_key(key);
    rows
}

/// In-memory [`IpamStore`]
#[derive(Debug, Clone)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    enforce_global_unique: bool,
}

impl MemoryStore {
    /// Empty store without global uniqueness enforcement
    pub fn new() -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
            enforce_global_unique: false,
        }
    }

    /// Empty store whose unique indexes follow `config`
    pub fn from_config(config: &IpamConfig) -> Self {
        Self::new().with_enforce_global_unique(config.enforce_global_unique)
    }

    pub fn with_enforce_global_unique(mut self, enforce: bool) -> Self {
        self.enforce_global_unique = enforce;
        self
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IpamStore for MemoryStore {
    async fn begin(&self) -> IpamResult<Box<dyn IpamTransaction>> {
        let guard = self.tables.clone().lock_owned().await;
        let working = (*guard).clone();
        Ok(Box::new(MemoryTransaction {
            guard,
            working,
            enforce_global_unique: self.enforce_global_unique,
        }))
    }

    fn global_unique_index(&self) -> Option<bool> {
        Some(self.enforce_global_unique)
    }
}

/// Transaction over a private working copy of the tables
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
    enforce_global_unique: bool,
}

#[async_trait]
impl IpamTransaction for MemoryTransaction {
    async fn get_vrf(&mut self, id: VrfId) -> IpamResult<Option<Vrf>> {
        Ok(self.working.vrfs.get(&id).cloned())
    }

    async fn upsert_vrf(&mut self, vrf: &Vrf) -> IpamResult<()> {
        self.working.vrfs.insert(vrf.id, vrf.clone());
        Ok(())
    }

    async fn delete_vrf(&mut self, id: VrfId) -> IpamResult<()> {
        self.working.vrfs.remove(&id);
        Ok(())
    }

    async fn get_rir(&mut self, id: RirId) -> IpamResult<Option<Rir>> {
        Ok(self.working.rirs.get(&id).cloned())
    }

    async fn upsert_rir(&mut self, rir: &Rir) -> IpamResult<()> {
        self.working.rirs.insert(rir.id, rir.clone());
        Ok(())
    }

    async fn delete_rir(&mut self, id: RirId) -> IpamResult<()> {
        self.working.rirs.remove(&id);
        Ok(())
    }

    async fn get_aggregate(&mut self, id: AggregateId) -> IpamResult<Option<Aggregate>> {
        Ok(self.working.aggregates.get(&id).cloned())
    }

    async fn select_aggregates(&mut self, filter: &AggregateFilter) -> IpamResult<Vec<Aggregate>> {
        let rows: Vec<Aggregate> = self
            .working
            .aggregates
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        Ok(sorted(rows, |a| (a.range, a.id)))
    }

    async fn upsert_aggregate(&mut self, aggregate: &Aggregate) -> IpamResult<()> {
        self.working
            .aggregates
            .insert(aggregate.id, aggregate.clone());
        Ok(())
    }

    async fn delete_aggregate(&mut self, id: AggregateId) -> IpamResult<()> {
        self.working.aggregates.remove(&id);
        Ok(())
    }

    async fn get_prefix(&mut self, id: PrefixId) -> IpamResult<Option<Prefix>> {
        Ok(self.working.prefixes.get(&id).cloned())
    }

    async fn select_prefixes(&mut self, filter: &PrefixFilter) -> IpamResult<Vec<Prefix>> {
        let rows: Vec<Prefix> = self
            .working
            .prefixes
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        Ok(sorted(rows, |p| (p.range, p.scope, p.id)))
    }

    async fn upsert_prefix(&mut self, prefix: &Prefix) -> IpamResult<()> {
        self.working.prefixes.insert(prefix.id, prefix.clone());
        Ok(())
    }

    async fn delete_prefix(&mut self, id: PrefixId) -> IpamResult<()> {
        self.working.prefixes.remove(&id);
        Ok(())
    }

    async fn update_prefix_counters(
        &mut self,
        counter: PrefixCounter,
        values: &[(PrefixId, u32)],
    ) -> IpamResult<()> {
        for (id, value) in values {
            if let Some(prefix) = self.working.prefixes.get_mut(id) {
                match counter {
                    PrefixCounter::Depth => prefix.depth = *value,
                    PrefixCounter::Children => prefix.children = *value,
                }
            }
        }
        Ok(())
    }

    async fn get_address(&mut self, id: IpAddressId) -> IpamResult<Option<IpAddress>> {
        Ok(self.working.addresses.get(&id).cloned())
    }

    async fn select_addresses(&mut self, filter: &AddressFilter) -> IpamResult<Vec<IpAddress>> {
        let rows: Vec<IpAddress> = self
            .working
            .addresses
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        Ok(sorted(rows, |a| (a.family(), a.host(), a.scope, a.id)))
    }

    async fn upsert_address(&mut self, address: &IpAddress) -> IpamResult<()> {
        self.working.addresses.insert(address.id, address.clone());
        Ok(())
    }

    async fn delete_address(&mut self, id: IpAddressId) -> IpamResult<()> {
        self.working.addresses.remove(&id);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> IpamResult<()> {
        let MemoryTransaction {
            mut guard,
            working,
            enforce_global_unique,
        } = *self;

        if let Err(e) = working.check_constraints(enforce_global_unique) {
            warn!("Rolling back transaction: {}", e);
            return Err(e);
        }

        *guard = working;
        debug!("Transaction committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{IpAddressRole, IpAddressWithCidr, PrefixStatus};
    use crate::store::{PrefixFilter, RangePredicate};

    fn range(s: &str) -> AddressRange {
        s.parse().unwrap()
    }

    fn ip(s: &str) -> IpAddress {
        IpAddress::new(IpAddressWithCidr::new(s).unwrap())
    }

    #[tokio::test]
    async fn test_drop_rolls_back() {
        let store = MemoryStore::new();
        {
            let mut txn = store.begin().await.unwrap();
            txn.upsert_prefix(&Prefix::new(range("10.0.0.0/8")))
                .await
                .unwrap();
        }

        let mut txn = store.begin().await.unwrap();
        let all = txn.select_prefixes(&PrefixFilter::new()).await.unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn test_select_is_ordered_by_range() {
        let store = MemoryStore::new();
        let mut txn = store.begin().await.unwrap();
        for cidr in ["10.0.2.0/24", "10.0.0.0/16", "10.0.0.0/24", "10.0.1.0/24"] {
            txn.upsert_prefix(&Prefix::new(range(cidr))).await.unwrap();
        }
        txn.commit().await.unwrap();

        let mut txn = store.begin().await.unwrap();
        let within = txn
            .select_prefixes(&PrefixFilter::new().range(RangePredicate::Within {
                range: range("10.0.0.0/16"),
                include_equal: false,
            }))
            .await
            .unwrap();
        let cidrs: Vec<String> = within.iter().map(|p| p.range.to_string()).collect();
        assert_eq!(cidrs, vec!["10.0.0.0/24", "10.0.1.0/24", "10.0.2.0/24"]);
    }

    #[tokio::test]
    async fn test_unique_prefix_index_when_enforced() {
        let store = MemoryStore::new().with_enforce_global_unique(true);
        let mut txn = store.begin().await.unwrap();
        txn.upsert_prefix(&Prefix::new(range("10.0.0.0/24")))
            .await
            .unwrap();
        txn.upsert_prefix(&Prefix::new(range("10.0.0.0/24")))
            .await
            .unwrap();
        assert!(matches!(
            txn.commit().await,
            Err(IpamError::StorageFailure(_))
        ));

        // Nothing was published
        let mut txn = store.begin().await.unwrap();
        assert!(txn
            .select_prefixes(&PrefixFilter::new())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_duplicates_allowed_without_enforcement() {
        let store = MemoryStore::new();
        let mut txn = store.begin().await.unwrap();
        txn.upsert_prefix(&Prefix::new(range("10.0.0.0/24")))
            .await
            .unwrap();
        txn.upsert_prefix(
            &Prefix::new(range("10.0.0.0/24")).with_status(PrefixStatus::Reserved),
        )
        .await
        .unwrap();
        txn.upsert_address(&ip("10.0.0.1/24")).await.unwrap();
        txn.upsert_address(&ip("10.0.0.1/24")).await.unwrap();
        assert!(txn.commit().await.is_ok());
    }

    #[tokio::test]
    async fn test_address_index_partitions_shared_roles() {
        let store = MemoryStore::new().with_enforce_global_unique(true);

        let mut txn = store.begin().await.unwrap();
        txn.upsert_address(&ip("192.0.2.1/24").with_role(IpAddressRole::Vip))
            .await
            .unwrap();
        txn.upsert_address(&ip("192.0.2.1/24").with_role(IpAddressRole::Vip))
            .await
            .unwrap();
        assert!(txn.commit().await.is_ok());

        let mut txn = store.begin().await.unwrap();
        txn.upsert_address(&ip("192.0.2.1/32")).await.unwrap();
        assert!(txn.commit().await.is_err());
    }

    #[tokio::test]
    async fn test_nat_inside_is_one_to_one() {
        let store = MemoryStore::new();
        let inside = ip("10.0.0.1/24");
        let mut txn = store.begin().await.unwrap();
        txn.upsert_address(&inside).await.unwrap();
        txn.upsert_address(&ip("192.0.2.1/24").with_nat_inside(inside.id))
            .await
            .unwrap();
        txn.upsert_address(&ip("192.0.2.2/24").with_nat_inside(inside.id))
            .await
            .unwrap();
        assert!(txn.commit().await.is_err());
    }

    #[tokio::test]
    async fn test_missing_vrf_is_rejected() {
        let store = MemoryStore::new();
        let mut txn = store.begin().await.unwrap();
        txn.upsert_prefix(&Prefix::new(range("10.0.0.0/8")).with_scope(VrfId::new()))
            .await
            .unwrap();
        assert!(txn.commit().await.is_err());
    }

    #[tokio::test]
    async fn test_aggregate_exclusion() {
        let store = MemoryStore::new();
        let rir = Rir::new("RFC 1918").private();
        let mut txn = store.begin().await.unwrap();
        txn.upsert_rir(&rir).await.unwrap();
        txn.upsert_aggregate(&Aggregate::new(range("10.1.0.0/16"), rir.id))
            .await
            .unwrap();
        txn.upsert_aggregate(&Aggregate::new(range("10.1.128.0/17"), rir.id))
            .await
            .unwrap();
        assert!(txn.commit().await.is_err());
    }

    #[tokio::test]
    async fn test_counter_update_skips_missing_rows() {
        let store = MemoryStore::new();
        let prefix = Prefix::new(range("10.0.0.0/8"));
        let mut txn = store.begin().await.unwrap();
        txn.upsert_prefix(&prefix).await.unwrap();
        txn.update_prefix_counters(
            PrefixCounter::Children,
            &[(prefix.id, 4), (PrefixId::new(), 9)],
        )
        .await
        .unwrap();
        let stored = txn.get_prefix(prefix.id).await.unwrap().unwrap();
        assert_eq!(stored.children, 4);
        assert_eq!(stored.depth, 0);
    }
}
