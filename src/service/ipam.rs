// Copyright (c) 2025 - Cowboy AI, Inc.
//! IPAM Service Layer
//!
//! Application service for aggregates, prefixes and IP addresses. Every
//! write runs inside exactly one storage transaction:
//!
//! ```text
//! begin → validate → row write → hierarchy maintenance → commit
//! ```
//!
//! A validation error returns before anything is written. A storage error
//! at any step drops the transaction, so the visible state is either fully
//! updated or unchanged.
//!
//! Saves are upserts keyed by record id: a record whose id is not stored yet
//! is created, otherwise it is updated. Cached prefix counters and the
//! `created` timestamp are owned by the service and ignored on input.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::allocation::{self, Utilization};
use crate::config::IpamConfig;
use crate::domain::{
    AddressRange, AddressSet, Aggregate, AggregateId, IpAddress, IpAddressId, IpAddressWithCidr,
    Prefix, PrefixId, RecordKind, Rir, RirId, Scope, Vrf, VrfId,
};
use crate::errors::{IpamError, IpamResult};
use crate::hierarchy::{HierarchyMaintainer, RebuildStats};
use crate::query;
use crate::references::{AssignmentResolver, NoReferences, PrimaryIpRegistry};
use crate::store::{
    AddressFilter, AggregateFilter, IpamStore, IpamTransaction, PrefixFilter, ScopeFilter,
};
use crate::validation;

/// IPAM service trait
///
/// Defines the application service interface consumed by CRUD/API layers.
#[async_trait]
pub trait IpamService: Send + Sync {
    /// Create or update a VRF
    async fn save_vrf(&self, vrf: Vrf) -> IpamResult<Vrf>;

    /// Delete a VRF that no prefix or address is assigned to
    async fn delete_vrf(&self, id: VrfId) -> IpamResult<()>;

    async fn get_vrf(&self, id: VrfId) -> IpamResult<Vrf>;

    /// Create or update a RIR
    async fn save_rir(&self, rir: Rir) -> IpamResult<Rir>;

    /// Delete a RIR that no aggregate references
    async fn delete_rir(&self, id: RirId) -> IpamResult<()>;

    /// Check an aggregate without writing it
    async fn validate_aggregate(&self, candidate: &Aggregate) -> IpamResult<()>;

    /// Validate and write an aggregate
    async fn save_aggregate(&self, candidate: Aggregate) -> IpamResult<Aggregate>;

    async fn delete_aggregate(&self, id: AggregateId) -> IpamResult<()>;

    async fn get_aggregate(&self, id: AggregateId) -> IpamResult<Aggregate>;

    /// Share of the aggregate covered by prefixes of any scope
    async fn aggregate_utilization(&self, id: AggregateId) -> IpamResult<Utilization>;

    /// Check a prefix without writing it
    async fn validate_prefix(&self, candidate: &Prefix) -> IpamResult<()>;

    /// Validate and write a prefix, then maintain the hierarchy counters
    ///
    /// # Returns
    /// - The stored prefix with its recomputed `depth` and `children`
    async fn save_prefix(&self, candidate: Prefix) -> IpamResult<Prefix>;

    /// Delete a prefix and maintain the hierarchy counters
    async fn delete_prefix(&self, id: PrefixId) -> IpamResult<()>;

    async fn get_prefix(&self, id: PrefixId) -> IpamResult<Prefix>;

    /// Other prefixes with the same scope and range
    async fn prefix_duplicates(&self, id: PrefixId) -> IpamResult<Vec<Prefix>>;

    /// Prefixes strictly containing this one
    async fn prefix_parents(&self, id: PrefixId) -> IpamResult<Vec<Prefix>>;

    /// Prefixes strictly inside this one
    async fn child_prefixes(&self, id: PrefixId) -> IpamResult<Vec<Prefix>>;

    /// Addresses whose host lies inside this prefix
    async fn child_addresses(&self, id: PrefixId) -> IpamResult<Vec<IpAddress>>;

    async fn available_prefixes(&self, id: PrefixId) -> IpamResult<AddressSet>;

    async fn first_available_prefix(&self, id: PrefixId) -> IpamResult<Option<AddressRange>>;

    async fn available_addresses(&self, id: PrefixId) -> IpamResult<AddressSet>;

    async fn first_available_address(
        &self,
        id: PrefixId,
    ) -> IpamResult<Option<IpAddressWithCidr>>;

    async fn prefix_utilization(&self, id: PrefixId) -> IpamResult<Utilization>;

    /// Recompute every prefix's cached counters
    async fn rebuild_hierarchy(&self) -> IpamResult<RebuildStats>;

    /// Check an IP address without writing it
    async fn validate_ip_address(&self, candidate: &IpAddress) -> IpamResult<()>;

    /// Validate and write an IP address
    ///
    /// # Returns
    /// - The stored address, DNS name lower-cased
    async fn save_ip_address(&self, candidate: IpAddress) -> IpamResult<IpAddress>;

    /// Delete an IP address
    ///
    /// Outside addresses pointing at it lose their NAT inside reference. If
    /// it was a primary IP, the holder is notified after commit.
    async fn delete_ip_address(&self, id: IpAddressId) -> IpamResult<()>;

    async fn get_ip_address(&self, id: IpAddressId) -> IpamResult<IpAddress>;

    /// Other addresses with the same scope and host address
    async fn address_duplicates(&self, id: IpAddressId) -> IpamResult<Vec<IpAddress>>;
}

/// [`IpamService`] over any [`IpamStore`]
pub struct StoreIpamService {
    store: Arc<dyn IpamStore>,
    resolver: Arc<dyn AssignmentResolver>,
    registry: Arc<dyn PrimaryIpRegistry>,
    config: IpamConfig,
    maintainer: HierarchyMaintainer,
}

impl StoreIpamService {
    /// Create a service with no external references
    pub fn new(store: Arc<dyn IpamStore>, config: IpamConfig) -> IpamResult<Self> {
        config.validate()?;
        if let Some(indexed) = store.global_unique_index() {
            if indexed != config.enforce_global_unique {
                return Err(IpamError::Configuration(format!(
                    "store global unique index is {}, configuration enforce_global_unique is {}",
                    on_off(indexed),
                    on_off(config.enforce_global_unique)
                )));
            }
        }
        let maintainer = HierarchyMaintainer::from_config(&config)?;
        Ok(Self {
            store,
            resolver: Arc::new(NoReferences),
            registry: Arc::new(NoReferences),
            config,
            maintainer,
        })
    }

    /// Use the given device/VM collaborators
    pub fn with_references(
        mut self,
        resolver: Arc<dyn AssignmentResolver>,
        registry: Arc<dyn PrimaryIpRegistry>,
    ) -> Self {
        self.resolver = resolver;
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &IpamConfig {
        &self.config
    }

    async fn load_prefix(
        txn: &mut dyn IpamTransaction,
        id: PrefixId,
    ) -> IpamResult<Prefix> {
        txn.get_prefix(id)
            .await?
            .ok_or_else(|| IpamError::not_found(RecordKind::Prefix, id))
    }

    async fn load_address(
        txn: &mut dyn IpamTransaction,
        id: IpAddressId,
    ) -> IpamResult<IpAddress> {
        txn.get_address(id)
            .await?
            .ok_or_else(|| IpamError::not_found(RecordKind::IpAddress, id))
    }

    async fn load_aggregate(
        txn: &mut dyn IpamTransaction,
        id: AggregateId,
    ) -> IpamResult<Aggregate> {
        txn.get_aggregate(id)
            .await?
            .ok_or_else(|| IpamError::not_found(RecordKind::Aggregate, id))
    }

    async fn check_ip_address(
        &self,
        txn: &mut dyn IpamTransaction,
        candidate: &IpAddress,
    ) -> IpamResult<IpAddress> {
        validation::validate_ip_address(
            txn,
            self.resolver.as_ref(),
            self.registry.as_ref(),
            candidate,
            self.config.enforce_global_unique,
        )
        .await
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

/// Log a rejected candidate before handing the error back
fn rejected<T>(
    kind: RecordKind,
    subject: impl std::fmt::Display,
    result: IpamResult<T>,
) -> IpamResult<T> {
    if let Err(e) = &result {
        if e.is_validation() {
            debug!("Rejected {} {}: {}", kind, subject, e);
        }
    }
    result
}

#[async_trait]
impl IpamService for StoreIpamService {
    async fn save_vrf(&self, vrf: Vrf) -> IpamResult<Vrf> {
        if vrf.name.trim().is_empty() {
            return Err(IpamError::InvalidAttribute(
                "VRF name cannot be empty".to_string(),
            ));
        }

        let mut txn = self.store.begin().await?;
        let mut vrf = vrf;
        let now = Utc::now();
        if let Some(previous) = txn.get_vrf(vrf.id).await? {
            if vrf.enforce_unique && !previous.enforce_unique {
                rejected(
                    RecordKind::Vrf,
                    &vrf,
                    validation::validate_scope_unique(txn.as_mut(), vrf.scope()).await,
                )?;
            }
            vrf.created = previous.created;
        }
        vrf.last_updated = now;
        txn.upsert_vrf(&vrf).await?;
        txn.commit().await?;

        info!("Saved VRF {}", vrf);
        Ok(vrf)
    }

    async fn delete_vrf(&self, id: VrfId) -> IpamResult<()> {
        let mut txn = self.store.begin().await?;
        let vrf = txn
            .get_vrf(id)
            .await?
            .ok_or_else(|| IpamError::not_found(RecordKind::Vrf, id))?;

        let scope = Scope::Vrf(id);
        let prefixes = txn
            .select_prefixes(&PrefixFilter::new().scope(ScopeFilter::Exactly(scope)))
            .await?;
        let addresses = txn
            .select_addresses(&AddressFilter::new().scope(scope))
            .await?;
        if !prefixes.is_empty() || !addresses.is_empty() {
            return Err(IpamError::Protected {
                kind: RecordKind::Vrf,
                reason: format!(
                    "{} is assigned to {} prefixes and {} IP addresses",
                    vrf,
                    prefixes.len(),
                    addresses.len()
                ),
            });
        }

        txn.delete_vrf(id).await?;
        txn.commit().await?;
        info!("Deleted VRF {}", vrf);
        Ok(())
    }

    async fn get_vrf(&self, id: VrfId) -> IpamResult<Vrf> {
        let mut txn = self.store.begin().await?;
        txn.get_vrf(id)
            .await?
            .ok_or_else(|| IpamError::not_found(RecordKind::Vrf, id))
    }

    async fn save_rir(&self, rir: Rir) -> IpamResult<Rir> {
        if rir.name.trim().is_empty() {
            return Err(IpamError::InvalidAttribute(
                "RIR name cannot be empty".to_string(),
            ));
        }

        let mut txn = self.store.begin().await?;
        txn.upsert_rir(&rir).await?;
        txn.commit().await?;
        info!("Saved RIR {}", rir.name);
        Ok(rir)
    }

    async fn delete_rir(&self, id: RirId) -> IpamResult<()> {
        let mut txn = self.store.begin().await?;
        let rir = txn
            .get_rir(id)
            .await?
            .ok_or_else(|| IpamError::not_found(RecordKind::Rir, id))?;

        let aggregates = txn
            .select_aggregates(&AggregateFilter::new().rir(id))
            .await?;
        if !aggregates.is_empty() {
            return Err(IpamError::Protected {
                kind: RecordKind::Rir,
                reason: format!(
                    "{} is referenced by {} aggregates",
                    rir.name,
                    aggregates.len()
                ),
            });
        }

        txn.delete_rir(id).await?;
        txn.commit().await?;
        info!("Deleted RIR {}", rir.name);
        Ok(())
    }

    async fn validate_aggregate(&self, candidate: &Aggregate) -> IpamResult<()> {
        let mut txn = self.store.begin().await?;
        let result = validation::validate_aggregate(txn.as_mut(), candidate).await;
        rejected(RecordKind::Aggregate, candidate, result).map(|_| ())
    }

    async fn save_aggregate(&self, candidate: Aggregate) -> IpamResult<Aggregate> {
        let mut txn = self.store.begin().await?;
        let result = validation::validate_aggregate(txn.as_mut(), &candidate).await;
        let mut aggregate = rejected(RecordKind::Aggregate, &candidate, result)?;

        if let Some(previous) = txn.get_aggregate(aggregate.id).await? {
            aggregate.created = previous.created;
        }
        aggregate.last_updated = Utc::now();
        if aggregate.date_added.is_none() {
            aggregate.date_added = Some(aggregate.created.date_naive());
        }

        txn.upsert_aggregate(&aggregate).await?;
        txn.commit().await?;
        info!("Saved aggregate {}", aggregate);
        Ok(aggregate)
    }

    async fn delete_aggregate(&self, id: AggregateId) -> IpamResult<()> {
        let mut txn = self.store.begin().await?;
        let aggregate = Self::load_aggregate(txn.as_mut(), id).await?;
        txn.delete_aggregate(id).await?;
        txn.commit().await?;
        info!("Deleted aggregate {}", aggregate);
        Ok(())
    }

    async fn get_aggregate(&self, id: AggregateId) -> IpamResult<Aggregate> {
        let mut txn = self.store.begin().await?;
        Self::load_aggregate(txn.as_mut(), id).await
    }

    async fn aggregate_utilization(&self, id: AggregateId) -> IpamResult<Utilization> {
        let mut txn = self.store.begin().await?;
        let aggregate = Self::load_aggregate(txn.as_mut(), id).await?;
        allocation::aggregate_utilization(txn.as_mut(), &aggregate).await
    }

    async fn validate_prefix(&self, candidate: &Prefix) -> IpamResult<()> {
        let mut txn = self.store.begin().await?;
        let result = validation::validate_prefix(
            txn.as_mut(),
            candidate,
            self.config.enforce_global_unique,
        )
        .await;
        rejected(RecordKind::Prefix, candidate, result).map(|_| ())
    }

    async fn save_prefix(&self, candidate: Prefix) -> IpamResult<Prefix> {
        let mut txn = self.store.begin().await?;
        let result = validation::validate_prefix(
            txn.as_mut(),
            &candidate,
            self.config.enforce_global_unique,
        )
        .await;
        let mut prefix = rejected(RecordKind::Prefix, &candidate, result)?;

        let previous = txn.get_prefix(prefix.id).await?;
        match &previous {
            Some(previous) => {
                prefix.created = previous.created;
                prefix.depth = previous.depth;
                prefix.children = previous.children;
            }
            None => {
                prefix.depth = 0;
                prefix.children = 0;
            }
        }
        prefix.last_updated = Utc::now();

        txn.upsert_prefix(&prefix).await?;
        let previous_placement = previous.as_ref().map(Prefix::placement);
        let stats = self
            .maintainer
            .prefix_saved(txn.as_mut(), previous_placement.as_ref(), &prefix.placement())
            .await?;
        let stored = Self::load_prefix(txn.as_mut(), prefix.id).await?;
        txn.commit().await?;

        info!(
            "Saved prefix {} in {} (depth {}, children {}, {} counters updated)",
            stored.range,
            stored.scope,
            stored.depth,
            stored.children,
            stats.children_updated + stats.depth_updated
        );
        Ok(stored)
    }

    async fn delete_prefix(&self, id: PrefixId) -> IpamResult<()> {
        let mut txn = self.store.begin().await?;
        let prefix = Self::load_prefix(txn.as_mut(), id).await?;
        txn.delete_prefix(id).await?;
        self.maintainer
            .prefix_deleted(txn.as_mut(), &prefix.placement())
            .await?;
        txn.commit().await?;
        info!("Deleted prefix {} in {}", prefix.range, prefix.scope);
        Ok(())
    }

    async fn get_prefix(&self, id: PrefixId) -> IpamResult<Prefix> {
        let mut txn = self.store.begin().await?;
        Self::load_prefix(txn.as_mut(), id).await
    }

    async fn prefix_duplicates(&self, id: PrefixId) -> IpamResult<Vec<Prefix>> {
        let mut txn = self.store.begin().await?;
        let prefix = Self::load_prefix(txn.as_mut(), id).await?;
        query::prefix_duplicates(txn.as_mut(), &prefix).await
    }

    async fn prefix_parents(&self, id: PrefixId) -> IpamResult<Vec<Prefix>> {
        let mut txn = self.store.begin().await?;
        let prefix = Self::load_prefix(txn.as_mut(), id).await?;
        query::ancestors_of(txn.as_mut(), &prefix.placement(), false).await
    }

    async fn child_prefixes(&self, id: PrefixId) -> IpamResult<Vec<Prefix>> {
        let mut txn = self.store.begin().await?;
        let prefix = Self::load_prefix(txn.as_mut(), id).await?;
        query::descendants_of(txn.as_mut(), &prefix.placement(), false).await
    }

    async fn child_addresses(&self, id: PrefixId) -> IpamResult<Vec<IpAddress>> {
        let mut txn = self.store.begin().await?;
        let prefix = Self::load_prefix(txn.as_mut(), id).await?;
        query::addresses_within(txn.as_mut(), &prefix.placement()).await
    }

    async fn available_prefixes(&self, id: PrefixId) -> IpamResult<AddressSet> {
        let mut txn = self.store.begin().await?;
        let prefix = Self::load_prefix(txn.as_mut(), id).await?;
        allocation::available_prefixes(txn.as_mut(), &prefix).await
    }

    async fn first_available_prefix(&self, id: PrefixId) -> IpamResult<Option<AddressRange>> {
        let mut txn = self.store.begin().await?;
        let prefix = Self::load_prefix(txn.as_mut(), id).await?;
        allocation::first_available_prefix(txn.as_mut(), &prefix).await
    }

    async fn available_addresses(&self, id: PrefixId) -> IpamResult<AddressSet> {
        let mut txn = self.store.begin().await?;
        let prefix = Self::load_prefix(txn.as_mut(), id).await?;
        allocation::available_addresses(txn.as_mut(), &prefix).await
    }

    async fn first_available_address(
        &self,
        id: PrefixId,
    ) -> IpamResult<Option<IpAddressWithCidr>> {
        let mut txn = self.store.begin().await?;
        let prefix = Self::load_prefix(txn.as_mut(), id).await?;
        allocation::first_available_address(txn.as_mut(), &prefix).await
    }

    async fn prefix_utilization(&self, id: PrefixId) -> IpamResult<Utilization> {
        let mut txn = self.store.begin().await?;
        let prefix = Self::load_prefix(txn.as_mut(), id).await?;
        allocation::prefix_utilization(txn.as_mut(), &prefix).await
    }

    async fn rebuild_hierarchy(&self) -> IpamResult<RebuildStats> {
        let mut txn = self.store.begin().await?;
        let stats = self.maintainer.rebuild_all(txn.as_mut()).await?;
        txn.commit().await?;
        info!(
            "Rebuilt prefix hierarchy: {} children and {} depth counters corrected",
            stats.children_updated, stats.depth_updated
        );
        Ok(stats)
    }

    async fn validate_ip_address(&self, candidate: &IpAddress) -> IpamResult<()> {
        let mut txn = self.store.begin().await?;
        let result = self.check_ip_address(txn.as_mut(), candidate).await;
        rejected(RecordKind::IpAddress, candidate, result).map(|_| ())
    }

    async fn save_ip_address(&self, candidate: IpAddress) -> IpamResult<IpAddress> {
        let mut txn = self.store.begin().await?;
        let result = self.check_ip_address(txn.as_mut(), &candidate).await;
        let mut address = rejected(RecordKind::IpAddress, &candidate, result)?;

        if let Some(previous) = txn.get_address(address.id).await? {
            address.created = previous.created;
        }
        address.last_updated = Utc::now();

        txn.upsert_address(&address).await?;
        txn.commit().await?;
        info!("Saved IP address {} in {}", address, address.scope);
        Ok(address)
    }

    async fn delete_ip_address(&self, id: IpAddressId) -> IpamResult<()> {
        let mut txn = self.store.begin().await?;
        let address = Self::load_address(txn.as_mut(), id).await?;
        let holder = self.registry.holder_of(id).await?;

        let outside = txn
            .select_addresses(&AddressFilter::new().nat_inside(id))
            .await?;
        for mut outside in outside {
            debug!("Clearing NAT inside {} on {}", address, outside);
            outside.nat_inside = None;
            outside.last_updated = Utc::now();
            txn.upsert_address(&outside).await?;
        }

        txn.delete_address(id).await?;
        txn.commit().await?;
        info!("Deleted IP address {} in {}", address, address.scope);

        if let Some(holder) = holder {
            if let Err(e) = self.registry.primary_ip_deleted(&holder, id).await {
                warn!(
                    "Failed to notify {} that primary IP {} was deleted: {}",
                    holder, address, e
                );
            }
        }
        Ok(())
    }

    async fn get_ip_address(&self, id: IpAddressId) -> IpamResult<IpAddress> {
        let mut txn = self.store.begin().await?;
        Self::load_address(txn.as_mut(), id).await
    }

    async fn address_duplicates(&self, id: IpAddressId) -> IpamResult<Vec<IpAddress>> {
        let mut txn = self.store.begin().await?;
        let address = Self::load_address(txn.as_mut(), id).await?;
        query::address_duplicates(txn.as_mut(), &address).await
    }
}
