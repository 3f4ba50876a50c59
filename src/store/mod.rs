// Copyright (c) 2025 - Cowboy AI, Inc.
//! Storage Abstraction
//!
//! The IPAM core never talks to a database directly. Everything it reads or
//! writes goes through an [`IpamTransaction`] opened from an [`IpamStore`].
//!
//! # Architecture
//!
//! ```text
//! Service → Validator ─┐
//!         → Row write ─┼→ IpamTransaction → commit / rollback
//!         → Hierarchy ─┘
//! ```
//!
//! # Store Requirements
//!
//! 1. **Atomicity**: `commit` publishes every write of the transaction or none
//! 2. **Rollback on drop**: a transaction dropped without `commit` changes nothing
//! 3. **Range predicates**: exact, covering and within queries over ranges
//! 4. **Ordering**: selects return rows ascending by range, then scope, then id
//! 5. **Bulk counter updates**: `depth`/`children` written by primary key
//!
//! Backends should also enforce uniqueness at commit (unique indexes on
//! `(scope, range)` for prefixes and `(scope, host)` for addresses) so
//! that two concurrent writers cannot both slip past validation.
//!
//! # Example
//!
//! ```rust
//! use cim_ipam::domain::{AddressRange, Prefix};
//! use cim_ipam::store::{IpamStore, MemoryStore, PrefixFilter, RangePredicate};
//!
//! # tokio_test::block_on(async {
//! let store = MemoryStore::new();
//! let range: AddressRange = "10.0.0.0/16".parse().unwrap();
//!
//! let mut txn = store.begin().await.unwrap();
//! txn.upsert_prefix(&Prefix::new(range)).await.unwrap();
//! txn.commit().await.unwrap();
//!
//! let mut txn = store.begin().await.unwrap();
//! let found = txn
//!     .select_prefixes(&PrefixFilter::new().range(RangePredicate::Exact(range)))
//!     .await
//!     .unwrap();
//! assert_eq!(found.len(), 1);
//! # });
//! ```

use async_trait::async_trait;
use std::net::IpAddr;

use crate::domain::{
    AddressRange, Aggregate, AggregateId, IpAddress, IpAddressId, Prefix, PrefixId, Rir, RirId,
    Scope, Vrf, VrfId,
};
use crate::errors::IpamResult;

pub mod memory;

pub use memory::MemoryStore;

/// Range predicate evaluated against a stored range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangePredicate {
    /// Same network and prefix length
    Exact(AddressRange),
    /// Stored range contains the given one
    Covering {
        range: AddressRange,
        include_equal: bool,
    },
    /// Stored range lies inside the given one
    Within {
        range: AddressRange,
        include_equal: bool,
    },
}

impl RangePredicate {
    pub fn matches(&self, stored: &AddressRange) -> bool {
        match self {
            Self::Exact(range) => stored == range,
            Self::Covering {
                range,
                include_equal,
            } => {
                if *include_equal {
                    stored.contains(range)
                } else {
                    stored.strictly_contains(range)
                }
            }
            Self::Within {
                range,
                include_equal,
            } => {
                if *include_equal {
                    range.contains(stored)
                } else {
                    range.strictly_contains(stored)
                }
            }
        }
    }
}

/// Scope restriction for prefix selects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScopeFilter {
    #[default]
    Any,
    Exactly(Scope),
    /// The given scope, plus global prefixes with container status
    ExactlyOrGlobalContainer(Scope),
}

impl ScopeFilter {
    pub fn matches_prefix(&self, prefix: &Prefix) -> bool {
        match self {
            Self::Any => true,
            Self::Exactly(scope) => prefix.scope == *scope,
            Self::ExactlyOrGlobalContainer(scope) => {
                prefix.scope == *scope || (prefix.scope.is_global() && prefix.is_container())
            }
        }
    }
}

/// Filter for [`IpamTransaction::select_aggregates`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateFilter {
    pub range: Option<RangePredicate>,
    pub rir: Option<RirId>,
    pub exclude: Option<AggregateId>,
}

impl AggregateFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn range(mut self, predicate: RangePredicate) -> Self {
        self.range = Some(predicate);
        self
    }

    pub fn rir(mut self, rir: RirId) -> Self {
        self.rir = Some(rir);
        self
    }

    pub fn excluding(mut self, id: AggregateId) -> Self {
        self.exclude = Some(id);
        self
    }

    pub fn matches(&self, aggregate: &Aggregate) -> bool {
        self.exclude != Some(aggregate.id)
            && self.rir.map_or(true, |rir| aggregate.rir == rir)
            && self
                .range
                .map_or(true, |predicate| predicate.matches(&aggregate.range))
    }
}

/// Filter for [`IpamTransaction::select_prefixes`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixFilter {
    pub range: Option<RangePredicate>,
    pub scope: ScopeFilter,
    pub exclude: Option<PrefixId>,
}

impl PrefixFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn range(mut self, predicate: RangePredicate) -> Self {
        self.range = Some(predicate);
        self
    }

    pub fn scope(mut self, scope: ScopeFilter) -> Self {
        self.scope = scope;
        self
    }

    pub fn excluding(mut self, id: PrefixId) -> Self {
        self.exclude = Some(id);
        self
    }

    pub fn matches(&self, prefix: &Prefix) -> bool {
        self.exclude != Some(prefix.id)
            && self.scope.matches_prefix(prefix)
            && self
                .range
                .map_or(true, |predicate| predicate.matches(&prefix.range))
    }
}

/// Host-address predicate; the address's own mask is ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPredicate {
    Within(AddressRange),
    Equals(IpAddr),
}

/// Filter for [`IpamTransaction::select_addresses`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressFilter {
    pub host: Option<HostPredicate>,
    /// `None` matches every scope
    pub scope: Option<Scope>,
    pub nat_inside: Option<IpAddressId>,
    pub exclude: Option<IpAddressId>,
}

impl AddressFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, predicate: HostPredicate) -> Self {
        self.host = Some(predicate);
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn nat_inside(mut self, inside: IpAddressId) -> Self {
        self.nat_inside = Some(inside);
        self
    }

    pub fn excluding(mut self, id: IpAddressId) -> Self {
        self.exclude = Some(id);
        self
    }

    pub fn matches(&self, address: &IpAddress) -> bool {
        let host_matches = match self.host {
            None => true,
            Some(HostPredicate::Within(range)) => range.contains_address(&address.host()),
            Some(HostPredicate::Equals(host)) => address.host() == host,
        };
        host_matches
            && self.exclude != Some(address.id)
            && self.scope.map_or(true, |scope| address.scope == scope)
            && self
                .nat_inside
                .map_or(true, |inside| address.nat_inside == Some(inside))
    }
}

/// Cached prefix counter written by hierarchy maintenance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixCounter {
    Depth,
    Children,
}

/// Opens transactions against a backend
#[async_trait]
pub trait IpamStore: Send + Sync {
    /// Begin a transaction; it holds whatever locks the backend needs until
    /// committed or dropped
    async fn begin(&self) -> IpamResult<Box<dyn IpamTransaction>>;

    /// Whether the backend's unique indexes cover the global table
    ///
    /// `None` when the backend does not report it. A service refuses a
    /// store that reports a setting other than its own configuration.
    fn global_unique_index(&self) -> Option<bool> {
        None
    }
}

/// One unit of work against the IPAM tables
///
/// Dropping a transaction without calling [`commit`](Self::commit) rolls
/// it back. Every error is surfaced as
/// [`IpamError::StorageFailure`](crate::errors::IpamError::StorageFailure)
/// by conforming backends.
#[async_trait]
pub trait IpamTransaction: Send {
    async fn get_vrf(&mut self, id: VrfId) -> IpamResult<Option<Vrf>>;

    async fn upsert_vrf(&mut self, vrf: &Vrf) -> IpamResult<()>;

    async fn delete_vrf(&mut self, id: VrfId) -> IpamResult<()>;

    async fn get_rir(&mut self, id: RirId) -> IpamResult<Option<Rir>>;

    async fn upsert_rir(&mut self, rir: &Rir) -> IpamResult<()>;

    async fn delete_rir(&mut self, id: RirId) -> IpamResult<()>;

    async fn get_aggregate(&mut self, id: AggregateId) -> IpamResult<Option<Aggregate>>;

    async fn select_aggregates(&mut self, filter: &AggregateFilter) -> IpamResult<Vec<Aggregate>>;

    async fn upsert_aggregate(&mut self, aggregate: &Aggregate) -> IpamResult<()>;

    async fn delete_aggregate(&mut self, id: AggregateId) -> IpamResult<()>;

    async fn get_prefix(&mut self, id: PrefixId) -> IpamResult<Option<Prefix>>;

    async fn select_prefixes(&mut self, filter: &PrefixFilter) -> IpamResult<Vec<Prefix>>;

    /// Insert or replace a prefix row, cached counters included
    async fn upsert_prefix(&mut self, prefix: &Prefix) -> IpamResult<()>;

    async fn delete_prefix(&mut self, id: PrefixId) -> IpamResult<()>;

    /// Bulk-write one cached counter by primary key
    ///
    /// Ids that no longer exist are skipped.
    async fn update_prefix_counters(
        &mut self,
        counter: PrefixCounter,
        values: &[(PrefixId, u32)],
    ) -> IpamResult<()>;

    async fn get_address(&mut self, id: IpAddressId) -> IpamResult<Option<IpAddress>>;

    async fn select_addresses(&mut self, filter: &AddressFilter) -> IpamResult<Vec<IpAddress>>;

    async fn upsert_address(&mut self, address: &IpAddress) -> IpamResult<()>;

    async fn delete_address(&mut self, id: IpAddressId) -> IpamResult<()>;

    /// Publish every write made in this transaction
    async fn commit(self: Box<Self>) -> IpamResult<()>;
}
