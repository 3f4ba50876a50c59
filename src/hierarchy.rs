// Copyright (c) 2025 - Cowboy AI, Inc.
//! Hierarchy Maintenance Engine
//!
//! Keeps the cached `depth` and `children` counters of every prefix equal to
//! a fresh recomputation over the live prefix set:
//!
//! - `depth(P)`: distinct ranges strictly containing P among P's ancestors
//! - `children(P)`: distinct ranges strictly inside P among P's descendants
//!
//! Ancestors and descendants follow the scope rule of [`crate::query`].
//!
//! # Maintenance Contract
//!
//! When a prefix is created, deleted, or changes scope, range or container
//! status, each affected placement (new first, then old) is rebuilt:
//!
//! 1. every prefix covering the placement, itself and duplicates included,
//!    gets `children` recomputed
//! 2. every prefix inside the placement, itself and duplicates included,
//!    gets `depth` recomputed
//!
//! Nothing outside those two sets is touched. Counter writes go out in
//! batches through [`IpamTransaction::update_prefix_counters`]. The engine
//! performs no validation; any error aborts the surrounding transaction.

use tracing::debug;

use crate::config::IpamConfig;
use crate::domain::{Placement, Prefix, PrefixId};
use crate::errors::{IpamError, IpamResult};
use crate::query::{ancestors_of, descendants_of, distinct_ranges};
use crate::store::{IpamTransaction, PrefixCounter, PrefixFilter};

/// Counter rows written by one rebuild
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildStats {
    pub children_updated: usize,
    pub depth_updated: usize,
}

impl RebuildStats {
    fn merge(self, other: RebuildStats) -> RebuildStats {
        RebuildStats {
            children_updated: self.children_updated + other.children_updated,
            depth_updated: self.depth_updated + other.depth_updated,
        }
    }
}

/// Recomputes cached prefix counters inside a caller's transaction
#[derive(Debug, Clone, Copy)]
pub struct HierarchyMaintainer {
    batch_size: usize,
}

impl HierarchyMaintainer {
    pub fn new(batch_size: usize) -> IpamResult<Self> {
        if batch_size == 0 {
            return Err(IpamError::Configuration(
                "hierarchy batch size must be at least 1".to_string(),
            ));
        }
        Ok(Self { batch_size })
    }

    pub fn from_config(config: &IpamConfig) -> IpamResult<Self> {
        Self::new(config.hierarchy_batch_size)
    }

    /// Whether moving from `previous` to `current` changes any relation
    pub fn needs_rebuild(previous: Option<&Placement>, current: &Placement) -> bool {
        previous != Some(current)
    }

    /// Maintain counters after a prefix was written
    ///
    /// `previous` is the stored placement before the write, `None` on create.
    pub async fn prefix_saved(
        &self,
        txn: &mut dyn IpamTransaction,
        previous: Option<&Placement>,
        current: &Placement,
    ) -> IpamResult<RebuildStats> {
        if !Self::needs_rebuild(previous, current) {
            return Ok(RebuildStats::default());
        }

        let mut stats = self.rebuild(txn, current).await?;
        if let Some(previous) = previous {
            stats = stats.merge(self.rebuild(txn, previous).await?);
        }
        Ok(stats)
    }

    /// Maintain counters after a prefix was deleted
    pub async fn prefix_deleted(
        &self,
        txn: &mut dyn IpamTransaction,
        previous: &Placement,
    ) -> IpamResult<RebuildStats> {
        self.rebuild(txn, previous).await
    }

    /// Recompute both counters for one placement's ancestor and descendant sets
    pub async fn rebuild(
        &self,
        txn: &mut dyn IpamTransaction,
        placement: &Placement,
    ) -> IpamResult<RebuildStats> {
        let ancestors = ancestors_of(txn, placement, true).await?;
        let mut children = Vec::with_capacity(ancestors.len());
        for ancestor in &ancestors {
            let count = children_count(txn, ancestor).await?;
            if count != ancestor.children {
                children.push((ancestor.id, count));
            }
        }
        self.write(txn, PrefixCounter::Children, &children).await?;

        let descendants = descendants_of(txn, placement, true).await?;
        let mut depths = Vec::with_capacity(descendants.len());
        for descendant in &descendants {
            let count = depth_count(txn, descendant).await?;
            if count != descendant.depth {
                depths.push((descendant.id, count));
            }
        }
        self.write(txn, PrefixCounter::Depth, &depths).await?;

        debug!(
            "Rebuilt hierarchy around {} in {}: {} ancestors ({} changed), {} descendants ({} changed)",
            placement.range,
            placement.scope,
            ancestors.len(),
            children.len(),
            descendants.len(),
            depths.len()
        );

        Ok(RebuildStats {
            children_updated: children.len(),
            depth_updated: depths.len(),
        })
    }

    /// Recompute the counters of every prefix
    ///
    /// Repairs a table whose counters were written outside this engine.
    pub async fn rebuild_all(&self, txn: &mut dyn IpamTransaction) -> IpamResult<RebuildStats> {
        let prefixes = txn.select_prefixes(&PrefixFilter::new()).await?;
        let mut children = Vec::new();
        let mut depths = Vec::new();
        for prefix in &prefixes {
            let count = children_count(txn, prefix).await?;
            if count != prefix.children {
                children.push((prefix.id, count));
            }
            let count = depth_count(txn, prefix).await?;
            if count != prefix.depth {
                depths.push((prefix.id, count));
            }
        }
        self.write(txn, PrefixCounter::Children, &children).await?;
        self.write(txn, PrefixCounter::Depth, &depths).await?;

        debug!(
            "Rebuilt all {} prefixes: {} children and {} depth counters changed",
            prefixes.len(),
            children.len(),
            depths.len()
        );
        Ok(RebuildStats {
            children_updated: children.len(),
            depth_updated: depths.len(),
        })
    }

    async fn write(
        &self,
        txn: &mut dyn IpamTransaction,
        counter: PrefixCounter,
        values: &[(PrefixId, u32)],
    ) -> IpamResult<()> {
        for batch in values.chunks(self.batch_size) {
            txn.update_prefix_counters(counter, batch).await?;
        }
        Ok(())
    }
}

async fn children_count(txn: &mut dyn IpamTransaction, prefix: &Prefix) -> IpamResult<u32> {
    let descendants = descendants_of(txn, &prefix.placement(), false).await?;
    counter_value(distinct_ranges(&descendants))
}

async fn depth_count(txn: &mut dyn IpamTransaction, prefix: &Prefix) -> IpamResult<u32> {
    let ancestors = ancestors_of(txn, &prefix.placement(), false).await?;
    counter_value(distinct_ranges(&ancestors))
}

fn counter_value(count: usize) -> IpamResult<u32> {
    u32::try_from(count)
        .map_err(|_| IpamError::StorageFailure(format!("counter overflow: {}", count)))
}
