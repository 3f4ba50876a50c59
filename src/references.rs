// Copyright (c) 2025 - Cowboy AI, Inc.
//! External collaborators
//!
//! Devices, virtual machines and their interfaces live outside the IPAM
//! core. The core only needs two things from them:
//!
//! - [`AssignmentResolver`]: which device/VM owns an interface an address
//!   is assigned to
//! - [`PrimaryIpRegistry`]: which device/VM uses an address as its primary
//!   IPv4/IPv6 address, and a hook to tell it when that address is deleted

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{AssignedObject, IpAddressId};
use crate::errors::IpamResult;

/// Kind of record that can hold a primary IP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HolderKind {
    Device,
    VirtualMachine,
}

/// Device or virtual machine reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HolderRef {
    pub kind: HolderKind,
    pub id: Uuid,
    pub name: String,
}

impl HolderRef {
    pub fn device(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            kind: HolderKind::Device,
            id,
            name: name.into(),
        }
    }

    pub fn virtual_machine(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            kind: HolderKind::VirtualMachine,
            id,
            name: name.into(),
        }
    }

    /// Same record, regardless of display name
    pub fn same_holder(&self, other: &HolderRef) -> bool {
        self.kind == other.kind && self.id == other.id
    }
}

impl fmt::Display for HolderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            HolderKind::Device => write!(f, "device {}", self.name),
            HolderKind::VirtualMachine => write!(f, "virtual machine {}", self.name),
        }
    }
}

/// Resolves an assigned object to the device/VM that owns it
#[async_trait]
pub trait AssignmentResolver: Send + Sync {
    async fn owner_of(&self, object: &AssignedObject) -> IpamResult<Option<HolderRef>>;
}

/// Tracks which device/VM uses an address as primary IP
#[async_trait]
pub trait PrimaryIpRegistry: Send + Sync {
    async fn holder_of(&self, address: IpAddressId) -> IpamResult<Option<HolderRef>>;

    /// Called after an address that was `holder`'s primary IP is deleted
    async fn primary_ip_deleted(&self, holder: &HolderRef, address: IpAddressId)
        -> IpamResult<()>;
}

/// Nothing is assigned and nothing is primary
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReferences;

#[async_trait]
impl AssignmentResolver for NoReferences {
    async fn owner_of(&self, _object: &AssignedObject) -> IpamResult<Option<HolderRef>> {
        Ok(None)
    }
}

#[async_trait]
impl PrimaryIpRegistry for NoReferences {
    async fn holder_of(&self, _address: IpAddressId) -> IpamResult<Option<HolderRef>> {
        Ok(None)
    }

    async fn primary_ip_deleted(
        &self,
        _holder: &HolderRef,
        _address: IpAddressId,
    ) -> IpamResult<()> {
        Ok(())
    }
}

/// In-memory references for embedding and tests
#[derive(Debug, Default)]
pub struct StaticReferences {
    owners: RwLock<HashMap<AssignedObject, HolderRef>>,
    primaries: RwLock<HashMap<IpAddressId, HolderRef>>,
    notifications: RwLock<Vec<(HolderRef, IpAddressId)>>,
}

impl StaticReferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `object` belongs to `holder`
    pub async fn assign(&self, object: AssignedObject, holder: HolderRef) {
        self.owners.write().await.insert(object, holder);
    }

    /// Record that `holder` uses `address` as a primary IP
    pub async fn set_primary(&self, address: IpAddressId, holder: HolderRef) {
        self.primaries.write().await.insert(address, holder);
    }

    /// Deletion notifications received so far
    pub async fn notifications(&self) -> Vec<(HolderRef, IpAddressId)> {
        self.notifications.read().await.clone()
    }
}

#[async_trait]
impl AssignmentResolver for StaticReferences {
    async fn owner_of(&self, object: &AssignedObject) -> IpamResult<Option<HolderRef>> {
        Ok(self.owners.read().await.get(object).cloned())
    }
}

#[async_trait]
impl PrimaryIpRegistry for StaticReferences {
    async fn holder_of(&self, address: IpAddressId) -> IpamResult<Option<HolderRef>> {
        Ok(self.primaries.read().await.get(&address).cloned())
    }

    async fn primary_ip_deleted(
        &self,
        holder: &HolderRef,
        address: IpAddressId,
    ) -> IpamResult<()> {
        self.primaries.write().await.remove(&address);
        self.notifications
            .write()
            .await
            .push((holder.clone(), address));
        Ok(())
    }
}
