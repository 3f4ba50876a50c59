// Copyright (c) 2025 - Cowboy AI, Inc.
//! IPAM Domain Models
//!
//! Value objects and records for IP address management.
//!
//! # Value Objects with Invariants
//!
//! - [`AddressRange`] - canonical CIDR network (host bits always clear)
//! - [`IpAddressWithCidr`] - interface address with its configured mask
//! - [`AddressSet`] - disjoint interval set with CIDR decomposition
//! - [`Scope`] - global table or a specific VRF
//!
//! # Records
//!
//! - [`Aggregate`] - registry allocation, pairwise non-overlapping
//! - [`Prefix`] - network with cached `depth`/`children` counters
//! - [`IpAddress`] - host address, optionally assigned to an interface
//! - [`Vrf`], [`Rir`] - reference entities

pub mod address_set;
pub mod ids;
pub mod invariants;
pub mod network;
pub mod records;
pub mod scope;

pub use address_set::AddressSet;
pub use ids::{AggregateId, IpAddressId, PrefixId, RirId, RoleId, SiteId, TenantId, VlanId, VrfId};
pub use invariants::{ValidationError, ValidationResult};
pub use network::{AddressFamily, AddressRange, IpAddressWithCidr, NetworkError};
pub use records::{
    Aggregate, AssignedObject, AssignedObjectKind, IpAddress, IpAddressRole, IpAddressStatus,
    Placement, Prefix, PrefixStatus, RecordKind,
};
pub use scope::{Rir, Scope, Vrf};
