// Copyright (c) 2025 - Cowboy AI, Inc.
//! IPAM Records
//!
//! The three persisted record kinds of the address hierarchy:
//!
//! - [`Aggregate`] - a top-level block assigned from a registry, always global
//! - [`Prefix`] - a CIDR network in a [`Scope`], carrying cached `depth`/`children`
//! - [`IpAddress`] - a host address plus configured mask in a [`Scope`]
//!
//! Records are plain data. Containment between them is answered by range
//! queries over the live record set, never by parent pointers.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use uuid::Uuid;

use super::ids::{AggregateId, IpAddressId, PrefixId, RirId, RoleId, SiteId, TenantId, VlanId};
use super::network::{AddressFamily, AddressRange, IpAddressWithCidr};
use super::scope::Scope;

/// Kind of record, used in error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Aggregate,
    Prefix,
    IpAddress,
    Vrf,
    Rir,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aggregate => write!(f, "aggregate"),
            Self::Prefix => write!(f, "prefix"),
            Self::IpAddress => write!(f, "IP address"),
            Self::Vrf => write!(f, "VRF"),
            Self::Rir => write!(f, "RIR"),
        }
    }
}

/// Operational status of a prefix
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrefixStatus {
    /// Aggregates utilization of its child prefixes
    Container,
    #[default]
    Active,
    Reserved,
    Deprecated,
}

impl fmt::Display for PrefixStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Container => write!(f, "container"),
            Self::Active => write!(f, "active"),
            Self::Reserved => write!(f, "reserved"),
            Self::Deprecated => write!(f, "deprecated"),
        }
    }
}

/// Operational status of an IP address
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IpAddressStatus {
    #[default]
    Active,
    Reserved,
    Deprecated,
    Dhcp,
    /// Stateless address autoconfiguration (IPv6 only)
    Slaac,
}

impl IpAddressStatus {
    /// Family this status is restricted to, if any
    pub fn restricted_family(&self) -> Option<AddressFamily> {
        match self {
            Self::Slaac => Some(AddressFamily::V6),
            _ => None,
        }
    }
}

impl fmt::Display for IpAddressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Reserved => write!(f, "reserved"),
            Self::Deprecated => write!(f, "deprecated"),
            Self::Dhcp => write!(f, "dhcp"),
            Self::Slaac => write!(f, "slaac"),
        }
    }
}

/// Functional role of an IP address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IpAddressRole {
    Loopback,
    Secondary,
    Anycast,
    Vip,
    Vrrp,
    Hsrp,
    Glbp,
    Carp,
}

impl IpAddressRole {
    /// Roles that may share a host address with other addresses
    pub const NON_UNIQUE: [IpAddressRole; 7] = [
        Self::Secondary,
        Self::Anycast,
        Self::Vip,
        Self::Vrrp,
        Self::Hsrp,
        Self::Glbp,
        Self::Carp,
    ];

    pub fn is_non_unique(&self) -> bool {
        Self::NON_UNIQUE.contains(self)
    }
}

impl fmt::Display for IpAddressRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Loopback => "loopback",
            Self::Secondary => "secondary",
            Self::Anycast => "anycast",
            Self::Vip => "vip",
            Self::Vrrp => "vrrp",
            Self::Hsrp => "hsrp",
            Self::Glbp => "glbp",
            Self::Carp => "carp",
        };
        write!(f, "{}", name)
    }
}

/// Kind of interface-like object an address can be assigned to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignedObjectKind {
    Interface,
    VmInterface,
}

/// Weak, polymorphic pointer to the object an address is configured on
///
/// The address never owns the target; resolution goes through
/// [`AssignmentResolver`](crate::references::AssignmentResolver).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssignedObject {
    pub kind: AssignedObjectKind,
    pub id: Uuid,
}

impl AssignedObject {
    pub fn interface(id: Uuid) -> Self {
        Self {
            kind: AssignedObjectKind::Interface,
            id,
        }
    }

    pub fn vm_interface(id: Uuid) -> Self {
        Self {
            kind: AssignedObjectKind::VmInterface,
            id,
        }
    }
}

/// Where a prefix sits for containment purposes
///
/// `container` marks a global container, whose relations cross every scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Placement {
    pub range: AddressRange,
    pub scope: Scope,
    pub container: bool,
}

impl Placement {
    pub fn new(range: AddressRange, scope: Scope) -> Self {
        Self {
            range,
            scope,
            container: false,
        }
    }

    /// Whether this placement matches descendants in any scope
    pub fn spans_all_scopes(&self) -> bool {
        self.container && self.scope.is_global()
    }
}

/// Top-level IP block allocated from a registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregate {
    pub id: AggregateId,
    pub range: AddressRange,
    pub rir: RirId,
    pub tenant: Option<TenantId>,
    pub date_added: Option<NaiveDate>,
    pub description: String,
    pub created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl Aggregate {
    pub fn new(range: AddressRange, rir: RirId) -> Self {
        let now = Utc::now();
        Self {
            id: AggregateId::new(),
            range,
            rir,
            tenant: None,
            date_added: None,
            description: String::new(),
            created: now,
            last_updated: now,
        }
    }

    pub fn with_date_added(mut self, date: NaiveDate) -> Self {
        self.date_added = Some(date);
        self
    }

    pub fn family(&self) -> AddressFamily {
        self.range.family()
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.range)
    }
}

/// A CIDR network record
///
/// `depth` and `children` are cached derived state maintained by
/// [`hierarchy`](crate::hierarchy); they are never written by callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prefix {
    pub id: PrefixId,
    pub range: AddressRange,
    pub scope: Scope,
    pub status: PrefixStatus,
    pub site: Option<SiteId>,
    pub vlan: Option<VlanId>,
    pub role: Option<RoleId>,
    pub tenant: Option<TenantId>,
    /// All addresses within this prefix are usable
    pub is_pool: bool,
    pub description: String,
    pub depth: u32,
    pub children: u32,
    pub created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl Prefix {
    pub fn new(range: AddressRange) -> Self {
        let now = Utc::now();
        Self {
            id: PrefixId::new(),
            range,
            scope: Scope::Global,
            status: PrefixStatus::default(),
            site: None,
            vlan: None,
            role: None,
            tenant: None,
            is_pool: false,
            description: String::new(),
            depth: 0,
            children: 0,
            created: now,
            last_updated: now,
        }
    }

    pub fn with_scope(mut self, scope: impl Into<Scope>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn with_status(mut self, status: PrefixStatus) -> Self {
        self.status = status;
        self
    }

    pub fn as_pool(mut self) -> Self {
        self.is_pool = true;
        self
    }

    pub fn is_container(&self) -> bool {
        self.status == PrefixStatus::Container
    }

    pub fn family(&self) -> AddressFamily {
        self.range.family()
    }

    pub fn placement(&self) -> Placement {
        Placement {
            range: self.range,
            scope: self.scope,
            container: self.is_container(),
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.range)
    }
}

/// An individual IPv4 or IPv6 address and its mask
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpAddress {
    pub id: IpAddressId,
    pub address: IpAddressWithCidr,
    pub scope: Scope,
    pub status: IpAddressStatus,
    /// `None` is an ordinary address
    pub role: Option<IpAddressRole>,
    pub tenant: Option<TenantId>,
    pub assigned_object: Option<AssignedObject>,
    /// Inside address this one is the NAT outside for
    pub nat_inside: Option<IpAddressId>,
    pub dns_name: String,
    pub description: String,
    pub created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl IpAddress {
    pub fn new(address: IpAddressWithCidr) -> Self {
        let now = Utc::now();
        Self {
            id: IpAddressId::new(),
            address,
            scope: Scope::Global,
            status: IpAddressStatus::default(),
            role: None,
            tenant: None,
            assigned_object: None,
            nat_inside: None,
            dns_name: String::new(),
            description: String::new(),
            created: now,
            last_updated: now,
        }
    }

    pub fn with_scope(mut self, scope: impl Into<Scope>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn with_status(mut self, status: IpAddressStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_role(mut self, role: IpAddressRole) -> Self {
        self.role = Some(role);
        self
    }

    pub fn assigned_to(mut self, object: AssignedObject) -> Self {
        self.assigned_object = Some(object);
        self
    }

    pub fn with_nat_inside(mut self, inside: IpAddressId) -> Self {
        self.nat_inside = Some(inside);
        self
    }

    pub fn with_dns_name(mut self, dns_name: impl Into<String>) -> Self {
        self.dns_name = dns_name.into();
        self
    }

    /// Host address, ignoring the mask
    pub fn host(&self) -> IpAddr {
        self.address.address()
    }

    pub fn family(&self) -> AddressFamily {
        self.address.family()
    }

    pub fn has_non_unique_role(&self) -> bool {
        self.role.is_some_and(|role| role.is_non_unique())
    }
}

impl fmt::Display for IpAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address)
    }
}
