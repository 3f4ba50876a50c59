// Copyright (c) 2025 - Cowboy AI, Inc.
//! Routing Domain Scope Model
//!
//! Prefixes and addresses live either in the global table or inside a VRF.
//! Two scopes are equal only when both are global or both name the same VRF.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{RirId, TenantId, VrfId};

/// Routing domain a prefix or address belongs to
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(tag = "type", content = "vrf", rename_all = "snake_case")]
pub enum Scope {
    /// The unscoped global table
    #[default]
    Global,
    /// A specific VRF
    Vrf(VrfId),
}

impl Scope {
    pub fn is_global(&self) -> bool {
        matches!(self, Self::Global)
    }

    pub fn vrf_id(&self) -> Option<VrfId> {
        match self {
            Self::Global => None,
            Self::Vrf(id) => Some(*id),
        }
    }

    /// Whether duplicate prefixes/addresses are forbidden in this scope
    ///
    /// The global table follows the deployment-wide flag; a VRF follows its
    /// own `enforce_unique` setting. `vrf` must be the record this scope
    /// names (ignored for the global table); an unresolved VRF enforces.
    pub fn enforces_unique(&self, vrf: Option<&Vrf>, enforce_global_unique: bool) -> bool {
        match self {
            Self::Global => enforce_global_unique,
            Self::Vrf(_) => vrf.map_or(true, |v| v.enforce_unique),
        }
    }
}

impl From<Option<VrfId>> for Scope {
    fn from(vrf: Option<VrfId>) -> Self {
        vrf.map_or(Self::Global, Self::Vrf)
    }
}

impl From<VrfId> for Scope {
    fn from(vrf: VrfId) -> Self {
        Self::Vrf(vrf)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global table"),
            Self::Vrf(id) => write!(f, "VRF {}", id),
        }
    }
}

/// Virtual routing and forwarding table: a discrete layer 3 forwarding domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vrf {
    pub id: VrfId,
    pub name: String,
    /// Route distinguisher (RFC 4364)
    pub rd: Option<String>,
    pub tenant: Option<TenantId>,
    /// Prevent duplicate prefixes/addresses within this VRF
    pub enforce_unique: bool,
    pub description: String,
    pub created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl Vrf {
    /// New VRF with uniqueness enforced
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: VrfId::new(),
            name: name.into(),
            rd: None,
            tenant: None,
            enforce_unique: true,
            description: String::new(),
            created: now,
            last_updated: now,
        }
    }

    pub fn with_rd(mut self, rd: impl Into<String>) -> Self {
        self.rd = Some(rd.into());
        self
    }

    pub fn with_enforce_unique(mut self, enforce_unique: bool) -> Self {
        self.enforce_unique = enforce_unique;
        self
    }

    pub fn scope(&self) -> Scope {
        Scope::Vrf(self.id)
    }
}

impl fmt::Display for Vrf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.rd {
            Some(rd) => write!(f, "{} ({})", self.name, rd),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Regional Internet Registry (or a governing standard such as RFC 1918)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rir {
    pub id: RirId,
    pub name: String,
    /// Space managed by this registry is private
    pub is_private: bool,
    pub description: String,
}

impl Rir {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: RirId::new(),
            name: name.into(),
            is_private: false,
            description: String::new(),
        }
    }

    pub fn private(mut self) -> Self {
        self.is_private = true;
        self
    }
}
