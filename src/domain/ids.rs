// Copyright (c) 2025 - Cowboy AI, Inc.
//! Record identifiers
//!
//! Every persisted record is keyed by a UUID v7 wrapped in its own newtype,
//! so a prefix id can never be passed where an address id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh time-ordered id
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

record_id!(
    /// Aggregate record id
    AggregateId
);
record_id!(
    /// Prefix record id
    PrefixId
);
record_id!(
    /// IP address record id
    IpAddressId
);
record_id!(
    /// VRF (routing domain) id
    VrfId
);
record_id!(
    /// Regional Internet Registry id
    RirId
);
record_id!(TenantId);
record_id!(SiteId);
record_id!(VlanId);
record_id!(
    /// Functional role of a prefix (not to be confused with address roles)
    RoleId
);
