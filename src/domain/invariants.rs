// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Validation Functions - Domain Invariants
//!
//! Record-local business rules for aggregates, prefixes and IP addresses.
//! Everything here looks only at the values passed in; rules that need
//! other records (duplicates, overlaps, NAT partners) live in
//! [`validation`](crate::validation) and call into these.
//!
//! # Invariant Categories
//!
//! 1. **Structural Invariants**: mask length, DNS name characters
//! 2. **State Invariants**: status values restricted to one address family
//! 3. **Collision Rules**: when a duplicate host address is acceptable

use super::network::{AddressFamily, AddressRange, IpAddressWithCidr};
use super::records::{IpAddressRole, IpAddressStatus};

/// Validation result with detailed error information
pub type ValidationResult = Result<(), ValidationError>;

/// Validation error with context
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A `/0` can never be stored
    #[error("Cannot create {0} with /0 mask")]
    ZeroLengthMask(String),

    /// Status is restricted to the other address family
    #[error("{status} status can only be assigned to {allowed} addresses, not {actual}")]
    FamilyRestrictedStatus {
        status: IpAddressStatus,
        allowed: AddressFamily,
        actual: AddressFamily,
    },

    /// DNS name contains characters outside `[0-9A-Za-z._-]`
    #[error("Invalid DNS name {0:?}: only alphanumeric characters, hyphens, periods and underscores are allowed")]
    InvalidDnsName(String),

    /// An address cannot be its own NAT inside address
    #[error("NAT inside address cannot be the address itself")]
    SelfNat,
}

/// Validate a stored range has a usable mask
///
/// # Rules
/// - Prefix length must be at least 1
pub fn validate_mask_length(range: &AddressRange) -> ValidationResult {
    if range.prefix_length() == 0 {
        return Err(ValidationError::ZeroLengthMask(range.to_string()));
    }
    Ok(())
}

/// Validate an interface address has a usable mask
pub fn validate_address_mask(address: &IpAddressWithCidr) -> ValidationResult {
    if address.prefix_length() == 0 {
        return Err(ValidationError::ZeroLengthMask(address.to_string()));
    }
    Ok(())
}

/// Validate status against the address family
///
/// # Rules
/// - SLAAC is IPv6 only
pub fn validate_status_family(status: IpAddressStatus, family: AddressFamily) -> ValidationResult {
    match status.restricted_family() {
        Some(allowed) if allowed != family => Err(ValidationError::FamilyRestrictedStatus {
            status,
            allowed,
            actual: family,
        }),
        _ => Ok(()),
    }
}

/// Lower-case a DNS name and check its characters
///
/// # Rules
/// - Only `[0-9A-Za-z._-]` after lower-casing
/// - Empty is allowed (no name)
pub fn normalize_dns_name(dns_name: &str) -> Result<String, ValidationError> {
    let lowered = dns_name.to_lowercase();
    let valid = lowered
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if !valid {
        return Err(ValidationError::InvalidDnsName(dns_name.to_string()));
    }
    Ok(lowered)
}

/// Whether a set of addresses sharing one host value may coexist
///
/// # Rules
/// - A lone address never collides
/// - Otherwise every member, candidate included, must carry a non-unique role
pub fn collision_permitted<'a>(
    candidate: Option<IpAddressRole>,
    existing: impl IntoIterator<Item = &'a Option<IpAddressRole>>,
) -> bool {
    let is_non_unique = |role: &Option<IpAddressRole>| role.is_some_and(|r| r.is_non_unique());
    let mut existing = existing.into_iter().peekable();
    if existing.peek().is_none() {
        return true;
    }
    is_non_unique(&candidate) && existing.all(is_non_unique)
}
