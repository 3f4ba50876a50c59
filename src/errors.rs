// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for IPAM operations

use thiserror::Error;

use crate::domain::{AddressRange, NetworkError, RecordKind, Scope, ValidationError};

/// Errors that can occur in IPAM operations
#[derive(Debug, Error)]
pub enum IpamError {
    /// Zero-length mask or malformed address/mask input
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// An aggregate overlaps another aggregate
    #[error("Aggregates cannot overlap: {candidate} overlaps existing aggregate {existing}")]
    OverlapViolation {
        candidate: AddressRange,
        existing: AddressRange,
    },

    /// Exact duplicate prefix, or host duplicate not covered by shared roles
    #[error("Duplicate {kind} found in {scope}: {existing}")]
    DuplicateViolation {
        kind: RecordKind,
        scope: Scope,
        existing: String,
    },

    /// Family-restricted value applied to the other family
    #[error("Address family mismatch: {0}")]
    FamilyMismatch(String),

    /// Cross-record reference is inconsistent
    #[error("Consistency violation: {0}")]
    ConsistencyViolation(String),

    /// Attribute failed a format rule
    #[error("Invalid attribute: {0}")]
    InvalidAttribute(String),

    /// Persistence failed mid-transaction
    #[error("Storage failure: {0}")]
    StorageFailure(String),

    /// Referenced record does not exist
    #[error("{kind} {id} not found")]
    NotFound { kind: RecordKind, id: String },

    /// Record is still referenced and cannot be deleted
    #[error("Cannot delete protected {kind}: {reason}")]
    Protected { kind: RecordKind, reason: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl IpamError {
    /// Whether the caller can correct its input and retry
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            IpamError::StorageFailure(_) | IpamError::Configuration(_)
        )
    }

    pub(crate) fn not_found(kind: RecordKind, id: impl ToString) -> Self {
        IpamError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

/// Result type for IPAM operations
pub type IpamResult<T> = Result<T, IpamError>;

impl From<NetworkError> for IpamError {
    fn from(err: NetworkError) -> Self {
        IpamError::InvalidRange(err.to_string())
    }
}

impl From<ValidationError> for IpamError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::ZeroLengthMask(_) => IpamError::InvalidRange(err.to_string()),
            ValidationError::FamilyRestrictedStatus { .. } => {
                IpamError::FamilyMismatch(err.to_string())
            }
            ValidationError::InvalidDnsName(_) => IpamError::InvalidAttribute(err.to_string()),
            ValidationError::SelfNat => IpamError::ConsistencyViolation(err.to_string()),
        }
    }
}
