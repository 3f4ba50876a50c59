// Copyright (c) 2025 - Cowboy AI, Inc.
//! Service Layer for IP Address Management
//!
//! The application service that surrounding CRUD/API layers call into.
//!
//! # Architecture
//!
//! ```text
//! Client Request
//!     ↓
//! Service Layer (this module)
//!     ↓
//! Validator → Row write → Hierarchy Maintenance
//!     ↓
//! IpamTransaction (commit / rollback)
//!     ↓
//! Primary-IP holder notification (after commit)
//! ```
//!
//! # Design Principles
//!
//! 1. **Transaction Boundaries**: one transaction per service call
//! 2. **Validate Before Write**: nothing is written for a rejected candidate
//! 3. **Derived State**: `depth`/`children` are never taken from the caller
//! 4. **Async by Default**: storage and collaborators are async traits
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use cim_ipam::config::IpamConfig;
//! use cim_ipam::domain::{Prefix, PrefixStatus};
//! use cim_ipam::service::{IpamService, StoreIpamService};
//! use cim_ipam::store::MemoryStore;
//!
//! # tokio_test::block_on(async {
//! let config = IpamConfig::default();
//! let service = StoreIpamService::new(Arc::new(MemoryStore::from_config(&config)), config)?;
//!
//! let parent = service
//!     .save_prefix(Prefix::new("10.0.0.0/16".parse()?).with_status(PrefixStatus::Container))
//!     .await?;
//! service.save_prefix(Prefix::new("10.0.0.0/24".parse()?)).await?;
//!
//! let next = service.first_available_prefix(parent.id).await?;
//! assert_eq!(next.map(|r| r.to_string()), Some("10.0.1.0/24".to_string()));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # }).unwrap();
//! ```

pub mod ipam;

pub use ipam::{IpamService, StoreIpamService};
