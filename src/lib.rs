// Copyright (c) 2025 - Cowboy AI, Inc.
//! IP address management core for the Composable Information Machine
//!
//! Models address aggregates, CIDR prefixes and individual IP addresses,
//! keeps the cached prefix hierarchy (`depth`/`children`) consistent as
//! records move, computes free space and utilization with set arithmetic,
//! and enforces uniqueness and overlap rules per routing domain (VRF).
//!
//! # Layers
//!
//! - [`domain`] - value objects and records
//! - [`store`] - transactional storage abstraction and the in-memory backend
//! - [`query`] - containment queries (ancestors, descendants, addresses)
//! - [`hierarchy`] - cached counter maintenance
//! - [`allocation`] - available prefixes/addresses and utilization
//! - [`validation`] - uniqueness and overlap rules
//! - [`references`] - device/VM collaborators
//! - [`service`] - validate/save/delete as one atomic unit

pub mod allocation;
pub mod config;
pub mod domain;
pub mod errors;
pub mod hierarchy;
pub mod query;
pub mod references;
pub mod service;
pub mod store;
pub mod validation;

// Re-export commonly used types
pub use allocation::Utilization;
pub use config::{init_tracing, IpamConfig};
pub use errors::{IpamError, IpamResult};
pub use service::{IpamService, StoreIpamService};
pub use store::{IpamStore, IpamTransaction, MemoryStore};
