// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for cim-ipam
//!
//! Provides deterministic test data for the IPAM integration tests.
//! Reference entities use fixed UUIDs so failures are reproducible.
//!
//! # Design Principles
//! - Fixed ids for VRFs and RIRs
//! - One helper per record shape, parsed from CIDR strings
//! - Services are always built over a fresh `MemoryStore`
#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use uuid::Uuid;

use cim_ipam::domain::{
    AddressRange, Aggregate, IpAddress, IpAddressWithCidr, Prefix, PrefixStatus, Rir, RirId, Vrf,
    VrfId,
};
use cim_ipam::{IpamConfig, IpamService, MemoryStore, StoreIpamService};

// Fixed test UUIDs (UUID v7 format, but deterministic for testing)
pub const VRF_A_ID: &str = "01934f4a-3001-7000-8000-000000003001";
pub const VRF_B_ID: &str = "01934f4a-3002-7000-8000-000000003002";
pub const RIR_ID: &str = "01934f4a-4001-7000-8000-000000004001";

// Fixed test timestamp (2026-01-19T12:00:00Z)
pub const FIXED_TIMESTAMP: &str = "2026-01-19T12:00:00Z";

/// Parse a fixed UUID from a constant string
pub fn parse_uuid(s: &str) -> Uuid {
    Uuid::parse_str(s).expect("Invalid UUID in test fixture")
}

/// Parse the fixed timestamp
pub fn fixed_timestamp() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(FIXED_TIMESTAMP)
        .expect("Invalid timestamp in test fixture")
        .with_timezone(&Utc)
}

pub fn range(cidr: &str) -> AddressRange {
    cidr.parse().expect("Invalid CIDR in test fixture")
}

/// Active prefix in the global table
pub fn prefix(cidr: &str) -> Prefix {
    Prefix::new(range(cidr))
}

/// Container prefix in the global table
pub fn container(cidr: &str) -> Prefix {
    prefix(cidr).with_status(PrefixStatus::Container)
}

/// Ordinary address in the global table
pub fn ip(cidr: &str) -> IpAddress {
    IpAddress::new(IpAddressWithCidr::new(cidr).expect("Invalid address in test fixture"))
}

pub fn vrf_a() -> Vrf {
    let mut vrf = Vrf::new("VRF A").with_rd("65000:1");
    vrf.id = VrfId::from_uuid(parse_uuid(VRF_A_ID));
    vrf.created = fixed_timestamp();
    vrf.last_updated = fixed_timestamp();
    vrf
}

pub fn vrf_b() -> Vrf {
    let mut vrf = Vrf::new("VRF B").with_rd("65000:2");
    vrf.id = VrfId::from_uuid(parse_uuid(VRF_B_ID));
    vrf.created = fixed_timestamp();
    vrf.last_updated = fixed_timestamp();
    vrf
}

pub fn rir() -> Rir {
    let mut rir = Rir::new("RFC 1918").private();
    rir.id = RirId::from_uuid(parse_uuid(RIR_ID));
    rir
}

pub fn aggregate(cidr: &str) -> Aggregate {
    let date_added = NaiveDate::from_ymd_opt(2026, 1, 19).expect("Invalid date in test fixture");
    Aggregate::new(range(cidr), rir().id).with_date_added(date_added)
}

/// Service over an empty store
pub fn service_with(config: IpamConfig) -> StoreIpamService {
    StoreIpamService::new(Arc::new(MemoryStore::from_config(&config)), config)
        .expect("Invalid test configuration")
}

/// Service over an empty store, global uniqueness off
pub fn service() -> StoreIpamService {
    service_with(IpamConfig::default())
}

/// Service with VRF A, VRF B and the test RIR already saved
pub async fn seeded_service(config: IpamConfig) -> StoreIpamService {
    let service = service_with(config);
    service.save_vrf(vrf_a()).await.expect("seed VRF A");
    service.save_vrf(vrf_b()).await.expect("seed VRF B");
    service.save_rir(rir()).await.expect("seed RIR");
    service
}

/// Save each prefix in order, returning the stored records
pub async fn save_prefixes(service: &dyn IpamService, prefixes: Vec<Prefix>) -> Vec<Prefix> {
    let mut saved = Vec::with_capacity(prefixes.len());
    for prefix in prefixes {
        saved.push(service.save_prefix(prefix).await.expect("save prefix"));
    }
    saved
}

/// `(range, depth, children)` of every listed prefix, as currently stored
pub async fn counters(service: &dyn IpamService, prefixes: &[&Prefix]) -> Vec<(String, u32, u32)> {
    let mut rows = Vec::with_capacity(prefixes.len());
    for prefix in prefixes {
        let stored = service.get_prefix(prefix.id).await.expect("load prefix");
        rows.push((stored.range.to_string(), stored.depth, stored.children));
    }
    rows
}

/// Build an expected counters row
pub fn row(cidr: &str, depth: u32, children: u32) -> (String, u32, u32) {
    (cidr.to_string(), depth, children)
}
