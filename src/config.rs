// Copyright (c) 2025 - Cowboy AI, Inc.
//! IPAM configuration
//!
//! Settings are read from the environment:
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `IPAM_ENFORCE_GLOBAL_UNIQUE` | `false` | forbid duplicates in the global table |
//! | `IPAM_HIERARCHY_BATCH_SIZE` | `100` | rows per bulk counter update |
//! | `IPAM_LOG` | `info` | default tracing directive |

use serde::{Deserialize, Serialize};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::errors::{IpamError, IpamResult};

/// Configuration for the IPAM core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpamConfig {
    /// Enforce uniqueness of prefixes and addresses in the global table
    pub enforce_global_unique: bool,
    /// Maximum rows per bulk counter update
    pub hierarchy_batch_size: usize,
    /// Default tracing filter directive
    pub log_filter: String,
}

impl Default for IpamConfig {
    fn default() -> Self {
        Self {
            enforce_global_unique: false,
            hierarchy_batch_size: 100,
            log_filter: "info".to_string(),
        }
    }
}

impl IpamConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> IpamResult<Self> {
        let defaults = Self::default();

        let enforce_global_unique = match std::env::var("IPAM_ENFORCE_GLOBAL_UNIQUE") {
            Ok(value) => parse_bool(&value).ok_or_else(|| {
                IpamError::Configuration(format!(
                    "IPAM_ENFORCE_GLOBAL_UNIQUE must be a boolean, got {:?}",
                    value
                ))
            })?,
            Err(_) => defaults.enforce_global_unique,
        };

        let hierarchy_batch_size = match std::env::var("IPAM_HIERARCHY_BATCH_SIZE") {
            Ok(value) => value.trim().parse::<usize>().map_err(|_| {
                IpamError::Configuration(format!(
                    "IPAM_HIERARCHY_BATCH_SIZE must be a positive integer, got {:?}",
                    value
                ))
            })?,
            Err(_) => defaults.hierarchy_batch_size,
        };

        let log_filter = std::env::var("IPAM_LOG").unwrap_or(defaults.log_filter);

        let config = Self {
            enforce_global_unique,
            hierarchy_batch_size,
            log_filter,
        };
        config.validate()?;
        debug!("Loaded IPAM configuration: {:?}", config);
        Ok(config)
    }

    pub fn with_enforce_global_unique(mut self, enforce: bool) -> Self {
        self.enforce_global_unique = enforce;
        self
    }

    pub fn with_hierarchy_batch_size(mut self, batch_size: usize) -> Self {
        self.hierarchy_batch_size = batch_size;
        self
    }

    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Check the settings are usable
    pub fn validate(&self) -> IpamResult<()> {
        if self.hierarchy_batch_size == 0 {
            return Err(IpamError::Configuration(
                "hierarchy_batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to the
/// configured directive
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_tracing(config: &IpamConfig) -> IpamResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .map_err(|e| IpamError::Configuration(format!("Invalid log filter: {}", e)))?;

    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_err()
    {
        debug!("Tracing subscriber already installed");
    }
    Ok(())
}
