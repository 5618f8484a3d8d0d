//! Configuration management and validation.
//!
//! Provides configuration structures for the registry client and the
//! streaming pipeline, with defaults drawn from [`crate::constants`] and a
//! validation pass applied before the engine starts.

use crate::constants::{
    DEFAULT_CACHE_TTL_SECS, DEFAULT_CHANNEL_CAPACITY, DEFAULT_REGISTRY_TIMEOUT_MS,
    DEFAULT_WARN_INTERVAL_SECS, DELTA_REORDER_CAPACITY,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration for the QC engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QcConfig {
    /// Registry client settings
    pub registry: RegistryConfig,

    /// Streaming pipeline settings
    pub pipeline: PipelineConfig,
}

impl QcConfig {
    /// Validate the complete configuration
    pub fn validate(&self) -> Result<()> {
        self.registry.validate()?;
        self.pipeline.validate()
    }
}

/// Registry client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Per-call lookup timeout in milliseconds
    pub lookup_timeout_ms: u64,

    /// Lookup cache TTL in seconds
    pub cache_ttl_secs: u64,

    /// Minimum interval between repeated lookup warnings per key-pattern,
    /// in seconds
    pub warn_interval_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            lookup_timeout_ms: DEFAULT_REGISTRY_TIMEOUT_MS,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            warn_interval_secs: DEFAULT_WARN_INTERVAL_SECS,
        }
    }
}

impl RegistryConfig {
    /// Per-call lookup timeout
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    /// Lookup cache TTL
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Warning rate-limit interval
    pub fn warn_interval(&self) -> Duration {
        Duration::from_secs(self.warn_interval_secs)
    }

    /// Validate registry settings
    pub fn validate(&self) -> Result<()> {
        if self.lookup_timeout_ms == 0 {
            return Err(Error::configuration(
                "registry lookup timeout must be greater than zero",
            ));
        }
        if self.cache_ttl_secs > DEFAULT_CACHE_TTL_SECS {
            return Err(Error::configuration(format!(
                "registry cache TTL {}s exceeds the {}s bound",
                self.cache_ttl_secs, DEFAULT_CACHE_TTL_SECS
            )));
        }
        Ok(())
    }
}

/// Streaming pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of PUID-hash partitions (worker tasks)
    pub partitions: usize,

    /// Bounded channel capacity between pipeline stages
    pub channel_capacity: usize,

    /// Reorder buffer depth for delta checks
    pub delta_reorder_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            partitions: num_cpus::get(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            delta_reorder_capacity: DELTA_REORDER_CAPACITY,
        }
    }
}

impl PipelineConfig {
    /// Validate pipeline settings
    pub fn validate(&self) -> Result<()> {
        if self.partitions == 0 {
            return Err(Error::configuration(
                "pipeline must have at least one partition",
            ));
        }
        if self.channel_capacity == 0 {
            return Err(Error::configuration(
                "channel capacity must be greater than zero",
            ));
        }
        if self.delta_reorder_capacity == 0 {
            return Err(Error::configuration(
                "delta reorder capacity must be greater than zero",
            ));
        }
        Ok(())
    }
}
