//! Configuration types for chain acceptance

use crate::error::{ChainError, Result};
use pc_01_producer_schedule::ScheduleConfig;
use serde::Deserialize;

/// Default allowed clock skew for incoming timestamps (ms)
pub const DEFAULT_MAX_FUTURE_SKEW_MS: u64 = 540_000;

/// Default flush cadence (ms)
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 30_000;

/// Default gas limit floor
pub const DEFAULT_MIN_GAS_LIMIT: u64 = 3_000_000;

/// Runtime configuration for chain acceptance
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ChainAcceptanceConfig {
    /// Round-robin schedule (must match the producers')
    pub schedule: ScheduleConfig,

    /// How far ahead of local time a block timestamp may be (ms)
    pub max_future_skew_ms: u64,

    /// Minimum time between block store flushes (ms)
    pub flush_interval_ms: u64,

    /// Receipts older than this many blocks below the head are pruned
    pub receipts_retention_blocks: u64,

    /// Skip execution for trusted replay
    pub no_validation_import: bool,

    /// Gas limit floor
    pub min_gas_limit: u64,

    /// Maximum extra-data length
    pub max_extra_data: usize,
}

impl Default for ChainAcceptanceConfig {
    fn default() -> Self {
        Self {
            schedule: ScheduleConfig::default(),
            max_future_skew_ms: DEFAULT_MAX_FUTURE_SKEW_MS,
            flush_interval_ms: DEFAULT_FLUSH_INTERVAL_MS,
            receipts_retention_blocks: 4_000,
            no_validation_import: false,
            min_gas_limit: DEFAULT_MIN_GAS_LIMIT,
            max_extra_data: 32,
        }
    }
}

impl ChainAcceptanceConfig {
    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.schedule
            .validate()
            .map_err(|e| ChainError::InvalidConfig(e.to_string()))?;
        if self.min_gas_limit == 0 {
            return Err(ChainError::InvalidConfig(
                "min_gas_limit must be positive".into(),
            ));
        }
        Ok(())
    }
}
