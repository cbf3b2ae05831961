//! Configuration types for block production

use crate::error::{BlockProductionError, Result};
use serde::Deserialize;

/// Default target minimum gas price
pub const DEFAULT_TARGET_MIN_GAS_PRICE: u64 = 10;

/// Default target gas limit
pub const DEFAULT_TARGET_GAS_LIMIT: u64 = 6_800_000;

/// Runtime configuration for block production
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BlockProductionConfig {
    /// Minimum gas price the producer steers toward
    pub target_min_gas_price: u64,

    /// Gas limit the producer steers toward
    pub target_gas_limit: u64,

    /// Delay before the first list refresh (ms)
    pub start_delay_ms: u64,

    /// Timeout for one producer-list fetch (ms)
    pub list_refresh_timeout_ms: u64,

    /// Hard ceiling on slots inspected when looking for the next own slot
    pub max_slot_search_steps: u64,

    /// Header extra data
    pub extra_data: String,
}

impl Default for BlockProductionConfig {
    fn default() -> Self {
        Self {
            target_min_gas_price: DEFAULT_TARGET_MIN_GAS_PRICE,
            target_gas_limit: DEFAULT_TARGET_GAS_LIMIT,
            start_delay_ms: 2_000,
            list_refresh_timeout_ms: 5_000,
            max_slot_search_steps: 10_000,
            extra_data: String::from("peg-chain"),
        }
    }
}

impl BlockProductionConfig {
    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.list_refresh_timeout_ms == 0 {
            return Err(BlockProductionError::InvalidConfig(
                "list_refresh_timeout_ms must be positive".into(),
            ));
        }
        if self.max_slot_search_steps == 0 {
            return Err(BlockProductionError::InvalidConfig(
                "max_slot_search_steps must be positive".into(),
            ));
        }
        if self.extra_data.len() > 32 {
            return Err(BlockProductionError::InvalidConfig(format!(
                "extra_data of {} bytes exceeds 32",
                self.extra_data.len()
            )));
        }
        Ok(())
    }
}
