//! Configuration types for the producer schedule

use crate::error::{Result, ScheduleError};
use serde::Deserialize;

/// Default slot length: 5 seconds
pub const DEFAULT_BLOCK_INTERVAL_MS: u64 = 5_000;

/// Default consecutive slots per producer
pub const DEFAULT_REPETITIONS: u64 = 1;

/// Round-robin schedule parameters, shared by producers and validators.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Start-of-time constant (ms since Unix epoch)
    pub block_epoch_ms: u64,

    /// Slot length (ms)
    pub block_interval_ms: u64,

    /// Consecutive slots each producer owns per round
    pub repetitions: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            block_epoch_ms: 0,
            block_interval_ms: DEFAULT_BLOCK_INTERVAL_MS,
            repetitions: DEFAULT_REPETITIONS,
        }
    }
}

impl ScheduleConfig {
    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.block_interval_ms == 0 {
            return Err(ScheduleError::InvalidConfig(
                "block_interval_ms must be positive".into(),
            ));
        }
        if self.repetitions == 0 {
            return Err(ScheduleError::InvalidConfig(
                "repetitions must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Length of one full round for a list of `list_size` producers.
    pub fn round_length_ms(&self, list_size: usize) -> u64 {
        (list_size as u64)
            .saturating_mul(self.repetitions)
            .saturating_mul(self.block_interval_ms)
    }

    /// Index of the producer owning the slot at `now_ms`.
    pub fn producer_index(&self, now_ms: u64, list_size: usize) -> Result<usize> {
        crate::domain::clock::producer_index(
            now_ms,
            self.block_epoch_ms,
            self.block_interval_ms,
            self.repetitions,
            list_size,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(ScheduleConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_repetitions_rejected() {
        let config = ScheduleConfig {
            repetitions: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_json() {
        let config: ScheduleConfig =
            serde_json::from_str(r#"{"block_epoch_ms": 1000, "repetitions": 2}"#).unwrap();
        assert_eq!(config.block_epoch_ms, 1000);
        assert_eq!(config.repetitions, 2);
        assert_eq!(config.block_interval_ms, DEFAULT_BLOCK_INTERVAL_MS);
    }

    #[test]
    fn test_round_length() {
        let config = ScheduleConfig {
            block_epoch_ms: 0,
            block_interval_ms: 1_000,
            repetitions: 3,
        };
        assert_eq!(config.round_length_ms(4), 12_000);
    }
}
