//! Configuration types for the bridge

use crate::error::{BridgeError, Result};
use serde::Deserialize;

/// Which peg-in registration path is authoritative.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationMode {
    /// Any active federator registers a proven transaction directly
    #[default]
    Direct,
    /// A majority of active federators must vote for the same payload
    Vote,
}

/// Runtime configuration for the bridge
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// External blocks on top of (and including) a lock before it is credited
    pub min_external_confirmations: u64,

    /// Ledger blocks a release transaction waits before it is sent for signing
    pub ledger_confirmations_for_release: u64,

    /// Release requests must exceed this value (external units)
    pub minimum_release_value: u64,

    /// Smallest output the external chain relays (external units)
    pub dust_threshold: u64,

    /// Release requests attempted per maintenance call
    pub max_release_iterations: usize,

    /// Fee per kb before any vote (external units)
    pub initial_fee_per_kb: u64,

    /// Largest fee per kb a vote may set
    pub max_fee_per_kb: u64,

    /// Canonical peg-in registration path
    pub registration_mode: RegistrationMode,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            min_external_confirmations: 6,
            ledger_confirmations_for_release: 10,
            minimum_release_value: 100_000,
            dust_threshold: 5_460,
            max_release_iterations: 10,
            initial_fee_per_kb: 10_000,
            max_fee_per_kb: 5_000_000,
            registration_mode: RegistrationMode::Direct,
        }
    }
}

impl BridgeConfig {
    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.min_external_confirmations == 0 {
            return Err(BridgeError::InvalidConfig(
                "min_external_confirmations must be positive".into(),
            ));
        }
        if self.max_release_iterations == 0 {
            return Err(BridgeError::InvalidConfig(
                "max_release_iterations must be positive".into(),
            ));
        }
        if self.minimum_release_value < self.dust_threshold {
            return Err(BridgeError::InvalidConfig(
                "minimum_release_value must not be below dust_threshold".into(),
            ));
        }
        if self.initial_fee_per_kb == 0 || self.initial_fee_per_kb > self.max_fee_per_kb {
            return Err(BridgeError::InvalidConfig(format!(
                "initial_fee_per_kb must be in 1..={}",
                self.max_fee_per_kb
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(BridgeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_json_registration_mode() {
        let config: BridgeConfig =
            serde_json::from_str(r#"{"registration_mode": "vote", "dust_threshold": 1000}"#)
                .unwrap();
        assert_eq!(config.registration_mode, RegistrationMode::Vote);
        assert_eq!(config.dust_threshold, 1_000);
        assert_eq!(config.min_external_confirmations, 6);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = BridgeConfig {
            initial_fee_per_kb: 10,
            max_fee_per_kb: 5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let config = BridgeConfig {
            minimum_release_value: 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
