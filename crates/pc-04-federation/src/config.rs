//! Configuration types for the federation registry

use crate::domain::{Authorizer, MAX_FEDERATION_SIZE};
use crate::error::{FederationError, Result};
use serde::Deserialize;

/// Runtime configuration for the federation registry
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct FederationConfig {
    /// Keys a pending federation needs before it can be committed
    pub min_pending_keys: usize,

    /// Blocks after a commit before the new federation counts as activated
    pub activation_age: u64,

    /// Blocks after activation when funds migration starts
    pub funds_migration_age_begin: u64,

    /// Blocks after activation when the retiring federation is dropped
    pub funds_migration_age_end: u64,

    /// Ledger addresses voting on federation changes (majority)
    pub federation_change_voters: Vec<String>,

    /// Ledger addresses administering the lock whitelist (any one)
    pub lock_whitelist_admins: Vec<String>,

    /// Ledger addresses voting on the fee per kb (majority)
    pub fee_per_kb_voters: Vec<String>,
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            min_pending_keys: 2,
            activation_age: 60,
            funds_migration_age_begin: 15,
            funds_migration_age_end: 150,
            federation_change_voters: Vec::new(),
            lock_whitelist_admins: Vec::new(),
            fee_per_kb_voters: Vec::new(),
        }
    }
}

/// Parsed voter sets.
#[derive(Clone, Debug)]
pub struct Authorizers {
    /// Federation change voters
    pub federation_change: Authorizer,
    /// Lock whitelist administrators
    pub lock_whitelist: Authorizer,
    /// Fee-per-kb voters
    pub fee_per_kb: Authorizer,
}

impl FederationConfig {
    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.min_pending_keys == 0 || self.min_pending_keys > MAX_FEDERATION_SIZE {
            return Err(FederationError::InvalidConfig(format!(
                "min_pending_keys must be in 1..={}",
                MAX_FEDERATION_SIZE
            )));
        }
        if self.funds_migration_age_begin >= self.funds_migration_age_end {
            return Err(FederationError::InvalidConfig(
                "funds_migration_age_begin must be below funds_migration_age_end".into(),
            ));
        }
        self.authorizers().map(|_| ())
    }

    /// Parse the voter address lists.
    pub fn authorizers(&self) -> Result<Authorizers> {
        Ok(Authorizers {
            federation_change: Authorizer::majority_from_hex(&self.federation_change_voters)?,
            lock_whitelist: Authorizer::single_from_hex(&self.lock_whitelist_admins)?,
            fee_per_kb: Authorizer::majority_from_hex(&self.fee_per_kb_voters)?,
        })
    }
}
