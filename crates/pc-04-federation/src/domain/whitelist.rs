//! # Lock Whitelist
//!
//! Only whitelisted external senders may lock funds until the whitelist is
//! disabled. One-off entries cap a single lock and are consumed by it;
//! unlimited entries never expire. Once the disable height is reached every
//! sender is admitted.

use crate::domain::authorizer::Authorizer;
use crate::domain::codes::{GENERIC_ERROR, INCOMPLETE, NOT_FOUND, SUCCESS};
use crate::domain::federation::ExternalAddress;
use serde::{Deserialize, Serialize};
use shared_types::Address;
use std::collections::BTreeMap;
use tracing::info;

/// A whitelist entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WhitelistEntry {
    /// One lock of at most `max_value`, then removed.
    OneOff {
        /// Largest admitted lock (external units)
        max_value: u64,
    },
    /// Any number of locks of any value.
    Unlimited,
}

impl WhitelistEntry {
    fn admits(&self, amount: u64) -> bool {
        match self {
            WhitelistEntry::OneOff { max_value } => amount <= *max_value,
            WhitelistEntry::Unlimited => true,
        }
    }
}

/// Whitelisted external senders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockWhitelist {
    entries: BTreeMap<ExternalAddress, WhitelistEntry>,
    disable_block_height: Option<u64>,
}

impl LockWhitelist {
    /// Empty, enabled whitelist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry for `address`.
    pub fn get(&self, address: &ExternalAddress) -> Option<WhitelistEntry> {
        self.entries.get(address).copied()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Height from which every sender is admitted.
    pub fn disable_block_height(&self) -> Option<u64> {
        self.disable_block_height
    }

    /// Whether the whitelist no longer applies at `height`.
    pub fn is_disabled_at(&self, height: u64) -> bool {
        self.disable_block_height.is_some_and(|h| height >= h)
    }

    /// Whether `address` may lock `amount` at ledger `height`.
    pub fn is_whitelisted(&self, address: &ExternalAddress, amount: u64, height: u64) -> bool {
        if self.is_disabled_at(height) {
            return true;
        }
        self.entries
            .get(address)
            .is_some_and(|entry| entry.admits(amount))
    }

    /// Record a successful lock by `address`; one-off entries are removed.
    pub fn consume(&mut self, address: &ExternalAddress) {
        if let Some(WhitelistEntry::OneOff { .. }) = self.entries.get(address) {
            self.entries.remove(address);
        }
    }

    /// Add a one-off entry. Codes: 1 ok, -1 exists, -2 zero cap, -10 unauthorized.
    pub fn add_one_off(
        &mut self,
        authorizer: &Authorizer,
        caller: &Address,
        address: ExternalAddress,
        max_value: u64,
    ) -> i32 {
        if !authorizer.is_authorized(caller) {
            return GENERIC_ERROR;
        }
        if max_value == 0 {
            return INCOMPLETE;
        }
        self.insert(address, WhitelistEntry::OneOff { max_value })
    }

    /// Add an unlimited entry. Codes: 1 ok, -1 exists, -10 unauthorized.
    pub fn add_unlimited(
        &mut self,
        authorizer: &Authorizer,
        caller: &Address,
        address: ExternalAddress,
    ) -> i32 {
        if !authorizer.is_authorized(caller) {
            return GENERIC_ERROR;
        }
        self.insert(address, WhitelistEntry::Unlimited)
    }

    fn insert(&mut self, address: ExternalAddress, entry: WhitelistEntry) -> i32 {
        if self.entries.contains_key(&address) {
            return NOT_FOUND;
        }
        info!("[pc-04] Whitelisted {} as {:?}", hex::encode(address), entry);
        self.entries.insert(address, entry);
        SUCCESS
    }

    /// Remove an entry. Codes: 1 ok, -1 not found, -10 unauthorized.
    pub fn remove(
        &mut self,
        authorizer: &Authorizer,
        caller: &Address,
        address: &ExternalAddress,
    ) -> i32 {
        if !authorizer.is_authorized(caller) {
            return GENERIC_ERROR;
        }
        match self.entries.remove(address) {
            Some(_) => SUCCESS,
            None => NOT_FOUND,
        }
    }

    /// Disable the whitelist `delay` blocks after `current_height`.
    ///
    /// Codes: 1 ok, -2 already set or height overflow, -10 unauthorized.
    pub fn set_disable_block_delay(
        &mut self,
        authorizer: &Authorizer,
        caller: &Address,
        delay: u64,
        current_height: u64,
    ) -> i32 {
        if !authorizer.is_authorized(caller) {
            return GENERIC_ERROR;
        }
        if self.disable_block_height.is_some() {
            return INCOMPLETE;
        }
        let Some(height) = current_height.checked_add(delay) else {
            return INCOMPLETE;
        };
        info!("[pc-04] Lock whitelist disabled from height {}", height);
        self.disable_block_height = Some(height);
        SUCCESS
    }
}
