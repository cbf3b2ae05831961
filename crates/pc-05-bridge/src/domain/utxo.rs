//! Federation wallet UTXO buckets.

use crate::domain::external_tx::OutPoint;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An unspent output owned by a federation wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    /// Output reference
    pub outpoint: OutPoint,
    /// Amount (external units)
    pub value: u64,
    /// External block height it was confirmed at
    pub height: u64,
    /// Whether the creating transaction is a coinbase
    pub is_coinbase: bool,
    /// Locking script
    pub script_pubkey: Vec<u8>,
}

/// UTXOs keyed by outpoint. An outpoint is present at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoBucket {
    entries: BTreeMap<OutPoint, Utxo>,
}

impl UtxoBucket {
    /// Empty bucket.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `utxo`. Returns false if its outpoint is already present.
    pub fn insert(&mut self, utxo: Utxo) -> bool {
        if self.entries.contains_key(&utxo.outpoint) {
            return false;
        }
        self.entries.insert(utxo.outpoint, utxo);
        true
    }

    /// Remove and return the entry for `outpoint`.
    pub fn remove(&mut self, outpoint: &OutPoint) -> Option<Utxo> {
        self.entries.remove(outpoint)
    }

    /// Whether `outpoint` is present.
    pub fn contains(&self, outpoint: &OutPoint) -> bool {
        self.entries.contains_key(outpoint)
    }

    /// Sum of values, saturating.
    pub fn balance(&self) -> u64 {
        self.entries
            .values()
            .fold(0u64, |acc, u| acc.saturating_add(u.value))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bucket is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in outpoint order.
    pub fn iter(&self) -> impl Iterator<Item = &Utxo> {
        self.entries.values()
    }

    /// Copy of all entries.
    pub fn to_vec(&self) -> Vec<Utxo> {
        self.entries.values().cloned().collect()
    }

    /// Remove and return all entries.
    pub fn take_all(&mut self) -> Vec<Utxo> {
        std::mem::take(&mut self.entries).into_values().collect()
    }
}
