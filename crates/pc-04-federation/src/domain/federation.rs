//! # Federation Snapshots
//!
//! A federation is a sorted set of secp256k1 keys guarding an m-of-n
//! multisig wallet on the external chain. Its external address is the
//! script hash of the standard multisig redeem script.

use crate::error::{FederationError, Result};
use serde::{Deserialize, Serialize};
use shared_crypto::{keccak256_many, short_hash, Secp256k1PublicKey};

/// External-chain address (20-byte key or script hash).
pub type ExternalAddress = [u8; 20];

/// Largest federation a single multisig redeem script supports.
pub const MAX_FEDERATION_SIZE: usize = 15;

/// `OP_0`, the placeholder pushed for each missing signature.
pub const OP_0: u8 = 0x00;

/// `OP_1`; small integers `n` encode as `OP_1 + n - 1`.
pub const OP_1: u8 = 0x51;

/// `OP_CHECKMULTISIG`.
pub const OP_CHECKMULTISIG: u8 = 0xae;

/// Majority quorum for `n` members.
pub fn majority(n: usize) -> usize {
    n / 2 + 1
}

/// Standard `OP_m <keys> OP_n OP_CHECKMULTISIG` redeem script.
pub fn multisig_redeem_script(keys: &[Secp256k1PublicKey], threshold: usize) -> Vec<u8> {
    let mut script = Vec::with_capacity(3 + keys.len() * 34);
    script.push(small_int(threshold));
    for key in keys {
        script.push(33);
        script.extend_from_slice(key.as_bytes());
    }
    script.push(small_int(keys.len()));
    script.push(OP_CHECKMULTISIG);
    script
}

fn small_int(n: usize) -> u8 {
    // Callers keep n within 1..=MAX_FEDERATION_SIZE.
    OP_1 + (n as u8).saturating_sub(1)
}

/// An immutable, committed federation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Federation {
    public_keys: Vec<Secp256k1PublicKey>,
    threshold: usize,
    creation_time_ms: u64,
    creation_block_number: u64,
}

impl Federation {
    /// Build a federation with a majority threshold.
    ///
    /// Keys are sorted and deduplicated so two federations with the same
    /// members always share an address.
    pub fn new(
        mut public_keys: Vec<Secp256k1PublicKey>,
        creation_time_ms: u64,
        creation_block_number: u64,
    ) -> Result<Self> {
        public_keys.sort();
        public_keys.dedup();
        if public_keys.is_empty() {
            return Err(FederationError::EmptyFederation);
        }
        if public_keys.len() > MAX_FEDERATION_SIZE {
            return Err(FederationError::TooManyKeys(public_keys.len()));
        }
        let threshold = majority(public_keys.len());
        Ok(Self {
            public_keys,
            threshold,
            creation_time_ms,
            creation_block_number,
        })
    }

    /// Members, sorted.
    pub fn public_keys(&self) -> &[Secp256k1PublicKey] {
        &self.public_keys
    }

    /// Member at `index`.
    pub fn public_key(&self, index: usize) -> Option<&Secp256k1PublicKey> {
        self.public_keys.get(index)
    }

    /// Number of members.
    pub fn size(&self) -> usize {
        self.public_keys.len()
    }

    /// Signatures required to spend.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Commit time (ms).
    pub fn creation_time_ms(&self) -> u64 {
        self.creation_time_ms
    }

    /// Ledger height of the commit.
    pub fn creation_block_number(&self) -> u64 {
        self.creation_block_number
    }

    /// Whether `key` is a member.
    pub fn has_member(&self, key: &Secp256k1PublicKey) -> bool {
        self.public_keys.binary_search(key).is_ok()
    }

    /// Multisig redeem script guarding the wallet.
    pub fn redeem_script(&self) -> Vec<u8> {
        multisig_redeem_script(&self.public_keys, self.threshold)
    }

    /// External-chain address (script hash of the redeem script).
    pub fn address(&self) -> ExternalAddress {
        short_hash(&self.redeem_script())
    }
}

/// A federation under construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingFederation {
    public_keys: Vec<Secp256k1PublicKey>,
}

impl PendingFederation {
    /// Empty pending federation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys added so far, in insertion order.
    pub fn public_keys(&self) -> &[Secp256k1PublicKey] {
        &self.public_keys
    }

    /// Number of keys added so far.
    pub fn size(&self) -> usize {
        self.public_keys.len()
    }

    /// Whether `key` was already added.
    pub fn contains(&self, key: &Secp256k1PublicKey) -> bool {
        self.public_keys.contains(key)
    }

    /// Add `key`. Returns false if it is already present.
    pub fn add_key(&mut self, key: Secp256k1PublicKey) -> bool {
        if self.contains(&key) {
            return false;
        }
        self.public_keys.push(key);
        true
    }

    /// Ready to commit once `min_keys` keys are present.
    pub fn is_complete(&self, min_keys: usize) -> bool {
        self.public_keys.len() >= min_keys
    }

    /// Keccak-256 over the keys in insertion order.
    ///
    /// Voters commit to this hash so a commit cannot land on a pending
    /// federation that changed after they looked at it.
    pub fn hash(&self) -> [u8; 32] {
        let parts: Vec<&[u8]> = self.public_keys.iter().map(|k| k.as_bytes().as_slice()).collect();
        keccak256_many(&parts)
    }

    /// Turn into a committed federation.
    pub fn build(&self, creation_time_ms: u64, creation_block_number: u64) -> Result<Federation> {
        Federation::new(self.public_keys.clone(), creation_time_ms, creation_block_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_crypto::Secp256k1KeyPair;

    fn key(seed: u8) -> Secp256k1PublicKey {
        Secp256k1KeyPair::from_bytes([seed; 32]).unwrap().public_key()
    }

    #[test]
    fn test_keys_sorted_and_majority_threshold() {
        let federation = Federation::new(vec![key(3), key(1), key(2), key(1)], 10, 5).unwrap();
        assert_eq!(federation.size(), 3);
        assert_eq!(federation.threshold(), 2);
        let mut sorted = federation.public_keys().to_vec();
        sorted.sort();
        assert_eq!(federation.public_keys(), sorted.as_slice());
        assert!(federation.has_member(&key(2)));
        assert!(!federation.has_member(&key(4)));
    }

    #[test]
    fn test_address_independent_of_key_order() {
        let a = Federation::new(vec![key(1), key(2), key(3)], 0, 0).unwrap();
        let b = Federation::new(vec![key(3), key(1), key(2)], 99, 7).unwrap();
        assert_eq!(a.address(), b.address());
        let c = Federation::new(vec![key(1), key(2)], 0, 0).unwrap();
        assert_ne!(a.address(), c.address());
    }

    #[test]
    fn test_redeem_script_layout() {
        let federation = Federation::new(vec![key(1), key(2), key(3)], 0, 0).unwrap();
        let script = federation.redeem_script();
        assert_eq!(script.len(), 3 + 3 * 34);
        assert_eq!(script[0], OP_1 + 1);
        assert_eq!(script[script.len() - 2], OP_1 + 2);
        assert_eq!(script[script.len() - 1], OP_CHECKMULTISIG);
    }

    #[test]
    fn test_empty_and_oversized_federations_rejected() {
        assert_eq!(
            Federation::new(vec![], 0, 0),
            Err(FederationError::EmptyFederation)
        );
        let keys: Vec<_> = (1..=16).map(key).collect();
        assert_eq!(
            Federation::new(keys, 0, 0),
            Err(FederationError::TooManyKeys(16))
        );
    }

    #[test]
    fn test_pending_hash_tracks_keys() {
        let mut pending = PendingFederation::new();
        let empty = pending.hash();
        assert!(pending.add_key(key(1)));
        assert!(!pending.add_key(key(1)));
        let one = pending.hash();
        assert_ne!(empty, one);
        assert!(pending.add_key(key(2)));
        assert_ne!(one, pending.hash());
        assert!(pending.is_complete(2));
        assert!(!pending.is_complete(3));
    }
}
