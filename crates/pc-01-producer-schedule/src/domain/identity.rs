//! Producer identities and the ordered producer list

use super::codec::{decode_producer_keys, encode_producer_keys};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use shared_crypto::Secp256k1PublicKey;
use shared_types::Address;

/// A producer: public key plus its derived external-chain and ledger addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProducerIdentity {
    public_key: Secp256k1PublicKey,
    external_address: [u8; 20],
    ledger_address: Address,
}

impl ProducerIdentity {
    /// Derive both addresses from `public_key`.
    pub fn new(public_key: Secp256k1PublicKey) -> Self {
        Self {
            public_key,
            external_address: public_key.external_address(),
            ledger_address: public_key.ledger_address(),
        }
    }

    /// Public key.
    pub fn public_key(&self) -> &Secp256k1PublicKey {
        &self.public_key
    }

    /// External-chain address.
    pub fn external_address(&self) -> [u8; 20] {
        self.external_address
    }

    /// Ledger address (expected block coinbase).
    pub fn ledger_address(&self) -> Address {
        self.ledger_address
    }
}

/// Ordered producers; position is rotation priority.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerList {
    producers: Vec<ProducerIdentity>,
}

impl ProducerList {
    /// Build from public keys in order.
    pub fn from_keys(keys: impl IntoIterator<Item = Secp256k1PublicKey>) -> Self {
        Self {
            producers: keys.into_iter().map(ProducerIdentity::new).collect(),
        }
    }

    /// Decode a producer-list payload.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        Ok(Self::from_keys(decode_producer_keys(payload)?))
    }

    /// Encode as a producer-list payload.
    pub fn encode(&self) -> Vec<u8> {
        let keys: Vec<Secp256k1PublicKey> = self.producers.iter().map(|p| p.public_key).collect();
        encode_producer_keys(&keys)
    }

    /// Number of producers.
    pub fn len(&self) -> usize {
        self.producers.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.producers.is_empty()
    }

    /// Producer at `index`.
    pub fn get(&self, index: usize) -> Option<&ProducerIdentity> {
        self.producers.get(index)
    }

    /// Position of the producer with ledger address `address`.
    pub fn index_of_ledger_address(&self, address: &Address) -> Option<usize> {
        self.producers
            .iter()
            .position(|p| &p.ledger_address == address)
    }

    /// Position of the producer with public key `key`.
    pub fn index_of_key(&self, key: &Secp256k1PublicKey) -> Option<usize> {
        self.producers.iter().position(|p| &p.public_key == key)
    }

    /// Iterate in rotation order.
    pub fn iter(&self) -> impl Iterator<Item = &ProducerIdentity> {
        self.producers.iter()
    }

    /// Ledger addresses with duplicates removed, first occurrence kept.
    pub fn distinct_ledger_addresses(&self) -> Vec<Address> {
        let mut seen = Vec::with_capacity(self.producers.len());
        for producer in &self.producers {
            if !seen.contains(&producer.ledger_address) {
                seen.push(producer.ledger_address);
            }
        }
        seen
    }
}
