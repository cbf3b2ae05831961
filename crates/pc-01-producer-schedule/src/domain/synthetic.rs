//! Synthetic system transactions
//!
//! Both transactions carry `nonce = block_number - 1`, zero value, gas price
//! and gas limit, and no signature. Their bit-exact encoding lives in
//! `shared_types::transaction`.

use super::identity::ProducerList;
use crate::error::{Result, ScheduleError};
use shared_types::{Block, FeeDistributionTransaction, ProducerListTransaction, Transaction};
use tracing::debug;

/// Producer-list transaction for block `block_number`.
pub fn producer_list_transaction(block_number: u64, list: &ProducerList) -> Transaction {
    Transaction::ProducerList(ProducerListTransaction {
        block_number,
        payload: list.encode(),
    })
}

/// Fee-distribution transaction for block `block_number`.
pub fn fee_distribution_transaction(block_number: u64) -> Transaction {
    Transaction::FeeDistribution(FeeDistributionTransaction { block_number })
}

/// Decode the producer list carried by `block`.
pub fn block_producer_list(block: &Block) -> Result<ProducerList> {
    let tx = block
        .producer_list_transaction()
        .ok_or(ScheduleError::MissingProducerList(block.number()))?;
    ProducerList::decode(&tx.payload).map_err(|e| {
        debug!(
            "[pc-01] Block #{} carries an undecodable producer list: {}",
            block.number(),
            e
        );
        e
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_crypto::Secp256k1KeyPair;
    use shared_types::{BlockHeader, ZERO_HASH, U256};

    fn header(number: u64) -> BlockHeader {
        BlockHeader {
            parent_hash: ZERO_HASH,
            coinbase: [0; 20],
            state_root: ZERO_HASH,
            tx_root: ZERO_HASH,
            receipts_root: ZERO_HASH,
            number,
            gas_limit: 0,
            gas_used: 0,
            timestamp: 0,
            extra_data: vec![],
            minimum_gas_price: U256::zero(),
        }
    }

    #[test]
    fn test_synthetic_nonce_is_previous_height() {
        let list = ProducerList::from_keys([Secp256k1KeyPair::from_bytes([1; 32])
            .unwrap()
            .public_key()]);
        let tx = producer_list_transaction(12, &list);
        assert_eq!(tx.nonce(), 11);
        assert_eq!(fee_distribution_transaction(12).nonce(), 11);
        assert!(tx.gas_price().is_zero());
    }

    #[test]
    fn test_block_producer_list_roundtrip() {
        let list = ProducerList::from_keys([
            Secp256k1KeyPair::from_bytes([1; 32]).unwrap().public_key(),
            Secp256k1KeyPair::from_bytes([2; 32]).unwrap().public_key(),
        ]);
        let block = Block::new(
            header(4),
            vec![
                producer_list_transaction(4, &list),
                fee_distribution_transaction(4),
            ],
        );
        assert_eq!(block_producer_list(&block).unwrap(), list);
    }

    #[test]
    fn test_missing_list() {
        let block = Block::new(header(4), vec![fee_distribution_transaction(4)]);
        assert_eq!(
            block_producer_list(&block),
            Err(ScheduleError::MissingProducerList(4))
        );
    }
}
