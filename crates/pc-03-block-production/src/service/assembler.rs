//! Block assembler
//!
//! Builds, executes, signs and self-validates a candidate block on top of a
//! parent. Callers hold the global ordering lock.

use crate::config::BlockProductionConfig;
use crate::error::{BlockProductionError, Result};
use pc_01_producer_schedule::{fee_distribution_transaction, producer_list_transaction, ProducerList};
use pc_02_chain_acceptance::{
    next_gas_limit, next_minimum_gas_price, BlockExecutor, ChainAcceptanceConfig, RuleChain,
    StateReader, TransactionPool, ValidationContext, INTRINSIC_GAS,
};
use shared_crypto::{Secp256k1KeyPair, Secp256k1PublicKey};
use shared_types::{
    Address, Block, BlockHeader, Hash, TimeSource, Transaction, U256, ZERO_HASH,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Pool transactions split into what goes into the block and what the pool
/// should drop.
struct Selection {
    included: Vec<Transaction>,
    invalid: Vec<Hash>,
}

/// Candidate block builder for the local producer.
pub struct BlockAssembler {
    config: BlockProductionConfig,
    chain_config: ChainAcceptanceConfig,
    keypair: Secp256k1KeyPair,
    pool: Arc<dyn TransactionPool>,
    executor: Arc<dyn BlockExecutor>,
    state: Arc<dyn StateReader>,
    time_source: Arc<dyn TimeSource>,
    rules: RuleChain,
}

impl BlockAssembler {
    /// Create an assembler signing with `keypair`.
    pub fn new(
        config: BlockProductionConfig,
        chain_config: ChainAcceptanceConfig,
        keypair: Secp256k1KeyPair,
        pool: Arc<dyn TransactionPool>,
        executor: Arc<dyn BlockExecutor>,
        state: Arc<dyn StateReader>,
        time_source: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            config,
            chain_config,
            keypair,
            pool,
            executor,
            state,
            time_source,
            rules: RuleChain::standard(),
        }
    }

    /// Public key of the local producer.
    pub fn public_key(&self) -> Secp256k1PublicKey {
        self.keypair.public_key()
    }

    /// Ledger address of the local producer.
    pub fn coinbase(&self) -> Address {
        self.keypair.ledger_address()
    }

    /// Build a signed block extending `parent` and carrying `list`.
    ///
    /// Pool transactions that can never be included (bad signature, spent
    /// nonce, gas limit below intrinsic gas) are removed from the pool.
    /// Returns [`BlockProductionError::CandidateRejected`] if the result does
    /// not pass the validation rule chain.
    pub fn build(&self, parent: &Block, list: &ProducerList, extra_data: &[u8]) -> Result<Block> {
        let parent_header = parent.header();
        let number = parent.number() + 1;

        let minimum_gas_price = next_minimum_gas_price(
            parent_header.minimum_gas_price,
            U256::from(self.config.target_min_gas_price),
        );
        let gas_limit = next_gas_limit(
            parent_header.gas_limit,
            self.config.target_gas_limit,
            self.chain_config.min_gas_limit,
        );

        let list_tx = producer_list_transaction(number, list);
        let fee_tx = fee_distribution_transaction(number);
        let selection = self.select_transactions(
            parent,
            minimum_gas_price,
            gas_limit,
            &[list_tx.hash(), fee_tx.hash()],
        );
        if !selection.invalid.is_empty() {
            debug!(
                "[pc-03] Dropping {} invalid pool transactions",
                selection.invalid.len()
            );
            self.pool.remove_transactions(&selection.invalid);
        }

        let mut transactions = selection.included;
        transactions.push(list_tx);
        transactions.push(fee_tx);

        let now = self.time_source.now_ms();
        let header = BlockHeader {
            parent_hash: parent.hash(),
            coinbase: self.coinbase(),
            state_root: ZERO_HASH,
            tx_root: ZERO_HASH,
            receipts_root: ZERO_HASH,
            number,
            gas_limit,
            gas_used: 0,
            timestamp: now.max(parent.timestamp() + 1),
            extra_data: extra_data.to_vec(),
            minimum_gas_price,
        };
        let mut block = Block::new(header, transactions);

        // The signature covers the post-execution roots.
        let outcome = self.executor.execute(&block, &parent_header.state_root)?;
        block.set_execution_result(outcome.state_root, outcome.receipts_root, outcome.gas_used)?;
        block.sign(&self.keypair)?;

        let ctx = ValidationContext {
            block: &block,
            parent,
            now_ms: now,
            config: &self.chain_config,
            state: self.state.as_ref(),
        };
        if let Err(e) = self.rules.validate(&ctx) {
            warn!("[pc-03] Candidate block #{} rejected: {}", number, e);
            return Err(BlockProductionError::CandidateRejected(e));
        }

        info!(
            "[pc-03] Assembled block #{} with {} transactions",
            number,
            block.transactions().len()
        );
        Ok(block)
    }

    fn select_transactions(
        &self,
        parent: &Block,
        minimum_gas_price: U256,
        gas_limit: u64,
        synthetic: &[Hash],
    ) -> Selection {
        let parent_root = parent.header().state_root;
        let mut nonces: HashMap<Address, u64> = HashMap::new();
        let mut gas_total = 0u64;
        let mut selection = Selection {
            included: Vec::new(),
            invalid: Vec::new(),
        };

        for tx in self.pool.pending_transactions() {
            let hash = tx.hash();
            if !tx.needs_signature() {
                // Synthesized fresh for this height; any other copy is stale.
                if !synthetic.contains(&hash) {
                    selection.invalid.push(hash);
                }
                continue;
            }
            let Ok(sender) = tx.sender() else {
                selection.invalid.push(hash);
                continue;
            };
            if tx.gas_limit() < INTRINSIC_GAS {
                selection.invalid.push(hash);
                continue;
            }
            if tx.gas_price() < minimum_gas_price {
                continue;
            }

            let expected = nonces
                .entry(sender)
                .or_insert_with(|| self.state.nonce(&parent_root, &sender));
            if tx.nonce() < *expected {
                selection.invalid.push(hash);
                continue;
            }
            if tx.nonce() > *expected {
                continue;
            }
            let Some(next_total) = gas_total.checked_add(tx.gas_limit()) else {
                continue;
            };
            if next_total > gas_limit {
                continue;
            }

            *expected += 1;
            gas_total = next_total;
            selection.included.push(tx);
        }
        selection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pc_02_chain_acceptance::adapters::InMemoryTransactionPool;
    use pc_02_chain_acceptance::test_utils::*;
    use pc_02_chain_acceptance::{ImportResult, ValidationError};

    fn assembler(harness: &Harness, producer: usize, pool: Arc<InMemoryTransactionPool>) -> BlockAssembler {
        assembler_with(harness, producer, pool, BlockProductionConfig::default())
    }

    fn assembler_with(
        harness: &Harness,
        producer: usize,
        pool: Arc<InMemoryTransactionPool>,
        config: BlockProductionConfig,
    ) -> BlockAssembler {
        let fixture = &harness.fixture;
        BlockAssembler::new(
            config,
            fixture.config.clone(),
            fixture.keys[producer].clone(),
            pool,
            fixture.ledger.clone(),
            fixture.ledger.clone(),
            harness.clock.clone(),
        )
    }

    #[test]
    fn test_built_block_is_accepted() {
        let harness = Harness::new(Fixture::new(2));
        let pool = Arc::new(InMemoryTransactionPool::new());
        let assembler = assembler(&harness, 0, pool);

        let block = assembler
            .build(&harness.fixture.genesis, &harness.fixture.list, b"test")
            .unwrap();

        assert!(block.is_sealed());
        assert_eq!(block.number(), 1);
        assert_eq!(block.coinbase(), harness.fixture.keys[0].ledger_address());
        assert_eq!(block.header().extra_data, b"test".to_vec());
        assert!(block.producer_list_transaction().is_some());
        assert!(block.has_fee_distribution_last());
        assert_eq!(harness.connect(&block), ImportResult::ImportedBest);
    }

    #[test]
    fn test_transaction_selection() {
        let harness = Harness::new(Fixture::new(1));
        let fixture = &harness.fixture;
        let pool = Arc::new(InMemoryTransactionPool::new());

        fixture.ledger.set_nonce(
            fixture.genesis.header().state_root,
            fixture.users[2].ledger_address(),
            3,
        );
        let t0 = fixture.transfer(0, 0);
        let t1 = fixture.transfer(0, 1);
        let cheap = fixture.transfer_priced(1, 0, 1);
        let future = fixture.transfer(1, 7);
        let stale = fixture.transfer(2, 1);
        for tx in [&t0, &t1, &cheap, &future, &stale] {
            pool.add(tx.clone());
        }

        let block = assembler(&harness, 0, pool.clone())
            .build(&fixture.genesis, &fixture.list, b"")
            .unwrap();

        let hashes: Vec<Hash> = block.transactions().iter().map(Transaction::hash).collect();
        assert_eq!(hashes.len(), 4);
        assert_eq!(hashes[0], t0.hash());
        assert_eq!(hashes[1], t1.hash());
        assert_eq!(block.header().gas_used, 2 * INTRINSIC_GAS);

        // Omitted transactions stay pooled; the spent nonce is dropped.
        let pending: Vec<Hash> = pool.pending_transactions().iter().map(Transaction::hash).collect();
        assert_eq!(pending.len(), 4);
        assert!(!pending.contains(&stale.hash()));
        assert!(pending.contains(&cheap.hash()));
        assert!(pending.contains(&future.hash()));
    }

    #[test]
    fn test_pooled_synthetic_transaction_not_duplicated() {
        let harness = Harness::new(Fixture::new(1));
        let fixture = &harness.fixture;
        let pool = Arc::new(InMemoryTransactionPool::new());
        let current = producer_list_transaction(1, &fixture.list);
        let stale = producer_list_transaction(7, &fixture.list);
        pool.add(current.clone());
        pool.add(stale.clone());

        let block = assembler(&harness, 0, pool.clone())
            .build(&fixture.genesis, &fixture.list, b"")
            .unwrap();

        let lists = block
            .transactions()
            .iter()
            .filter(|tx| tx.is_producer_list())
            .count();
        assert_eq!(lists, 1);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.pending_transactions()[0].hash(), current.hash());
    }

    #[test]
    fn test_timestamp_after_parent_when_clock_lags() {
        let harness = Harness::new(Fixture::new(1));
        let genesis = harness.fixture.genesis.clone();
        harness.clock.set(genesis.timestamp() - 5_000);
        let pool = Arc::new(InMemoryTransactionPool::new());

        let block = assembler(&harness, 0, pool)
            .build(&genesis, &harness.fixture.list, b"")
            .unwrap();
        assert_eq!(block.timestamp(), genesis.timestamp() + 1);
    }

    #[test]
    fn test_minimum_gas_price_steps_toward_target() {
        let harness = Harness::new(Fixture::new(1));
        let pool = Arc::new(InMemoryTransactionPool::new());
        let config = BlockProductionConfig {
            target_min_gas_price: 1_000,
            ..Default::default()
        };

        let block = assembler_with(&harness, 0, pool, config)
            .build(&harness.fixture.genesis, &harness.fixture.list, b"")
            .unwrap();
        assert_eq!(
            block.header().minimum_gas_price,
            U256::from(GENESIS_MIN_GAS_PRICE + 1)
        );
    }

    #[test]
    fn test_wrong_slot_candidate_rejected() {
        let harness = Harness::new(Fixture::new(2));
        let fixture = &harness.fixture;
        let block1 = fixture.block_after(&fixture.genesis, 0, vec![]);
        assert_eq!(harness.connect(&block1), ImportResult::ImportedBest);

        harness.clock.set(fixture.slot_time(0, 1));
        let pool = Arc::new(InMemoryTransactionPool::new());
        let result = assembler(&harness, 0, pool).build(&block1, &fixture.list, b"");

        assert!(matches!(
            result,
            Err(BlockProductionError::CandidateRejected(
                ValidationError::WrongSlot { .. }
            ))
        ));
    }
}
