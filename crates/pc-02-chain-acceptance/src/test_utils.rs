//! Test fixtures for chain acceptance.
//!
//! Also used by block production and the integration tests through the
//! `test-utils` feature.

use crate::adapters::{InMemoryBlockStore, InMemoryLedger};
use crate::config::ChainAcceptanceConfig;
use crate::domain::{ImportResult, RuleChain, ValidationContext};
use crate::error::ValidationError;
use crate::ports::BlockExecutor;
use crate::service::{ChainAcceptance, ChainDependencies};
use pc_01_producer_schedule::{
    fee_distribution_transaction, producer_list_transaction, ProducerList, ScheduleConfig,
};
use shared_crypto::{keccak256, Secp256k1KeyPair};
use shared_types::{
    Address, Block, BlockHeader, GlobalOrdering, ManualTimeSource, RecordingAlarmReporter,
    Transaction, UnsignedTransaction, U256, ZERO_ADDRESS, ZERO_HASH,
};
use std::sync::Arc;

/// Schedule epoch used by fixtures (ms).
pub const EPOCH_MS: u64 = 1_000_000;

/// Slot length used by fixtures (ms).
pub const INTERVAL_MS: u64 = 1_000;

/// Genesis gas limit.
pub const GENESIS_GAS_LIMIT: u64 = 6_800_000;

/// Genesis minimum gas price.
pub const GENESIS_MIN_GAS_PRICE: u64 = 10;

/// Destination of fixture transfers.
pub const TRANSFER_TARGET: Address = [0x22; 20];

/// Deterministic producer keys.
pub fn producer_key(index: usize) -> Secp256k1KeyPair {
    Secp256k1KeyPair::from_bytes([0x11 + index as u8; 32]).expect("valid fixture key")
}

/// Deterministic user keys.
pub fn user_key(index: usize) -> Secp256k1KeyPair {
    Secp256k1KeyPair::from_bytes([0x51 + index as u8; 32]).expect("valid fixture key")
}

/// Genesis block used by fixtures.
pub fn genesis_block() -> Block {
    Block::genesis(BlockHeader {
        parent_hash: ZERO_HASH,
        coinbase: ZERO_ADDRESS,
        state_root: keccak256(b"peg-chain fixture genesis"),
        tx_root: ZERO_HASH,
        receipts_root: ZERO_HASH,
        number: 0,
        gas_limit: GENESIS_GAS_LIMIT,
        gas_used: 0,
        timestamp: EPOCH_MS - INTERVAL_MS,
        extra_data: Vec::new(),
        minimum_gas_price: U256::from(GENESIS_MIN_GAS_PRICE),
    })
}

/// Producers, users, schedule and a ledger, with helpers to build valid blocks.
pub struct Fixture {
    /// Producer keys, in list order
    pub keys: Vec<Secp256k1KeyPair>,
    /// User keys
    pub users: Vec<Secp256k1KeyPair>,
    /// Producer list carried by every block
    pub list: ProducerList,
    /// Acceptance configuration
    pub config: ChainAcceptanceConfig,
    /// Shared execution engine
    pub ledger: Arc<InMemoryLedger>,
    /// Genesis block
    pub genesis: Block,
}

impl Fixture {
    /// `producers` producers, one repetition per round.
    pub fn new(producers: usize) -> Self {
        Self::with_repetitions(producers, 1)
    }

    /// `producers` producers owning `repetitions` consecutive slots each.
    pub fn with_repetitions(producers: usize, repetitions: u64) -> Self {
        let keys: Vec<Secp256k1KeyPair> = (0..producers).map(producer_key).collect();
        let list = ProducerList::from_keys(keys.iter().map(Secp256k1KeyPair::public_key));
        let config = ChainAcceptanceConfig {
            schedule: ScheduleConfig {
                block_epoch_ms: EPOCH_MS,
                block_interval_ms: INTERVAL_MS,
                repetitions,
            },
            ..ChainAcceptanceConfig::default()
        };
        Self {
            keys,
            users: (0..3).map(user_key).collect(),
            list,
            config,
            ledger: Arc::new(InMemoryLedger::new()),
            genesis: genesis_block(),
        }
    }

    /// Start of `index`'s first slot in `round`.
    pub fn slot_time(&self, round: u64, index: usize) -> u64 {
        let reps = self.config.schedule.repetitions;
        let list = self.list.len() as u64;
        EPOCH_MS + (round * list * reps + index as u64 * reps) * INTERVAL_MS
    }

    /// First slot of `producer` strictly after `after_ms`.
    pub fn next_slot(&self, producer: usize, after_ms: u64) -> u64 {
        let mut round = 0;
        loop {
            let slot = self.slot_time(round, producer);
            if slot > after_ms {
                return slot;
            }
            round += 1;
        }
    }

    /// Transfer from user `user` at the genesis minimum gas price.
    pub fn transfer(&self, user: usize, nonce: u64) -> Transaction {
        self.transfer_priced(user, nonce, GENESIS_MIN_GAS_PRICE)
    }

    /// Transfer from user `user` at `gas_price`.
    pub fn transfer_priced(&self, user: usize, nonce: u64, gas_price: u64) -> Transaction {
        let tx = UnsignedTransaction {
            nonce,
            gas_price: U256::from(gas_price),
            gas_limit: 21_000,
            to: Some(TRANSFER_TARGET),
            value: U256::from(1u64),
            data: Vec::new(),
        }
        .sign(&self.users[user])
        .expect("fixture signing");
        Transaction::Regular(tx)
    }

    /// Unexecuted, unsigned block by `producer` at `timestamp` with the
    /// synthetic transactions appended.
    pub fn unsigned_block(&self, parent: &Block, producer: usize, timestamp: u64) -> Block {
        self.unsigned_block_with(parent, producer, timestamp, Vec::new())
    }

    fn unsigned_block_with(
        &self,
        parent: &Block,
        producer: usize,
        timestamp: u64,
        mut transactions: Vec<Transaction>,
    ) -> Block {
        let number = parent.number() + 1;
        transactions.push(producer_list_transaction(number, &self.list));
        transactions.push(fee_distribution_transaction(number));
        let header = BlockHeader {
            parent_hash: parent.hash(),
            coinbase: self.keys[producer].ledger_address(),
            state_root: ZERO_HASH,
            tx_root: ZERO_HASH,
            receipts_root: ZERO_HASH,
            number,
            gas_limit: parent.header().gas_limit,
            gas_used: 0,
            timestamp,
            extra_data: Vec::new(),
            minimum_gas_price: parent.header().minimum_gas_price,
        };
        Block::new(header, transactions)
    }

    /// Fill in the execution result of `block` on top of `parent`.
    pub fn execute_into(&self, block: &mut Block, parent: &Block) {
        let outcome = self
            .ledger
            .execute(block, &parent.header().state_root)
            .expect("fixture execution");
        block
            .set_execution_result(outcome.state_root, outcome.receipts_root, outcome.gas_used)
            .expect("unsealed fixture block");
    }

    /// Sign `block` as `producer`.
    pub fn finish(&self, mut block: Block, producer: usize) -> Block {
        block.sign(&self.keys[producer]).expect("fixture block signing");
        block
    }

    /// Valid block by `producer` at `timestamp`.
    pub fn block_with(
        &self,
        parent: &Block,
        producer: usize,
        timestamp: u64,
        transactions: Vec<Transaction>,
    ) -> Block {
        let mut block = self.unsigned_block_with(parent, producer, timestamp, transactions);
        self.execute_into(&mut block, parent);
        self.finish(block, producer)
    }

    /// Valid block by `producer` in its next slot after `parent`.
    pub fn block_after(
        &self,
        parent: &Block,
        producer: usize,
        transactions: Vec<Transaction>,
    ) -> Block {
        let timestamp = self.next_slot(producer, parent.timestamp());
        self.block_with(parent, producer, timestamp, transactions)
    }

    /// Run the standard rule chain with local time at the block timestamp.
    pub fn validate(&self, block: &Block, parent: &Block) -> Result<(), ValidationError> {
        RuleChain::standard().validate(&ValidationContext {
            block,
            parent,
            now_ms: block.timestamp(),
            config: &self.config,
            state: self.ledger.as_ref(),
        })
    }
}

/// A [`ChainAcceptance`] over in-memory collaborators.
pub struct Harness {
    /// Fixture the chain was built from
    pub fixture: Fixture,
    /// Chain under test
    pub chain: Arc<ChainAcceptance>,
    /// Backing store
    pub store: Arc<InMemoryBlockStore>,
    /// Local clock
    pub clock: Arc<ManualTimeSource>,
    /// Raised alarms
    pub alarms: Arc<RecordingAlarmReporter>,
}

impl Harness {
    /// Build a chain from `fixture` with the clock at the schedule epoch.
    pub fn new(fixture: Fixture) -> Self {
        let store = Arc::new(InMemoryBlockStore::new());
        let clock = Arc::new(ManualTimeSource::new(EPOCH_MS));
        let alarms = Arc::new(RecordingAlarmReporter::new());
        let chain = ChainAcceptance::new(
            fixture.config.clone(),
            fixture.genesis.clone(),
            ChainDependencies {
                store: store.clone(),
                executor: fixture.ledger.clone(),
                state: fixture.ledger.clone(),
                time_source: clock.clone(),
                alarms: alarms.clone(),
            },
            GlobalOrdering::new(),
        )
        .expect("fixture chain");
        Self {
            fixture,
            chain: Arc::new(chain),
            store,
            clock,
            alarms,
        }
    }

    /// Connect `block`, panicking on infrastructure errors.
    pub fn connect(&self, block: &Block) -> ImportResult {
        self.chain
            .try_connect(block.clone())
            .expect("in-memory collaborators do not fail")
    }
}
