//! Driven ports (Outbound dependencies)
//!
//! Every call here runs under the global ordering lock, whose guard cannot
//! cross an `.await`, so these ports are synchronous.

use crate::error::Result;
use shared_types::{Address, Block, Hash, Receipt, Transaction};

/// Key-value block and receipt storage.
///
/// Production: a disk-backed store owned by the node.
/// Testing: [`crate::adapters::InMemoryBlockStore`].
pub trait BlockStore: Send + Sync {
    /// Persist `block`; when `canonical`, also index it as the chain block at its number.
    fn save_block(&self, block: &Block, canonical: bool) -> Result<()>;

    /// Block by hash, on any branch.
    fn get_block_by_hash(&self, hash: &Hash) -> Option<Block>;

    /// Canonical-chain block at `number`.
    fn get_chain_block_by_number(&self, number: u64) -> Option<Block>;

    /// Every stored block at `number`, on any branch.
    fn get_blocks_by_number(&self, number: u64) -> Vec<Block>;

    /// Remove a block from every index.
    fn remove_block(&self, hash: &Hash) -> Result<()>;

    /// Re-point the canonical index at `number` to `hash`.
    fn set_canonical(&self, number: u64, hash: &Hash) -> Result<()>;

    /// Raise the irreversible flag of a stored block.
    fn mark_irreversible(&self, hash: &Hash) -> Result<()>;

    /// Persist the receipts of a block.
    fn save_receipts(&self, block_hash: &Hash, number: u64, receipts: Vec<Receipt>) -> Result<()>;

    /// Receipts of a block, if retained.
    fn get_receipts(&self, block_hash: &Hash) -> Option<Vec<Receipt>>;

    /// Drop receipts of blocks below `number`.
    fn prune_receipts_below(&self, number: u64) -> Result<()>;

    /// Flush buffered writes.
    fn flush(&self) -> Result<()>;
}

/// Output of executing a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// State root after execution
    pub state_root: Hash,
    /// Receipts root
    pub receipts_root: Hash,
    /// Gas consumed by all transactions
    pub gas_used: u64,
    /// Per-transaction receipts
    pub receipts: Vec<Receipt>,
}

/// Transaction execution engine.
pub trait BlockExecutor: Send + Sync {
    /// Execute `block` on top of `parent_state_root`.
    fn execute(&self, block: &Block, parent_state_root: &Hash) -> Result<ExecutionOutcome>;
}

/// Read access to account state.
pub trait StateReader: Send + Sync {
    /// Account nonce at `state_root`.
    fn nonce(&self, state_root: &Hash, address: &Address) -> u64;
}

/// Transaction pool collaborator. Admission policy and ordering belong to the pool.
pub trait TransactionPool: Send + Sync {
    /// Pending transactions, in the pool's priority order.
    fn pending_transactions(&self) -> Vec<Transaction>;

    /// Drop transactions by hash.
    fn remove_transactions(&self, hashes: &[Hash]);

    /// Re-validate the pool against a new best block.
    fn process_best(&self, block: &Block);
}

/// Observer of chain commits.
pub trait ChainListener: Send + Sync {
    /// Called for every connected block.
    fn on_block(&self, _block: &Block, _receipts: &[Receipt]) {}

    /// Called when a block becomes the best block.
    fn on_best_block(&self, _block: &Block) {}
}
