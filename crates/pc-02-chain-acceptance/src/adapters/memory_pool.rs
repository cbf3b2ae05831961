use crate::ports::TransactionPool;
use parking_lot::RwLock;
use shared_types::{Block, Hash, Transaction};
use std::collections::HashSet;

/// In-memory transaction pool. Keeps insertion order as priority order.
#[derive(Default)]
pub struct InMemoryTransactionPool {
    pending: RwLock<Vec<Transaction>>,
    best_seen: RwLock<Vec<Hash>>,
}

impl InMemoryTransactionPool {
    /// Create an empty instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a transaction.
    pub fn add(&self, tx: Transaction) {
        self.pending.write().push(tx);
    }

    /// Number of pending transactions.
    pub fn len(&self) -> usize {
        self.pending.read().len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.read().is_empty()
    }

    /// Hashes of the best blocks processed so far, in order.
    pub fn processed_best_blocks(&self) -> Vec<Hash> {
        self.best_seen.read().clone()
    }
}

impl TransactionPool for InMemoryTransactionPool {
    fn pending_transactions(&self) -> Vec<Transaction> {
        self.pending.read().clone()
    }

    fn remove_transactions(&self, hashes: &[Hash]) {
        let removed: HashSet<&Hash> = hashes.iter().collect();
        self.pending.write().retain(|tx| !removed.contains(&tx.hash()));
    }

    fn process_best(&self, block: &Block) {
        let included: Vec<Hash> = block.transactions().iter().map(Transaction::hash).collect();
        self.remove_transactions(&included);
        self.best_seen.write().push(block.hash());
    }
}
