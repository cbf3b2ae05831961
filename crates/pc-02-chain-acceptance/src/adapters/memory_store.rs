use crate::error::{ChainError, Result};
use crate::ports::BlockStore;
use parking_lot::RwLock;
use shared_types::{Block, Hash, Receipt};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
struct StoreInner {
    blocks: HashMap<Hash, Block>,
    by_number: BTreeMap<u64, Vec<Hash>>,
    canonical: BTreeMap<u64, Hash>,
    receipts: HashMap<Hash, (u64, Vec<Receipt>)>,
}

/// In-memory block store for tests and ephemeral nodes.
///
/// Flushing is a no-op apart from counting calls.
#[derive(Default)]
pub struct InMemoryBlockStore {
    inner: RwLock<StoreInner>,
    flushes: AtomicU64,
}

impl InMemoryBlockStore {
    /// Create an empty instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `flush` calls so far.
    pub fn flush_count(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    /// Hash indexed as canonical at `number`.
    pub fn canonical_hash(&self, number: u64) -> Option<Hash> {
        self.inner.read().canonical.get(&number).copied()
    }

    /// Total stored blocks across all branches.
    pub fn block_count(&self) -> usize {
        self.inner.read().blocks.len()
    }
}

impl BlockStore for InMemoryBlockStore {
    fn save_block(&self, block: &Block, canonical: bool) -> Result<()> {
        let hash = block.hash();
        let number = block.number();
        let mut inner = self.inner.write();
        if inner.blocks.insert(hash, block.clone()).is_none() {
            inner.by_number.entry(number).or_default().push(hash);
        }
        if canonical {
            inner.canonical.insert(number, hash);
        }
        Ok(())
    }

    fn get_block_by_hash(&self, hash: &Hash) -> Option<Block> {
        self.inner.read().blocks.get(hash).cloned()
    }

    fn get_chain_block_by_number(&self, number: u64) -> Option<Block> {
        let inner = self.inner.read();
        inner
            .canonical
            .get(&number)
            .and_then(|hash| inner.blocks.get(hash))
            .cloned()
    }

    fn get_blocks_by_number(&self, number: u64) -> Vec<Block> {
        let inner = self.inner.read();
        inner
            .by_number
            .get(&number)
            .map(|hashes| {
                hashes
                    .iter()
                    .filter_map(|hash| inner.blocks.get(hash).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn remove_block(&self, hash: &Hash) -> Result<()> {
        let mut inner = self.inner.write();
        let Some(block) = inner.blocks.remove(hash) else {
            return Ok(());
        };
        let number = block.number();
        if let Some(hashes) = inner.by_number.get_mut(&number) {
            hashes.retain(|h| h != hash);
        }
        if inner.canonical.get(&number) == Some(hash) {
            inner.canonical.remove(&number);
        }
        inner.receipts.remove(hash);
        Ok(())
    }

    fn set_canonical(&self, number: u64, hash: &Hash) -> Result<()> {
        let mut inner = self.inner.write();
        if !inner.blocks.contains_key(hash) {
            return Err(ChainError::Storage(format!(
                "cannot index unknown block {} as canonical",
                hex::encode(hash)
            )));
        }
        inner.canonical.insert(number, *hash);
        Ok(())
    }

    fn mark_irreversible(&self, hash: &Hash) -> Result<()> {
        let mut inner = self.inner.write();
        let block = inner
            .blocks
            .get_mut(hash)
            .ok_or_else(|| ChainError::Storage(format!("unknown block {}", hex::encode(hash))))?;
        block.mark_irreversible();
        Ok(())
    }

    fn save_receipts(&self, block_hash: &Hash, number: u64, receipts: Vec<Receipt>) -> Result<()> {
        self.inner
            .write()
            .receipts
            .insert(*block_hash, (number, receipts));
        Ok(())
    }

    fn get_receipts(&self, block_hash: &Hash) -> Option<Vec<Receipt>> {
        self.inner
            .read()
            .receipts
            .get(block_hash)
            .map(|(_, receipts)| receipts.clone())
    }

    fn prune_receipts_below(&self, number: u64) -> Result<()> {
        self.inner
            .write()
            .receipts
            .retain(|_, (block_number, _)| *block_number >= number);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{BlockHeader, ZERO_HASH, U256};

    fn block(number: u64, parent_hash: Hash, timestamp: u64) -> Block {
        Block::new(
            BlockHeader {
                parent_hash,
                coinbase: [0; 20],
                state_root: ZERO_HASH,
                tx_root: ZERO_HASH,
                receipts_root: ZERO_HASH,
                number,
                gas_limit: 0,
                gas_used: 0,
                timestamp,
                extra_data: vec![],
                minimum_gas_price: U256::zero(),
            },
            vec![],
        )
    }

    #[test]
    fn test_canonical_and_side_blocks() {
        let store = InMemoryBlockStore::new();
        let a = block(1, ZERO_HASH, 1);
        let b = block(1, ZERO_HASH, 2);
        store.save_block(&a, true).unwrap();
        store.save_block(&b, false).unwrap();

        assert_eq!(store.get_chain_block_by_number(1).unwrap().hash(), a.hash());
        assert_eq!(store.get_blocks_by_number(1).len(), 2);

        store.set_canonical(1, &b.hash()).unwrap();
        assert_eq!(store.canonical_hash(1), Some(b.hash()));
    }

    #[test]
    fn test_remove_block_clears_indexes() {
        let store = InMemoryBlockStore::new();
        let a = block(1, ZERO_HASH, 1);
        store.save_block(&a, true).unwrap();
        store.remove_block(&a.hash()).unwrap();

        assert!(store.get_block_by_hash(&a.hash()).is_none());
        assert!(store.get_chain_block_by_number(1).is_none());
        assert!(store.get_blocks_by_number(1).is_empty());
    }

    #[test]
    fn test_receipts_pruned_by_height() {
        let store = InMemoryBlockStore::new();
        store.save_receipts(&[1; 32], 1, vec![]).unwrap();
        store.save_receipts(&[5; 32], 5, vec![]).unwrap();
        store.prune_receipts_below(3).unwrap();

        assert!(store.get_receipts(&[1; 32]).is_none());
        assert!(store.get_receipts(&[5; 32]).is_some());
    }

    #[test]
    fn test_mark_irreversible_persists() {
        let store = InMemoryBlockStore::new();
        let a = block(1, ZERO_HASH, 1);
        store.save_block(&a, true).unwrap();
        store.mark_irreversible(&a.hash()).unwrap();
        assert!(store.get_block_by_hash(&a.hash()).unwrap().is_irreversible());
        assert!(store.mark_irreversible(&[9; 32]).is_err());
    }
}
