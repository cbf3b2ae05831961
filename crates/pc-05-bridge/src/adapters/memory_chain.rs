use crate::error::{BridgeError, Result};
use crate::ports::ExternalChainView;
use parking_lot::RwLock;
use shared_types::Hash;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// In-memory external header chain: merkle roots by height plus a best
/// height.
#[derive(Default)]
pub struct InMemoryExternalChain {
    roots: RwLock<BTreeMap<u64, Hash>>,
    best_height: RwLock<u64>,
    unavailable: AtomicBool,
}

impl InMemoryExternalChain {
    /// Create an empty instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the canonical block at `height`, raising the best height if needed.
    pub fn add_block(&self, height: u64, merkle_root: Hash) {
        self.roots.write().insert(height, merkle_root);
        let mut best = self.best_height.write();
        *best = (*best).max(height);
    }

    /// Set the best height.
    pub fn set_best_height(&self, height: u64) {
        *self.best_height.write() = height;
    }

    /// Make every call fail until cleared.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BridgeError::ExternalChain("header store unavailable".into()));
        }
        Ok(())
    }
}

impl ExternalChainView for InMemoryExternalChain {
    fn best_height(&self) -> Result<u64> {
        self.check_available()?;
        Ok(*self.best_height.read())
    }

    fn merkle_root_at(&self, height: u64) -> Result<Option<Hash>> {
        self.check_available()?;
        Ok(self.roots.read().get(&height).copied())
    }
}
