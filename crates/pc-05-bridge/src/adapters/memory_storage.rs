use crate::domain::BridgeSnapshot;
use crate::error::{BridgeError, Result};
use crate::ports::BridgeStorage;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Keeps the last snapshot bincode-encoded in memory.
#[derive(Default)]
pub struct InMemoryBridgeStorage {
    encoded: RwLock<Option<Vec<u8>>>,
    saves: AtomicU64,
    failing: AtomicBool,
}

impl InMemoryBridgeStorage {
    /// Create an empty instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful saves.
    pub fn saves(&self) -> u64 {
        self.saves.load(Ordering::Relaxed)
    }

    /// Make every save fail until cleared.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Size of the stored encoding.
    pub fn encoded_len(&self) -> usize {
        self.encoded.read().as_ref().map_or(0, Vec::len)
    }
}

impl BridgeStorage for InMemoryBridgeStorage {
    fn load(&self) -> Result<Option<BridgeSnapshot>> {
        match self.encoded.read().as_deref() {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes)?)),
            None => Ok(None),
        }
    }

    fn save(&self, snapshot: &BridgeSnapshot) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BridgeError::Storage("disk full".into()));
        }
        let bytes = bincode::serialize(snapshot)?;
        *self.encoded.write() = Some(bytes);
        self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
