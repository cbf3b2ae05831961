//! # Global Ordering
//!
//! One exclusive, re-entrant lock serializes every externally observed state
//! change: block connection, peg-in registration, signature collection,
//! federation votes and the producer's build-and-connect step. Re-entrancy
//! lets a block-connect path call into bridge entry points that take the same
//! lock.
//!
//! The guard is not `Send`; it must never be held across an `.await`.

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::sync::Arc;

/// Shared handle to the global ordering lock.
#[derive(Clone, Default)]
pub struct GlobalOrdering {
    inner: Arc<ReentrantMutex<()>>,
}

impl GlobalOrdering {
    /// Create a new, independent lock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock, blocking until available.
    pub fn lock(&self) -> ReentrantMutexGuard<'_, ()> {
        self.inner.lock()
    }

    /// Acquire the lock if nobody else holds it.
    pub fn try_lock(&self) -> Option<ReentrantMutexGuard<'_, ()>> {
        self.inner.try_lock()
    }
}

impl std::fmt::Debug for GlobalOrdering {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalOrdering").finish_non_exhaustive()
    }
}
