//! Metrics collection for chain acceptance

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics collector for chain acceptance
#[derive(Debug, Default)]
pub struct Metrics {
    /// Blocks connected (best or side branch)
    pub blocks_imported: AtomicU64,

    /// Blocks rejected as invalid
    pub blocks_rejected: AtomicU64,

    /// Rebranches performed
    pub rebranches: AtomicU64,

    /// Blocks marked irreversible
    pub blocks_irreversible: AtomicU64,

    /// Block store flushes
    pub flushes: AtomicU64,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a connected block
    pub fn record_imported(&self) {
        self.blocks_imported.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rejected block
    pub fn record_rejected(&self) {
        self.blocks_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rebranch
    pub fn record_rebranch(&self) {
        self.rebranches.fetch_add(1, Ordering::Relaxed);
    }

    /// Record newly irreversible blocks
    pub fn record_irreversible(&self, count: u64) {
        self.blocks_irreversible.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a flush
    pub fn record_flush(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of current metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            blocks_imported: self.blocks_imported.load(Ordering::Relaxed),
            blocks_rejected: self.blocks_rejected.load(Ordering::Relaxed),
            rebranches: self.rebranches.load(Ordering::Relaxed),
            blocks_irreversible: self.blocks_irreversible.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Blocks connected
    pub blocks_imported: u64,
    /// Blocks rejected
    pub blocks_rejected: u64,
    /// Rebranches performed
    pub rebranches: u64,
    /// Blocks marked irreversible
    pub blocks_irreversible: u64,
    /// Block store flushes
    pub flushes: u64,
}
