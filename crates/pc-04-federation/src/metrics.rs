//! Metrics collection for the federation registry

use crate::domain::ElectionResult;
use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics collector for federation change votes
#[derive(Debug, Default)]
pub struct Metrics {
    /// Votes recorded without reaching quorum
    pub votes_recorded: AtomicU64,

    /// Calls rejected by the authorizer or the dry run
    pub votes_rejected: AtomicU64,

    /// Calls executed on quorum
    pub calls_executed: AtomicU64,

    /// Federations committed
    pub federations_committed: AtomicU64,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of a submitted vote
    pub fn record(&self, result: ElectionResult) {
        let counter = match result {
            ElectionResult::Rejected(_) => &self.votes_rejected,
            ElectionResult::Voted => &self.votes_recorded,
            ElectionResult::Executed(_) => &self.calls_executed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a committed federation
    pub fn record_commit(&self) {
        self.federations_committed.fetch_add(1, Ordering::Relaxed);
    }

    /// Committed federation count
    pub fn commits(&self) -> u64 {
        self.federations_committed.load(Ordering::Relaxed)
    }
}
