//! Metrics collection for the bridge

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics collector for peg operations
#[derive(Debug, Default)]
pub struct Metrics {
    /// Locks credited on the ledger
    pub locks_credited: AtomicU64,

    /// Locks refunded to unwhitelisted senders
    pub locks_refunded: AtomicU64,

    /// Registrations ignored (replays, shallow, bad proofs, unclassified)
    pub registrations_ignored: AtomicU64,

    /// Peg-out requests queued
    pub releases_requested: AtomicU64,

    /// Outgoing transactions built (releases and migrations)
    pub transactions_built: AtomicU64,

    /// Federator signature batches inserted
    pub signatures_added: AtomicU64,

    /// Outgoing transactions fully signed
    pub transactions_signed: AtomicU64,

    /// Calls rolled back on error
    pub calls_rolled_back: AtomicU64,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a credited lock
    pub fn record_credit(&self) {
        self.locks_credited.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a refunded lock
    pub fn record_refund(&self) {
        self.locks_refunded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an ignored registration
    pub fn record_ignored(&self) {
        self.registrations_ignored.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a queued peg-out
    pub fn record_release_request(&self) {
        self.releases_requested.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a built outgoing transaction
    pub fn record_built(&self) {
        self.transactions_built.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an inserted signature batch
    pub fn record_signatures(&self) {
        self.signatures_added.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a fully signed transaction
    pub fn record_signed(&self) {
        self.transactions_signed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rolled-back call
    pub fn record_rollback(&self) {
        self.calls_rolled_back.fetch_add(1, Ordering::Relaxed);
    }

    /// Credited lock count
    pub fn credited(&self) -> u64 {
        self.locks_credited.load(Ordering::Relaxed)
    }
}
