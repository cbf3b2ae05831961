//! Metrics collection for block production

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics collector for block production
#[derive(Debug, Default)]
pub struct Metrics {
    /// Blocks built, imported and published
    pub blocks_produced: AtomicU64,

    /// Candidates that failed validation or import
    pub candidates_rejected: AtomicU64,

    /// Failed or timed-out producer-list fetches
    pub list_refresh_failures: AtomicU64,

    /// Rounds skipped because the local identity was not listed
    pub rounds_skipped: AtomicU64,

    /// Slot searches that found nothing
    pub schedule_failures: AtomicU64,

    /// Blocks imported locally but not published
    pub publish_failures: AtomicU64,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a produced block
    pub fn record_produced(&self) {
        self.blocks_produced.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rejected candidate
    pub fn record_rejected(&self) {
        self.candidates_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed list refresh
    pub fn record_list_failure(&self) {
        self.list_refresh_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a skipped round
    pub fn record_round_skipped(&self) {
        self.rounds_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed slot search
    pub fn record_schedule_failure(&self) {
        self.schedule_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed publish
    pub fn record_publish_failure(&self) {
        self.publish_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Produced block count
    pub fn produced(&self) -> u64 {
        self.blocks_produced.load(Ordering::Relaxed)
    }
}
