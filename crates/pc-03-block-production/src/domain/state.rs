//! Producer scheduler states

/// Where the scheduler is in its loop.
///
/// ```text
/// Idle -> AwaitingListRefresh -> Scheduled -> Producing -> AwaitingListRefresh ...
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SchedulerState {
    /// Not started
    #[default]
    Idle,
    /// Next wake fetches the producer list
    AwaitingListRefresh,
    /// Waiting for an own slot
    Scheduled {
        /// Slot start (ms)
        at_ms: u64,
    },
    /// Building and publishing a block
    Producing,
}

