//! Error types for the producer schedule

use thiserror::Error;

/// Result type alias for schedule operations
pub type Result<T> = std::result::Result<T, ScheduleError>;

/// Errors raised by the schedule clock, the producer-list codec and config validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// List size, repetitions or interval is zero
    #[error(
        "Invalid schedule parameters: list_size={list_size}, repetitions={repetitions}, interval={interval_ms}ms"
    )]
    InvalidScheduleParameters {
        /// Producer list size
        list_size: usize,
        /// Slots per producer per round
        repetitions: u64,
        /// Slot length
        interval_ms: u64,
    },

    /// The requested instant precedes the block epoch
    #[error("Time {now_ms} precedes block epoch {epoch_ms}")]
    BeforeEpoch {
        /// Requested instant
        now_ms: u64,
        /// Block epoch
        epoch_ms: u64,
    },

    /// Producer-list payload could not be decoded
    #[error("Malformed producer list: {0}")]
    MalformedProducerList(String),

    /// Block does not carry a producer-list transaction
    #[error("Block #{0} carries no producer list")]
    MissingProducerList(u64),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
