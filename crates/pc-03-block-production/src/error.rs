//! Error types for block production

use pc_01_producer_schedule::ScheduleError;
use pc_02_chain_acceptance::{ChainError, ImportResult, ValidationError};
use shared_types::{BlockSigningError, SealedBlockError};
use thiserror::Error;

/// Result type alias for block production operations
pub type Result<T> = std::result::Result<T, BlockProductionError>;

/// Errors that can occur during block production
#[derive(Debug, Error)]
pub enum BlockProductionError {
    /// External producer-list authority failed
    #[error("Producer list source error: {0}")]
    ListSourceUnavailable(String),

    /// External producer-list authority did not answer in time
    #[error("Producer list refresh timed out after {0}ms")]
    ListSourceTimeout(u64),

    /// A producer record could not be parsed
    #[error("Malformed producer record: {0}")]
    MalformedProducerRecord(String),

    /// The active producer list is empty
    #[error("Active producer list is empty")]
    EmptyProducerList,

    /// Slot computation failed
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    /// No own slot within the lookahead ceiling
    #[error("No slot found within {steps} slots after {from_ms}")]
    NoSlotFound {
        /// Search start (ms)
        from_ms: u64,
        /// Slots inspected
        steps: u64,
    },

    /// The assembled block failed the validation rule chain
    #[error("Candidate block rejected: {0}")]
    CandidateRejected(ValidationError),

    /// The local chain did not accept the produced block as best
    #[error("Produced block not imported as best: {0:?}")]
    NotImported(ImportResult),

    /// Chain or execution failure
    #[error(transparent)]
    Chain(#[from] ChainError),

    /// Header signing failed
    #[error("Block signing failed: {0}")]
    Signing(#[from] BlockSigningError),

    /// Attempted mutation of a sealed block
    #[error(transparent)]
    Sealed(#[from] SealedBlockError),

    /// Broadcasting the block failed
    #[error("Publish error: {0}")]
    Publish(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl BlockProductionError {
    /// Retryable next round without operator action.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BlockProductionError::ListSourceUnavailable(_)
                | BlockProductionError::ListSourceTimeout(_)
                | BlockProductionError::NoSlotFound { .. }
                | BlockProductionError::CandidateRejected(_)
                | BlockProductionError::NotImported(_)
                | BlockProductionError::Publish(_)
        )
    }
}
