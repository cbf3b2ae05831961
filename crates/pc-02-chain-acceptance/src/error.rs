//! Error types for chain acceptance

use primitive_types::U256;
use shared_types::SealedBlockError;
use thiserror::Error;

/// Result type alias for chain acceptance operations
pub type Result<T> = std::result::Result<T, ChainError>;

/// Infrastructure failures. Validation failures are reported as
/// [`crate::ImportResult::InvalidBlock`], not as errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// Block store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Block executor failure
    #[error("Execution error: {0}")]
    Execution(String),

    /// Genesis block was not usable
    #[error("Invalid genesis: {0}")]
    InvalidGenesis(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Attempted mutation of a sealed block
    #[error(transparent)]
    Sealed(#[from] SealedBlockError),
}

impl ChainError {
    /// Storage and execution failures may succeed on retry.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ChainError::Storage(_) | ChainError::Execution(_))
    }
}

/// Reasons a block fails the validation rule chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A transaction's fields are malformed
    #[error("Transaction #{index} malformed: {reason}")]
    MalformedTransaction {
        /// Position in the block
        index: usize,
        /// What is wrong
        reason: String,
    },

    /// A regular transaction's signature does not recover
    #[error("Transaction #{index} has an invalid signature")]
    InvalidTransactionSignature {
        /// Position in the block
        index: usize,
    },

    /// Nonce does not follow the sender's state nonce
    #[error("Nonce mismatch for {sender}: expected {expected}, got {actual}")]
    NonceMismatch {
        /// Hex sender address
        sender: String,
        /// Expected nonce
        expected: u64,
        /// Actual nonce
        actual: u64,
    },

    /// Minimum gas price moved by more than the allowed step
    #[error("Minimum gas price {block} out of bounds of parent {parent}")]
    MinimumGasPriceOutOfBounds {
        /// Parent minimum gas price
        parent: U256,
        /// Block minimum gas price
        block: U256,
    },

    /// A regular transaction pays less than the block minimum gas price
    #[error("Transaction #{index} gas price below block minimum")]
    GasPriceBelowMinimum {
        /// Position in the block
        index: usize,
    },

    /// Block number is not parent + 1
    #[error("Block number {actual} does not follow parent (expected {expected})")]
    ParentNumberMismatch {
        /// Expected number
        expected: u64,
        /// Actual number
        actual: u64,
    },

    /// Gas limit moved by more than the allowed step or fell below the floor
    #[error("Gas limit {block} out of bounds of parent {parent}")]
    GasLimitOutOfBounds {
        /// Parent gas limit
        parent: u64,
        /// Block gas limit
        block: u64,
    },

    /// Extra data longer than allowed
    #[error("Extra data of {len} bytes exceeds {max}")]
    ExtraDataTooLong {
        /// Actual length
        len: usize,
        /// Allowed length
        max: usize,
    },

    /// Timestamp beyond the allowed future skew
    #[error("Timestamp {timestamp} too far in future (now {now})")]
    TimestampInFuture {
        /// Block timestamp
        timestamp: u64,
        /// Local time
        now: u64,
    },

    /// Timestamp not after the parent's
    #[error("Timestamp {timestamp} not after parent {parent}")]
    TimestampNotAfterParent {
        /// Block timestamp
        timestamp: u64,
        /// Parent timestamp
        parent: u64,
    },

    /// Gas used is inconsistent with the gas limit
    #[error("Gas used {used} exceeds limit {limit}")]
    GasUsedExceedsLimit {
        /// Gas used
        used: u64,
        /// Gas limit
        limit: u64,
    },

    /// Producer-list transaction missing from the second-to-last position
    #[error("Producer-list transaction missing or misplaced")]
    MissingProducerList,

    /// Fee-distribution transaction missing from the last position
    #[error("Fee-distribution transaction missing or misplaced")]
    MissingFeeDistribution,

    /// Header signature absent or not matching the coinbase
    #[error("Header signature does not match coinbase")]
    InvalidHeaderSignature,

    /// Producer list could not be decoded
    #[error("Undecodable producer list: {0}")]
    UndecodableProducerList(String),

    /// Coinbase is not a listed producer
    #[error("Coinbase {0} is not a listed producer")]
    UnknownProducer(String),

    /// Schedule could not be evaluated for the block timestamp
    #[error("Schedule violation: {0}")]
    ScheduleViolation(String),

    /// Timestamp falls in another producer's slot
    #[error("Wrong slot: timestamp belongs to producer #{slot_owner}, coinbase is #{producer}")]
    WrongSlot {
        /// Index owning the slot
        slot_owner: usize,
        /// Index of the coinbase
        producer: usize,
    },

    /// Same producer produced the parent less than a round ago
    #[error("Same producer within one round: gap {gap_ms}ms < round {round_ms}ms")]
    SameProducerTooSoon {
        /// Gap between the two timestamps
        gap_ms: u64,
        /// One full round
        round_ms: u64,
    },

    /// Post-execution roots differ from the header
    #[error("Execution result mismatch: {0}")]
    ExecutionMismatch(String),
}
