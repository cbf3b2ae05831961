//! # Peg Chain - Chain Acceptance (Subsystem 2)
//!
//! **Bounded Context:** Block validation, fork choice and finality
//!
//! ## Purpose
//!
//! - Run the validation rule chain over every incoming block
//! - Execute blocks and compare roots against the header
//! - Keep the best block (longest chain, first seen on ties) and rebranch
//! - Propagate irreversibility from the recent producers of each branch
//!
//! ## Concurrency
//!
//! `try_connect` holds the node-wide [`shared_types::GlobalOrdering`] lock for
//! the whole import. Listeners run inside that lock; the transaction pool is
//! reconciled afterwards on its own task (see [`spawn_pool_reconciler`]).
//!
//! ## Import flow
//!
//! ```text
//! unsealed? -> alarm + seal
//! known?    -> AlreadyExists
//! siblings  -> InvalidBlock (irreversible sibling / same producer in round)
//! parent?   -> NoParent
//! rules     -> InvalidBlock
//! execute   -> InvalidBlock (root mismatch)
//! save, rebranch, commit, irreversibility, flush
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

mod config;
mod error;
mod metrics;
mod reconciler;

/// Test fixtures.
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{
    ChainAcceptanceConfig, DEFAULT_FLUSH_INTERVAL_MS, DEFAULT_MAX_FUTURE_SKEW_MS,
    DEFAULT_MIN_GAS_LIMIT,
};
pub use error::{ChainError, Result, ValidationError};
pub use metrics::{Metrics, MetricsSnapshot};
pub use reconciler::spawn_pool_reconciler;

pub use domain::{
    next_gas_limit, next_minimum_gas_price, BlockValidationRule, ImportResult, RuleChain,
    ValidationContext, INTRINSIC_GAS,
};
pub use ports::{
    BlockExecutor, BlockStore, ChainListener, ExecutionOutcome, StateReader, TransactionPool,
};
pub use service::{ChainAcceptance, ChainDependencies};
