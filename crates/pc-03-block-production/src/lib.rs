//! # Peg Chain - Block Production (Subsystem 3)
//!
//! **Bounded Context:** Building and signing blocks in the local producer's slots
//!
//! ## Components
//!
//! - [`BlockAssembler`]: selects pool transactions, appends the producer-list
//!   and fee-distribution transactions, executes, signs, and runs the same
//!   validation rule chain as block import before handing the block out.
//! - [`ProducerScheduler`]: the `Idle -> AwaitingListRefresh -> Scheduled ->
//!   Producing` state machine. It refreshes the producer list from the
//!   external authority (with a timeout, outside the global lock), finds the
//!   next own slot, and produces there.
//!
//! ## Liveness
//!
//! Nothing in the loop is fatal. A failed list refresh, an empty slot
//! search or a rejected candidate each reschedule one round later; a
//! genesis-only chain is bootstrapped by producing block #1 immediately.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

mod config;
mod error;
mod metrics;

pub use config::{BlockProductionConfig, DEFAULT_TARGET_GAS_LIMIT, DEFAULT_TARGET_MIN_GAS_PRICE};
pub use error::{BlockProductionError, Result};
pub use metrics::Metrics;

pub use domain::{
    active_producer_list, next_own_slot, parse_records, ProducerRecord, SchedulerState,
};
pub use ports::{BlockPublisher, ProducerListSource};
pub use service::{BlockAssembler, ProducerScheduler, SchedulerHandle};
