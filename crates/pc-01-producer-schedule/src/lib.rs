//! # Peg Chain - Producer Schedule (Subsystem 1)
//!
//! **Bounded Context:** Round-robin block producer rotation
//!
//! ## Purpose
//!
//! - Map wall-clock time to the producer owning the current slot
//! - Encode/decode the ordered producer list carried inside blocks
//! - Synthesize the producer-list and fee-distribution system transactions
//!
//! Everything here is pure: no I/O, no clock, no locks. The producer
//! scheduler and chain acceptance both call into this crate and must agree
//! bit for bit.
//!
//! ## Schedule
//!
//! ```text
//! divisions = (now - epoch) / interval
//! index     = (divisions mod (list_size * repetitions)) / repetitions
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod domain;

mod config;
mod error;

pub use config::{ScheduleConfig, DEFAULT_BLOCK_INTERVAL_MS, DEFAULT_REPETITIONS};
pub use error::{Result, ScheduleError};

pub use domain::{
    block_producer_list, decode_producer_keys, encode_producer_keys,
    fee_distribution_transaction, producer_index, producer_list_transaction, ProducerIdentity,
    ProducerList,
};
