//! # Shared Types Crate
//!
//! Ledger entities and cross-subsystem ports shared by every peg-chain crate.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: blocks, transactions and receipts are
//!   defined once here and consumed by scheduling, acceptance and the bridge.
//! - **Tagged Transactions**: synthetic system transactions are variants of
//!   [`Transaction`], not special-cased regular transactions.
//! - **Injected Collaborators**: alarms, time and the global ordering lock are
//!   passed into components explicitly; nothing here is a process-wide
//!   singleton.

pub mod alarm;
pub mod entities;
pub mod errors;
pub mod ordering;
pub mod time;
pub mod transaction;

pub use alarm::{Alarm, AlarmReporter, RecordingAlarmReporter, TracingAlarmReporter};
pub use entities::*;
pub use errors::*;
pub use ordering::GlobalOrdering;
pub use time::{ManualTimeSource, SystemTimeSource, TimeSource};
pub use transaction::*;
