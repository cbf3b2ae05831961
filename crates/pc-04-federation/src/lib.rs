//! # Peg Chain - Federation Registry (Subsystem 4)
//!
//! **Bounded Context:** Who guards the bridge wallet, and who may change that
//!
//! ## Federations
//!
//! At most three federations are live: the `active` one guards new locks and
//! releases, the `retiring` one holds funds still being migrated after a
//! change, and a `pending` one is assembled key by key. A new pending
//! federation cannot be opened while a retiring one is live.
//!
//! ## Elections
//!
//! Federation changes and fee-per-kb changes go through one generic
//! [`AbiCallElection`]: authorize the caller, dry-run the transition, record
//! the vote, and execute once a quorum of distinct voters agrees on the exact
//! same call. Executing clears all votes.
//!
//! ```text
//! vote(call) ──► authorized? ──no──► -10
//!                    │yes
//!                    ▼
//!               dry run ok? ──no──► error code, no vote
//!                    │yes
//!                    ▼
//!               record vote ──► quorum? ──no──► 1
//!                                  │yes
//!                                  ▼
//!                          execute, clear votes
//! ```
//!
//! Results use the fixed sentinel codes in [`codes`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod domain;
pub mod service;

mod config;
mod error;
mod metrics;

pub use domain::codes;

pub use config::{Authorizers, FederationConfig};
pub use error::{FederationError, Result};
pub use metrics::Metrics;

pub use domain::{
    majority, multisig_redeem_script, AbiCallElection, Authorizer, ChangeContext,
    ElectionResult, ExecutionMode, ExternalAddress, Federation, FederationChange, Federations,
    FeePerKbVote, LockWhitelist, MigrationPhase, MigrationWindow, PendingFederation,
    WhitelistEntry, MAX_FEDERATION_SIZE, OP_0, OP_1, OP_CHECKMULTISIG,
};
pub use service::{FederationRegistry, FederationState};
