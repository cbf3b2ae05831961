//! # Peg Chain - Bridge (Subsystem 5)
//!
//! **Bounded Context:** Two-way peg between the ledger and the external chain
//!
//! ## Purpose
//!
//! - Model the external chain: transactions, scripts, merkle proofs, UTXOs
//! - Peg-in: verify inclusion and depth of external locks, then credit the
//!   sender's ledger account or refund unwhitelisted senders
//! - Peg-out: queue release requests, build federation-signed releases in
//!   batches, collect federator signatures
//! - Migrate funds from a retiring federation to the active one
//!
//! ## Transactions
//!
//! Every mutating call holds the node-wide [`shared_types::GlobalOrdering`]
//! lock and runs as one transaction: ledger transfers are applied and the
//! [`BridgeSnapshot`] is saved only when the call succeeds. An error leaves
//! bridge state, federation state and ledger balances as they were.
//!
//! ## Peg-out lifecycle
//!
//! ```text
//! request_release ──► release_requests (queue)
//!                          │ periodic_maintenance: build
//!                          ▼
//!                     release_transactions (waiting for ledger confirmations)
//!                          │ periodic_maintenance: promote (one per call)
//!                          ▼
//!                     awaiting_signatures[ledger tx hash]
//!                          │ add_signature until every input is complete
//!                          ▼
//!                     SignatureOutcome::Complete { tx } ──► broadcast
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

/// Test fixtures.
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{BridgeConfig, RegistrationMode};
pub use error::{BridgeError, Result};
pub use metrics::Metrics;

pub use domain::{
    BridgeSnapshot, BridgeState, ExternalTransaction, MerkleBranch, OutPoint, PegTxKind,
    PendingRelease, ReleaseKind, ReleaseRequest, TxInput, TxOutput, Utxo, UtxoBucket,
};
pub use ports::{
    BridgeStorage, BuildRequest, BuiltTransaction, ExternalChainView, LedgerAccounts,
    ReleaseTransactionBuilder,
};
pub use service::{
    BridgeDependencies, FederationKind, LedgerContext, MaintenanceReport, PegSupport,
    RegistrationOutcome, SignatureOutcome,
};
