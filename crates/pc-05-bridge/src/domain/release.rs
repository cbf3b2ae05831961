//! Peg-out requests and outgoing transactions.

use crate::domain::external_tx::{ExternalTransaction, OutPoint};
use pc_04_federation::ExternalAddress;
use serde::{Deserialize, Serialize};

/// A queued peg-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRequest {
    /// External pubkey-hash address paid
    pub destination: ExternalAddress,
    /// Amount before fees (external units)
    pub amount: u64,
}

/// What an outgoing transaction is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReleaseKind {
    /// Peg-out to a user
    Release,
    /// Sweep from the retiring to the active federation
    Migration,
    /// Return of an unwhitelisted lock
    Refund,
}

/// An outgoing transaction waiting for ledger confirmations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRelease {
    /// Unsigned transaction
    pub tx: ExternalTransaction,
    /// Ledger height it was built at
    pub created_at: u64,
    /// Purpose
    pub kind: ReleaseKind,
}

impl PendingRelease {
    /// Outpoints the transaction spends.
    pub fn spent(&self) -> impl Iterator<Item = &OutPoint> {
        self.tx.inputs.iter().map(|input| &input.previous)
    }

    /// Whether `confirmations` ledger blocks have passed at `height`.
    pub fn is_confirmed(&self, height: u64, confirmations: u64) -> bool {
        height.saturating_sub(self.created_at) >= confirmations
    }
}
