//! Persistent bridge state.

use crate::domain::external_tx::{ExternalTransaction, OutPoint};
use crate::domain::merkle::MerkleBranch;
use crate::domain::release::{PendingRelease, ReleaseRequest};
use crate::domain::utxo::UtxoBucket;
use pc_04_federation::{AbiCallElection, FederationState};
use serde::{Deserialize, Serialize};
use shared_types::Hash;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// A peg-in registration as voted on by federators.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegistrationCall {
    /// Serialized external transaction
    pub raw_tx: Vec<u8>,
    /// External block height claimed to contain it
    pub height: u64,
    /// Inclusion proof
    pub proof: MerkleBranch,
}

/// UTXOs, queues and replay protection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeState {
    /// Active federation wallet
    pub active_utxos: UtxoBucket,
    /// Retiring federation wallet
    pub retiring_utxos: UtxoBucket,
    /// Peg-outs waiting for a transaction
    pub release_requests: VecDeque<ReleaseRequest>,
    /// Built transactions waiting for ledger confirmations
    pub release_transactions: Vec<PendingRelease>,
    /// Transactions waiting for federator signatures, by ledger tx hash
    pub awaiting_signatures: BTreeMap<Hash, ExternalTransaction>,
    /// External txids already processed, with the ledger height
    pub processed_txs: BTreeMap<Hash, u64>,
    /// Votes on peg-in registrations
    pub registration_election: AbiCallElection<RegistrationCall>,
}

impl BridgeState {
    /// Outpoints referenced by built but unsigned transactions.
    pub fn reserved_outpoints(&self) -> BTreeSet<OutPoint> {
        self.release_transactions
            .iter()
            .flat_map(|release| release.spent().copied())
            .chain(
                self.awaiting_signatures
                    .values()
                    .flat_map(|tx| tx.inputs.iter().map(|input| input.previous)),
            )
            .collect()
    }
}

/// Everything the bridge persists at the end of a successful call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeSnapshot {
    /// Bridge ledger
    pub bridge: BridgeState,
    /// Federations, whitelist and fee vote
    pub federation: FederationState,
}
