//! # Outbound Ports
//!
//! Collaborators the bridge drives. All calls happen under the global
//! ordering lock, so every port is synchronous.

use crate::domain::{BridgeSnapshot, ExternalTransaction, OutPoint, Utxo};
use crate::error::Result;
use pc_04_federation::Federation;
use primitive_types::U256;
use shared_types::{Address, Hash};

/// View of the external chain's canonical fork, fed by the federators.
pub trait ExternalChainView: Send + Sync {
    /// Height of the best known external block.
    fn best_height(&self) -> Result<u64>;

    /// Merkle root of the canonical block at `height`, if known.
    fn merkle_root_at(&self, height: u64) -> Result<Option<Hash>>;
}

/// What to build.
#[derive(Debug, Clone)]
pub struct BuildRequest<'a> {
    /// Spendable UTXOs of the paying wallet
    pub utxos: &'a [Utxo],
    /// Federation owning those UTXOs
    pub federation: &'a Federation,
    /// Locking script of the payment
    pub destination: Vec<u8>,
    /// Amount to move; the fee comes out of it
    pub amount: u64,
    /// Locking script for change
    pub change: Vec<u8>,
    /// Fee rate (external units per kb)
    pub fee_per_kb: u64,
    /// Smallest relayable output
    pub dust_threshold: u64,
}

/// A transaction ready for federator signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltTransaction {
    /// Transaction with placeholder unlocking scripts
    pub tx: ExternalTransaction,
    /// UTXOs it spends
    pub spent: Vec<OutPoint>,
    /// Fee paid
    pub fee: u64,
    /// Amount moved from the payment to the change output to clear dust
    pub change_bump: u64,
}

/// External-chain wallet: coin selection and transaction building.
pub trait ReleaseTransactionBuilder: Send + Sync {
    /// Build a transaction for `request`, or `None` if the wallet cannot
    /// (insufficient funds, too many inputs, output below dust).
    fn build(&self, request: &BuildRequest<'_>) -> Option<BuiltTransaction>;
}

/// Ledger balances touched by peg-ins and peg-outs.
pub trait LedgerAccounts: Send + Sync {
    /// Balance of `address`.
    fn balance(&self, address: &Address) -> U256;

    /// Move `amount` from `from` to `to`.
    fn transfer(&self, from: &Address, to: &Address, amount: U256) -> Result<()>;
}

/// Durable bridge state.
pub trait BridgeStorage: Send + Sync {
    /// Last saved snapshot.
    fn load(&self) -> Result<Option<BridgeSnapshot>>;

    /// Replace the saved snapshot.
    fn save(&self, snapshot: &BridgeSnapshot) -> Result<()>;
}
