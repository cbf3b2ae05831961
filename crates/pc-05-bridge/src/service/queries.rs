//! Read-only bridge queries.

use super::PegSupport;
use crate::domain::{BridgeSnapshot, ExternalTransaction, ReleaseRequest};
use pc_04_federation::{ExternalAddress, Federation, MigrationPhase, WhitelistEntry};
use shared_crypto::Secp256k1PublicKey;
use shared_types::Hash;

/// Which live federation a query is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FederationKind {
    /// Federation guarding new locks and releases
    Active,
    /// Previous federation, until its funds are migrated
    Retiring,
}

impl PegSupport {
    fn with_federation<T>(&self, kind: FederationKind, f: impl FnOnce(&Federation) -> T) -> Option<T> {
        let inner = self.inner.lock();
        match kind {
            FederationKind::Active => Some(f(inner.registry.active())),
            FederationKind::Retiring => inner.registry.retiring().map(f),
        }
    }

    /// Active federation address.
    pub fn federation_address(&self) -> ExternalAddress {
        self.inner.lock().registry.active().address()
    }

    /// Retiring federation address, if any.
    pub fn retiring_federation_address(&self) -> Option<ExternalAddress> {
        self.with_federation(FederationKind::Retiring, Federation::address)
    }

    /// Number of members.
    pub fn federation_size(&self, kind: FederationKind) -> Option<usize> {
        self.with_federation(kind, Federation::size)
    }

    /// Signatures required to spend.
    pub fn federation_threshold(&self, kind: FederationKind) -> Option<usize> {
        self.with_federation(kind, Federation::threshold)
    }

    /// Commit time (ms).
    pub fn federation_creation_time(&self, kind: FederationKind) -> Option<u64> {
        self.with_federation(kind, Federation::creation_time_ms)
    }

    /// Ledger height of the commit.
    pub fn federation_creation_block_number(&self, kind: FederationKind) -> Option<u64> {
        self.with_federation(kind, Federation::creation_block_number)
    }

    /// Member at `index` in key order.
    pub fn federator_public_key(
        &self,
        kind: FederationKind,
        index: usize,
    ) -> Option<Secp256k1PublicKey> {
        self.with_federation(kind, |f| f.public_key(index).copied())
            .flatten()
    }

    /// Hash committing to the pending federation's keys.
    pub fn pending_federation_hash(&self) -> Option<[u8; 32]> {
        self.inner.lock().registry.pending().map(|p| p.hash())
    }

    /// Keys collected by the pending federation.
    pub fn pending_federation_size(&self) -> Option<usize> {
        self.inner.lock().registry.pending().map(|p| p.size())
    }

    /// Key at `index` of the pending federation, in insertion order.
    pub fn pending_federator_public_key(&self, index: usize) -> Option<Secp256k1PublicKey> {
        self.inner
            .lock()
            .registry
            .pending()
            .and_then(|p| p.public_keys().get(index).copied())
    }

    /// Migration phase at ledger `height`.
    pub fn migration_phase(&self, height: u64) -> MigrationPhase {
        self.inner.lock().registry.migration_phase(height)
    }

    /// Active wallet UTXO count.
    pub fn active_utxos_len(&self) -> usize {
        self.inner.lock().state.active_utxos.len()
    }

    /// Retiring wallet UTXO count.
    pub fn retiring_utxos_len(&self) -> usize {
        self.inner.lock().state.retiring_utxos.len()
    }

    /// Spendable value of the active wallet (external units).
    pub fn active_balance(&self) -> u64 {
        self.inner.lock().state.active_utxos.balance()
    }

    /// Spendable value of the retiring wallet (external units).
    pub fn retiring_balance(&self) -> u64 {
        self.inner.lock().state.retiring_utxos.balance()
    }

    /// Queued peg-outs.
    pub fn release_requests_len(&self) -> usize {
        self.inner.lock().state.release_requests.len()
    }

    /// Queued peg-outs, oldest first.
    pub fn release_requests(&self) -> Vec<ReleaseRequest> {
        self.inner.lock().state.release_requests.iter().cloned().collect()
    }

    /// Built transactions waiting for ledger confirmations.
    pub fn release_transactions_len(&self) -> usize {
        self.inner.lock().state.release_transactions.len()
    }

    /// Transactions waiting for signatures.
    pub fn awaiting_signatures_len(&self) -> usize {
        self.inner.lock().state.awaiting_signatures.len()
    }

    /// Transaction waiting for signatures under `ledger_tx_hash`.
    pub fn awaiting_signature(&self, ledger_tx_hash: &Hash) -> Option<ExternalTransaction> {
        self.inner
            .lock()
            .state
            .awaiting_signatures
            .get(ledger_tx_hash)
            .cloned()
    }

    /// Whitelist entry of `address`.
    pub fn lock_whitelist_entry(&self, address: &ExternalAddress) -> Option<WhitelistEntry> {
        self.inner.lock().registry.lock_whitelist().get(address)
    }

    /// Number of whitelisted addresses.
    pub fn lock_whitelist_len(&self) -> usize {
        self.inner.lock().registry.lock_whitelist().len()
    }

    /// Fee per kb in force.
    pub fn fee_per_kb(&self) -> u64 {
        self.inner.lock().registry.fee_per_kb()
    }

    /// Current state as it would be persisted.
    pub fn snapshot(&self) -> BridgeSnapshot {
        self.inner.lock().snapshot()
    }
}
