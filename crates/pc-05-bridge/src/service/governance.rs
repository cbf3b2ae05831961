//! Federation changes, lock whitelist and fee-per-kb votes.
//!
//! Thin wrappers over the federation registry that run inside a bridge
//! transaction, so their effects persist with the rest of the bridge.

use super::{LedgerContext, PegSupport};
use crate::error::Result;
use pc_04_federation::{ElectionResult, ExternalAddress};
use shared_crypto::Secp256k1PublicKey;
use shared_types::Address;
use tracing::info;

impl PegSupport {
    /// Vote to open a pending federation.
    pub fn create_federation(&self, ctx: &LedgerContext, voter: &Address) -> Result<i32> {
        self.transact(|inner| Ok(inner.registry.create_pending(voter, ctx.change()).code()))
    }

    /// Vote to add `key` to the pending federation.
    pub fn add_federator_public_key(
        &self,
        ctx: &LedgerContext,
        voter: &Address,
        key: Secp256k1PublicKey,
    ) -> Result<i32> {
        self.transact(|inner| {
            Ok(inner
                .registry
                .add_pending_key(voter, key, ctx.change())
                .code())
        })
    }

    /// Vote to commit the pending federation whose hash is `expected_hash`.
    ///
    /// When the commit executes, the active wallet's UTXOs move to the
    /// retiring wallet along with the federation.
    pub fn commit_federation(
        &self,
        ctx: &LedgerContext,
        voter: &Address,
        expected_hash: [u8; 32],
    ) -> Result<i32> {
        self.transact(|inner| {
            let result = inner
                .registry
                .commit_pending(voter, expected_hash, ctx.change());
            if result.executed_successfully() {
                let moved = inner.state.active_utxos.take_all();
                info!(
                    "[pc-05] Federation committed at block #{}; {} UTXOs now retiring",
                    ctx.block_number,
                    moved.len()
                );
                for utxo in moved {
                    inner.state.retiring_utxos.insert(utxo);
                }
            }
            Ok(result.code())
        })
    }

    /// Vote to discard the pending federation.
    pub fn rollback_federation(&self, ctx: &LedgerContext, voter: &Address) -> Result<i32> {
        self.transact(|inner| Ok(inner.registry.rollback_pending(voter, ctx.change()).code()))
    }

    /// Whitelist `address` for one lock of at most `max_value`.
    pub fn add_one_off_lock_whitelist_address(
        &self,
        caller: &Address,
        address: ExternalAddress,
        max_value: u64,
    ) -> Result<i32> {
        self.transact(|inner| {
            Ok(inner
                .registry
                .add_one_off_lock_whitelist_address(caller, address, max_value))
        })
    }

    /// Whitelist `address` without limits.
    pub fn add_unlimited_lock_whitelist_address(
        &self,
        caller: &Address,
        address: ExternalAddress,
    ) -> Result<i32> {
        self.transact(|inner| {
            Ok(inner
                .registry
                .add_unlimited_lock_whitelist_address(caller, address))
        })
    }

    /// Remove `address` from the whitelist.
    pub fn remove_lock_whitelist_address(
        &self,
        caller: &Address,
        address: &ExternalAddress,
    ) -> Result<i32> {
        self.transact(|inner| Ok(inner.registry.remove_lock_whitelist_address(caller, address)))
    }

    /// Disable the whitelist `delay` blocks after the current one.
    pub fn set_lock_whitelist_disable_block_delay(
        &self,
        ctx: &LedgerContext,
        caller: &Address,
        delay: u64,
    ) -> Result<i32> {
        self.transact(|inner| {
            Ok(inner
                .registry
                .set_lock_whitelist_disable_block_delay(caller, delay, ctx.block_number))
        })
    }

    /// Vote for a new fee per kb.
    pub fn vote_fee_per_kb(&self, voter: &Address, fee_per_kb: u64) -> Result<ElectionResult> {
        let max_fee = self.config.max_fee_per_kb;
        self.transact(|inner| Ok(inner.registry.vote_fee_per_kb(voter, fee_per_kb, max_fee)))
    }
}
