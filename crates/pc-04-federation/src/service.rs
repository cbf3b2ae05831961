//! Federation registry service
//!
//! Owns the serializable [`FederationState`] and gates every mutation
//! through the configured authorizers. Callers serialize access under the
//! global ordering lock; the registry itself is not synchronized.

use crate::config::{Authorizers, FederationConfig};
use crate::domain::{
    AbiCallElection, ChangeContext, ElectionResult, ExternalAddress, FederationChange,
    Federation, Federations, FeePerKbVote, LockWhitelist, MigrationPhase, MigrationWindow,
    PendingFederation,
};
use crate::error::Result;
use crate::metrics::Metrics;
use serde::{Deserialize, Serialize};
use shared_crypto::Secp256k1PublicKey;
use shared_types::Address;
use tracing::{debug, info};

/// Everything the registry persists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederationState {
    /// Active, retiring and pending federations
    pub federations: Federations,
    /// Votes on federation changes
    pub change_election: AbiCallElection<FederationChange>,
    /// Lock whitelist
    pub lock_whitelist: LockWhitelist,
    /// Fee per kb and its votes
    pub fee_per_kb: FeePerKbVote,
    /// Redeem scripts of dropped federations, oldest first
    #[serde(default)]
    pub retired_redeem_scripts: Vec<Vec<u8>>,
}

impl FederationState {
    /// Fresh state with `genesis` active.
    pub fn genesis(genesis: Federation, initial_fee_per_kb: u64) -> Self {
        Self {
            federations: Federations::new(genesis),
            change_election: AbiCallElection::new(),
            lock_whitelist: LockWhitelist::new(),
            fee_per_kb: FeePerKbVote::new(initial_fee_per_kb),
            retired_redeem_scripts: Vec::new(),
        }
    }
}

/// Versioned, vote-driven federation set.
pub struct FederationRegistry {
    config: FederationConfig,
    authorizers: Authorizers,
    state: FederationState,
    metrics: Metrics,
}

impl FederationRegistry {
    /// Resume from `state`.
    pub fn new(config: FederationConfig, state: FederationState) -> Result<Self> {
        config.validate()?;
        let authorizers = config.authorizers()?;
        Ok(Self {
            config,
            authorizers,
            state,
            metrics: Metrics::new(),
        })
    }

    /// Persistable state.
    pub fn state(&self) -> &FederationState {
        &self.state
    }

    /// Replace the state, e.g. after a failed bridge call is rolled back.
    pub fn restore(&mut self, state: FederationState) {
        self.state = state;
    }

    /// Registry configuration.
    pub fn config(&self) -> &FederationConfig {
        &self.config
    }

    /// Metrics collector.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Federation guarding new locks and releases.
    pub fn active(&self) -> &Federation {
        &self.state.federations.active
    }

    /// Federation whose funds are being migrated, if any.
    pub fn retiring(&self) -> Option<&Federation> {
        self.state.federations.retiring.as_ref()
    }

    /// Federation being assembled, if any.
    pub fn pending(&self) -> Option<&PendingFederation> {
        self.state.federations.pending.as_ref()
    }

    /// Whether `key` belongs to the active or retiring federation.
    pub fn is_member(&self, key: &Secp256k1PublicKey) -> bool {
        self.state.federations.is_member(key)
    }

    /// Migration phase at ledger `height`.
    pub fn migration_phase(&self, height: u64) -> MigrationPhase {
        self.state.federations.migration_phase(
            height,
            MigrationWindow {
                activation_age: self.config.activation_age,
                begin: self.config.funds_migration_age_begin,
                end: self.config.funds_migration_age_end,
            },
        )
    }

    /// Redeem scripts of federations dropped after migration.
    pub fn retired_redeem_scripts(&self) -> &[Vec<u8>] {
        &self.state.retired_redeem_scripts
    }

    /// Drop the retiring federation once its funds are gone.
    ///
    /// Its redeem script is kept so late sweeps of its wallet are still
    /// recognised.
    pub fn drop_retiring(&mut self) -> Option<Federation> {
        let dropped = self.state.federations.retiring.take();
        if let Some(federation) = &dropped {
            self.state
                .retired_redeem_scripts
                .push(federation.redeem_script());
            info!(
                "[pc-04] Retiring federation {} dropped",
                hex::encode(federation.address())
            );
        }
        dropped
    }

    /// Vote to open a pending federation.
    pub fn create_pending(&mut self, voter: &Address, ctx: ChangeContext) -> ElectionResult {
        self.submit_change(voter, FederationChange::CreatePending, ctx)
    }

    /// Vote to add `key` to the pending federation.
    pub fn add_pending_key(
        &mut self,
        voter: &Address,
        key: Secp256k1PublicKey,
        ctx: ChangeContext,
    ) -> ElectionResult {
        self.submit_change(voter, FederationChange::AddPendingKey(key), ctx)
    }

    /// Vote to commit the pending federation whose hash is `expected_hash`.
    ///
    /// On execution the active federation becomes the retiring one; the
    /// caller moves its UTXOs along.
    pub fn commit_pending(
        &mut self,
        voter: &Address,
        expected_hash: [u8; 32],
        ctx: ChangeContext,
    ) -> ElectionResult {
        let result = self.submit_change(voter, FederationChange::CommitPending(expected_hash), ctx);
        if result.executed_successfully() {
            self.metrics.record_commit();
        }
        result
    }

    /// Vote to discard the pending federation.
    pub fn rollback_pending(&mut self, voter: &Address, ctx: ChangeContext) -> ElectionResult {
        self.submit_change(voter, FederationChange::RollbackPending, ctx)
    }

    fn submit_change(
        &mut self,
        voter: &Address,
        change: FederationChange,
        ctx: ChangeContext,
    ) -> ElectionResult {
        let min_keys = self.config.min_pending_keys;
        let FederationState {
            federations,
            change_election,
            ..
        } = &mut self.state;
        let result = change_election.submit(
            &self.authorizers.federation_change,
            voter,
            change.clone(),
            |call, mode| federations.apply(call, mode, ctx, min_keys),
        );
        debug!(
            "[pc-04] {:?} by {}: {:?}",
            change,
            hex::encode(voter),
            result
        );
        self.metrics.record(result);
        result
    }

    /// Lock whitelist.
    pub fn lock_whitelist(&self) -> &LockWhitelist {
        &self.state.lock_whitelist
    }

    /// Whether `sender` may lock `amount` at `height`.
    pub fn is_lock_whitelisted(&self, sender: &ExternalAddress, amount: u64, height: u64) -> bool {
        self.state.lock_whitelist.is_whitelisted(sender, amount, height)
    }

    /// Record a credited lock by `sender`.
    pub fn consume_lock_whitelist(&mut self, sender: &ExternalAddress) {
        self.state.lock_whitelist.consume(sender);
    }

    /// Whitelist `address` for one lock of at most `max_value`.
    pub fn add_one_off_lock_whitelist_address(
        &mut self,
        caller: &Address,
        address: ExternalAddress,
        max_value: u64,
    ) -> i32 {
        self.state
            .lock_whitelist
            .add_one_off(&self.authorizers.lock_whitelist, caller, address, max_value)
    }

    /// Whitelist `address` without limits.
    pub fn add_unlimited_lock_whitelist_address(
        &mut self,
        caller: &Address,
        address: ExternalAddress,
    ) -> i32 {
        self.state
            .lock_whitelist
            .add_unlimited(&self.authorizers.lock_whitelist, caller, address)
    }

    /// Remove `address` from the whitelist.
    pub fn remove_lock_whitelist_address(
        &mut self,
        caller: &Address,
        address: &ExternalAddress,
    ) -> i32 {
        self.state
            .lock_whitelist
            .remove(&self.authorizers.lock_whitelist, caller, address)
    }

    /// Disable the whitelist `delay` blocks after `current_height`.
    pub fn set_lock_whitelist_disable_block_delay(
        &mut self,
        caller: &Address,
        delay: u64,
        current_height: u64,
    ) -> i32 {
        self.state.lock_whitelist.set_disable_block_delay(
            &self.authorizers.lock_whitelist,
            caller,
            delay,
            current_height,
        )
    }

    /// Fee per kb in force.
    pub fn fee_per_kb(&self) -> u64 {
        self.state.fee_per_kb.fee_per_kb()
    }

    /// Vote for a new fee per kb capped at `max_fee`.
    pub fn vote_fee_per_kb(&mut self, voter: &Address, fee: u64, max_fee: u64) -> ElectionResult {
        let result = self
            .state
            .fee_per_kb
            .vote(&self.authorizers.fee_per_kb, voter, fee, max_fee);
        self.metrics.record(result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::codes::{GENERIC_ERROR, HASH_MISMATCH, NOT_FOUND, SUCCESS};
    use shared_crypto::Secp256k1KeyPair;

    const CTX: ChangeContext = ChangeContext {
        block_number: 100,
        now_ms: 50_000,
    };

    fn key(seed: u8) -> Secp256k1PublicKey {
        Secp256k1KeyPair::from_bytes([seed; 32]).unwrap().public_key()
    }

    fn voter(i: u8) -> Address {
        [i; 20]
    }

    fn registry() -> FederationRegistry {
        let config = FederationConfig {
            federation_change_voters: (1..=3).map(|i| hex::encode(voter(i))).collect(),
            lock_whitelist_admins: vec![hex::encode(voter(1))],
            fee_per_kb_voters: (1..=3).map(|i| hex::encode(voter(i))).collect(),
            ..Default::default()
        };
        let genesis = Federation::new(vec![key(1), key(2), key(3)], 0, 0).unwrap();
        FederationRegistry::new(config, FederationState::genesis(genesis, 1_000)).unwrap()
    }

    fn with_quorum(
        registry: &mut FederationRegistry,
        mut call: impl FnMut(&mut FederationRegistry, &Address) -> ElectionResult,
    ) -> ElectionResult {
        assert_eq!(call(registry, &voter(1)), ElectionResult::Voted);
        call(registry, &voter(2))
    }

    #[test]
    fn test_commit_by_quorum() {
        let mut registry = registry();
        let old = registry.active().clone();

        let created = with_quorum(&mut registry, |r, v| r.create_pending(v, CTX));
        assert_eq!(created, ElectionResult::Executed(SUCCESS));
        for seed in [7, 8, 9] {
            let added = with_quorum(&mut registry, |r, v| r.add_pending_key(v, key(seed), CTX));
            assert_eq!(added, ElectionResult::Executed(SUCCESS));
        }

        let hash = registry.pending().unwrap().hash();
        let committed = with_quorum(&mut registry, |r, v| r.commit_pending(v, hash, CTX));
        assert_eq!(committed, ElectionResult::Executed(SUCCESS));

        assert_eq!(registry.retiring(), Some(&old));
        assert_eq!(registry.active().size(), 3);
        assert!(registry.active().has_member(&key(8)));
        assert!(registry.pending().is_none());
        assert!(registry.is_member(&key(1)));
        assert_eq!(registry.metrics().commits(), 1);
    }

    #[test]
    fn test_commit_with_stale_hash_changes_nothing() {
        let mut registry = registry();
        with_quorum(&mut registry, |r, v| r.create_pending(v, CTX));
        with_quorum(&mut registry, |r, v| r.add_pending_key(v, key(7), CTX));
        with_quorum(&mut registry, |r, v| r.add_pending_key(v, key(8), CTX));
        let before = registry.state().clone();

        let stale = [0x42; 32];
        for i in 1..=3 {
            let result = registry.commit_pending(&voter(i), stale, CTX);
            assert_eq!(result, ElectionResult::Rejected(HASH_MISMATCH));
        }
        assert_eq!(registry.state(), &before);
    }

    #[test]
    fn test_unauthorized_and_failed_dry_runs() {
        let mut registry = registry();
        assert_eq!(registry.create_pending(&voter(9), CTX).code(), GENERIC_ERROR);
        assert_eq!(registry.rollback_pending(&voter(1), CTX).code(), NOT_FOUND);
        assert!(registry.state().change_election.is_empty());
    }

    #[test]
    fn test_migration_and_drop() {
        let mut registry = registry();
        with_quorum(&mut registry, |r, v| r.create_pending(v, CTX));
        with_quorum(&mut registry, |r, v| r.add_pending_key(v, key(7), CTX));
        with_quorum(&mut registry, |r, v| r.add_pending_key(v, key(8), CTX));
        let hash = registry.pending().unwrap().hash();
        with_quorum(&mut registry, |r, v| r.commit_pending(v, hash, CTX));

        let config = registry.config().clone();
        let activated = CTX.block_number + config.activation_age;
        assert_eq!(registry.migration_phase(activated), MigrationPhase::Waiting);
        assert_eq!(
            registry.migration_phase(activated + config.funds_migration_age_begin),
            MigrationPhase::Migrating
        );
        assert_eq!(
            registry.migration_phase(activated + config.funds_migration_age_end),
            MigrationPhase::Expired
        );
        let retiring_script = registry.retiring().unwrap().redeem_script();
        assert!(registry.retired_redeem_scripts().is_empty());
        assert!(registry.drop_retiring().is_some());
        assert_eq!(registry.retired_redeem_scripts(), &[retiring_script]);
        assert!(registry.drop_retiring().is_none());
        assert_eq!(registry.retired_redeem_scripts().len(), 1);
        assert_eq!(
            registry.migration_phase(activated + config.funds_migration_age_end),
            MigrationPhase::NoRetiring
        );
    }

    #[test]
    fn test_whitelist_and_fee_through_registry() {
        let mut registry = registry();
        let sender = [0x33; 20];
        assert_eq!(
            registry.add_one_off_lock_whitelist_address(&voter(2), sender, 10),
            GENERIC_ERROR
        );
        assert_eq!(
            registry.add_one_off_lock_whitelist_address(&voter(1), sender, 10),
            SUCCESS
        );
        assert!(registry.is_lock_whitelisted(&sender, 10, CTX.block_number));
        registry.consume_lock_whitelist(&sender);
        assert!(!registry.is_lock_whitelisted(&sender, 10, CTX.block_number));

        let result = with_quorum(&mut registry, |r, v| r.vote_fee_per_kb(v, 5_000, 10_000));
        assert_eq!(result, ElectionResult::Executed(SUCCESS));
        assert_eq!(registry.fee_per_kb(), 5_000);
    }

    #[test]
    fn test_state_survives_bincode() {
        let mut registry = registry();
        with_quorum(&mut registry, |r, v| r.create_pending(v, CTX));
        registry.add_pending_key(&voter(1), key(7), CTX);

        let bytes = bincode::serialize(registry.state()).unwrap();
        let restored: FederationState = bincode::deserialize(&bytes).unwrap();
        assert_eq!(&restored, registry.state());
    }
}
