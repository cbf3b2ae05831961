//! Federation change calls and their state transitions.

use crate::domain::codes::{GENERIC_ERROR, HASH_MISMATCH, INCOMPLETE, NOT_FOUND, SUCCESS};
use crate::domain::election::ExecutionMode;
use crate::domain::federation::{Federation, PendingFederation, MAX_FEDERATION_SIZE};
use serde::{Deserialize, Serialize};
use shared_crypto::Secp256k1PublicKey;
use tracing::info;

/// A vote-driven federation change.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FederationChange {
    /// Open an empty pending federation
    CreatePending,
    /// Add a key to the pending federation
    AddPendingKey(Secp256k1PublicKey),
    /// Replace the active federation with the pending one whose hash is given
    CommitPending([u8; 32]),
    /// Discard the pending federation
    RollbackPending,
}

/// Ledger position a change executes at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeContext {
    /// Current ledger height
    pub block_number: u64,
    /// Current ledger time (ms)
    pub now_ms: u64,
}

/// Where the retiring federation's funds stand relative to the migration
/// window of the active federation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationPhase {
    /// Nothing to migrate
    NoRetiring,
    /// Retiring federation live, window not open yet
    Waiting,
    /// Inside the migration window
    Migrating,
    /// Past the window; sweep what is left and drop the retiring federation
    Expired,
}

/// Migration window bounds, in blocks after the active federation's commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationWindow {
    /// Blocks after a commit before activation
    pub activation_age: u64,
    /// Blocks after activation when migration starts
    pub begin: u64,
    /// Blocks after activation when migration ends
    pub end: u64,
}

/// The active, retiring and pending federations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Federations {
    /// Federation guarding new locks and releases
    pub active: Federation,
    /// Previous federation whose funds are being migrated
    pub retiring: Option<Federation>,
    /// Federation being assembled by vote
    pub pending: Option<PendingFederation>,
}

impl Federations {
    /// Only `active` is live.
    pub fn new(active: Federation) -> Self {
        Self {
            active,
            retiring: None,
            pending: None,
        }
    }

    /// Whether `key` belongs to the active or the retiring federation.
    pub fn is_member(&self, key: &Secp256k1PublicKey) -> bool {
        self.active.has_member(key) || self.retiring.as_ref().is_some_and(|f| f.has_member(key))
    }

    /// Migration phase at ledger `height`.
    pub fn migration_phase(&self, height: u64, window: MigrationWindow) -> MigrationPhase {
        if self.retiring.is_none() {
            return MigrationPhase::NoRetiring;
        }
        let activated = self
            .active
            .creation_block_number()
            .saturating_add(window.activation_age);
        if height >= activated.saturating_add(window.end) {
            MigrationPhase::Expired
        } else if height >= activated.saturating_add(window.begin) {
            MigrationPhase::Migrating
        } else {
            MigrationPhase::Waiting
        }
    }

    /// Apply `change`, or only check it in dry-run mode.
    pub fn apply(
        &mut self,
        change: &FederationChange,
        mode: ExecutionMode,
        ctx: ChangeContext,
        min_pending_keys: usize,
    ) -> i32 {
        match change {
            FederationChange::CreatePending => {
                if self.pending.is_some() {
                    return NOT_FOUND;
                }
                if self.retiring.is_some() {
                    return INCOMPLETE;
                }
                if mode.is_execute() {
                    info!("[pc-04] Pending federation created at #{}", ctx.block_number);
                    self.pending = Some(PendingFederation::new());
                }
                SUCCESS
            }
            FederationChange::AddPendingKey(key) => {
                let Some(pending) = self.pending.as_mut() else {
                    return NOT_FOUND;
                };
                if pending.contains(key) {
                    return INCOMPLETE;
                }
                if pending.size() >= MAX_FEDERATION_SIZE {
                    return GENERIC_ERROR;
                }
                if mode.is_execute() {
                    pending.add_key(*key);
                }
                SUCCESS
            }
            FederationChange::CommitPending(hash) => {
                let Some(pending) = self.pending.as_ref() else {
                    return NOT_FOUND;
                };
                if pending.hash() != *hash {
                    return HASH_MISMATCH;
                }
                if !pending.is_complete(min_pending_keys) {
                    return INCOMPLETE;
                }
                let Ok(federation) = pending.build(ctx.now_ms, ctx.block_number) else {
                    return GENERIC_ERROR;
                };
                if mode.is_execute() {
                    info!(
                        "[pc-04] Federation {} committed at #{}, {} members",
                        hex::encode(federation.address()),
                        ctx.block_number,
                        federation.size()
                    );
                    let previous = std::mem::replace(&mut self.active, federation);
                    self.retiring = Some(previous);
                    self.pending = None;
                }
                SUCCESS
            }
            FederationChange::RollbackPending => {
                if self.pending.is_none() {
                    return NOT_FOUND;
                }
                if mode.is_execute() {
                    info!("[pc-04] Pending federation rolled back");
                    self.pending = None;
                }
                SUCCESS
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_crypto::Secp256k1KeyPair;

    const CTX: ChangeContext = ChangeContext {
        block_number: 50,
        now_ms: 9_000,
    };

    fn key(seed: u8) -> Secp256k1PublicKey {
        Secp256k1KeyPair::from_bytes([seed; 32]).unwrap().public_key()
    }

    fn federations() -> Federations {
        Federations::new(Federation::new(vec![key(1), key(2), key(3)], 0, 0).unwrap())
    }

    fn execute(federations: &mut Federations, change: FederationChange) -> i32 {
        federations.apply(&change, ExecutionMode::Execute, CTX, 2)
    }

    #[test]
    fn test_dry_run_does_not_mutate() {
        let mut feds = federations();
        let before = feds.clone();
        assert_eq!(
            feds.apply(&FederationChange::CreatePending, ExecutionMode::DryRun, CTX, 2),
            SUCCESS
        );
        assert_eq!(feds, before);
    }

    #[test]
    fn test_full_change_cycle() {
        let mut feds = federations();
        let old_address = feds.active.address();
        assert_eq!(execute(&mut feds, FederationChange::CreatePending), SUCCESS);
        assert_eq!(execute(&mut feds, FederationChange::CreatePending), NOT_FOUND);
        assert_eq!(execute(&mut feds, FederationChange::AddPendingKey(key(4))), SUCCESS);
        assert_eq!(execute(&mut feds, FederationChange::AddPendingKey(key(4))), INCOMPLETE);

        let hash = feds.pending.as_ref().unwrap().hash();
        assert_eq!(execute(&mut feds, FederationChange::CommitPending(hash)), INCOMPLETE);
        assert_eq!(execute(&mut feds, FederationChange::AddPendingKey(key(5))), SUCCESS);

        let hash = feds.pending.as_ref().unwrap().hash();
        assert_eq!(
            execute(&mut feds, FederationChange::CommitPending([0u8; 32])),
            HASH_MISMATCH
        );
        assert_eq!(execute(&mut feds, FederationChange::CommitPending(hash)), SUCCESS);

        assert!(feds.pending.is_none());
        assert_eq!(feds.retiring.as_ref().unwrap().address(), old_address);
        assert_eq!(feds.active.size(), 2);
        assert_eq!(feds.active.creation_block_number(), 50);
        assert_eq!(feds.active.creation_time_ms(), 9_000);
        assert!(feds.is_member(&key(1)));
        assert!(feds.is_member(&key(5)));

        // No new pending federation while the old one is retiring.
        assert_eq!(execute(&mut feds, FederationChange::CreatePending), INCOMPLETE);
    }

    #[test]
    fn test_stale_hash_reported_before_completeness() {
        let mut feds = federations();
        execute(&mut feds, FederationChange::CreatePending);
        let stale = feds.pending.as_ref().unwrap().hash();
        assert_eq!(execute(&mut feds, FederationChange::CommitPending(stale)), INCOMPLETE);

        execute(&mut feds, FederationChange::AddPendingKey(key(4)));
        assert_eq!(
            execute(&mut feds, FederationChange::CommitPending(stale)),
            HASH_MISMATCH
        );
        assert_eq!(feds.pending.as_ref().unwrap().size(), 1);
        assert!(feds.retiring.is_none());
    }

    #[test]
    fn test_migration_phases() {
        let window = MigrationWindow {
            activation_age: 10,
            begin: 5,
            end: 20,
        };
        let mut feds = federations();
        assert_eq!(feds.migration_phase(1_000, window), MigrationPhase::NoRetiring);

        execute(&mut feds, FederationChange::CreatePending);
        execute(&mut feds, FederationChange::AddPendingKey(key(4)));
        execute(&mut feds, FederationChange::AddPendingKey(key(5)));
        let hash = feds.pending.as_ref().unwrap().hash();
        execute(&mut feds, FederationChange::CommitPending(hash));

        // Committed at #50, activated at #60.
        assert_eq!(feds.migration_phase(64, window), MigrationPhase::Waiting);
        assert_eq!(feds.migration_phase(65, window), MigrationPhase::Migrating);
        assert_eq!(feds.migration_phase(79, window), MigrationPhase::Migrating);
        assert_eq!(feds.migration_phase(80, window), MigrationPhase::Expired);
    }

    #[test]
    fn test_calls_without_pending() {
        let mut feds = federations();
        assert_eq!(execute(&mut feds, FederationChange::AddPendingKey(key(4))), NOT_FOUND);
        assert_eq!(execute(&mut feds, FederationChange::CommitPending([0; 32])), NOT_FOUND);
        assert_eq!(execute(&mut feds, FederationChange::RollbackPending), NOT_FOUND);
        execute(&mut feds, FederationChange::CreatePending);
        assert_eq!(execute(&mut feds, FederationChange::RollbackPending), SUCCESS);
        assert!(feds.pending.is_none());
    }
}
