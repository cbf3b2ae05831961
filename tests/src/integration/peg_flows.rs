//! # Peg Flows
//!
//! End-to-end federated peg scenarios: a lock on the external chain
//! becomes ledger balance, a release request becomes a fully signed
//! external transaction, and a federation change moves the funds to the
//! new federation.

#[cfg(test)]
mod tests {
    use super::super::init_tracing;
    use pc_04_federation::codes::{HASH_MISMATCH, SUCCESS};
    use pc_04_federation::MigrationPhase;
    use pc_05_bridge::domain::{to_ledger_units, value_paid_to, MerkleBranch};
    use pc_05_bridge::test_utils::{ctx, new_key, BridgeHarness};
    use pc_05_bridge::{ExternalTransaction, RegistrationOutcome, SignatureOutcome};
    use primitive_types::U256;
    use shared_crypto::Secp256k1KeyPair;
    use shared_types::{Alarm, Hash};

    /// Promote the oldest built transaction at `block` and return the
    /// transaction with the ledger hash it awaits signatures under.
    fn promote(harness: &BridgeHarness, block: u64) -> (Hash, ExternalTransaction) {
        let report = harness
            .bridge
            .periodic_maintenance(&ctx(block))
            .expect("maintenance");
        let hash = report.promoted.expect("a confirmed transaction");
        let tx = harness
            .bridge
            .awaiting_signature(&hash)
            .expect("promoted transaction");
        (hash, tx)
    }

    fn sign(
        harness: &BridgeHarness,
        federator: usize,
        tx: &ExternalTransaction,
        hash: &Hash,
        block: u64,
    ) -> SignatureOutcome {
        harness
            .bridge
            .add_signature(
                &ctx(block),
                &harness.federator_key(federator),
                harness.sign_all(federator, tx),
                hash,
            )
            .expect("signature submission")
    }

    #[test]
    fn test_peg_round_trip() {
        init_tracing();
        let harness = BridgeHarness::new();
        harness.lock_whitelisted(0, 2_000_000, 1);
        assert_eq!(harness.balance(&harness.user_ledger(0)), to_ledger_units(2_000_000));

        harness.request(0, 500_000, 2);
        assert_eq!(harness.balance(&harness.user_ledger(0)), to_ledger_units(1_500_000));

        let built = harness.bridge.periodic_maintenance(&ctx(3)).unwrap();
        assert_eq!(built.releases_built, 1);

        let confirmations = harness.bridge.config().ledger_confirmations_for_release;
        let (hash, tx) = promote(&harness, 3 + confirmations);

        assert!(matches!(
            sign(&harness, 1, &tx, &hash, 20),
            SignatureOutcome::Added { .. }
        ));
        let SignatureOutcome::Complete { tx: signed } = sign(&harness, 2, &tx, &hash, 21) else {
            panic!("two of three signatures complete the release");
        };

        // Broadcast and seen on the external chain: the change returns to
        // the wallet.
        let federation = harness.bridge.federation_address();
        let change = value_paid_to(&signed, &federation);
        assert_eq!(change, 1_500_000);
        assert_eq!(harness.register(&signed, 30), RegistrationOutcome::ReleaseRecorded);
        assert_eq!(harness.bridge.active_balance(), change);

        let metrics = harness.bridge.metrics();
        assert_eq!(metrics.credited(), 1);
        assert!(harness.alarms.alarms().is_empty());
    }

    #[test]
    fn test_shallow_lock_is_credited_once_deep_enough() {
        init_tracing();
        let harness = BridgeHarness::new();
        harness
            .bridge
            .add_unlimited_lock_whitelist_address(&harness.whitelist_admin(), harness.user_external(1))
            .unwrap();
        let tx = harness.lock_tx(1, &harness.bridge.federation_address(), 250_000);
        let (height, proof) = harness.include(&tx);
        let required = harness.bridge.config().min_external_confirmations;

        harness.chain.set_best_height(height);
        let first = harness
            .bridge
            .register_external_tx(&ctx(5), &harness.federator_ledger(0), tx.serialize(), height, proof.clone())
            .unwrap();
        assert_eq!(
            first,
            RegistrationOutcome::InsufficientConfirmations {
                confirmations: 1,
                required
            }
        );
        assert!(!harness.bridge.is_external_tx_processed(&tx.txid()));

        harness.chain.set_best_height(height + required - 1);
        let retry = harness
            .bridge
            .register_external_tx(&ctx(6), &harness.federator_ledger(2), tx.serialize(), height, proof)
            .unwrap();
        assert!(matches!(retry, RegistrationOutcome::Credited { value: 250_000, .. }));
        assert_eq!(harness.bridge.external_tx_processed_height(&tx.txid()), Some(6));
        assert_eq!(harness.balance(&harness.user_ledger(1)), to_ledger_units(250_000));
    }

    #[test]
    fn test_one_off_whitelist_admits_a_single_lock() {
        init_tracing();
        let harness = BridgeHarness::new();
        let sender = harness.user_external(2);
        assert_eq!(
            harness
                .bridge
                .add_one_off_lock_whitelist_address(&harness.whitelist_admin(), sender, 300_000)
                .unwrap(),
            SUCCESS
        );
        let federation = harness.bridge.federation_address();

        let first = harness.register(&harness.lock_tx(2, &federation, 300_000), 1);
        assert!(matches!(first, RegistrationOutcome::Credited { value: 300_000, .. }));
        assert!(harness.bridge.lock_whitelist_entry(&sender).is_none());

        let second = harness.register(&harness.lock_tx(2, &federation, 300_000), 2);
        assert!(matches!(second, RegistrationOutcome::Refunded { value: 300_000, .. }));
        assert_eq!(harness.balance(&harness.user_ledger(2)), to_ledger_units(300_000));
        assert_eq!(harness.bridge.active_balance(), 300_000);
    }

    #[test]
    fn test_forged_proof_then_replay() {
        init_tracing();
        let harness = BridgeHarness::new();
        harness
            .bridge
            .add_unlimited_lock_whitelist_address(&harness.whitelist_admin(), harness.user_external(0))
            .unwrap();
        let tx = harness.lock_tx(0, &harness.bridge.federation_address(), 120_000);
        let (height, proof) = harness.include(&tx);

        let forged = MerkleBranch {
            hashes: vec![[0x42; 32]],
            path: proof.path,
        };
        let outcome = harness
            .bridge
            .register_external_tx(&ctx(3), &harness.federator_ledger(0), tx.serialize(), height, forged)
            .unwrap();
        assert_eq!(outcome, RegistrationOutcome::MerkleRootMismatch);
        assert!(matches!(
            harness.alarms.alarms().as_slice(),
            [Alarm::MerkleRootMismatch { .. }]
        ));
        assert_eq!(harness.balance(&harness.user_ledger(0)), U256::zero());

        let honest = harness
            .bridge
            .register_external_tx(&ctx(4), &harness.federator_ledger(0), tx.serialize(), height, proof.clone())
            .unwrap();
        assert!(matches!(honest, RegistrationOutcome::Credited { .. }));

        // Same transaction through another federator, and through a bridge
        // reopened from storage.
        let replay = harness
            .bridge
            .register_external_tx(&ctx(5), &harness.federator_ledger(1), tx.serialize(), height, proof.clone())
            .unwrap();
        assert_eq!(replay, RegistrationOutcome::AlreadyProcessed { height: 4 });
        let reopened = harness.reopen();
        let replay = reopened
            .register_external_tx(&ctx(6), &harness.federator_ledger(2), tx.serialize(), height, proof)
            .unwrap();
        assert_eq!(replay, RegistrationOutcome::AlreadyProcessed { height: 4 });
        assert_eq!(harness.balance(&harness.user_ledger(0)), to_ledger_units(120_000));
    }

    #[test]
    fn test_partial_signatures_survive_restart() {
        init_tracing();
        let harness = BridgeHarness::new();
        harness.lock_whitelisted(0, 1_000_000, 1);
        harness.request(0, 400_000, 2);
        harness.bridge.periodic_maintenance(&ctx(3)).unwrap();
        let (hash, tx) = promote(&harness, 50);

        let mut tampered = harness.sign_all(0, &tx);
        tampered[0][10] ^= 0x01;
        let rejected = harness
            .bridge
            .add_signature(&ctx(51), &harness.federator_key(0), tampered, &hash)
            .unwrap();
        assert_eq!(rejected, SignatureOutcome::InvalidSignature { input: 0 });

        assert!(matches!(
            sign(&harness, 0, &tx, &hash, 52),
            SignatureOutcome::Added { .. }
        ));

        let reopened = harness.reopen();
        let partial = reopened.awaiting_signature(&hash).expect("persisted");
        assert_ne!(partial, tx);
        let outcome = reopened
            .add_signature(&ctx(53), &harness.federator_key(1), harness.sign_all(1, &tx), &hash)
            .unwrap();
        assert!(matches!(outcome, SignatureOutcome::Complete { .. }));
        assert_eq!(reopened.awaiting_signatures_len(), 0);
    }

    #[test]
    fn test_stale_federation_hash_cannot_commit() {
        init_tracing();
        let harness = BridgeHarness::new();
        let c = ctx(10);
        let voters = [harness.federator_ledger(0), harness.federator_ledger(1)];
        for voter in &voters {
            harness.bridge.create_federation(&c, voter).unwrap();
        }
        for voter in &voters {
            harness
                .bridge
                .add_federator_public_key(&c, voter, new_key(0x71))
                .unwrap();
        }
        let stale = harness.bridge.pending_federation_hash().unwrap();
        for voter in &voters {
            harness
                .bridge
                .add_federator_public_key(&c, voter, new_key(0x72))
                .unwrap();
        }

        assert_eq!(
            harness.bridge.commit_federation(&c, &voters[0], stale).unwrap(),
            HASH_MISMATCH
        );
        assert_eq!(harness.bridge.pending_federation_size(), Some(2));

        let current = harness.bridge.pending_federation_hash().unwrap();
        for voter in &voters {
            harness.bridge.commit_federation(&c, voter, current).unwrap();
        }
        assert!(harness.bridge.pending_federation_hash().is_none());
        assert!(harness.bridge.retiring_federation_address().is_some());
    }

    #[test]
    fn test_federation_rotation_migrates_funds() {
        init_tracing();
        let harness = BridgeHarness::new();
        harness.lock_whitelisted(0, 3_000_000, 1);
        let old_address = harness.bridge.federation_address();

        harness.elect_new_federation(&[0x71, 0x72, 0x73], 10);
        let new_address = harness.bridge.federation_address();
        assert_ne!(new_address, old_address);
        assert_eq!(harness.bridge.retiring_balance(), 3_000_000);

        let config = harness.federation_config();
        let begin = 10 + config.activation_age + config.funds_migration_age_begin;
        let end = 10 + config.activation_age + config.funds_migration_age_end;
        assert_eq!(harness.bridge.migration_phase(begin + 1), MigrationPhase::Migrating);

        let report = harness.bridge.periodic_maintenance(&ctx(begin + 1)).unwrap();
        assert!(report.migration_built);
        assert_eq!(harness.bridge.retiring_balance(), 0);

        let confirmations = harness.bridge.config().ledger_confirmations_for_release;
        let (hash, tx) = promote(&harness, begin + 1 + confirmations);

        // Members of the new federation cannot sign the retiring wallet's
        // inputs.
        let newcomer = Secp256k1KeyPair::from_bytes([0x71; 32]).unwrap();
        let outcome = harness
            .bridge
            .add_signature(
                &ctx(begin + 20),
                &newcomer.public_key(),
                harness.sign_all_with(&newcomer, &tx),
                &hash,
            )
            .unwrap();
        assert_eq!(outcome, SignatureOutcome::WrongFederation);

        assert!(matches!(
            sign(&harness, 0, &tx, &hash, begin + 21),
            SignatureOutcome::Added { .. }
        ));
        let SignatureOutcome::Complete { tx: signed } = sign(&harness, 1, &tx, &hash, begin + 22) else {
            panic!("retiring threshold reached");
        };

        let migrated = value_paid_to(&signed, &new_address);
        assert!(migrated > 0 && migrated < 3_000_000);
        assert_eq!(
            harness.register(&signed, begin + 30),
            RegistrationOutcome::MigrationRecorded
        );
        assert_eq!(harness.bridge.active_balance(), migrated);

        // New locks go to the new federation.
        harness.lock_whitelisted(1, 200_000, begin + 31);
        assert_eq!(harness.bridge.active_balance(), migrated + 200_000);

        let expired = harness.bridge.periodic_maintenance(&ctx(end + 1)).unwrap();
        assert!(expired.retiring_dropped);
        assert!(harness.bridge.retiring_federation_address().is_none());
        assert!(harness.alarms.alarms().is_empty());
    }
}
