//! Peg-out: release requests and periodic maintenance.

use super::{Inner, LedgerContext, PegSupport};
use crate::domain::{
    p2pkh, p2sh, to_external_units, to_ledger_units, PendingRelease, ReleaseKind, ReleaseRequest,
};
use crate::error::Result;
use crate::ports::BuildRequest;
use pc_04_federation::{ExternalAddress, MigrationPhase};
use primitive_types::U256;
use shared_types::{Address, Alarm, Hash, BRIDGE_ADDRESS, ZERO_ADDRESS};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// What a maintenance call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    /// A migration transaction was built
    pub migration_built: bool,
    /// The retiring federation was dropped
    pub retiring_dropped: bool,
    /// Release transactions built
    pub releases_built: usize,
    /// Requests left queued because the wallet could not serve them
    pub releases_deferred: usize,
    /// Dust-bump excess burned (external units)
    pub burned: u64,
    /// Transaction moved to signature collection, by ledger tx hash
    pub promoted: Option<Hash>,
}

impl PegSupport {
    /// Queue a peg-out of `value` ledger units from `sender` to the
    /// external pubkey-hash address `destination`.
    ///
    /// Returns `false`, without debiting, when the amount does not exceed
    /// the minimum release value. Only whole external units are debited.
    pub fn request_release(
        &self,
        ctx: &LedgerContext,
        sender: Address,
        destination: ExternalAddress,
        value: U256,
    ) -> Result<bool> {
        let Some(amount) = to_external_units(value) else {
            warn!("[pc-05] Release of {} from {} overflows", value, hex::encode(sender));
            return Ok(false);
        };
        if amount <= self.config.minimum_release_value {
            debug!(
                "[pc-05] Release of {} below minimum {}",
                amount, self.config.minimum_release_value
            );
            return Ok(false);
        }

        self.transact(|inner| {
            inner.transfer(sender, BRIDGE_ADDRESS, to_ledger_units(amount));
            inner
                .state
                .release_requests
                .push_back(ReleaseRequest {
                    destination,
                    amount,
                });
            self.metrics.record_release_request();
            info!(
                "[pc-05] Release of {} to {} queued at block #{}",
                amount,
                hex::encode(destination),
                ctx.block_number
            );
            Ok(true)
        })
    }

    /// Run once per ledger block: migrate retiring funds, build queued
    /// releases and hand one confirmed transaction to signature collection.
    pub fn periodic_maintenance(&self, ctx: &LedgerContext) -> Result<MaintenanceReport> {
        self.transact(|inner| {
            let mut report = MaintenanceReport::default();
            self.migrate_funds(inner, ctx, &mut report);
            self.process_release_requests(inner, ctx, &mut report);
            self.promote_release(inner, ctx, &mut report);
            Ok(report)
        })
    }

    fn migrate_funds(&self, inner: &mut Inner, ctx: &LedgerContext, report: &mut MaintenanceReport) {
        match inner.registry.migration_phase(ctx.block_number) {
            MigrationPhase::NoRetiring | MigrationPhase::Waiting => {}
            MigrationPhase::Migrating => {
                let balance = inner.state.retiring_utxos.balance();
                let minimum = inner
                    .registry
                    .fee_per_kb()
                    .max(self.config.dust_threshold);
                if balance >= minimum {
                    report.migration_built = self.build_migration(inner, ctx);
                }
            }
            MigrationPhase::Expired => {
                let balance = inner.state.retiring_utxos.balance();
                if balance > 0 {
                    report.migration_built = self.build_migration(inner, ctx);
                    if !report.migration_built {
                        self.alarms.raise(Alarm::ForcedMigrationFailed {
                            retiring_balance: balance,
                        });
                    }
                }
                let abandoned = inner.state.retiring_utxos.take_all();
                if !abandoned.is_empty() {
                    warn!(
                        "[pc-05] Abandoning {} retiring UTXOs past the migration window",
                        abandoned.len()
                    );
                }
                report.retiring_dropped = inner.registry.drop_retiring().is_some();
            }
        }
    }

    /// Sweep the retiring wallet into the active one, halving the amount
    /// until the wallet can build it or it falls below dust.
    fn build_migration(&self, inner: &mut Inner, ctx: &LedgerContext) -> bool {
        let Some(retiring) = inner.registry.retiring().cloned() else {
            return false;
        };
        let destination = p2sh(&inner.registry.active().address());
        let change = p2sh(&retiring.address());
        let fee_per_kb = inner.registry.fee_per_kb();
        let utxos = inner.state.retiring_utxos.to_vec();

        let mut amount = inner.state.retiring_utxos.balance();
        while amount >= self.config.dust_threshold {
            let built = self.builder.build(&BuildRequest {
                utxos: &utxos,
                federation: &retiring,
                destination: destination.clone(),
                amount,
                change: change.clone(),
                fee_per_kb,
                dust_threshold: self.config.dust_threshold,
            });
            if let Some(built) = built {
                for outpoint in &built.spent {
                    inner.state.retiring_utxos.remove(outpoint);
                }
                info!(
                    "[pc-05] Migration of {} built spending {} inputs",
                    amount,
                    built.spent.len()
                );
                inner.state.release_transactions.push(PendingRelease {
                    tx: built.tx,
                    created_at: ctx.block_number,
                    kind: ReleaseKind::Migration,
                });
                self.metrics.record_built();
                return true;
            }
            amount /= 2;
        }
        false
    }

    /// Build a transaction for each queued request the active wallet can
    /// serve, within the iteration budget. Unserved requests keep their
    /// place in the queue.
    fn process_release_requests(
        &self,
        inner: &mut Inner,
        ctx: &LedgerContext,
        report: &mut MaintenanceReport,
    ) {
        let active = inner.registry.active().clone();
        let change = p2sh(&active.address());
        let fee_per_kb = inner.registry.fee_per_kb();
        let budget = inner
            .state
            .release_requests
            .len()
            .min(self.config.max_release_iterations);

        let mut deferred = VecDeque::new();
        for _ in 0..budget {
            let Some(request) = inner.state.release_requests.pop_front() else {
                break;
            };
            let utxos = inner.state.active_utxos.to_vec();
            let built = self.builder.build(&BuildRequest {
                utxos: &utxos,
                federation: &active,
                destination: p2pkh(&request.destination),
                amount: request.amount,
                change: change.clone(),
                fee_per_kb,
                dust_threshold: self.config.dust_threshold,
            });
            let Some(built) = built else {
                deferred.push_back(request);
                continue;
            };

            for outpoint in &built.spent {
                inner.state.active_utxos.remove(outpoint);
            }
            if built.change_bump > 0 {
                // The user received less than requested; the difference
                // left the peg as change and no longer backs ledger funds.
                inner.transfer(BRIDGE_ADDRESS, ZERO_ADDRESS, to_ledger_units(built.change_bump));
                report.burned += built.change_bump;
            }
            inner.state.release_transactions.push(PendingRelease {
                tx: built.tx,
                created_at: ctx.block_number,
                kind: ReleaseKind::Release,
            });
            report.releases_built += 1;
            self.metrics.record_built();
        }

        report.releases_deferred = deferred.len();
        while let Some(request) = deferred.pop_back() {
            inner.state.release_requests.push_front(request);
        }
        if report.releases_built > 0 || report.releases_deferred > 0 {
            info!(
                "[pc-05] Release batch: {} built, {} deferred, {} still queued",
                report.releases_built,
                report.releases_deferred,
                inner.state.release_requests.len()
            );
        }
    }

    /// Move at most one confirmed transaction to signature collection,
    /// keyed by the calling ledger transaction.
    fn promote_release(&self, inner: &mut Inner, ctx: &LedgerContext, report: &mut MaintenanceReport) {
        if inner.state.awaiting_signatures.contains_key(&ctx.tx_hash) {
            return;
        }
        let confirmations = self.config.ledger_confirmations_for_release;
        let Some(position) = inner
            .state
            .release_transactions
            .iter()
            .position(|release| release.is_confirmed(ctx.block_number, confirmations))
        else {
            return;
        };
        let release = inner.state.release_transactions.remove(position);
        debug!(
            "[pc-05] {:?} {} awaiting signatures under {}",
            release.kind,
            hex::encode(&release.tx.txid()[..8]),
            hex::encode(&ctx.tx_hash[..8])
        );
        inner
            .state
            .awaiting_signatures
            .insert(ctx.tx_hash, release.tx);
        report.promoted = Some(ctx.tx_hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::output_kind;
    use crate::domain::OutputKind;
    use crate::test_utils::*;

    #[test]
    fn test_release_below_minimum_is_refused() {
        let harness = BridgeHarness::new();
        harness.fund_user(0, 1_000_000);
        let minimum = harness.bridge.config().minimum_release_value;

        let queued = harness
            .bridge
            .request_release(&ctx(5), harness.user_ledger(0), [7; 20], to_ledger_units(minimum))
            .unwrap();

        assert!(!queued);
        assert_eq!(harness.bridge.release_requests_len(), 0);
        assert_eq!(harness.balance(&harness.user_ledger(0)), to_ledger_units(1_000_000));
    }

    #[test]
    fn test_release_without_balance_fails() {
        let harness = BridgeHarness::new();
        let result = harness.bridge.request_release(
            &ctx(5),
            harness.user_ledger(0),
            [7; 20],
            to_ledger_units(500_000),
        );
        assert!(result.is_err());
        assert_eq!(harness.bridge.release_requests_len(), 0);
    }

    #[test]
    fn test_release_flow_to_signature_collection() {
        let harness = BridgeHarness::new();
        harness.lock_whitelisted(0, 2_000_000, 1);
        harness.request(0, 500_000, 10);

        let report = harness.bridge.periodic_maintenance(&ctx(11)).unwrap();
        assert_eq!(report.releases_built, 1);
        assert_eq!(report.promoted, None);
        assert_eq!(harness.bridge.release_requests_len(), 0);
        assert_eq!(harness.bridge.release_transactions_len(), 1);
        assert_eq!(harness.bridge.active_utxos_len(), 0);

        // Not confirmed yet.
        let early = harness.bridge.periodic_maintenance(&ctx(15)).unwrap();
        assert_eq!(early.promoted, None);

        let confirmed = ctx(11 + harness.bridge.config().ledger_confirmations_for_release);
        let report = harness.bridge.periodic_maintenance(&confirmed).unwrap();
        assert_eq!(report.promoted, Some(confirmed.tx_hash));
        assert_eq!(harness.bridge.release_transactions_len(), 0);

        let tx = harness.bridge.awaiting_signature(&confirmed.tx_hash).unwrap();
        let paid: u64 = tx
            .outputs
            .iter()
            .filter(|o| output_kind(&o.script_pubkey) == OutputKind::PayToPubKeyHash([0x77; 20]))
            .map(|o| o.value)
            .sum();
        assert!(paid > 0 && paid < 500_000);
    }

    #[test]
    fn test_dust_bump_excess_is_burned() {
        let harness = BridgeHarness::new();
        harness.lock_whitelisted(0, 1_000_000, 1);
        harness.request(0, 996_000, 2);
        let dust = harness.bridge.config().dust_threshold;

        let report = harness.bridge.periodic_maintenance(&ctx(3)).unwrap();

        assert_eq!(report.burned, dust - 4_000);
        assert_eq!(harness.balance(&ZERO_ADDRESS), to_ledger_units(dust - 4_000));
        let tx = &harness.bridge.snapshot().bridge.release_transactions[0].tx;
        assert_eq!(tx.outputs[1].value, dust);
    }

    #[test]
    fn test_unserved_requests_keep_their_place() {
        let harness = BridgeHarness::new();
        harness.lock_whitelisted(0, 300_000, 1);
        harness.fund_user(1, 10_000_000);
        harness.request(1, 1_000_000, 2);
        harness.request(1, 200_000, 3);

        let report = harness.bridge.periodic_maintenance(&ctx(4)).unwrap();

        assert_eq!(report.releases_built, 1);
        assert_eq!(report.releases_deferred, 1);
        let queue = harness.bridge.release_requests();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].amount, 1_000_000);
    }

    #[test]
    fn test_iteration_budget_bounds_batch() {
        let harness = BridgeHarness::with_config(crate::BridgeConfig {
            max_release_iterations: 2,
            ..Default::default()
        });
        for height in 1..5 {
            harness.lock_whitelisted(0, 1_000_000, height);
        }
        for height in 5..9 {
            harness.request(0, 200_000, height);
        }

        let report = harness.bridge.periodic_maintenance(&ctx(9)).unwrap();

        assert_eq!(report.releases_built, 2);
        assert_eq!(harness.bridge.release_requests_len(), 2);

        // Built transactions spend distinct outputs that left the wallet.
        let state = harness.bridge.snapshot().bridge;
        let reserved = state.reserved_outpoints();
        assert_eq!(reserved.len(), 2);
        assert!(state.active_utxos.iter().all(|u| !reserved.contains(&u.outpoint)));
        assert_eq!(state.active_utxos.len(), 2);
    }

    #[test]
    fn test_one_promotion_per_call() {
        let harness = BridgeHarness::new();
        harness.lock_whitelisted(0, 1_000_000, 1);
        harness.lock_whitelisted(0, 1_000_000, 2);
        harness.request(0, 200_000, 3);
        harness.request(0, 200_000, 4);
        harness.bridge.periodic_maintenance(&ctx(5)).unwrap();
        assert_eq!(harness.bridge.release_transactions_len(), 2);

        let later = ctx(100);
        let report = harness.bridge.periodic_maintenance(&later).unwrap();
        assert_eq!(report.promoted, Some(later.tx_hash));
        assert_eq!(harness.bridge.release_transactions_len(), 1);

        // Same ledger transaction again: nothing more is promoted.
        let again = harness.bridge.periodic_maintenance(&later).unwrap();
        assert_eq!(again.promoted, None);
        assert_eq!(harness.bridge.release_transactions_len(), 1);
    }
}
