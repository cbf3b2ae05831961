//! Peg support service
//!
//! Every mutating call runs under the global ordering lock as one
//! transaction over the bridge state, the federation registry and the
//! ledger transfers it requests. A call either persists all of it or, on
//! error, none of it.

mod governance;
mod peg_in;
mod peg_out;
mod queries;
mod signatures;

pub use peg_in::RegistrationOutcome;
pub use peg_out::MaintenanceReport;
pub use queries::FederationKind;
pub use signatures::SignatureOutcome;

use crate::config::BridgeConfig;
use crate::domain::{BridgeSnapshot, BridgeState};
use crate::error::Result;
use crate::metrics::Metrics;
use crate::ports::{BridgeStorage, ExternalChainView, LedgerAccounts, ReleaseTransactionBuilder};
use parking_lot::Mutex;
use pc_04_federation::{ChangeContext, Federation, FederationConfig, FederationRegistry, FederationState};
use primitive_types::U256;
use shared_types::{Address, AlarmReporter, GlobalOrdering, Hash};
use std::sync::Arc;
use tracing::{info, warn};

/// Collaborators of [`PegSupport`].
pub struct BridgeDependencies {
    /// Canonical external headers
    pub external_chain: Arc<dyn ExternalChainView>,
    /// Federation wallet
    pub builder: Arc<dyn ReleaseTransactionBuilder>,
    /// Ledger balances
    pub accounts: Arc<dyn LedgerAccounts>,
    /// Durable state
    pub storage: Arc<dyn BridgeStorage>,
    /// Operator alarm sink
    pub alarms: Arc<dyn AlarmReporter>,
}

/// Ledger transaction a bridge call executes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerContext {
    /// Height of the block being executed
    pub block_number: u64,
    /// Hash of the calling ledger transaction
    pub tx_hash: Hash,
    /// Timestamp of the block being executed (ms)
    pub now_ms: u64,
}

impl LedgerContext {
    fn change(&self) -> ChangeContext {
        ChangeContext {
            block_number: self.block_number,
            now_ms: self.now_ms,
        }
    }
}

/// A ledger transfer requested by a call, applied when the call succeeds.
#[derive(Debug, Clone, Copy)]
struct Transfer {
    from: Address,
    to: Address,
    amount: U256,
}

struct Inner {
    state: BridgeState,
    registry: FederationRegistry,
    transfers: Vec<Transfer>,
}

impl Inner {
    fn transfer(&mut self, from: Address, to: Address, amount: U256) {
        self.transfers.push(Transfer { from, to, amount });
    }

    fn snapshot(&self) -> BridgeSnapshot {
        BridgeSnapshot {
            bridge: self.state.clone(),
            federation: self.registry.state().clone(),
        }
    }
}

/// Two-way peg between the ledger and the external chain.
pub struct PegSupport {
    config: BridgeConfig,
    external_chain: Arc<dyn ExternalChainView>,
    builder: Arc<dyn ReleaseTransactionBuilder>,
    accounts: Arc<dyn LedgerAccounts>,
    storage: Arc<dyn BridgeStorage>,
    alarms: Arc<dyn AlarmReporter>,
    ordering: GlobalOrdering,
    inner: Mutex<Inner>,
    metrics: Metrics,
}

impl PegSupport {
    /// Open the bridge, resuming from storage when a snapshot exists and
    /// starting from `genesis` otherwise.
    pub fn new(
        config: BridgeConfig,
        federation_config: FederationConfig,
        genesis: Federation,
        deps: BridgeDependencies,
        ordering: GlobalOrdering,
    ) -> Result<Self> {
        config.validate()?;
        let (state, federation_state) = match deps.storage.load()? {
            Some(snapshot) => {
                info!(
                    "[pc-05] Resumed bridge state: {} active UTXOs, {} queued releases",
                    snapshot.bridge.active_utxos.len(),
                    snapshot.bridge.release_requests.len()
                );
                (snapshot.bridge, snapshot.federation)
            }
            None => {
                info!(
                    "[pc-05] Starting bridge with genesis federation {}",
                    hex::encode(genesis.address())
                );
                (
                    BridgeState::default(),
                    FederationState::genesis(genesis, config.initial_fee_per_kb),
                )
            }
        };
        let registry = FederationRegistry::new(federation_config, federation_state)?;

        Ok(Self {
            config,
            external_chain: deps.external_chain,
            builder: deps.builder,
            accounts: deps.accounts,
            storage: deps.storage,
            alarms: deps.alarms,
            ordering,
            inner: Mutex::new(Inner {
                state,
                registry,
                transfers: Vec::new(),
            }),
            metrics: Metrics::new(),
        })
    }

    /// Bridge configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Metrics.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Run `op` as one transaction.
    ///
    /// On success the requested transfers are applied and the new state is
    /// saved. On any error the transfers already applied are reversed and
    /// both the bridge and federation state are restored.
    fn transact<T>(&self, op: impl FnOnce(&mut Inner) -> Result<T>) -> Result<T> {
        let _ordering = self.ordering.lock();
        let mut inner = self.inner.lock();
        let bridge_backup = inner.state.clone();
        let federation_backup = inner.registry.state().clone();
        inner.transfers.clear();

        let outcome = op(&mut *inner).and_then(|value| {
            let transfers = std::mem::take(&mut inner.transfers);
            self.commit(&*inner, &transfers)?;
            Ok(value)
        });

        if let Err(e) = &outcome {
            warn!("[pc-05] Bridge call rolled back: {}", e);
            inner.state = bridge_backup;
            inner.registry.restore(federation_backup);
            inner.transfers.clear();
            self.metrics.record_rollback();
        }
        outcome
    }

    fn commit(&self, inner: &Inner, transfers: &[Transfer]) -> Result<()> {
        let mut applied = Vec::with_capacity(transfers.len());
        let result = self
            .apply_transfers(transfers, &mut applied)
            .and_then(|()| self.storage.save(&inner.snapshot()));

        if result.is_err() {
            for t in applied.iter().rev() {
                if let Err(e) = self.accounts.transfer(&t.to, &t.from, t.amount) {
                    warn!("[pc-05] Failed to reverse ledger transfer: {}", e);
                }
            }
        }
        result
    }

    fn apply_transfers(&self, transfers: &[Transfer], applied: &mut Vec<Transfer>) -> Result<()> {
        for t in transfers {
            self.accounts.transfer(&t.from, &t.to, t.amount)?;
            applied.push(*t);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::to_ledger_units;
    use crate::test_utils::*;
    use shared_types::BRIDGE_ADDRESS;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_starts_from_genesis_federation() {
        let harness = BridgeHarness::new();
        assert_eq!(harness.bridge.federation_address(), harness.genesis.address());
        assert_eq!(harness.bridge.fee_per_kb(), harness.bridge.config().initial_fee_per_kb);
        assert_eq!(harness.storage.saves(), 0);
    }

    #[test]
    fn test_resumes_from_storage() {
        let harness = BridgeHarness::new();
        harness.fund_user(0, 1_000_000);
        let queued = harness
            .bridge
            .request_release(&ctx(10), harness.user_ledger(0), [7; 20], to_ledger_units(200_000))
            .unwrap();
        assert!(queued);

        let reopened = harness.reopen();
        assert_eq!(reopened.release_requests_len(), 1);
        assert_eq!(reopened.federation_address(), harness.genesis.address());
    }

    #[test]
    fn test_failed_save_rolls_back_state_and_transfers() {
        let harness = BridgeHarness::new();
        harness.fund_user(0, 1_000_000);
        let bridge_before = harness.balance(&BRIDGE_ADDRESS);
        harness.storage.set_failing(true);

        let result = harness.bridge.request_release(
            &ctx(10),
            harness.user_ledger(0),
            [7; 20],
            to_ledger_units(200_000),
        );

        assert!(result.is_err());
        assert_eq!(harness.bridge.release_requests_len(), 0);
        assert_eq!(harness.balance(&harness.user_ledger(0)), to_ledger_units(1_000_000));
        assert_eq!(harness.balance(&BRIDGE_ADDRESS), bridge_before);
        assert_eq!(harness.bridge.metrics().calls_rolled_back.load(Ordering::Relaxed), 1);
    }
}
