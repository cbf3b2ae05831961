//! Classification of external transactions relative to the live federations.

use crate::domain::external_tx::ExternalTransaction;
use crate::domain::script::{output_kind, MultisigUnlocking, OutputKind};
use pc_04_federation::{ExternalAddress, Federation};

/// How an external transaction relates to the peg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PegTxKind {
    /// Pays a federation wallet from outside
    Lock,
    /// Spends federation funds to someone else
    Release,
    /// Spends retiring (or already dropped federation) funds into the
    /// active wallet
    Migration,
    /// None of the above
    Unrelated,
}

/// Active and, optionally, retiring federation addresses.
#[derive(Debug, Clone)]
pub struct LiveWallets {
    /// Active federation address and redeem script
    pub active: (ExternalAddress, Vec<u8>),
    /// Retiring federation address and redeem script
    pub retiring: Option<(ExternalAddress, Vec<u8>)>,
    /// Redeem scripts of dropped federations
    pub retired: Vec<Vec<u8>>,
}

impl LiveWallets {
    /// Wallets of `active` and `retiring`, plus the redeem scripts of
    /// federations already dropped.
    pub fn new(active: &Federation, retiring: Option<&Federation>, retired: &[Vec<u8>]) -> Self {
        Self {
            active: (active.address(), active.redeem_script()),
            retiring: retiring.map(|f| (f.address(), f.redeem_script())),
            retired: retired.to_vec(),
        }
    }

    /// Whether `address` is one of the live wallets.
    pub fn is_live(&self, address: &ExternalAddress) -> bool {
        self.active.0 == *address || self.retiring.as_ref().is_some_and(|(a, _)| a == address)
    }

    fn spends_from(&self, tx: &ExternalTransaction, redeem_script: &[u8]) -> bool {
        tx.inputs.iter().any(|input| {
            MultisigUnlocking::parse(&input.script_sig)
                .is_some_and(|unlocking| unlocking.redeem_script == redeem_script)
        })
    }

    /// Classify `tx`.
    pub fn classify(&self, tx: &ExternalTransaction) -> PegTxKind {
        let spends_active = self.spends_from(tx, &self.active.1);
        let spends_retiring = self
            .retiring
            .as_ref()
            .is_some_and(|(_, script)| self.spends_from(tx, script));

        // A sweep registered after its federation was dropped.
        let spends_dropped = !spends_active
            && !spends_retiring
            && self
                .retired
                .iter()
                .any(|script| self.spends_from(tx, script));

        if (spends_retiring || spends_dropped) && value_paid_to(tx, &self.active.0) > 0 {
            return PegTxKind::Migration;
        }
        if spends_active || spends_retiring {
            return PegTxKind::Release;
        }
        if self.live_value(tx) > 0 {
            return PegTxKind::Lock;
        }
        PegTxKind::Unrelated
    }

    /// Value paid to any live wallet.
    pub fn live_value(&self, tx: &ExternalTransaction) -> u64 {
        let retiring = self
            .retiring
            .as_ref()
            .map_or(0, |(address, _)| value_paid_to(tx, address));
        value_paid_to(tx, &self.active.0).saturating_add(retiring)
    }
}

/// Value of outputs paying the script hash `address`.
pub fn value_paid_to(tx: &ExternalTransaction, address: &ExternalAddress) -> u64 {
    tx.outputs
        .iter()
        .filter(|o| output_kind(&o.script_pubkey) == OutputKind::PayToScriptHash(*address))
        .fold(0u64, |acc, o| acc.saturating_add(o.value))
}
