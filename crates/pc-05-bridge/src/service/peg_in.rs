//! Peg-in: registration of external transactions.
//!
//! ```text
//! raw tx + height + proof
//!     │
//!     ├─ already processed? ──────────────► AlreadyProcessed
//!     ├─ proof well formed? ──────────────► InvalidProof
//!     ├─ enough confirmations? ───────────► InsufficientConfirmations
//!     ├─ parse (error if malformed)
//!     ├─ canonical merkle root matches? ──► UnknownBlock / MerkleRootMismatch (alarm)
//!     └─ classify
//!           Lock      → credit or refund
//!           Release   → record change outputs
//!           Migration → record active outputs
//!           Unrelated → Unclassified (alarm)
//! ```

use super::{Inner, LedgerContext, PegSupport};
use crate::config::RegistrationMode;
use crate::domain::{
    output_kind, p2pkh, p2pkh_spender, p2sh, to_ledger_units, value_paid_to, ExternalTransaction,
    LiveWallets, MerkleBranch, OutPoint, OutputKind, PegTxKind, PendingRelease,
    RegistrationCall, ReleaseKind, Utxo,
};
use crate::error::{BridgeError, Result};
use crate::ports::BuildRequest;
use pc_04_federation::codes::{
    ALREADY_PROCESSED, BAD_PROOF, GENERIC_ERROR, NOT_CONFIRMED, REGISTRATION_REFUSED, SUCCESS,
};
use pc_04_federation::{Authorizer, ElectionResult, ExecutionMode, ExternalAddress, Federation};
use shared_crypto::double_sha256;
use shared_types::{Address, Alarm, Hash, BRIDGE_ADDRESS};
use tracing::{debug, info, warn};

/// What a registration call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// Lock credited to the sender's ledger account
    Credited {
        /// Ledger account credited
        recipient: Address,
        /// Amount locked (external units)
        value: u64,
    },
    /// Lock from a sender that is not whitelisted; refund transactions queued
    Refunded {
        /// Amount locked (external units)
        value: u64,
        /// Refund transactions built
        refunds: usize,
    },
    /// Lock whose sender could not be derived; marked processed, not credited
    SenderUnknown,
    /// Federation spend recorded
    ReleaseRecorded,
    /// Migration into the active wallet recorded
    MigrationRecorded,
    /// Transaction was processed before
    AlreadyProcessed {
        /// Ledger height it was processed at
        height: u64,
    },
    /// Not deep enough in the external chain
    InsufficientConfirmations {
        /// Confirmations seen
        confirmations: u64,
        /// Confirmations required
        required: u64,
    },
    /// Merkle branch is malformed
    InvalidProof,
    /// No canonical external block is known at the claimed height
    UnknownBlock {
        /// Claimed height
        height: u64,
    },
    /// Proof does not lead to the canonical merkle root
    MerkleRootMismatch,
    /// Transaction does not touch a live federation wallet
    Unclassified,
    /// Caller may not register
    Unauthorized,
    /// Registration must go through the other entry point
    NotCanonicalPath,
    /// Vote recorded, quorum not reached
    Voted,
}

impl RegistrationOutcome {
    /// Whether the transaction is now marked processed.
    pub fn is_processed(&self) -> bool {
        matches!(
            self,
            Self::Credited { .. }
                | Self::Refunded { .. }
                | Self::SenderUnknown
                | Self::ReleaseRecorded
                | Self::MigrationRecorded
        )
    }

    /// Election code for an ignored registration.
    fn rejection_code(&self) -> i32 {
        match self {
            Self::AlreadyProcessed { .. } => ALREADY_PROCESSED,
            Self::InsufficientConfirmations { .. } => NOT_CONFIRMED,
            Self::InvalidProof | Self::UnknownBlock { .. } | Self::MerkleRootMismatch => BAD_PROOF,
            _ => REGISTRATION_REFUSED,
        }
    }
}

/// A registration that passed every check.
struct Verified {
    tx: ExternalTransaction,
    tx_hash: Hash,
    height: u64,
    kind: PegTxKind,
}

enum Prevalidation {
    Ready(Verified),
    Ignored(RegistrationOutcome),
}

impl PegSupport {
    /// Register an external transaction as an active federator.
    ///
    /// Available when registration runs in [`RegistrationMode::Direct`].
    pub fn register_external_tx(
        &self,
        ctx: &LedgerContext,
        caller: &Address,
        raw_tx: Vec<u8>,
        height: u64,
        proof: MerkleBranch,
    ) -> Result<RegistrationOutcome> {
        if self.config.registration_mode != RegistrationMode::Direct {
            return Ok(RegistrationOutcome::NotCanonicalPath);
        }
        let call = RegistrationCall {
            raw_tx,
            height,
            proof,
        };
        self.transact(|inner| {
            let authorized = inner
                .registry
                .active()
                .public_keys()
                .iter()
                .any(|key| key.ledger_address() == *caller);
            if !authorized {
                debug!("[pc-05] Registration by non-federator {}", hex::encode(caller));
                return Ok(RegistrationOutcome::Unauthorized);
            }
            self.register(inner, ctx, &call)
        })
    }

    /// Vote for the registration of an external transaction.
    ///
    /// Available when registration runs in [`RegistrationMode::Vote`]. The
    /// registration is processed once a majority of the active federation
    /// has voted for the same call.
    pub fn register_external_tx_by_vote(
        &self,
        ctx: &LedgerContext,
        voter: &Address,
        raw_tx: Vec<u8>,
        height: u64,
        proof: MerkleBranch,
    ) -> Result<RegistrationOutcome> {
        if self.config.registration_mode != RegistrationMode::Vote {
            return Ok(RegistrationOutcome::NotCanonicalPath);
        }
        let call = RegistrationCall {
            raw_tx,
            height,
            proof,
        };
        self.transact(|inner| {
            let authorizer = Authorizer::majority(
                inner
                    .registry
                    .active()
                    .public_keys()
                    .iter()
                    .map(|key| key.ledger_address()),
            );
            let mut election = std::mem::take(&mut inner.state.registration_election);
            let mut ignored = None;
            let mut executed = None;
            let mut failure = None;

            let result = election.submit(&authorizer, voter, call, |call, mode| match mode {
                ExecutionMode::DryRun => match self.prevalidate(inner, call) {
                    Ok(Prevalidation::Ready(_)) => SUCCESS,
                    Ok(Prevalidation::Ignored(outcome)) => {
                        let code = outcome.rejection_code();
                        ignored = Some(outcome);
                        code
                    }
                    Err(e) => {
                        failure = Some(e);
                        GENERIC_ERROR
                    }
                },
                ExecutionMode::Execute => {
                    let outcome = self.register(inner, ctx, call);
                    let code = match &outcome {
                        Ok(o) if o.is_processed() => SUCCESS,
                        Ok(o) => o.rejection_code(),
                        Err(_) => GENERIC_ERROR,
                    };
                    executed = Some(outcome);
                    code
                }
            });
            inner.state.registration_election = election;

            if let Some(e) = failure {
                return Err(e);
            }
            match result {
                ElectionResult::Rejected(_) => {
                    Ok(ignored.unwrap_or(RegistrationOutcome::Unauthorized))
                }
                ElectionResult::Voted => Ok(RegistrationOutcome::Voted),
                ElectionResult::Executed(_) => executed.unwrap_or(Ok(RegistrationOutcome::Voted)),
            }
        })
    }

    /// Whether the external transaction `tx_hash` was processed.
    pub fn is_external_tx_processed(&self, tx_hash: &Hash) -> bool {
        self.inner.lock().state.processed_txs.contains_key(tx_hash)
    }

    /// Ledger height `tx_hash` was processed at.
    pub fn external_tx_processed_height(&self, tx_hash: &Hash) -> Option<u64> {
        self.inner.lock().state.processed_txs.get(tx_hash).copied()
    }

    fn register(
        &self,
        inner: &mut Inner,
        ctx: &LedgerContext,
        call: &RegistrationCall,
    ) -> Result<RegistrationOutcome> {
        let verified = match self.prevalidate(inner, call)? {
            Prevalidation::Ready(verified) => verified,
            Prevalidation::Ignored(outcome) => {
                debug!("[pc-05] Registration ignored: {:?}", outcome);
                self.metrics.record_ignored();
                return Ok(outcome);
            }
        };

        let outcome = match verified.kind {
            PegTxKind::Lock => self.process_lock(inner, ctx, &verified)?,
            PegTxKind::Release => {
                self.record_federation_outputs(inner, &verified);
                RegistrationOutcome::ReleaseRecorded
            }
            PegTxKind::Migration => {
                self.record_federation_outputs(inner, &verified);
                RegistrationOutcome::MigrationRecorded
            }
            PegTxKind::Unrelated => return Ok(RegistrationOutcome::Unclassified),
        };
        inner
            .state
            .processed_txs
            .insert(verified.tx_hash, ctx.block_number);
        info!(
            "[pc-05] Registered external tx {} at height {}: {:?}",
            hex::encode(&verified.tx_hash[..8]),
            verified.height,
            outcome
        );
        Ok(outcome)
    }

    /// Checks that do not touch state. Alarms are raised here.
    fn prevalidate(&self, inner: &Inner, call: &RegistrationCall) -> Result<Prevalidation> {
        use Prevalidation::Ignored;

        let tx_hash = double_sha256(&call.raw_tx);
        if let Some(&height) = inner.state.processed_txs.get(&tx_hash) {
            return Ok(Ignored(RegistrationOutcome::AlreadyProcessed { height }));
        }
        if !call.proof.is_well_formed() {
            return Ok(Ignored(RegistrationOutcome::InvalidProof));
        }

        let best = self.external_chain.best_height()?;
        let confirmations = if call.height > best {
            0
        } else {
            best - call.height + 1
        };
        let required = self.config.min_external_confirmations;
        if confirmations < required {
            return Ok(Ignored(RegistrationOutcome::InsufficientConfirmations {
                confirmations,
                required,
            }));
        }

        let tx = ExternalTransaction::parse(&call.raw_tx)?;
        if tx.inputs.is_empty() {
            return Err(BridgeError::MalformedTransaction(
                "transaction has no inputs".into(),
            ));
        }

        let Some(canonical_root) = self.external_chain.merkle_root_at(call.height)? else {
            return Ok(Ignored(RegistrationOutcome::UnknownBlock {
                height: call.height,
            }));
        };
        if call.proof.root_for(&tx_hash) != canonical_root {
            self.alarms.raise(Alarm::MerkleRootMismatch {
                tx_hash,
                height: call.height,
            });
            return Ok(Ignored(RegistrationOutcome::MerkleRootMismatch));
        }

        let wallets = LiveWallets::new(
            inner.registry.active(),
            inner.registry.retiring(),
            inner.registry.retired_redeem_scripts(),
        );
        let kind = wallets.classify(&tx);
        if kind == PegTxKind::Unrelated {
            self.alarms.raise(Alarm::UnclassifiedPegTransaction { tx_hash });
            return Ok(Ignored(RegistrationOutcome::Unclassified));
        }

        Ok(Prevalidation::Ready(Verified {
            tx,
            tx_hash,
            height: call.height,
            kind,
        }))
    }

    fn process_lock(
        &self,
        inner: &mut Inner,
        ctx: &LedgerContext,
        verified: &Verified,
    ) -> Result<RegistrationOutcome> {
        let wallets = LiveWallets::new(
            inner.registry.active(),
            inner.registry.retiring(),
            inner.registry.retired_redeem_scripts(),
        );
        let value = wallets.live_value(&verified.tx);

        // The sender is the key spending the first input.
        let Some(sender_key) = p2pkh_spender(&verified.tx.inputs[0].script_sig) else {
            warn!(
                "[pc-05] Lock {} of {} has no pay-to-pubkey-hash sender; not credited",
                hex::encode(&verified.tx_hash[..8]),
                value
            );
            return Ok(RegistrationOutcome::SenderUnknown);
        };
        let sender = sender_key.external_address();

        if inner
            .registry
            .is_lock_whitelisted(&sender, value, ctx.block_number)
        {
            let recipient = sender_key.ledger_address();
            inner.transfer(BRIDGE_ADDRESS, recipient, to_ledger_units(value));
            inner.registry.consume_lock_whitelist(&sender);
            self.record_federation_outputs(inner, verified);
            self.metrics.record_credit();
            return Ok(RegistrationOutcome::Credited { recipient, value });
        }

        let mut refunds = 0;
        let federations: Vec<Federation> = std::iter::once(inner.registry.active().clone())
            .chain(inner.registry.retiring().cloned())
            .collect();
        for federation in &federations {
            if let Some(refund) = self.build_refund(inner, ctx, verified, federation, &sender) {
                inner.state.release_transactions.push(refund);
                refunds += 1;
            }
        }
        self.metrics.record_refund();
        Ok(RegistrationOutcome::Refunded { value, refunds })
    }

    /// Return what `verified` paid to `federation`, spending only those
    /// outputs.
    fn build_refund(
        &self,
        inner: &Inner,
        ctx: &LedgerContext,
        verified: &Verified,
        federation: &Federation,
        sender: &ExternalAddress,
    ) -> Option<PendingRelease> {
        let address = federation.address();
        let amount = value_paid_to(&verified.tx, &address);
        if amount == 0 {
            return None;
        }
        let utxos = federation_utxos(verified, &address);
        let built = self.builder.build(&BuildRequest {
            utxos: &utxos,
            federation,
            destination: p2pkh(sender),
            amount,
            change: p2sh(&address),
            fee_per_kb: inner.registry.fee_per_kb(),
            dust_threshold: self.config.dust_threshold,
        });
        match built {
            Some(built) => Some(PendingRelease {
                tx: built.tx,
                created_at: ctx.block_number,
                kind: ReleaseKind::Refund,
            }),
            None => {
                warn!(
                    "[pc-05] Cannot build refund of {} for {}",
                    amount,
                    hex::encode(sender)
                );
                None
            }
        }
    }

    /// Add outputs paying a live federation to its UTXO bucket.
    fn record_federation_outputs(&self, inner: &mut Inner, verified: &Verified) {
        let active = inner.registry.active().address();
        let retiring = inner.registry.retiring().map(Federation::address);

        for utxo in federation_utxos(verified, &active) {
            inner.state.active_utxos.insert(utxo);
        }
        if let Some(retiring) = retiring {
            for utxo in federation_utxos(verified, &retiring) {
                inner.state.retiring_utxos.insert(utxo);
            }
        }
    }
}

/// Outputs of `verified` paying the script hash `address`, as UTXOs.
fn federation_utxos(verified: &Verified, address: &ExternalAddress) -> Vec<Utxo> {
    verified
        .tx
        .outputs
        .iter()
        .enumerate()
        .filter(|(_, output)| {
            output_kind(&output.script_pubkey) == OutputKind::PayToScriptHash(*address)
        })
        .map(|(index, output)| Utxo {
            outpoint: OutPoint {
                tx_hash: verified.tx_hash,
                index: index as u32,
            },
            value: output.value,
            height: verified.height,
            is_coinbase: false,
            script_pubkey: output.script_pubkey.clone(),
        })
        .collect()
}
