//! Federator signature collection.
//!
//! A federator submits one signature per input of a transaction awaiting
//! signatures. Either every signature verifies and all are inserted, or
//! none is. Within an input, signatures stay in the order of their keys in
//! the redeem script.

use super::{Inner, LedgerContext, PegSupport};
use crate::domain::{parse_multisig_redeem, ExternalTransaction, MultisigUnlocking, SIGHASH_ALL};
use crate::error::{BridgeError, Result};
use shared_crypto::{Secp256k1PublicKey, Secp256k1Signature};
use shared_types::Hash;
use tracing::{debug, info};

/// What a signature submission did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureOutcome {
    /// Signatures inserted; more are needed
    Added {
        /// Inputs still missing signatures
        inputs_incomplete: usize,
    },
    /// Every input is fully signed; the transaction left the collection
    Complete {
        /// Broadcastable transaction
        tx: ExternalTransaction,
    },
    /// Signer is not an active or retiring federator
    NotFederator,
    /// Nothing awaits signatures under that ledger transaction
    NotFound,
    /// Signature count differs from the input count
    WrongSignatureCount {
        /// Inputs of the transaction
        expected: usize,
        /// Signatures submitted
        actual: usize,
    },
    /// A signature failed to verify; nothing was inserted
    InvalidSignature {
        /// First failing input
        input: usize,
    },
    /// Signer belongs to a federation that does not own this transaction
    WrongFederation,
    /// Signer already signed every input
    AlreadySigned,
}

/// Whether an insertion changed the unlocking script.
enum Insertion {
    Inserted,
    AlreadyPresent,
}

impl PegSupport {
    /// Add `federator`'s signatures to the transaction awaiting signatures
    /// under `ledger_tx_hash`.
    ///
    /// Each signature is 64 bytes (`r || s`), optionally followed by the
    /// `SIGHASH_ALL` byte.
    pub fn add_signature(
        &self,
        ctx: &LedgerContext,
        federator: &Secp256k1PublicKey,
        signatures: Vec<Vec<u8>>,
        ledger_tx_hash: &Hash,
    ) -> Result<SignatureOutcome> {
        self.transact(|inner| {
            let outcome = self.insert_signatures(inner, federator, &signatures, ledger_tx_hash)?;
            debug!(
                "[pc-05] Signatures from {:?} at block #{}: {:?}",
                federator, ctx.block_number, outcome
            );
            Ok(outcome)
        })
    }

    fn insert_signatures(
        &self,
        inner: &mut Inner,
        federator: &Secp256k1PublicKey,
        signatures: &[Vec<u8>],
        ledger_tx_hash: &Hash,
    ) -> Result<SignatureOutcome> {
        if !inner.registry.is_member(federator) {
            return Ok(SignatureOutcome::NotFederator);
        }
        let Some(tx) = inner.state.awaiting_signatures.get(ledger_tx_hash).cloned() else {
            return Ok(SignatureOutcome::NotFound);
        };
        if signatures.len() != tx.inputs.len() {
            return Ok(SignatureOutcome::WrongSignatureCount {
                expected: tx.inputs.len(),
                actual: signatures.len(),
            });
        }

        // Verify everything before touching the transaction.
        let mut prepared = Vec::with_capacity(tx.inputs.len());
        for (index, (input, raw)) in tx.inputs.iter().zip(signatures).enumerate() {
            let unlocking = MultisigUnlocking::parse(&input.script_sig).ok_or_else(|| {
                BridgeError::MalformedScript(format!("input {} has no multisig unlocking", index))
            })?;
            let (_, keys) = parse_multisig_redeem(&unlocking.redeem_script).ok_or_else(|| {
                BridgeError::MalformedScript(format!("input {} has no multisig redeem", index))
            })?;
            let Some(position) = keys.iter().position(|key| key == federator) else {
                return Ok(SignatureOutcome::WrongFederation);
            };
            let sighash = tx.signature_hash(index, &unlocking.redeem_script);
            let Some(signature) = decode_signature(raw) else {
                return Ok(SignatureOutcome::InvalidSignature { input: index });
            };
            if federator.verify(&sighash, &signature).is_err() {
                return Ok(SignatureOutcome::InvalidSignature { input: index });
            }
            prepared.push((unlocking, keys, position, sighash, signature));
        }

        let mut signed = tx;
        let mut inserted = 0;
        for (index, (mut unlocking, keys, position, sighash, signature)) in
            prepared.into_iter().enumerate()
        {
            match insert_in_key_order(&mut unlocking, &keys, position, &sighash, &signature) {
                Insertion::Inserted => inserted += 1,
                Insertion::AlreadyPresent => continue,
            }
            signed.inputs[index].script_sig = unlocking.to_script();
        }
        if inserted == 0 {
            return Ok(SignatureOutcome::AlreadySigned);
        }
        self.metrics.record_signatures();

        let inputs_incomplete = signed
            .inputs
            .iter()
            .filter(|input| {
                MultisigUnlocking::parse(&input.script_sig)
                    .map_or(true, |unlocking| !unlocking.is_complete())
            })
            .count();
        if inputs_incomplete > 0 {
            inner
                .state
                .awaiting_signatures
                .insert(*ledger_tx_hash, signed);
            return Ok(SignatureOutcome::Added { inputs_incomplete });
        }

        inner.state.awaiting_signatures.remove(ledger_tx_hash);
        self.metrics.record_signed();
        info!(
            "[pc-05] External tx {} fully signed",
            hex::encode(&signed.txid()[..8])
        );
        Ok(SignatureOutcome::Complete { tx: signed })
    }
}

/// 64-byte compact signature, with or without a trailing `SIGHASH_ALL`.
fn decode_signature(raw: &[u8]) -> Option<Secp256k1Signature> {
    let compact = match raw.len() {
        64 => raw,
        65 if raw[64] == SIGHASH_ALL => &raw[..64],
        _ => return None,
    };
    Secp256k1Signature::from_slice(compact).ok()
}

/// Insert the signature of `keys[position]` so signatures stay in key
/// order. Existing signatures are attributed to keys by verification.
fn insert_in_key_order(
    unlocking: &mut MultisigUnlocking,
    keys: &[Secp256k1PublicKey],
    position: usize,
    sighash: &Hash,
    signature: &Secp256k1Signature,
) -> Insertion {
    if unlocking.is_complete() {
        return Insertion::AlreadyPresent;
    }
    let mut before = 0;
    for existing in &unlocking.signatures {
        let owner = decode_signature(existing).and_then(|sig| {
            keys.iter()
                .position(|key| key.verify(sighash, &sig).is_ok())
        });
        match owner {
            Some(owner) if owner == position => return Insertion::AlreadyPresent,
            Some(owner) if owner < position => before += 1,
            _ => {}
        }
    }
    let mut encoded = signature.as_bytes().to_vec();
    encoded.push(SIGHASH_ALL);
    unlocking.signatures.insert(before, encoded);
    unlocking.placeholders -= 1;
    Insertion::Inserted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    fn setup() -> (BridgeHarness, Hash) {
        let harness = BridgeHarness::new();
        harness.lock_whitelisted(0, 1_000_000, 1);
        harness.lock_whitelisted(0, 1_000_000, 2);
        harness.request(0, 1_500_000, 3);
        harness.bridge.periodic_maintenance(&ctx(4)).unwrap();
        let promote = ctx(100);
        harness.bridge.periodic_maintenance(&promote).unwrap();
        (harness, promote.tx_hash)
    }

    #[test]
    fn test_signatures_complete_transaction() {
        let (harness, hash) = setup();
        let tx = harness.bridge.awaiting_signature(&hash).unwrap();
        assert_eq!(tx.inputs.len(), 2);

        // Threshold of three federators is two.
        let first = harness.sign_all(2, &tx);
        assert_eq!(
            harness
                .bridge
                .add_signature(&ctx(101), &harness.federator_key(2), first, &hash)
                .unwrap(),
            SignatureOutcome::Added {
                inputs_incomplete: 2
            }
        );

        let second = harness.sign_all(0, &tx);
        let outcome = harness
            .bridge
            .add_signature(&ctx(102), &harness.federator_key(0), second, &hash)
            .unwrap();
        let SignatureOutcome::Complete { tx: signed } = outcome else {
            panic!("expected completion, got {:?}", outcome);
        };
        assert!(harness.bridge.awaiting_signature(&hash).is_none());

        // Signatures are in key order regardless of submission order.
        let keys = harness.genesis.public_keys().to_vec();
        for (index, input) in signed.inputs.iter().enumerate() {
            let unlocking = MultisigUnlocking::parse(&input.script_sig).unwrap();
            assert!(unlocking.is_complete());
            let sighash = tx.signature_hash(index, &unlocking.redeem_script);
            let owners: Vec<usize> = unlocking
                .signatures
                .iter()
                .map(|raw| {
                    let sig = decode_signature(raw).unwrap();
                    keys.iter().position(|k| k.verify(&sighash, &sig).is_ok()).unwrap()
                })
                .collect();
            let mut sorted = owners.clone();
            sorted.sort();
            assert_eq!(owners, sorted);
        }
    }

    #[test]
    fn test_one_bad_signature_inserts_nothing() {
        let (harness, hash) = setup();
        let tx = harness.bridge.awaiting_signature(&hash).unwrap();
        let mut signatures = harness.sign_all(1, &tx);
        signatures[1][0] ^= 0xff;

        let outcome = harness
            .bridge
            .add_signature(&ctx(101), &harness.federator_key(1), signatures, &hash)
            .unwrap();

        assert_eq!(outcome, SignatureOutcome::InvalidSignature { input: 1 });
        assert_eq!(harness.bridge.awaiting_signature(&hash).unwrap(), tx);
    }

    #[test]
    fn test_repeated_signatures_are_ignored() {
        let (harness, hash) = setup();
        let tx = harness.bridge.awaiting_signature(&hash).unwrap();
        let signatures = harness.sign_all(1, &tx);
        let key = harness.federator_key(1);

        harness
            .bridge
            .add_signature(&ctx(101), &key, signatures.clone(), &hash)
            .unwrap();
        let again = harness
            .bridge
            .add_signature(&ctx(102), &key, signatures, &hash)
            .unwrap();

        assert_eq!(again, SignatureOutcome::AlreadySigned);
    }

    #[test]
    fn test_rejected_submissions() {
        let (harness, hash) = setup();
        let tx = harness.bridge.awaiting_signature(&hash).unwrap();
        let signatures = harness.sign_all(0, &tx);
        let key = harness.federator_key(0);

        assert_eq!(
            harness
                .bridge
                .add_signature(&ctx(101), &harness.outsider_key(), signatures.clone(), &hash)
                .unwrap(),
            SignatureOutcome::NotFederator
        );
        assert_eq!(
            harness
                .bridge
                .add_signature(&ctx(101), &key, signatures[..1].to_vec(), &hash)
                .unwrap(),
            SignatureOutcome::WrongSignatureCount {
                expected: 2,
                actual: 1
            }
        );
        assert_eq!(
            harness
                .bridge
                .add_signature(&ctx(101), &key, signatures, &[0xab; 32])
                .unwrap(),
            SignatureOutcome::NotFound
        );
    }
}
