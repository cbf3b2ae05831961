use crate::domain::{
    ExternalTransaction, MultisigUnlocking, OutPoint, TxInput, TxOutput, Utxo, FINAL_SEQUENCE,
};
use crate::ports::{BuildRequest, BuiltTransaction, ReleaseTransactionBuilder};

/// Default input cap per transaction.
pub const DEFAULT_MAX_INPUTS: usize = 50;

const TX_OVERHEAD: usize = 10;
const INPUT_OVERHEAD: usize = 32 + 4 + 4 + 3;
const SIGNATURE_PUSH: usize = 1 + 65;
const OUTPUT_SIZE: usize = 8 + 1 + 25;

/// Largest-first coin selection paying the fee out of the moved amount.
///
/// A change output below the dust threshold is raised to the threshold by
/// taking the difference from the payment; the difference is reported as
/// [`BuiltTransaction::change_bump`].
#[derive(Debug, Clone)]
pub struct DefaultReleaseBuilder {
    max_inputs: usize,
}

impl Default for DefaultReleaseBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_INPUTS)
    }
}

impl DefaultReleaseBuilder {
    /// Builder spending at most `max_inputs` UTXOs per transaction.
    pub fn new(max_inputs: usize) -> Self {
        Self { max_inputs }
    }

    fn select<'a>(&self, utxos: &'a [Utxo], amount: u64) -> Option<(Vec<&'a Utxo>, u64)> {
        let mut candidates: Vec<&Utxo> = utxos.iter().collect();
        candidates.sort_by(|a, b| b.value.cmp(&a.value).then(a.outpoint.cmp(&b.outpoint)));

        let mut selected = Vec::new();
        let mut total = 0u64;
        for utxo in candidates {
            if total >= amount {
                break;
            }
            if selected.len() == self.max_inputs {
                return None;
            }
            total = total.checked_add(utxo.value)?;
            selected.push(utxo);
        }
        (total >= amount).then_some((selected, total))
    }
}

fn estimated_size(inputs: usize, outputs: usize, redeem_script: usize, threshold: usize) -> usize {
    let script_sig = 1 + threshold * SIGNATURE_PUSH + 3 + redeem_script;
    TX_OVERHEAD + inputs * (INPUT_OVERHEAD + script_sig) + outputs * OUTPUT_SIZE
}

fn fee_for(size: usize, fee_per_kb: u64) -> Option<u64> {
    let fee = (u128::from(fee_per_kb) * size as u128).div_ceil(1000);
    u64::try_from(fee).ok()
}

impl ReleaseTransactionBuilder for DefaultReleaseBuilder {
    fn build(&self, request: &BuildRequest<'_>) -> Option<BuiltTransaction> {
        if request.amount == 0 {
            return None;
        }
        let (selected, total) = self.select(request.utxos, request.amount)?;

        let redeem_script = request.federation.redeem_script();
        let threshold = request.federation.threshold();
        let mut change = total - request.amount;
        let outputs = if change > 0 { 2 } else { 1 };
        let size = estimated_size(selected.len(), outputs, redeem_script.len(), threshold);
        let fee = fee_for(size, request.fee_per_kb)?;

        let mut payment = request.amount.checked_sub(fee)?;
        let mut change_bump = 0;
        if change > 0 && change < request.dust_threshold {
            change_bump = request.dust_threshold - change;
            change = request.dust_threshold;
            payment = payment.checked_sub(change_bump)?;
        }
        if payment < request.dust_threshold {
            return None;
        }

        let unlocking = MultisigUnlocking::unsigned(redeem_script, threshold).to_script();
        let inputs = selected
            .iter()
            .map(|utxo| TxInput {
                previous: utxo.outpoint,
                script_sig: unlocking.clone(),
                sequence: FINAL_SEQUENCE,
            })
            .collect();
        let mut tx_outputs = vec![TxOutput {
            value: payment,
            script_pubkey: request.destination.clone(),
        }];
        if change > 0 {
            tx_outputs.push(TxOutput {
                value: change,
                script_pubkey: request.change.clone(),
            });
        }

        Some(BuiltTransaction {
            tx: ExternalTransaction::new(inputs, tx_outputs),
            spent: selected.iter().map(|utxo| utxo.outpoint).collect::<Vec<OutPoint>>(),
            fee,
            change_bump,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{p2pkh, p2sh};
    use pc_04_federation::Federation;
    use shared_crypto::Secp256k1KeyPair;

    fn federation() -> Federation {
        let keys = (1..=3u8)
            .map(|s| Secp256k1KeyPair::from_bytes([s; 32]).unwrap().public_key())
            .collect();
        Federation::new(keys, 0, 0).unwrap()
    }

    fn utxo(seed: u8, value: u64) -> Utxo {
        Utxo {
            outpoint: OutPoint {
                tx_hash: [seed; 32],
                index: 0,
            },
            value,
            height: 1,
            is_coinbase: false,
            script_pubkey: Vec::new(),
        }
    }

    fn request<'a>(utxos: &'a [Utxo], federation: &'a Federation, amount: u64) -> BuildRequest<'a> {
        BuildRequest {
            utxos,
            federation,
            destination: p2pkh(&[7; 20]),
            amount,
            change: p2sh(&federation.address()),
            fee_per_kb: 1_000,
            dust_threshold: 500,
        }
    }

    #[test]
    fn test_largest_first_with_change() {
        let federation = federation();
        let utxos = vec![utxo(1, 10_000), utxo(2, 80_000), utxo(3, 30_000)];
        let built = DefaultReleaseBuilder::default()
            .build(&request(&utxos, &federation, 90_000))
            .unwrap();

        assert_eq!(built.spent, vec![utxos[1].outpoint, utxos[2].outpoint]);
        assert_eq!(built.tx.outputs.len(), 2);
        assert_eq!(built.tx.outputs[0].value, 90_000 - built.fee);
        assert_eq!(built.tx.outputs[1].value, 20_000);
        assert_eq!(built.change_bump, 0);
        assert!(built.fee > 0);
        for input in &built.tx.inputs {
            let unlocking = MultisigUnlocking::parse(&input.script_sig).unwrap();
            assert_eq!(unlocking.placeholders, federation.threshold());
            assert_eq!(unlocking.redeem_script, federation.redeem_script());
        }
    }

    #[test]
    fn test_dust_change_is_bumped() {
        let federation = federation();
        let utxos = vec![utxo(1, 50_100)];
        let built = DefaultReleaseBuilder::default()
            .build(&request(&utxos, &federation, 50_000))
            .unwrap();
        assert_eq!(built.change_bump, 400);
        assert_eq!(built.tx.outputs[1].value, 500);
        assert_eq!(built.tx.outputs[0].value, 50_000 - built.fee - 400);
        let paid: u64 = built.tx.outputs.iter().map(|o| o.value).sum();
        assert_eq!(paid + built.fee, 50_100);
    }

    #[test]
    fn test_cannot_build() {
        let federation = federation();
        let utxos = vec![utxo(1, 1_000), utxo(2, 1_000)];
        let builder = DefaultReleaseBuilder::default();
        assert!(builder.build(&request(&utxos, &federation, 5_000)).is_none());
        // Payment would not cover the fee.
        assert!(builder.build(&request(&utxos, &federation, 600)).is_none());
        // Too many inputs needed.
        let capped = DefaultReleaseBuilder::new(1);
        assert!(capped.build(&request(&utxos, &federation, 1_500)).is_none());
        assert!(builder.build(&request(&utxos, &federation, 0)).is_none());
    }
}
