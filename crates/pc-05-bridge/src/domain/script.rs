//! # Scripts
//!
//! Just enough of the external chain's script language for the peg:
//! pay-to-pubkey-hash and pay-to-script-hash outputs, unspendable burn
//! outputs, pubkey-hash unlocking scripts, and multisig unlocking scripts
//! whose signature slots start as `OP_0` placeholders.

use crate::error::{BridgeError, Result};
use pc_04_federation::{ExternalAddress, OP_0, OP_1, OP_CHECKMULTISIG};
use shared_crypto::Secp256k1PublicKey;

/// `OP_PUSHDATA1`
pub const OP_PUSHDATA1: u8 = 0x4c;
/// `OP_PUSHDATA2`
pub const OP_PUSHDATA2: u8 = 0x4d;
/// `OP_RETURN`
pub const OP_RETURN: u8 = 0x6a;
/// `OP_DUP`
pub const OP_DUP: u8 = 0x76;
/// `OP_EQUAL`
pub const OP_EQUAL: u8 = 0x87;
/// `OP_EQUALVERIFY`
pub const OP_EQUALVERIFY: u8 = 0x88;
/// `OP_HASH160`
pub const OP_HASH160: u8 = 0xa9;
/// `OP_CHECKSIG`
pub const OP_CHECKSIG: u8 = 0xac;

/// Sighash type appended to every federator signature.
pub const SIGHASH_ALL: u8 = 0x01;

/// One parsed script element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptChunk {
    /// Data push (`OP_0` parses as an empty push)
    Push(Vec<u8>),
    /// Any other opcode
    Op(u8),
}

/// Append a minimal data push of `data`.
pub fn push_data(out: &mut Vec<u8>, data: &[u8]) {
    match data.len() {
        0 => out.push(OP_0),
        len @ 1..=75 => out.push(len as u8),
        len @ 76..=255 => {
            out.push(OP_PUSHDATA1);
            out.push(len as u8);
        }
        len => {
            out.push(OP_PUSHDATA2);
            out.extend_from_slice(&(len as u16).to_le_bytes());
        }
    }
    out.extend_from_slice(data);
}

/// Split a script into pushes and opcodes.
pub fn parse_chunks(script: &[u8]) -> Result<Vec<ScriptChunk>> {
    let mut chunks = Vec::new();
    let mut pos = 0;
    while pos < script.len() {
        let op = script[pos];
        pos += 1;
        let len = match op {
            OP_0 => {
                chunks.push(ScriptChunk::Push(Vec::new()));
                continue;
            }
            1..=75 => op as usize,
            OP_PUSHDATA1 => {
                let len = *script
                    .get(pos)
                    .ok_or_else(|| malformed("truncated OP_PUSHDATA1"))?;
                pos += 1;
                len as usize
            }
            OP_PUSHDATA2 => {
                let bytes = script
                    .get(pos..pos + 2)
                    .ok_or_else(|| malformed("truncated OP_PUSHDATA2"))?;
                pos += 2;
                u16::from_le_bytes([bytes[0], bytes[1]]) as usize
            }
            other => {
                chunks.push(ScriptChunk::Op(other));
                continue;
            }
        };
        let data = script
            .get(pos..pos + len)
            .ok_or_else(|| malformed("push past end of script"))?;
        pos += len;
        chunks.push(ScriptChunk::Push(data.to_vec()));
    }
    Ok(chunks)
}

fn malformed(reason: &str) -> BridgeError {
    BridgeError::MalformedScript(reason.to_string())
}

/// Pay-to-pubkey-hash locking script.
pub fn p2pkh(address: &ExternalAddress) -> Vec<u8> {
    let mut script = vec![OP_DUP, OP_HASH160, 20];
    script.extend_from_slice(address);
    script.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
    script
}

/// Pay-to-script-hash locking script.
pub fn p2sh(script_hash: &ExternalAddress) -> Vec<u8> {
    let mut script = vec![OP_HASH160, 20];
    script.extend_from_slice(script_hash);
    script.push(OP_EQUAL);
    script
}

/// Provably unspendable output script.
pub fn burn() -> Vec<u8> {
    vec![OP_RETURN]
}

/// What an output script pays to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// A key hash
    PayToPubKeyHash(ExternalAddress),
    /// A script hash (federation wallets)
    PayToScriptHash(ExternalAddress),
    /// Unspendable
    Burn,
    /// Anything else
    Unknown,
}

/// Classify a locking script.
pub fn output_kind(script: &[u8]) -> OutputKind {
    match script {
        [OP_DUP, OP_HASH160, 20, hash @ .., OP_EQUALVERIFY, OP_CHECKSIG] if hash.len() == 20 => {
            OutputKind::PayToPubKeyHash(to_address(hash))
        }
        [OP_HASH160, 20, hash @ .., OP_EQUAL] if hash.len() == 20 => {
            OutputKind::PayToScriptHash(to_address(hash))
        }
        [OP_RETURN, ..] => OutputKind::Burn,
        _ => OutputKind::Unknown,
    }
}

fn to_address(hash: &[u8]) -> ExternalAddress {
    let mut address = [0u8; 20];
    address.copy_from_slice(hash);
    address
}

/// `<signature> <pubkey>` unlocking script.
pub fn p2pkh_unlocking(signature: &[u8], public_key: &Secp256k1PublicKey) -> Vec<u8> {
    let mut script = Vec::with_capacity(signature.len() + 35);
    push_data(&mut script, signature);
    push_data(&mut script, public_key.as_bytes());
    script
}

/// Public key revealed by a pubkey-hash unlocking script.
pub fn p2pkh_spender(script_sig: &[u8]) -> Option<Secp256k1PublicKey> {
    match parse_chunks(script_sig).ok()?.as_slice() {
        [ScriptChunk::Push(signature), ScriptChunk::Push(key)] if !signature.is_empty() => {
            Secp256k1PublicKey::from_sec1_slice(key).ok()
        }
        _ => None,
    }
}

/// Keys and threshold of a standard multisig redeem script.
pub fn parse_multisig_redeem(script: &[u8]) -> Option<(usize, Vec<Secp256k1PublicKey>)> {
    let chunks = parse_chunks(script).ok()?;
    let (first, rest) = chunks.split_first()?;
    let (last, rest) = rest.split_last()?;
    let (count, keys) = rest.split_last()?;
    if *last != ScriptChunk::Op(OP_CHECKMULTISIG) {
        return None;
    }
    let threshold = small_int(first)?;
    let n = small_int(count)?;
    if n != keys.len() || threshold == 0 || threshold > n {
        return None;
    }
    let keys = keys
        .iter()
        .map(|chunk| match chunk {
            ScriptChunk::Push(bytes) => Secp256k1PublicKey::from_sec1_slice(bytes).ok(),
            ScriptChunk::Op(_) => None,
        })
        .collect::<Option<Vec<_>>>()?;
    Some((threshold, keys))
}

fn small_int(chunk: &ScriptChunk) -> Option<usize> {
    match chunk {
        ScriptChunk::Op(op) if (OP_1..=OP_1 + 15).contains(op) => Some((op - OP_1 + 1) as usize),
        _ => None,
    }
}

/// A multisig unlocking script: `OP_0 <sig>* OP_0* <redeem script>`.
///
/// Signatures appear in the order of their keys in the redeem script; the
/// trailing `OP_0`s are slots still waiting for a signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultisigUnlocking {
    /// Signatures collected so far, in key order
    pub signatures: Vec<Vec<u8>>,
    /// Empty signature slots
    pub placeholders: usize,
    /// Redeem script being satisfied
    pub redeem_script: Vec<u8>,
}

impl MultisigUnlocking {
    /// Unsigned unlocking script with `threshold` placeholders.
    pub fn unsigned(redeem_script: Vec<u8>, threshold: usize) -> Self {
        Self {
            signatures: Vec::new(),
            placeholders: threshold,
            redeem_script,
        }
    }

    /// Parse an unlocking script of this shape.
    pub fn parse(script_sig: &[u8]) -> Option<Self> {
        let chunks = parse_chunks(script_sig).ok()?;
        let (first, rest) = chunks.split_first()?;
        let (last, slots) = rest.split_last()?;
        let (ScriptChunk::Push(dummy), ScriptChunk::Push(redeem_script)) = (first, last) else {
            return None;
        };
        if !dummy.is_empty() || redeem_script.is_empty() {
            return None;
        }
        let mut signatures = Vec::new();
        let mut placeholders = 0;
        for slot in slots {
            match slot {
                ScriptChunk::Push(sig) if sig.is_empty() => placeholders += 1,
                // Signatures after a placeholder are out of shape.
                ScriptChunk::Push(sig) if placeholders == 0 => signatures.push(sig.clone()),
                _ => return None,
            }
        }
        Some(Self {
            signatures,
            placeholders,
            redeem_script: redeem_script.clone(),
        })
    }

    /// Encode back into an unlocking script.
    pub fn to_script(&self) -> Vec<u8> {
        let mut script = vec![OP_0];
        for signature in &self.signatures {
            push_data(&mut script, signature);
        }
        script.extend(std::iter::repeat(OP_0).take(self.placeholders));
        push_data(&mut script, &self.redeem_script);
        script
    }

    /// Whether every slot holds a signature.
    pub fn is_complete(&self) -> bool {
        self.placeholders == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pc_04_federation::multisig_redeem_script;
    use shared_crypto::Secp256k1KeyPair;

    fn key(seed: u8) -> Secp256k1PublicKey {
        Secp256k1KeyPair::from_bytes([seed; 32]).unwrap().public_key()
    }

    #[test]
    fn test_output_kinds() {
        let address = [9u8; 20];
        assert_eq!(output_kind(&p2pkh(&address)), OutputKind::PayToPubKeyHash(address));
        assert_eq!(output_kind(&p2sh(&address)), OutputKind::PayToScriptHash(address));
        assert_eq!(output_kind(&burn()), OutputKind::Burn);
        assert_eq!(output_kind(&[0x51]), OutputKind::Unknown);
    }

    #[test]
    fn test_push_data_forms() {
        for len in [0usize, 1, 75, 76, 255, 256, 600] {
            let data = vec![0x42; len];
            let mut script = Vec::new();
            push_data(&mut script, &data);
            assert_eq!(parse_chunks(&script).unwrap(), vec![ScriptChunk::Push(data)]);
        }
    }

    #[test]
    fn test_truncated_push_rejected() {
        assert!(parse_chunks(&[10, 1, 2]).is_err());
        assert!(parse_chunks(&[OP_PUSHDATA2, 1]).is_err());
    }

    #[test]
    fn test_p2pkh_spender() {
        let pk = key(1);
        assert_eq!(p2pkh_spender(&p2pkh_unlocking(&[1u8; 65], &pk)), Some(pk));
        assert_eq!(p2pkh_spender(&p2pkh_unlocking(&[], &pk)), None);
        assert_eq!(p2pkh_spender(&[OP_0]), None);
    }

    #[test]
    fn test_multisig_redeem_parse() {
        let keys = vec![key(1), key(2), key(3)];
        let script = multisig_redeem_script(&keys, 2);
        assert_eq!(parse_multisig_redeem(&script), Some((2, keys)));
        assert_eq!(parse_multisig_redeem(&p2sh(&[0; 20])), None);
    }

    #[test]
    fn test_multisig_unlocking_shape() {
        let redeem = multisig_redeem_script(&[key(1), key(2), key(3)], 2);
        let mut unlocking = MultisigUnlocking::unsigned(redeem.clone(), 2);
        let parsed = MultisigUnlocking::parse(&unlocking.to_script()).unwrap();
        assert_eq!(parsed, unlocking);
        assert!(!parsed.is_complete());

        unlocking.signatures.push(vec![7u8; 65]);
        unlocking.placeholders -= 1;
        let parsed = MultisigUnlocking::parse(&unlocking.to_script()).unwrap();
        assert_eq!(parsed.signatures, vec![vec![7u8; 65]]);
        assert_eq!(parsed.placeholders, 1);
        assert_eq!(parsed.redeem_script, redeem);
    }
}
