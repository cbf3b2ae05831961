//! # External-Chain Transactions
//!
//! The external UTXO chain's legacy transaction format:
//!
//! ```text
//! version:u32le  n_in:varint  { prev_txid:32  prev_index:u32le  script_sig:varbytes  sequence:u32le }*
//!                n_out:varint { value:u64le  script_pubkey:varbytes }*
//! lock_time:u32le
//! ```
//!
//! The txid is the double SHA-256 of this serialization.

use crate::domain::script::SIGHASH_ALL;
use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use shared_crypto::double_sha256;
use shared_types::Hash;

/// A reference to an output of an external transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    /// Txid of the transaction holding the output
    pub tx_hash: Hash,
    /// Output position
    pub index: u32,
}

/// A transaction input.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxInput {
    /// Output being spent
    pub previous: OutPoint,
    /// Unlocking script
    pub script_sig: Vec<u8>,
    /// Sequence number
    pub sequence: u32,
}

/// A transaction output.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxOutput {
    /// Amount (external units)
    pub value: u64,
    /// Locking script
    pub script_pubkey: Vec<u8>,
}

/// An external-chain transaction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExternalTransaction {
    /// Format version
    pub version: u32,
    /// Inputs
    pub inputs: Vec<TxInput>,
    /// Outputs
    pub outputs: Vec<TxOutput>,
    /// Lock time
    pub lock_time: u32,
}

/// Sequence number of final inputs.
pub const FINAL_SEQUENCE: u32 = 0xffff_ffff;

impl ExternalTransaction {
    /// Version-1 transaction with no lock time.
    pub fn new(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Self {
        Self {
            version: 1,
            inputs,
            outputs,
            lock_time: 0,
        }
    }

    /// Canonical serialization.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(10 + self.inputs.len() * 150 + self.outputs.len() * 34);
        out.extend_from_slice(&self.version.to_le_bytes());
        write_varint(&mut out, self.inputs.len() as u64);
        for input in &self.inputs {
            out.extend_from_slice(&input.previous.tx_hash);
            out.extend_from_slice(&input.previous.index.to_le_bytes());
            write_varbytes(&mut out, &input.script_sig);
            out.extend_from_slice(&input.sequence.to_le_bytes());
        }
        write_varint(&mut out, self.outputs.len() as u64);
        for output in &self.outputs {
            out.extend_from_slice(&output.value.to_le_bytes());
            write_varbytes(&mut out, &output.script_pubkey);
        }
        out.extend_from_slice(&self.lock_time.to_le_bytes());
        out
    }

    /// Parse a canonical serialization. Trailing bytes are rejected.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes);
        let version = reader.u32()?;
        let input_count = reader.count(41)?;
        let mut inputs = Vec::with_capacity(input_count);
        for _ in 0..input_count {
            let tx_hash = reader.array32()?;
            let index = reader.u32()?;
            let script_sig = reader.varbytes()?;
            let sequence = reader.u32()?;
            inputs.push(TxInput {
                previous: OutPoint { tx_hash, index },
                script_sig,
                sequence,
            });
        }
        let output_count = reader.count(9)?;
        let mut outputs = Vec::with_capacity(output_count);
        for _ in 0..output_count {
            let value = reader.u64()?;
            let script_pubkey = reader.varbytes()?;
            outputs.push(TxOutput {
                value,
                script_pubkey,
            });
        }
        let lock_time = reader.u32()?;
        if !reader.is_empty() {
            return Err(BridgeError::MalformedTransaction(format!(
                "{} trailing bytes",
                reader.remaining()
            )));
        }
        Ok(Self {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }

    /// Double SHA-256 of the serialization.
    pub fn txid(&self) -> Hash {
        double_sha256(&self.serialize())
    }

    /// Sum of all output values, saturating.
    pub fn total_output_value(&self) -> u64 {
        self.outputs
            .iter()
            .fold(0u64, |acc, o| acc.saturating_add(o.value))
    }

    /// Legacy signature hash of input `index` spending `redeem_script`
    /// with `SIGHASH_ALL`: every other input's script emptied, this one's
    /// replaced by the redeem script, sighash type appended as `u32le`.
    pub fn signature_hash(&self, index: usize, redeem_script: &[u8]) -> Hash {
        let mut copy = self.clone();
        for (i, input) in copy.inputs.iter_mut().enumerate() {
            input.script_sig = if i == index {
                redeem_script.to_vec()
            } else {
                Vec::new()
            };
        }
        let mut bytes = copy.serialize();
        bytes.extend_from_slice(&u32::from(SIGHASH_ALL).to_le_bytes());
        double_sha256(&bytes)
    }

    /// Outpoint of output `index`.
    pub fn outpoint(&self, index: u32) -> OutPoint {
        OutPoint {
            tx_hash: self.txid(),
            index,
        }
    }
}

fn write_varint(out: &mut Vec<u8>, n: u64) {
    match n {
        0..=0xfc => out.push(n as u8),
        0xfd..=0xffff => {
            out.push(0xfd);
            out.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            out.push(0xfe);
            out.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            out.push(0xff);
            out.extend_from_slice(&n.to_le_bytes());
        }
    }
}

fn write_varbytes(out: &mut Vec<u8>, bytes: &[u8]) {
    write_varint(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(BridgeError::MalformedTransaction(format!(
                "needed {} bytes at offset {}, {} left",
                n,
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn array32(&mut self) -> Result<[u8; 32]> {
        self.array::<32>()
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    fn varint(&mut self) -> Result<u64> {
        let [prefix] = self.array::<1>()?;
        Ok(match prefix {
            0xfd => u64::from(self.u16()?),
            0xfe => u64::from(self.u32()?),
            0xff => self.u64()?,
            n => u64::from(n),
        })
    }

    /// An element count, bounded by what the remaining bytes could hold.
    fn count(&mut self, min_element_size: usize) -> Result<usize> {
        let n = self.varint()?;
        let limit = (self.remaining() / min_element_size) as u64;
        if n > limit {
            return Err(BridgeError::MalformedTransaction(format!(
                "count {} exceeds remaining data",
                n
            )));
        }
        Ok(n as usize)
    }

    fn varbytes(&mut self) -> Result<Vec<u8>> {
        let len = self.varint()?;
        if len > self.remaining() as u64 {
            return Err(BridgeError::MalformedTransaction(format!(
                "script of {} bytes exceeds remaining data",
                len
            )));
        }
        Ok(self.take(len as usize)?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ExternalTransaction {
        ExternalTransaction::new(
            vec![TxInput {
                previous: OutPoint {
                    tx_hash: [7u8; 32],
                    index: 3,
                },
                script_sig: vec![0xaa; 300],
                sequence: FINAL_SEQUENCE,
            }],
            vec![
                TxOutput {
                    value: 50_000,
                    script_pubkey: vec![0x51],
                },
                TxOutput {
                    value: 1,
                    script_pubkey: vec![],
                },
            ],
        )
    }

    #[test]
    fn test_parse_serialize_identity() {
        let tx = sample();
        let bytes = tx.serialize();
        // 300-byte script needs the 0xfd varint form.
        assert_eq!(bytes[4 + 1 + 32 + 4], 0xfd);
        assert_eq!(ExternalTransaction::parse(&bytes).unwrap(), tx);
        assert_eq!(tx.txid(), double_sha256(&bytes));
        assert_eq!(tx.total_output_value(), 50_001);
    }

    #[test]
    fn test_truncated_and_trailing_rejected() {
        let bytes = sample().serialize();
        assert!(matches!(
            ExternalTransaction::parse(&bytes[..bytes.len() - 1]),
            Err(BridgeError::MalformedTransaction(_))
        ));
        let mut extended = bytes.clone();
        extended.push(0);
        assert!(matches!(
            ExternalTransaction::parse(&extended),
            Err(BridgeError::MalformedTransaction(_))
        ));
    }

    #[test]
    fn test_signature_hash_ignores_existing_signatures() {
        let mut tx = sample();
        tx.inputs.push(tx.inputs[0].clone());
        let before = tx.signature_hash(0, &[0x51]);
        tx.inputs[0].script_sig = vec![1, 2, 3];
        tx.inputs[1].script_sig = vec![4, 5, 6];
        assert_eq!(tx.signature_hash(0, &[0x51]), before);
        assert_ne!(tx.signature_hash(1, &[0x51]), before);
        assert_ne!(tx.signature_hash(0, &[0x52]), before);
    }

    #[test]
    fn test_absurd_count_rejected() {
        let mut bytes = 1u32.to_le_bytes().to_vec();
        bytes.push(0xff);
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());
        assert!(ExternalTransaction::parse(&bytes).is_err());
    }
}
