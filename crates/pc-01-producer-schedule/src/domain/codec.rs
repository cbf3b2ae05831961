//! Producer-list codec
//!
//! Per producer, `[1-byte length][raw public key bytes]`, concatenated.
//! Keys are stored in the compressed SEC1 form; uncompressed keys are
//! accepted on decode and normalized.

use crate::error::{Result, ScheduleError};
use shared_crypto::Secp256k1PublicKey;

/// Encode public keys in list order.
pub fn encode_producer_keys(keys: &[Secp256k1PublicKey]) -> Vec<u8> {
    let mut out = Vec::with_capacity(keys.len() * 34);
    for key in keys {
        let bytes = key.as_bytes();
        out.push(bytes.len() as u8);
        out.extend_from_slice(bytes);
    }
    out
}

/// Decode a payload produced by [`encode_producer_keys`].
pub fn decode_producer_keys(payload: &[u8]) -> Result<Vec<Secp256k1PublicKey>> {
    let mut keys = Vec::new();
    let mut cursor = 0usize;

    while cursor < payload.len() {
        let len = payload[cursor] as usize;
        let start = cursor + 1;
        let end = start + len;
        if end > payload.len() {
            return Err(ScheduleError::MalformedProducerList(format!(
                "key #{} declares {} bytes but only {} remain",
                keys.len(),
                len,
                payload.len() - start
            )));
        }
        let key = Secp256k1PublicKey::from_sec1_slice(&payload[start..end]).map_err(|e| {
            ScheduleError::MalformedProducerList(format!("key #{}: {}", keys.len(), e))
        })?;
        keys.push(key);
        cursor = end;
    }

    Ok(keys)
}
