//! Producer-list records from the external authority
//!
//! The authority answers with a JSON array of
//! `{"identity": "<hex public key>", "validFromTime": <ms>}`. The active list
//! is every record already valid, in the order given.

use crate::error::{BlockProductionError, Result};
use pc_01_producer_schedule::ProducerList;
use serde::{Deserialize, Serialize};
use shared_crypto::Secp256k1PublicKey;

/// One authority record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerRecord {
    /// Hex SEC1 public key, optionally `0x`-prefixed
    pub identity: String,
    /// Time from which the producer is active (ms)
    #[serde(rename = "validFromTime")]
    pub valid_from_time: u64,
}

impl ProducerRecord {
    /// Record for `key`, valid from `valid_from_time`.
    pub fn new(key: &Secp256k1PublicKey, valid_from_time: u64) -> Self {
        Self {
            identity: hex::encode(key.as_bytes()),
            valid_from_time,
        }
    }

    /// Decoded public key.
    pub fn public_key(&self) -> Result<Secp256k1PublicKey> {
        let raw = self.identity.trim_start_matches("0x");
        let bytes = hex::decode(raw)
            .map_err(|e| BlockProductionError::MalformedProducerRecord(e.to_string()))?;
        Secp256k1PublicKey::from_sec1_slice(&bytes)
            .map_err(|e| BlockProductionError::MalformedProducerRecord(e.to_string()))
    }
}

/// Parse an authority response.
pub fn parse_records(json: &str) -> Result<Vec<ProducerRecord>> {
    serde_json::from_str(json)
        .map_err(|e| BlockProductionError::MalformedProducerRecord(e.to_string()))
}

/// Producers valid at `now_ms`, in record order.
pub fn active_producer_list(records: &[ProducerRecord], now_ms: u64) -> Result<ProducerList> {
    let keys = records
        .iter()
        .filter(|record| record.valid_from_time <= now_ms)
        .map(ProducerRecord::public_key)
        .collect::<Result<Vec<_>>>()?;
    if keys.is_empty() {
        return Err(BlockProductionError::EmptyProducerList);
    }
    Ok(ProducerList::from_keys(keys))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_crypto::Secp256k1KeyPair;

    fn key(seed: u8) -> Secp256k1PublicKey {
        Secp256k1KeyPair::from_bytes([seed; 32]).unwrap().public_key()
    }

    #[test]
    fn test_parse_authority_json() {
        let json = format!(
            r#"[{{"identity": "0x{}", "validFromTime": 10}}, {{"identity": "{}", "validFromTime": 500}}]"#,
            hex::encode(key(1).as_bytes()),
            hex::encode(key(2).as_bytes())
        );
        let records = parse_records(&json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].valid_from_time, 500);
        assert_eq!(records[0].public_key().unwrap(), key(1));
    }

    #[test]
    fn test_future_records_excluded() {
        let records = vec![
            ProducerRecord::new(&key(1), 0),
            ProducerRecord::new(&key(2), 1_000),
            ProducerRecord::new(&key(3), 0),
        ];
        let list = active_producer_list(&records, 999).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.index_of_key(&key(3)), Some(1));

        assert_eq!(active_producer_list(&records, 1_000).unwrap().len(), 3);
    }

    #[test]
    fn test_nothing_active_is_error() {
        let records = vec![ProducerRecord::new(&key(1), 1_000)];
        assert!(matches!(
            active_producer_list(&records, 0),
            Err(BlockProductionError::EmptyProducerList)
        ));
    }

    #[test]
    fn test_bad_identity_rejected() {
        let records = vec![ProducerRecord {
            identity: "zz".into(),
            valid_from_time: 0,
        }];
        assert!(matches!(
            active_producer_list(&records, 0),
            Err(BlockProductionError::MalformedProducerRecord(_))
        ));
    }
}
