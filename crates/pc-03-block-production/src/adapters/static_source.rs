use crate::domain::{parse_records, ProducerRecord};
use crate::error::{BlockProductionError, Result};
use crate::ports::ProducerListSource;
use async_trait::async_trait;
use parking_lot::RwLock;

/// Producer-list source backed by a local record set.
///
/// Used for fixed federations and tests; `set_unavailable` simulates an
/// authority outage.
#[derive(Default)]
pub struct StaticProducerListSource {
    records: RwLock<Vec<ProducerRecord>>,
    unavailable: RwLock<bool>,
}

impl StaticProducerListSource {
    /// Serve `records`.
    pub fn new(records: Vec<ProducerRecord>) -> Self {
        Self {
            records: RwLock::new(records),
            unavailable: RwLock::new(false),
        }
    }

    /// Serve the records of an authority JSON response.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(parse_records(json)?))
    }

    /// Replace the served records.
    pub fn set_records(&self, records: Vec<ProducerRecord>) {
        *self.records.write() = records;
    }

    /// Make every fetch fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write() = unavailable;
    }
}

#[async_trait]
impl ProducerListSource for StaticProducerListSource {
    async fn fetch_records(&self) -> Result<Vec<ProducerRecord>> {
        if *self.unavailable.read() {
            return Err(BlockProductionError::ListSourceUnavailable(
                "authority offline".into(),
            ));
        }
        Ok(self.records.read().clone())
    }
}
