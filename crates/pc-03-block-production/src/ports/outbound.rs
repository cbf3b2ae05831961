//! Driven ports (Outbound dependencies)
//!
//! Both ports may block on the network and are called without the global
//! ordering lock held.

use crate::domain::ProducerRecord;
use crate::error::Result;
use async_trait::async_trait;
use shared_types::Block;

/// External authority publishing the producer list.
#[async_trait]
pub trait ProducerListSource: Send + Sync {
    /// Current records, in rotation order.
    async fn fetch_records(&self) -> Result<Vec<ProducerRecord>>;
}

/// Broadcast of locally produced blocks.
#[async_trait]
pub trait BlockPublisher: Send + Sync {
    /// Announce `block` to peers.
    async fn publish(&self, block: &Block) -> Result<()>;
}
