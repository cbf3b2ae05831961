use crate::error::{BlockProductionError, Result};
use crate::ports::BlockPublisher;
use async_trait::async_trait;
use shared_types::Block;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Publishes produced blocks onto an in-process channel, for the network
/// layer (or a test) to drain.
pub struct ChannelBlockPublisher {
    sender: UnboundedSender<Block>,
}

impl ChannelBlockPublisher {
    /// Publisher plus the receiving end of its channel.
    pub fn new() -> (Self, UnboundedReceiver<Block>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl BlockPublisher for ChannelBlockPublisher {
    async fn publish(&self, block: &Block) -> Result<()> {
        self.sender
            .send(block.clone())
            .map_err(|_| BlockProductionError::Publish("block channel closed".into()))
    }
}
