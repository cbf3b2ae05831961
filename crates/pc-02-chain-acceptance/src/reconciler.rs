//! Transaction-pool reconciliation
//!
//! New best blocks are pushed onto an unbounded channel from inside
//! `try_connect` and drained by a background task, so the pool catches up
//! after the import returns, not during it.

use crate::ports::TransactionPool;
use shared_types::Block;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::debug;

/// Spawn the reconciler task. Must be called inside a tokio runtime.
///
/// The task exits once every sender is dropped.
pub fn spawn_pool_reconciler(
    pool: Arc<dyn TransactionPool>,
) -> (UnboundedSender<Block>, JoinHandle<()>) {
    let (sender, mut receiver) = mpsc::unbounded_channel::<Block>();
    let handle = tokio::spawn(async move {
        while let Some(block) = receiver.recv().await {
            debug!(
                "[pc-02] Reconciling pool against best block #{}",
                block.number()
            );
            pool.process_best(&block);
        }
        debug!("[pc-02] Pool reconciler stopped");
    });
    (sender, handle)
}
