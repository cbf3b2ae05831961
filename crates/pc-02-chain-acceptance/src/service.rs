//! Chain acceptance service
//!
//! Connects blocks under the global ordering lock: validation, execution,
//! fork choice, rebranch, commit and irreversibility propagation.

use crate::config::ChainAcceptanceConfig;
use crate::domain::{implied_irreversible_height, window_len, ImportResult, RuleChain, ValidationContext};
use crate::error::{ChainError, Result};
use crate::metrics::Metrics;
use crate::ports::{BlockExecutor, BlockStore, ChainListener, ExecutionOutcome, StateReader};
use parking_lot::{Mutex, RwLock};
use pc_01_producer_schedule::block_producer_list;
use shared_types::{Alarm, AlarmReporter, Block, GlobalOrdering, Hash, Receipt, TimeSource};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

/// Collaborators of [`ChainAcceptance`].
pub struct ChainDependencies {
    /// Block and receipt storage
    pub store: Arc<dyn BlockStore>,
    /// Execution engine
    pub executor: Arc<dyn BlockExecutor>,
    /// Account state
    pub state: Arc<dyn StateReader>,
    /// Local clock
    pub time_source: Arc<dyn TimeSource>,
    /// Operator alarm sink
    pub alarms: Arc<dyn AlarmReporter>,
}

/// Blockchain state machine: the only writer of the best block.
pub struct ChainAcceptance {
    config: ChainAcceptanceConfig,
    rules: RuleChain,
    store: Arc<dyn BlockStore>,
    executor: Arc<dyn BlockExecutor>,
    state: Arc<dyn StateReader>,
    time_source: Arc<dyn TimeSource>,
    alarms: Arc<dyn AlarmReporter>,
    ordering: GlobalOrdering,
    best: RwLock<Block>,
    listeners: RwLock<Vec<Arc<dyn ChainListener>>>,
    pool_notifier: RwLock<Option<UnboundedSender<Block>>>,
    last_flush_ms: Mutex<u64>,
    metrics: Metrics,
}

impl ChainAcceptance {
    /// Open the chain on top of `genesis`.
    ///
    /// Genesis is stored (if absent) as canonical and irreversible. When the
    /// store already holds a canonical chain above genesis, its highest block
    /// becomes the best block.
    pub fn new(
        config: ChainAcceptanceConfig,
        genesis: Block,
        deps: ChainDependencies,
        ordering: GlobalOrdering,
    ) -> Result<Self> {
        config.validate()?;
        if !genesis.is_genesis() || !genesis.is_sealed() {
            return Err(ChainError::InvalidGenesis(format!(
                "block #{} is not a sealed genesis block",
                genesis.number()
            )));
        }

        let store = deps.store;
        let genesis_hash = genesis.hash();
        match store.get_block_by_hash(&genesis_hash) {
            Some(stored) if stored.is_irreversible() => {}
            Some(_) => store.mark_irreversible(&genesis_hash)?,
            None => {
                let mut genesis = genesis.clone();
                genesis.mark_irreversible();
                store.save_block(&genesis, true)?;
            }
        }
        if let Some(canonical) = store.get_chain_block_by_number(0) {
            if canonical.hash() != genesis_hash {
                return Err(ChainError::InvalidGenesis(
                    "store holds a different genesis".into(),
                ));
            }
        }

        let mut best = store
            .get_block_by_hash(&genesis_hash)
            .ok_or_else(|| ChainError::Storage("genesis missing after save".into()))?;
        while let Some(next) = store.get_chain_block_by_number(best.number() + 1) {
            best = next;
        }

        info!(
            "[pc-02] Chain opened at best block #{} ({})",
            best.number(),
            hex::encode(&best.hash()[..8])
        );

        let now = deps.time_source.now_ms();
        Ok(Self {
            config,
            rules: RuleChain::standard(),
            store,
            executor: deps.executor,
            state: deps.state,
            time_source: deps.time_source,
            alarms: deps.alarms,
            ordering,
            best: RwLock::new(best),
            listeners: RwLock::new(Vec::new()),
            pool_notifier: RwLock::new(None),
            last_flush_ms: Mutex::new(now),
            metrics: Metrics::new(),
        })
    }

    /// Replace the validation rule chain.
    pub fn with_rules(mut self, rules: RuleChain) -> Self {
        self.rules = rules;
        self
    }

    /// Register a commit observer.
    pub fn add_listener(&self, listener: Arc<dyn ChainListener>) {
        self.listeners.write().push(listener);
    }

    /// Channel receiving every new best block for pool reconciliation.
    pub fn set_pool_notifier(&self, sender: UnboundedSender<Block>) {
        *self.pool_notifier.write() = Some(sender);
    }

    /// Current best block.
    pub fn best_block(&self) -> Block {
        self.best.read().clone()
    }

    /// Block on any branch.
    pub fn get_block_by_hash(&self, hash: &Hash) -> Option<Block> {
        self.store.get_block_by_hash(hash)
    }

    /// Canonical block at `number`.
    pub fn get_block_by_number(&self, number: u64) -> Option<Block> {
        self.store.get_chain_block_by_number(number)
    }

    /// Receipts of a block, if retained.
    pub fn get_receipts(&self, hash: &Hash) -> Option<Vec<Receipt>> {
        self.store.get_receipts(hash)
    }

    /// Configuration.
    pub fn config(&self) -> &ChainAcceptanceConfig {
        &self.config
    }

    /// Lock shared with the producer and the bridge.
    pub fn ordering(&self) -> &GlobalOrdering {
        &self.ordering
    }

    /// Metrics.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Validate and connect `block`.
    ///
    /// Rejections are reported through [`ImportResult`]; `Err` means a
    /// storage or execution failure.
    pub fn try_connect(&self, mut block: Block) -> Result<ImportResult> {
        let _guard = self.ordering.lock();

        if !block.is_sealed() {
            let alarm = Alarm::UnsealedBlock {
                number: block.number(),
                hash: block.hash(),
            };
            error!("[pc-02] Received unsealed block #{}", block.number());
            self.alarms.raise(alarm);
            block.seal();
        }

        let hash = block.hash();
        if self.store.get_block_by_hash(&hash).is_some() {
            debug!("[pc-02] Block #{} already known", block.number());
            return Ok(ImportResult::AlreadyExists);
        }

        if let Err(reason) = self.check_siblings(&block) {
            warn!("[pc-02] Block #{} rejected: {}", block.number(), reason);
            self.metrics.record_rejected();
            return Ok(ImportResult::InvalidBlock);
        }

        let Some(parent) = self.resolve_parent(&block) else {
            debug!(
                "[pc-02] Block #{} has unknown parent {}",
                block.number(),
                hex::encode(&block.parent_hash()[..8])
            );
            return Ok(ImportResult::NoParent);
        };

        let ctx = ValidationContext {
            block: &block,
            parent: &parent,
            now_ms: self.time_source.now_ms(),
            config: &self.config,
            state: self.state.as_ref(),
        };
        if let Err(e) = self.rules.validate(&ctx) {
            warn!("[pc-02] Block #{} invalid: {}", block.number(), e);
            self.metrics.record_rejected();
            return Ok(ImportResult::InvalidBlock);
        }

        let receipts = if self.config.no_validation_import {
            Vec::new()
        } else {
            let outcome = self.executor.execute(&block, &parent.header().state_root)?;
            if let Some(mismatch) = execution_mismatch(&block, &outcome) {
                warn!("[pc-02] Block #{} invalid: {}", block.number(), mismatch);
                self.metrics.record_rejected();
                return Ok(ImportResult::InvalidBlock);
            }
            outcome.receipts
        };

        let previous_best = self.best_block();
        let is_best = block.number() > previous_best.number();
        let reorg = is_best && block.parent_hash() != previous_best.hash();
        if reorg {
            let fork = self.fork_point(&block)?;
            if let Some(final_block) = self.irreversible_above(fork.number()) {
                warn!(
                    "[pc-02] Block #{} rejected: fork at #{} would orphan irreversible block #{}",
                    block.number(),
                    fork.number(),
                    final_block.number()
                );
                self.metrics.record_rejected();
                return Ok(ImportResult::InvalidBlock);
            }
        }

        self.store.save_block(&block, is_best)?;
        if is_best {
            if reorg {
                self.rebranch(&block, &previous_best)?;
            }
            *self.best.write() = block.clone();
        }

        self.commit(&block, receipts, is_best)?;
        if is_best {
            self.propagate_irreversibility(&block)?;
        }
        self.maybe_flush();

        self.metrics.record_imported();
        if is_best {
            info!(
                "[pc-02] Imported best block #{} ({} txs)",
                block.number(),
                block.transactions().len()
            );
            Ok(ImportResult::ImportedBest)
        } else {
            debug!("[pc-02] Imported side block #{}", block.number());
            Ok(ImportResult::ImportedNotBest)
        }
    }

    fn resolve_parent(&self, block: &Block) -> Option<Block> {
        let best = self.best.read();
        if best.hash() == block.parent_hash() {
            return Some(best.clone());
        }
        drop(best);
        self.store.get_block_by_hash(&block.parent_hash())
    }

    /// Reject blocks next to an irreversible block, and a producer's second
    /// block at one height within a round.
    fn check_siblings(&self, block: &Block) -> std::result::Result<(), String> {
        let siblings = self.store.get_blocks_by_number(block.number());
        if siblings.is_empty() {
            return Ok(());
        }
        let round_ms = block_producer_list(block)
            .ok()
            .map(|list| self.config.schedule.round_length_ms(list.len()));

        for sibling in siblings {
            if sibling.is_irreversible() {
                return Err(format!(
                    "height {} already has irreversible block {}",
                    block.number(),
                    hex::encode(&sibling.hash()[..8])
                ));
            }
            if sibling.coinbase() == block.coinbase() {
                if let Some(round_ms) = round_ms {
                    let gap = sibling.timestamp().abs_diff(block.timestamp());
                    if gap < round_ms {
                        return Err(format!(
                            "producer {} already signed height {} {}ms earlier",
                            hex::encode(block.coinbase()),
                            block.number(),
                            gap
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Last canonical ancestor of `block`.
    fn fork_point(&self, block: &Block) -> Result<Block> {
        let mut cursor = self.load(&block.parent_hash())?;
        loop {
            let canonical = self.store.get_chain_block_by_number(cursor.number());
            if cursor.is_genesis() || canonical.map(|b| b.hash()) == Some(cursor.hash()) {
                return Ok(cursor);
            }
            cursor = self.load(&cursor.parent_hash())?;
        }
    }

    /// Canonical irreversible block right above `fork_number`, if any.
    ///
    /// Irreversible blocks form a prefix of the canonical chain, so the
    /// first height above the fork decides.
    fn irreversible_above(&self, fork_number: u64) -> Option<Block> {
        self.store
            .get_chain_block_by_number(fork_number + 1)
            .filter(Block::is_irreversible)
    }

    /// Point the canonical index at the branch ending in `new_tip`.
    fn rebranch(&self, new_tip: &Block, old_tip: &Block) -> Result<()> {
        let mut reassigned = 0u64;
        let mut cursor = self.load(&new_tip.parent_hash())?;
        loop {
            let canonical = self.store.get_chain_block_by_number(cursor.number());
            if canonical.map(|b| b.hash()) == Some(cursor.hash()) {
                break;
            }
            self.store.set_canonical(cursor.number(), &cursor.hash())?;
            reassigned += 1;
            if cursor.is_genesis() {
                break;
            }
            cursor = self.load(&cursor.parent_hash())?;
        }

        info!(
            "[pc-02] Rebranch: fork at #{}, old tip #{}, new tip #{}, {} ancestors reassigned",
            cursor.number(),
            old_tip.number(),
            new_tip.number(),
            reassigned
        );
        self.metrics.record_rebranch();
        Ok(())
    }

    fn commit(&self, block: &Block, receipts: Vec<Receipt>, is_best: bool) -> Result<()> {
        self.store
            .save_receipts(&block.hash(), block.number(), receipts.clone())?;

        if is_best {
            let retention = self.config.receipts_retention_blocks;
            if retention > 0 && block.number() > retention {
                self.store.prune_receipts_below(block.number() - retention)?;
            }
            if let Some(sender) = self.pool_notifier.read().as_ref() {
                if sender.send(block.clone()).is_err() {
                    warn!("[pc-02] Pool reconciler is gone; best block not forwarded");
                }
            }
        }

        let listeners: Vec<Arc<dyn ChainListener>> = self.listeners.read().clone();
        for listener in listeners {
            listener.on_block(block, &receipts);
            if is_best {
                listener.on_best_block(block);
            }
        }
        Ok(())
    }

    /// Mark ancestors irreversible from the height implied by the recent
    /// producers of the best chain ending in `block`.
    fn propagate_irreversibility(&self, block: &Block) -> Result<()> {
        let list = match block_producer_list(block) {
            Ok(list) if !list.is_empty() => list,
            _ => return Ok(()),
        };
        let producers = list.distinct_ledger_addresses();
        let window_size = window_len(list.len());

        let mut window = Vec::with_capacity(window_size);
        let mut cursor = Some(block.clone());
        while let Some(current) = cursor {
            if window.len() >= window_size {
                break;
            }
            window.push((current.number(), current.coinbase()));
            if current.is_genesis() {
                break;
            }
            cursor = self.store.get_block_by_hash(&current.parent_hash());
        }

        let height = implied_irreversible_height(&producers, &window);
        if height == 0 {
            return Ok(());
        }

        let mut marked = 0u64;
        let mut cursor = self.store.get_block_by_hash(&block.hash());
        while let Some(current) = cursor {
            if current.is_genesis() {
                break;
            }
            if current.number() <= height {
                if current.is_irreversible() {
                    break;
                }
                self.store.mark_irreversible(&current.hash())?;
                marked += 1;
            }
            cursor = self.store.get_block_by_hash(&current.parent_hash());
        }

        if marked > 0 {
            debug!(
                "[pc-02] {} blocks became irreversible up to #{}",
                marked, height
            );
            self.metrics.record_irreversible(marked);
            let best_hash = self.best.read().hash();
            if let Some(best) = self.store.get_block_by_hash(&best_hash) {
                *self.best.write() = best;
            }
        }
        Ok(())
    }

    fn maybe_flush(&self) {
        let now = self.time_source.now_ms();
        let mut last = self.last_flush_ms.lock();
        if now.saturating_sub(*last) < self.config.flush_interval_ms {
            return;
        }
        match self.store.flush() {
            Ok(()) => {
                *last = now;
                self.metrics.record_flush();
            }
            Err(e) => warn!("[pc-02] Block store flush failed: {}", e),
        }
    }

    fn load(&self, hash: &Hash) -> Result<Block> {
        self.store
            .get_block_by_hash(hash)
            .ok_or_else(|| ChainError::Storage(format!("missing block {}", hex::encode(hash))))
    }
}

fn execution_mismatch(block: &Block, outcome: &ExecutionOutcome) -> Option<String> {
    let header = block.header();
    if header.state_root != outcome.state_root {
        return Some("state root differs from execution".into());
    }
    if header.receipts_root != outcome.receipts_root {
        return Some("receipts root differs from execution".into());
    }
    if header.gas_used != outcome.gas_used {
        return Some(format!(
            "gas used {} differs from executed {}",
            header.gas_used, outcome.gas_used
        ));
    }
    None
}
