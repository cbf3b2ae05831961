//! Producer scheduler
//!
//! A single cooperative task. Each [`ProducerScheduler::tick`] performs one
//! state transition and returns the instant (ms) of the next wake-up; the run
//! loop only sleeps until then. Failures never stop the loop: they are
//! logged and the next attempt is scheduled one round later.

use super::assembler::BlockAssembler;
use crate::config::BlockProductionConfig;
use crate::domain::{active_producer_list, next_own_slot, SchedulerState};
use crate::error::{BlockProductionError, Result};
use crate::metrics::Metrics;
use crate::ports::{BlockPublisher, ProducerListSource};
use pc_01_producer_schedule::ProducerList;
use pc_02_chain_acceptance::{ChainAcceptance, ImportResult};
use shared_crypto::Secp256k1PublicKey;
use shared_types::{Block, TimeSource};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Round-robin producer state machine for the local identity.
pub struct ProducerScheduler {
    config: BlockProductionConfig,
    identity: Secp256k1PublicKey,
    assembler: BlockAssembler,
    chain: Arc<ChainAcceptance>,
    source: Arc<dyn ProducerListSource>,
    publisher: Arc<dyn BlockPublisher>,
    time_source: Arc<dyn TimeSource>,
    state: SchedulerState,
    list: Option<ProducerList>,
    metrics: Arc<Metrics>,
}

impl ProducerScheduler {
    /// Create an idle scheduler producing with `assembler`'s key.
    pub fn new(
        config: BlockProductionConfig,
        assembler: BlockAssembler,
        chain: Arc<ChainAcceptance>,
        source: Arc<dyn ProducerListSource>,
        publisher: Arc<dyn BlockPublisher>,
        time_source: Arc<dyn TimeSource>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            identity: assembler.public_key(),
            assembler,
            chain,
            source,
            publisher,
            time_source,
            state: SchedulerState::Idle,
            list: None,
            metrics: Arc::new(Metrics::new()),
        })
    }

    /// Current state.
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Shared metrics.
    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    /// Perform one transition; returns the next wake-up time (ms).
    pub async fn tick(&mut self) -> u64 {
        let now = self.time_source.now_ms();
        match self.state {
            SchedulerState::Idle => {
                info!("[pc-03] Producer scheduler starting");
                self.state = SchedulerState::AwaitingListRefresh;
                now.saturating_add(self.config.start_delay_ms)
            }
            SchedulerState::AwaitingListRefresh => self.refresh_and_schedule(now).await,
            SchedulerState::Scheduled { at_ms } if now < at_ms => at_ms,
            SchedulerState::Scheduled { .. } | SchedulerState::Producing => {
                self.produce_in_slot(now).await
            }
        }
    }

    /// Drive the state machine until `shutdown` flips or its sender drops.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        loop {
            let wake_at = self.tick().await;
            let delay = wake_at.saturating_sub(self.time_source.now_ms());
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(delay)) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("[pc-03] Producer scheduler stopping");
                        return;
                    }
                }
            }
        }
    }

    /// Spawn [`Self::run`] on the current runtime.
    pub fn spawn(self) -> SchedulerHandle {
        let (shutdown, receiver) = watch::channel(false);
        let task = tokio::spawn(self.run(receiver));
        SchedulerHandle { shutdown, task }
    }

    async fn refresh_and_schedule(&mut self, now: u64) -> u64 {
        let list = match self.fetch_list(now).await {
            Ok(list) => list,
            Err(e) => {
                warn!("[pc-03] Producer list refresh failed: {}; retrying next round", e);
                self.metrics.record_list_failure();
                return now.saturating_add(self.round_ms());
            }
        };
        self.list = Some(list.clone());

        if self.chain.best_block().is_genesis() {
            info!("[pc-03] Best block is genesis; bootstrapping the first round");
            self.state = SchedulerState::Producing;
            let produced = self.produce(&list).await;
            self.state = SchedulerState::AwaitingListRefresh;
            return if produced {
                now
            } else {
                now.saturating_add(self.round_ms())
            };
        }

        let Some(index) = list.index_of_key(&self.identity) else {
            debug!("[pc-03] Local identity not in producer list; skipping round");
            self.metrics.record_round_skipped();
            self.state = SchedulerState::AwaitingListRefresh;
            return now.saturating_add(self.round_ms());
        };

        match next_own_slot(
            &self.chain.config().schedule,
            now,
            index,
            list.len(),
            self.config.max_slot_search_steps,
        ) {
            Ok(at_ms) => {
                debug!("[pc-03] Next slot for producer #{} at {}", index, at_ms);
                self.state = SchedulerState::Scheduled { at_ms };
                at_ms
            }
            Err(e) => {
                warn!("[pc-03] Slot search failed: {}; retrying next round", e);
                self.metrics.record_schedule_failure();
                self.state = SchedulerState::AwaitingListRefresh;
                now.saturating_add(self.round_ms())
            }
        }
    }

    async fn produce_in_slot(&mut self, now: u64) -> u64 {
        let Some(list) = self.list.clone() else {
            self.state = SchedulerState::AwaitingListRefresh;
            return now;
        };
        self.state = SchedulerState::Producing;
        self.produce(&list).await;
        self.state = SchedulerState::AwaitingListRefresh;
        self.time_source.now_ms()
    }

    /// Fetch with a timeout, outside the global lock.
    async fn fetch_list(&self, now: u64) -> Result<ProducerList> {
        let timeout_ms = self.config.list_refresh_timeout_ms;
        let records = tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            self.source.fetch_records(),
        )
        .await
        .map_err(|_| BlockProductionError::ListSourceTimeout(timeout_ms))??;
        active_producer_list(&records, now)
    }

    /// Build, import and publish one block. Returns whether it was imported.
    async fn produce(&self, list: &ProducerList) -> bool {
        let block = match self.build_and_connect(list) {
            Ok(block) => block,
            Err(e) => {
                warn!("[pc-03] Block production failed: {}", e);
                self.metrics.record_rejected();
                return false;
            }
        };
        self.metrics.record_produced();
        if let Err(e) = self.publisher.publish(&block).await {
            warn!("[pc-03] Publishing block #{} failed: {}", block.number(), e);
            self.metrics.record_publish_failure();
        }
        true
    }

    /// The global lock is held only here, never across an `.await`.
    fn build_and_connect(&self, list: &ProducerList) -> Result<Block> {
        let _guard = self.chain.ordering().lock();
        let parent = self.chain.best_block();
        let block = self
            .assembler
            .build(&parent, list, self.config.extra_data.as_bytes())?;
        match self.chain.try_connect(block.clone())? {
            ImportResult::ImportedBest => {
                info!("[pc-03] Produced block #{}", block.number());
                Ok(block)
            }
            other => Err(BlockProductionError::NotImported(other)),
        }
    }

    fn round_ms(&self) -> u64 {
        let list_size = self.list.as_ref().map_or(1, |list| list.len().max(1));
        self.chain
            .config()
            .schedule
            .round_length_ms(list_size)
            .max(1)
    }
}

/// Running scheduler task.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signal shutdown and wait for the task to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!("[pc-03] Producer scheduler task ended abnormally: {}", e);
        }
    }
}
