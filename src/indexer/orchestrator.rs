//! Ingest orchestrator: merges historical backfill and the live feed
//! into one strictly ordered event stream.
//!
//! Phase A replays `[last_synced_block + 1, head]` in fixed-size batches
//! and checkpoints SyncState after each committed batch. Phase B starts
//! the head poller from the first unsynced block and drains its FIFO one
//! entry at a time, with no parallelism across events, so application
//! order is exactly `(blockNumber, logIndex)`.
//!
//! Live-during-backfill strategy: the poller starts only after backfill
//! has reached the observed head, so overlap is impossible by
//! construction; any redelivery is absorbed by the
//! `(transaction_hash, log_index)` unique index.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::{mpsc, watch};

use crate::chain::events::{PoolManagerEvent, decode_log};
use crate::chain::{ChainReader, Log, spawn_log_poller};
use crate::config::IndexerConfig;
use crate::domain::address_hex;
use crate::error::IndexerError;
use crate::indexer::aggregator::TokenAggregator;
use crate::indexer::pool_tracker::PoolTracker;
use crate::persistence::PostgresPersistence;

const MAX_RPC_RETRIES: u32 = 10;
const BASE_BACKOFF_MS: u64 = 500;
const MAX_BACKOFF_MS: u64 = 30_000;
const LIVE_QUEUE_DEPTH: usize = 64;

/// Drives the whole pipeline for one pool manager.
pub struct Orchestrator {
    chain: Arc<dyn ChainReader>,
    persistence: PostgresPersistence,
    tracker: PoolTracker,
    aggregator: Arc<TokenAggregator>,
    pool_manager: String,
    starting_block: u64,
    sync_batch_size: u64,
    live_poll_interval: Duration,
    timestamps: HashMap<u64, u64>,
}

impl Orchestrator {
    /// Wires the orchestrator to its collaborators.
    #[must_use]
    pub fn new(
        chain: Arc<dyn ChainReader>,
        persistence: PostgresPersistence,
        tracker: PoolTracker,
        aggregator: Arc<TokenAggregator>,
        config: &IndexerConfig,
    ) -> Self {
        Self {
            chain,
            persistence,
            tracker,
            aggregator,
            pool_manager: address_hex(&config.pool_manager_address),
            starting_block: config.starting_block,
            sync_batch_size: config.sync_batch_size.max(1),
            live_poll_interval: Duration::from_secs(config.live_poll_interval_secs.max(1)),
            timestamps: HashMap::new(),
        }
    }

    /// Runs backfill then the live loop until shutdown or a fatal error.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error (database unavailable, or an RPC
    /// window that kept failing after every retry). The caller exits
    /// non-zero so a supervisor restarts the process; SyncState drives
    /// resume.
    pub async fn run(mut self, shutdown: watch::Receiver<bool>) -> Result<(), IndexerError> {
        let resume_from = self.backfill(&shutdown).await?;
        if *shutdown.borrow() {
            return Ok(());
        }
        self.live(resume_from, shutdown).await
    }

    /// Phase A: batched historical catch-up. Returns the first block the
    /// live phase must cover.
    async fn backfill(&mut self, shutdown: &watch::Receiver<bool>) -> Result<u64, IndexerError> {
        let state = self.persistence.get_sync_state(&self.pool_manager).await?;
        let mut from = match &state {
            Some(state) => (state.last_synced_block as u64 + 1).max(self.starting_block),
            None => self.starting_block,
        };
        tracing::info!(pool_manager = %self.pool_manager, from, "backfill starting");

        loop {
            let chain = Arc::clone(&self.chain);
            let head = retry_rpc("eth_blockNumber", || {
                let chain = Arc::clone(&chain);
                async move { chain.block_number().await }
            })
            .await?;

            if from > head {
                // Fully caught up (the head may have advanced while the
                // previous pass was running, hence the outer loop).
                self.persistence
                    .upsert_sync_state(
                        &self.pool_manager,
                        from.saturating_sub(1) as i64,
                        head as i64,
                        true,
                    )
                    .await?;
                tracing::info!(head, "initial sync complete");
                return Ok(from);
            }

            while from <= head {
                if *shutdown.borrow() {
                    return Ok(from);
                }
                let to = head.min(from + self.sync_batch_size - 1);
                let chain = Arc::clone(&self.chain);
                let logs = retry_rpc("eth_getLogs", || {
                    let chain = Arc::clone(&chain);
                    async move { chain.get_logs(from, to).await }
                })
                .await?;

                let count = logs.len();
                for log in &logs {
                    self.apply_log(log).await?;
                }
                self.persistence
                    .upsert_sync_state(&self.pool_manager, to as i64, head as i64, false)
                    .await?;
                tracing::debug!(from, to, count, "backfill batch committed");
                from = to + 1;
            }
        }
    }

    /// Phase B: drain the live FIFO one entry at a time.
    async fn live(
        &mut self,
        from: u64,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), IndexerError> {
        let (tx, mut rx) = mpsc::channel(LIVE_QUEUE_DEPTH);
        let poller = spawn_log_poller(
            Arc::clone(&self.chain),
            from,
            self.live_poll_interval,
            self.sync_batch_size,
            tx,
        );
        tracing::info!(from, "live subscription started");

        let mut outcome = Ok(());
        'drain: loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break 'drain;
                    }
                }
                batch = rx.recv() => {
                    let Some(batch) = batch else { break 'drain };
                    for log in &batch.logs {
                        if let Err(e) = self.apply_log(log).await {
                            outcome = Err(e);
                            break 'drain;
                        }
                    }
                    if let Err(e) = self
                        .persistence
                        .upsert_sync_state(
                            &self.pool_manager,
                            batch.to_block as i64,
                            batch.to_block as i64,
                            true,
                        )
                        .await
                    {
                        outcome = Err(e);
                        break 'drain;
                    }
                }
            }
        }

        poller.abort();
        tracing::info!("orchestrator stopped");
        outcome
    }

    /// Applies one log end to end. Only fatal errors escape: malformed
    /// logs and per-event handler failures are logged and skipped so a
    /// single bad event cannot halt the pipeline.
    async fn apply_log(&mut self, log: &Log) -> Result<(), IndexerError> {
        let event = match decode_log(log) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(block = log.block_number, log_index = log.log_index,
                    error = %e, "undecodable log skipped");
                return Ok(());
            }
        };

        let timestamp = self.block_timestamp(log.block_number).await?;

        let result = match event {
            PoolManagerEvent::Initialize(init) => {
                match self
                    .tracker
                    .handle_initialize(&init, log.block_number, timestamp, &log.transaction_hash)
                    .await
                {
                    Ok(Some(pool)) => self.aggregator.link_whitelist_pool(&pool).await,
                    Ok(None) => Ok(()),
                    Err(e) => Err(e),
                }
            }
            PoolManagerEvent::Swap(swap) => {
                match self
                    .tracker
                    .handle_swap(
                        &swap,
                        log.block_number,
                        timestamp,
                        &log.transaction_hash,
                        log.log_index,
                    )
                    .await
                {
                    Ok(Some(record)) => self.aggregator.apply_swap(&record).await,
                    Ok(None) => Ok(()),
                    Err(e) => Err(e),
                }
            }
            PoolManagerEvent::ModifyLiquidity(change) => {
                self.tracker.handle_modify_liquidity(&change, log.block_number).await
            }
        };

        if let Err(e) = result {
            if e.is_fatal() {
                return Err(e);
            }
            tracing::warn!(block = log.block_number, log_index = log.log_index,
                error = %e, "event handling failed, skipping");
        }
        Ok(())
    }

    /// Block timestamps repeat for every log in a block; cache them per
    /// run.
    async fn block_timestamp(&mut self, block: u64) -> Result<u64, IndexerError> {
        if let Some(cached) = self.timestamps.get(&block) {
            return Ok(*cached);
        }
        let chain = Arc::clone(&self.chain);
        let timestamp = retry_rpc("eth_getBlockByNumber", || {
            let chain = Arc::clone(&chain);
            async move { chain.block_timestamp(block).await }
        })
        .await?;
        if self.timestamps.len() > 4096 {
            self.timestamps.clear();
        }
        self.timestamps.insert(block, timestamp);
        Ok(timestamp)
    }
}

/// Retries a transient-failing RPC call with capped exponential backoff
/// and jitter. Non-transient errors and exhausted retries propagate.
async fn retry_rpc<T, F, Fut>(label: &str, mut op: F) -> Result<T, IndexerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, IndexerError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < MAX_RPC_RETRIES => {
                let backoff = (BASE_BACKOFF_MS << attempt.min(6)).min(MAX_BACKOFF_MS);
                let delay = backoff + jitter_ms(backoff / 4);
                tracing::warn!(label, attempt, delay_ms = delay, error = %e,
                    "transient rpc failure, backing off");
                tokio::time::sleep(Duration::from_millis(delay)).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

fn jitter_ms(cap: u64) -> u64 {
    if cap == 0 {
        return 0;
    }
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::from(d.subsec_nanos()) % cap)
        .unwrap_or(0)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn retry_recovers_after_transient_failures() {
        let attempts = AtomicU32::new(0);
        let result = retry_rpc("test", || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(IndexerError::Rpc("flaky".to_string()))
                } else {
                    Ok(7u64)
                }
            }
        })
        .await;
        assert_eq!(result.ok(), Some(7));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_propagates_non_transient_errors_immediately() {
        let attempts = AtomicU32::new(0);
        let result: Result<u64, _> = retry_rpc("test", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(IndexerError::Decode("bad".to_string())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn jitter_stays_under_cap() {
        for _ in 0..10 {
            assert!(jitter_ms(100) < 100);
        }
        assert_eq!(jitter_ms(0), 0);
    }
}
