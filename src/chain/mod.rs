//! Chain Reader: JSON-RPC access to the pool manager's event stream.

pub mod client;
pub mod events;

pub use client::{ChainReader, HttpChainReader, Log, TokenMetadata};
pub use events::PoolManagerEvent;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

/// A contiguous run of ordered logs ending at `to_block`, as delivered
/// by the live poller.
#[derive(Debug)]
pub struct LogBatch {
    /// Logs in `(block_number, log_index)` order.
    pub logs: Vec<Log>,
    /// Highest block covered by this batch (inclusive).
    pub to_block: u64,
}

/// Spawns the live log feed: a head-polling task that fetches every new
/// block range and pushes it into a bounded FIFO.
///
/// Poll failures are logged and retried on the next tick; the feed never
/// skips a block range. Ranges wider than `max_batch` (e.g. after the
/// poller fell behind) are fetched in chunks so provider limits hold.
pub fn spawn_log_poller(
    reader: Arc<dyn ChainReader>,
    from_block: u64,
    poll_interval: Duration,
    max_batch: u64,
    tx: mpsc::Sender<LogBatch>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut next_block = from_block;

        loop {
            ticker.tick().await;

            let head = match reader.block_number().await {
                Ok(head) => head,
                Err(e) => {
                    tracing::warn!(error = %e, "live head poll failed");
                    continue;
                }
            };
            if head < next_block {
                continue;
            }

            let mut from = next_block;
            while from <= head {
                let to = head.min(from + max_batch.saturating_sub(1));
                let logs = match reader.get_logs(from, to).await {
                    Ok(logs) => logs,
                    Err(e) => {
                        tracing::warn!(from, to, error = %e, "live getLogs failed, will re-poll");
                        // Leave next_block at `from` so the range is retried.
                        break;
                    }
                };
                if tx.send(LogBatch { logs, to_block: to }).await.is_err() {
                    // Consumer is gone; the pipeline is shutting down.
                    return;
                }
                from = to + 1;
                next_block = from;
            }
        }
    })
}
