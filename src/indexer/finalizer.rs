//! Wall-clock candle finalizers.
//!
//! Three long-lived tasks, one per interval, each sleeping until the
//! next period boundary and then promoting the just-ended buckets.
//! Finalization targets buckets strictly before the live one, so it can
//! race ongoing event application without ever touching a bucket that
//! current events still write to.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::domain::CandleInterval;
use crate::indexer::aggregator::TokenAggregator;

/// Spawns one finalizer task per candle interval.
#[must_use]
pub fn spawn_finalizers(
    aggregator: Arc<TokenAggregator>,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    CandleInterval::ALL
        .into_iter()
        .map(|interval| spawn_one(interval, Arc::clone(&aggregator), shutdown.clone()))
        .collect()
}

fn spawn_one(
    interval: CandleInterval,
    aggregator: Arc<TokenAggregator>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let wait = seconds_until_next_boundary(interval, Utc::now().timestamp());
            tokio::select! {
                () = tokio::time::sleep(Duration::from_secs(wait)) => {
                    let now = Utc::now().timestamp();
                    if let Err(e) = aggregator.finalize(interval, now).await {
                        tracing::error!(interval = %interval, error = %e, "finalization failed");
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
    })
}

/// Seconds from `now` until the next bucket boundary for the interval,
/// never zero so a task cannot spin inside one boundary second.
fn seconds_until_next_boundary(interval: CandleInterval, now: i64) -> u64 {
    let next = interval.bucket_start(now) + interval.duration_secs();
    (next - now).max(1) as u64
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    // 2021-01-01T12:34:56Z
    const TS: i64 = 1_609_504_496;

    #[test]
    fn waits_to_the_next_minute() {
        assert_eq!(seconds_until_next_boundary(CandleInterval::Minute, TS), 4);
    }

    #[test]
    fn waits_to_the_next_hour() {
        assert_eq!(
            seconds_until_next_boundary(CandleInterval::Hour, TS),
            25 * 60 + 4
        );
    }

    #[test]
    fn boundary_timestamp_waits_a_full_period() {
        let boundary = CandleInterval::Minute.bucket_start(TS);
        assert_eq!(
            seconds_until_next_boundary(CandleInterval::Minute, boundary),
            60
        );
    }
}
