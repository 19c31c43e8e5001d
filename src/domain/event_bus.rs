//! Broadcast channel for market events.
//!
//! [`EventBus`] wraps a [`tokio::sync::broadcast`] channel. The pipeline
//! publishes a [`MarketEvent`] for every persisted swap and every
//! finalized candle; WebSocket connections subscribe and filter locally.
//!
//! Backpressure policy: the channel is a ring buffer. When it fills,
//! the oldest events are dropped for lagging receivers and the publisher
//! never blocks.

use tokio::sync::broadcast;

use super::MarketEvent;

/// Broadcast bus for [`MarketEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<MarketEvent>,
}

impl EventBus {
    /// Creates a new `EventBus` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of receivers that received the event.
    /// If there are no active receivers, the event is silently dropped.
    pub fn publish(&self, event: MarketEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Creates a new receiver that will receive all future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<MarketEvent> {
        self.sender.subscribe()
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::persistence::models::SwapEventRecord;

    fn make_event() -> MarketEvent {
        MarketEvent::SwapCreated {
            swap: SwapEventRecord {
                transaction_hash: "0xbeef".to_string(),
                log_index: 0,
                pool_id: "0xaa".to_string(),
                token0: "0x1111111111111111111111111111111111111111".to_string(),
                token1: "0x2222222222222222222222222222222222222222".to_string(),
                sender: "0x3333333333333333333333333333333333333333".to_string(),
                amount0: "1".to_string(),
                amount1: "-1".to_string(),
                sqrt_price_x96: "79228162514264337593543950336".to_string(),
                liquidity: "1".to_string(),
                tick: 0,
                fee: 3000,
                block_number: 1,
                block_timestamp: 60,
            },
        }
    }

    #[test]
    fn publish_without_receivers_returns_zero() {
        let bus = EventBus::new(100);
        assert_eq!(bus.publish(make_event()), 0);
    }

    #[tokio::test]
    async fn subscriber_receives_event() {
        let bus = EventBus::new(100);
        let mut rx = bus.subscribe();

        bus.publish(make_event());

        let event = rx.recv().await;
        let Ok(event) = event else {
            panic!("expected to receive event");
        };
        assert_eq!(event.topic(), "swap.created");
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(100);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let count = bus.publish(make_event());
        assert_eq!(count, 2);

        let e1 = rx1.recv().await;
        let e2 = rx2.recv().await;
        let (Ok(e1), Ok(e2)) = (e1, e2) else {
            panic!("both receivers should get the event");
        };
        assert_eq!(e1.topic(), e2.topic());
    }

    #[test]
    fn receiver_count_tracks_subscribers() {
        let bus = EventBus::new(100);
        assert_eq!(bus.receiver_count(), 0);

        let rx1 = bus.subscribe();
        assert_eq!(bus.receiver_count(), 1);

        let _rx2 = bus.subscribe();
        assert_eq!(bus.receiver_count(), 2);

        drop(rx1);
        assert_eq!(bus.receiver_count(), 1);
    }
}
