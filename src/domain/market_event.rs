//! Typed events published on the [`super::EventBus`].
//!
//! Two topics exist: `swap.created` carries the persisted swap row as
//! soon as the aggregator has folded it, and `candle.finalized` carries
//! each promoted candle exactly as it was frozen. Values wider than 53
//! bits serialize as decimal strings.

use serde::Serialize;

use super::CandleInterval;
use crate::persistence::models::{CandleRecord, SwapEventRecord};

/// Event published after every state mutation the pipeline exposes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type")]
pub enum MarketEvent {
    /// A swap was persisted and folded into token/candle state.
    #[serde(rename = "swap.created")]
    SwapCreated {
        /// The persisted swap row.
        swap: SwapEventRecord,
    },

    /// A candle was promoted from `current` to `finalized`.
    #[serde(rename = "candle.finalized")]
    CandleFinalized {
        /// Which collection the candle belongs to.
        interval: CandleInterval,
        /// The frozen candle row, byte-identical to what was stored.
        candle: CandleRecord,
    },
}

impl MarketEvent {
    /// Returns the topic name for this event.
    #[must_use]
    pub const fn topic(&self) -> &'static str {
        match self {
            Self::SwapCreated { .. } => "swap.created",
            Self::CandleFinalized { .. } => "candle.finalized",
        }
    }

    /// Token addresses this event concerns, for subscription filtering.
    #[must_use]
    pub fn token_addresses(&self) -> Vec<&str> {
        match self {
            Self::SwapCreated { swap } => vec![swap.token0.as_str(), swap.token1.as_str()],
            Self::CandleFinalized { candle, .. } => vec![candle.token_address.as_str()],
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn sample_swap() -> SwapEventRecord {
        SwapEventRecord {
            transaction_hash: "0xdead".to_string(),
            log_index: 3,
            pool_id: "0xaa".to_string(),
            token0: "0x1111111111111111111111111111111111111111".to_string(),
            token1: "0x2222222222222222222222222222222222222222".to_string(),
            sender: "0x3333333333333333333333333333333333333333".to_string(),
            amount0: "1000000000000000000".to_string(),
            amount1: "-2000000000000000000".to_string(),
            sqrt_price_x96: "79228162514264337593543950336".to_string(),
            liquidity: "5000000000000000000".to_string(),
            tick: 100,
            fee: 3000,
            block_number: 17,
            block_timestamp: 1_609_504_496,
        }
    }

    fn sample_candle() -> CandleRecord {
        CandleRecord {
            token_address: "0x1111111111111111111111111111111111111111".to_string(),
            bucket_start: 1_609_504_440,
            status: "finalized".to_string(),
            open: Decimal::ONE,
            high: Decimal::TWO,
            low: Decimal::ONE,
            close: Decimal::TWO,
            price_usd: Decimal::TWO,
            volume: "1000000000000000000".to_string(),
            volume_usd: Decimal::TWO,
            untracked_volume_usd: Decimal::TWO,
            fees_usd: Decimal::ZERO,
            total_value_locked: "1000000000000000000".to_string(),
            total_value_locked_usd: Decimal::TWO,
            tx_count: 1,
        }
    }

    #[test]
    fn topic_names_are_stable() {
        let swap = MarketEvent::SwapCreated { swap: sample_swap() };
        assert_eq!(swap.topic(), "swap.created");

        let candle = MarketEvent::CandleFinalized {
            interval: CandleInterval::Minute,
            candle: sample_candle(),
        };
        assert_eq!(candle.topic(), "candle.finalized");
    }

    #[test]
    fn swap_event_serializes_amounts_as_strings() {
        let event = MarketEvent::SwapCreated { swap: sample_swap() };
        let json = serde_json::to_string(&event).unwrap_or_default();
        assert!(json.contains("\"event_type\":\"swap.created\""));
        assert!(json.contains("\"1000000000000000000\""));
        assert!(json.contains("\"-2000000000000000000\""));
    }

    #[test]
    fn candle_event_carries_interval_tag() {
        let event = MarketEvent::CandleFinalized {
            interval: CandleInterval::Hour,
            candle: sample_candle(),
        };
        let json = serde_json::to_string(&event).unwrap_or_default();
        assert!(json.contains("\"interval\":\"hour\""));
    }

    #[test]
    fn token_addresses_cover_both_swap_sides() {
        let event = MarketEvent::SwapCreated { swap: sample_swap() };
        let tokens = event.token_addresses();
        assert_eq!(tokens.len(), 2);
        assert!(tokens.contains(&"0x1111111111111111111111111111111111111111"));
        assert!(tokens.contains(&"0x2222222222222222222222222222222222222222"));
    }
}
