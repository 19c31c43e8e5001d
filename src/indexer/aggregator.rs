//! Token aggregator: cumulative per-token stats and the three rolling
//! candles. Sole writer to the token and candle collections.
//!
//! Each swap folds into both tokens of its pool: an atomic token upsert
//! (volume, txCount, USD aggregates, derived price) followed by one
//! guarded candle fold per interval. Finalization promotes completed
//! buckets and publishes each frozen row exactly once.

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use alloy_primitives::Address;
use rust_decimal::Decimal;

use crate::config::IndexerConfig;
use crate::domain::price::human_amount;
use crate::domain::{CandleInterval, EventBus, MarketEvent, address_hex};
use crate::error::IndexerError;
use crate::indexer::metadata::TokenMetadataCache;
use crate::indexer::oracle::PriceOracle;
use crate::persistence::PostgresPersistence;
use crate::persistence::models::{PoolRecord, SwapEventRecord};

/// Fee tiers are expressed in hundredths of a basis point.
const FEE_DENOMINATOR: i64 = 1_000_000;

/// Aggregates swaps into token stats and candles.
pub struct TokenAggregator {
    persistence: PostgresPersistence,
    metadata: Arc<TokenMetadataCache>,
    oracle: PriceOracle,
    bus: EventBus,
    whitelist: HashSet<String>,
}

impl TokenAggregator {
    /// Creates a new aggregator.
    #[must_use]
    pub fn new(
        persistence: PostgresPersistence,
        metadata: Arc<TokenMetadataCache>,
        oracle: PriceOracle,
        bus: EventBus,
        config: &IndexerConfig,
    ) -> Self {
        Self {
            persistence,
            metadata,
            oracle,
            bus,
            whitelist: config.whitelist_tokens.iter().map(address_hex).collect(),
        }
    }

    /// Folds a persisted swap into both tokens' stats and candles, then
    /// publishes `swap.created`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexerError::Persistence`] on database failure.
    pub async fn apply_swap(&self, swap: &SwapEventRecord) -> Result<(), IndexerError> {
        let native_usd = self.oracle.native_price_usd().await?;
        self.accrue_side(swap, &swap.token0, &swap.amount0, native_usd).await?;
        self.accrue_side(swap, &swap.token1, &swap.amount1, native_usd).await?;
        self.bus.publish(MarketEvent::SwapCreated { swap: swap.clone() });
        Ok(())
    }

    async fn accrue_side(
        &self,
        swap: &SwapEventRecord,
        token_address: &str,
        amount: &str,
        native_usd: Decimal,
    ) -> Result<(), IndexerError> {
        let Ok(signed) = amount.parse::<i128>() else {
            tracing::warn!(token = %token_address, amount = %amount,
                "unparsable swap amount, side skipped");
            return Ok(());
        };
        let Ok(parsed_address) = Address::from_str(token_address) else {
            tracing::warn!(token = %token_address, "unparsable token address, side skipped");
            return Ok(());
        };

        let metadata = self.metadata.get(parsed_address).await;
        self.persistence.ensure_token(token_address, &metadata).await?;
        let Some(mut token) = self.persistence.get_token(token_address).await? else {
            tracing::warn!(token = %token_address, "token row vanished, side skipped");
            return Ok(());
        };

        // Lazy metadata patch: the row may predate a successful fetch.
        if token.symbol == "UNKNOWN" && !metadata.is_default() {
            self.persistence.patch_token_metadata(token_address, &metadata).await?;
            token.decimals = i16::from(metadata.decimals);
            token.symbol = metadata.symbol.clone();
            token.name = metadata.name.clone();
        }

        let derived_native = self.oracle.derived_native_per_token(&token).await?;
        let price_usd = derived_native * native_usd;
        let decimals = u8::try_from(token.decimals).unwrap_or(18);
        let magnitude = signed.unsigned_abs();
        let amount_usd = human_amount(magnitude, decimals) * price_usd;
        let tracked_usd = if derived_native > Decimal::ZERO {
            amount_usd
        } else {
            Decimal::ZERO
        };
        let fees_usd = fee_usd(amount_usd, swap.fee);
        let volume_delta = magnitude.to_string();

        let (total_value_locked, total_value_locked_usd) = self
            .persistence
            .accrue_token_swap(
                token_address,
                &metadata,
                &volume_delta,
                amount,
                derived_native,
                tracked_usd,
                amount_usd,
                fees_usd,
                price_usd,
            )
            .await?;

        for interval in CandleInterval::ALL {
            let bucket = interval.bucket_start(swap.block_timestamp);
            let touched = self
                .persistence
                .fold_candle(
                    interval,
                    token_address,
                    bucket,
                    price_usd,
                    &volume_delta,
                    tracked_usd,
                    amount_usd,
                    fees_usd,
                    &total_value_locked,
                    total_value_locked_usd,
                )
                .await?;
            if touched == 0 {
                tracing::warn!(token = %token_address, bucket, interval = %interval,
                    "swap targeted a finalized candle, ignored");
            }
        }

        Ok(())
    }

    /// Links a freshly initialized pool into the whitelist graph: when
    /// one side is a reference token, the pool becomes a price source
    /// for the other side.
    ///
    /// # Errors
    ///
    /// Returns [`IndexerError::Persistence`] on database failure.
    pub async fn link_whitelist_pool(&self, pool: &PoolRecord) -> Result<(), IndexerError> {
        if self.whitelist.contains(&pool.currency0) {
            self.link(&pool.currency1, &pool.pool_id).await?;
        }
        if self.whitelist.contains(&pool.currency1) {
            self.link(&pool.currency0, &pool.pool_id).await?;
        }
        Ok(())
    }

    async fn link(&self, token_address: &str, pool_id: &str) -> Result<(), IndexerError> {
        let metadata = match Address::from_str(token_address) {
            Ok(parsed) => self.metadata.get(parsed).await,
            Err(_) => crate::chain::TokenMetadata::default(),
        };
        self.persistence.ensure_token(token_address, &metadata).await?;
        self.persistence.add_whitelist_pool(token_address, pool_id).await?;
        tracing::info!(token = %token_address, pool_id = %pool_id, "whitelist pool linked");
        Ok(())
    }

    /// Promotes every completed `current` candle for the interval and
    /// publishes one `candle.finalized` per promoted row.
    ///
    /// Targets all buckets strictly before the live one, so rows
    /// stranded by downtime are still promoted exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`IndexerError::Persistence`] on database failure.
    pub async fn finalize(
        &self,
        interval: CandleInterval,
        now_timestamp: i64,
    ) -> Result<usize, IndexerError> {
        let live_bucket = interval.bucket_start(now_timestamp);
        let promoted = self.persistence.finalize_candles(interval, live_bucket).await?;
        let count = promoted.len();
        for candle in promoted {
            self.bus.publish(MarketEvent::CandleFinalized { interval, candle });
        }
        if count > 0 {
            tracing::info!(interval = %interval, count, "candles finalized");
        }
        Ok(count)
    }
}

/// USD fees paid on one swap side at the given fee tier (hundredths of
/// a basis point).
fn fee_usd(amount_usd: Decimal, fee: i64) -> Decimal {
    amount_usd * Decimal::from(fee) / Decimal::from(FEE_DENOMINATOR)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn fee_usd_applies_the_tier_fraction() {
        // 3000 hundredths of a bip = 0.3%
        let fees = fee_usd(Decimal::from(1000), 3000);
        assert_eq!(fees, Decimal::from(3));
    }

    #[test]
    fn zero_fee_tier_costs_nothing() {
        assert_eq!(fee_usd(Decimal::from(1000), 0), Decimal::ZERO);
    }

    #[test]
    fn max_fee_tier_consumes_everything() {
        assert_eq!(fee_usd(Decimal::from(7), FEE_DENOMINATOR), Decimal::from(7));
    }
}
