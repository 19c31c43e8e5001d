//! Pool state machine: applies Initialize / Swap / ModifyLiquidity to
//! per-pool state. Sole writer to the pool collection.
//!
//! Lifecycle per pool: unknown → `Initialize` → active. Swap and
//! liquidity events for an unknown pool are skipped with a warning; the
//! single OR-filter ordering makes that path rare but log reordering on
//! reindex can still produce it.

use std::str::FromStr;
use std::sync::Arc;

use alloy_primitives::{Address, B256, U256};

use crate::chain::events::{InitializeEvent, ModifyLiquidityEvent, SwapEvent};
use crate::domain::price::sqrt_price_x96_to_token_prices;
use crate::domain::tick_math::position_amounts;
use crate::domain::{address_hex, b256_hex};
use crate::error::IndexerError;
use crate::indexer::metadata::TokenMetadataCache;
use crate::persistence::PostgresPersistence;
use crate::persistence::models::{PoolRecord, SwapEventRecord};

/// Applies decoded pool manager events to the pool collection.
pub struct PoolTracker {
    persistence: PostgresPersistence,
    metadata: Arc<TokenMetadataCache>,
}

impl PoolTracker {
    /// Creates a new tracker.
    #[must_use]
    pub fn new(persistence: PostgresPersistence, metadata: Arc<TokenMetadataCache>) -> Self {
        Self {
            persistence,
            metadata,
        }
    }

    /// Handles `Initialize`: creates the pool row with decimal-adjusted
    /// starting prices. A duplicate event is dropped without error.
    ///
    /// Returns the created record so the caller can wire up whitelist
    /// links, or `None` for duplicates.
    ///
    /// # Errors
    ///
    /// Returns [`IndexerError::Persistence`] on database failure.
    pub async fn handle_initialize(
        &self,
        event: &InitializeEvent,
        block_number: u64,
        block_timestamp: u64,
        transaction_hash: &B256,
    ) -> Result<Option<PoolRecord>, IndexerError> {
        let metadata0 = self.metadata.get(event.currency0).await;
        let metadata1 = self.metadata.get(event.currency1).await;
        let prices = sqrt_price_x96_to_token_prices(
            event.sqrt_price_x96,
            metadata0.decimals,
            metadata1.decimals,
        );

        let record = PoolRecord {
            pool_id: event.pool_id.to_hex(),
            currency0: address_hex(&event.currency0),
            currency1: address_hex(&event.currency1),
            fee: i64::from(event.fee),
            tick_spacing: event.tick_spacing,
            hooks: address_hex(&event.hooks),
            sqrt_price_x96: event.sqrt_price_x96.to_string(),
            tick: event.tick,
            liquidity: "0".to_string(),
            total_value_locked_token0: "0".to_string(),
            total_value_locked_token1: "0".to_string(),
            token0_price: prices.token0_price,
            token1_price: prices.token1_price,
            created_block: block_number as i64,
            created_at_timestamp: block_timestamp as i64,
            created_tx_hash: b256_hex(transaction_hash),
        };

        if self.persistence.insert_pool(&record).await? {
            tracing::info!(pool_id = %record.pool_id, currency0 = %record.currency0,
                currency1 = %record.currency1, fee = record.fee, "pool initialized");
            Ok(Some(record))
        } else {
            tracing::debug!(pool_id = %record.pool_id, "duplicate Initialize dropped");
            Ok(None)
        }
    }

    /// Handles `Swap`: persists the swap row, then applies the post-swap
    /// pool state and TVL deltas.
    ///
    /// The swap row is the dedup gate: state deltas apply only when the
    /// insert actually lands, so redelivery leaves every collection
    /// untouched. Returns the persisted record for aggregation, or
    /// `None` when the event was a duplicate or the pool is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`IndexerError::Persistence`] on database failure.
    pub async fn handle_swap(
        &self,
        event: &SwapEvent,
        block_number: u64,
        block_timestamp: u64,
        transaction_hash: &B256,
        log_index: u64,
    ) -> Result<Option<SwapEventRecord>, IndexerError> {
        let pool_id = event.pool_id.to_hex();
        let Some(pool) = self.persistence.get_pool(&pool_id).await? else {
            tracing::warn!(pool_id = %pool_id, block = block_number,
                "swap for uninitialized pool skipped");
            return Ok(None);
        };

        let record = SwapEventRecord {
            transaction_hash: b256_hex(transaction_hash),
            log_index: log_index as i64,
            pool_id,
            token0: pool.currency0.clone(),
            token1: pool.currency1.clone(),
            sender: address_hex(&event.sender),
            amount0: event.amount0.to_string(),
            amount1: event.amount1.to_string(),
            sqrt_price_x96: event.sqrt_price_x96.to_string(),
            liquidity: event.liquidity.to_string(),
            tick: event.tick,
            fee: i64::from(event.fee),
            block_number: block_number as i64,
            block_timestamp: block_timestamp as i64,
        };

        if !self.persistence.insert_swap_event(&record).await? {
            tracing::info!(transaction_hash = %record.transaction_hash,
                log_index = record.log_index, "duplicate swap event ignored");
            return Ok(None);
        }

        let prices = sqrt_price_x96_to_token_prices(
            event.sqrt_price_x96,
            self.decimals_for(&pool.currency0).await,
            self.decimals_for(&pool.currency1).await,
        );
        self.persistence
            .apply_swap_to_pool(
                &record.pool_id,
                &record.sqrt_price_x96,
                event.tick,
                &record.liquidity,
                prices.token0_price,
                prices.token1_price,
                &record.amount0,
                &record.amount1,
            )
            .await?;

        Ok(Some(record))
    }

    /// Handles `ModifyLiquidity`: applies the signed liquidity delta and
    /// the token amounts spanned by the position's tick range.
    ///
    /// # Errors
    ///
    /// Returns [`IndexerError::Persistence`] on database failure.
    pub async fn handle_modify_liquidity(
        &self,
        event: &ModifyLiquidityEvent,
        block_number: u64,
    ) -> Result<(), IndexerError> {
        let pool_id = event.pool_id.to_hex();
        let Some(pool) = self.persistence.get_pool(&pool_id).await? else {
            tracing::warn!(pool_id = %pool_id, block = block_number,
                "liquidity change for uninitialized pool skipped");
            return Ok(());
        };

        let Ok(sqrt_price) = U256::from_str_radix(&pool.sqrt_price_x96, 10) else {
            tracing::warn!(pool_id = %pool_id, "unreadable pool sqrt price, skipping");
            return Ok(());
        };

        let negative = event.liquidity_delta.is_negative();
        let magnitude: u128 = event.liquidity_delta.unsigned_abs().saturating_to();
        let (amount0, amount1) =
            position_amounts(sqrt_price, event.tick_lower, event.tick_upper, magnitude);

        self.persistence
            .apply_liquidity_to_pool(
                &pool_id,
                &event.liquidity_delta.to_string(),
                &signed_amount(amount0, negative),
                &signed_amount(amount1, negative),
            )
            .await?;

        tracing::debug!(pool_id = %pool_id, delta = %event.liquidity_delta,
            tick_lower = event.tick_lower, tick_upper = event.tick_upper,
            "liquidity applied");
        Ok(())
    }

    async fn decimals_for(&self, address: &str) -> u8 {
        match Address::from_str(address) {
            Ok(parsed) => self.metadata.get(parsed).await.decimals,
            Err(_) => 18,
        }
    }
}

fn signed_amount(amount: U256, negative: bool) -> String {
    if negative && !amount.is_zero() {
        format!("-{amount}")
    } else {
        amount.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn signed_amount_prefixes_negatives() {
        assert_eq!(signed_amount(U256::from(42u8), true), "-42");
        assert_eq!(signed_amount(U256::from(42u8), false), "42");
    }

    #[test]
    fn signed_amount_never_emits_negative_zero() {
        assert_eq!(signed_amount(U256::ZERO, true), "0");
    }
}
