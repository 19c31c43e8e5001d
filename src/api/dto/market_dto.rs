//! DTOs mirroring the persisted collections.
//!
//! Decimal fields serialize as strings, so values wider than 53 bits
//! survive JSON round-trips unharmed.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::persistence::models::{
    CandleRecord, PoolRecord, SwapEventRecord, SyncStateRecord, TokenRecord,
};

/// One pool's current state.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PoolDto {
    /// 32-byte pool identifier (lowercase `0x…`).
    pub pool_id: String,
    /// First token address.
    pub currency0: String,
    /// Second token address.
    pub currency1: String,
    /// Fee tier in hundredths of a basis point.
    pub fee: i64,
    /// Tick spacing.
    pub tick_spacing: i32,
    /// Hooks contract address.
    pub hooks: String,
    /// Current sqrt price (decimal string).
    pub sqrt_price_x96: String,
    /// Current tick.
    pub tick: i32,
    /// In-range liquidity (decimal string).
    pub liquidity: String,
    /// Net token0 locked (decimal string).
    pub total_value_locked_token0: String,
    /// Net token1 locked (decimal string).
    pub total_value_locked_token1: String,
    /// token0 per 1 token1.
    pub token0_price: Decimal,
    /// token1 per 1 token0.
    pub token1_price: Decimal,
    /// Creation block.
    pub created_block: i64,
    /// Creation block timestamp.
    pub created_at_timestamp: i64,
    /// Creating transaction.
    pub created_tx_hash: String,
}

impl From<PoolRecord> for PoolDto {
    fn from(record: PoolRecord) -> Self {
        Self {
            pool_id: record.pool_id,
            currency0: record.currency0,
            currency1: record.currency1,
            fee: record.fee,
            tick_spacing: record.tick_spacing,
            hooks: record.hooks,
            sqrt_price_x96: record.sqrt_price_x96,
            tick: record.tick,
            liquidity: record.liquidity,
            total_value_locked_token0: record.total_value_locked_token0,
            total_value_locked_token1: record.total_value_locked_token1,
            token0_price: record.token0_price,
            token1_price: record.token1_price,
            created_block: record.created_block,
            created_at_timestamp: record.created_at_timestamp,
            created_tx_hash: record.created_tx_hash,
        }
    }
}

/// One persisted swap.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SwapDto {
    /// Transaction hash.
    pub transaction_hash: String,
    /// Log index within the block.
    pub log_index: i64,
    /// Pool the swap executed in.
    pub pool_id: String,
    /// Pool's currency0.
    pub token0: String,
    /// Pool's currency1.
    pub token1: String,
    /// Sender address.
    pub sender: String,
    /// Signed token0 delta (decimal string).
    pub amount0: String,
    /// Signed token1 delta (decimal string).
    pub amount1: String,
    /// Post-swap sqrt price (decimal string).
    pub sqrt_price_x96: String,
    /// Post-swap liquidity (decimal string).
    pub liquidity: String,
    /// Post-swap tick.
    pub tick: i32,
    /// Fee tier applied.
    pub fee: i64,
    /// Block number.
    pub block_number: i64,
    /// Block timestamp.
    pub block_timestamp: i64,
}

impl From<SwapEventRecord> for SwapDto {
    fn from(record: SwapEventRecord) -> Self {
        Self {
            transaction_hash: record.transaction_hash,
            log_index: record.log_index,
            pool_id: record.pool_id,
            token0: record.token0,
            token1: record.token1,
            sender: record.sender,
            amount0: record.amount0,
            amount1: record.amount1,
            sqrt_price_x96: record.sqrt_price_x96,
            liquidity: record.liquidity,
            tick: record.tick,
            fee: record.fee,
            block_number: record.block_number,
            block_timestamp: record.block_timestamp,
        }
    }
}

/// One token's cumulative stats.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TokenDto {
    /// Token address.
    pub address: String,
    /// ERC-20 decimals.
    pub decimals: i16,
    /// ERC-20 symbol.
    pub symbol: String,
    /// ERC-20 name.
    pub name: String,
    /// Cumulative raw volume (decimal string).
    pub volume: String,
    /// Cumulative tracked USD volume.
    pub volume_usd: Decimal,
    /// Cumulative untracked USD volume.
    pub untracked_volume_usd: Decimal,
    /// Cumulative USD fees.
    pub fees_usd: Decimal,
    /// Net raw units locked (decimal string).
    pub total_value_locked: String,
    /// USD value of the locked amount.
    pub total_value_locked_usd: Decimal,
    /// Price in the wrapped-native unit.
    pub derived_native: Decimal,
    /// Swap events folded into this token.
    pub tx_count: i64,
    /// Whitelisted price-source pools.
    pub whitelist_pools: Vec<String>,
}

impl From<TokenRecord> for TokenDto {
    fn from(record: TokenRecord) -> Self {
        Self {
            address: record.address,
            decimals: record.decimals,
            symbol: record.symbol,
            name: record.name,
            volume: record.volume,
            volume_usd: record.volume_usd,
            untracked_volume_usd: record.untracked_volume_usd,
            fees_usd: record.fees_usd,
            total_value_locked: record.total_value_locked,
            total_value_locked_usd: record.total_value_locked_usd,
            derived_native: record.derived_native,
            tx_count: record.tx_count,
            whitelist_pools: record.whitelist_pools,
        }
    }
}

/// One candle bar.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CandleDto {
    /// Token the bar aggregates.
    pub token_address: String,
    /// Bucket start (epoch seconds).
    pub bucket_start: i64,
    /// `"current"` or `"finalized"`.
    pub status: String,
    /// Opening price (USD).
    pub open: Decimal,
    /// High price (USD).
    pub high: Decimal,
    /// Low price (USD).
    pub low: Decimal,
    /// Closing price (USD).
    pub close: Decimal,
    /// Latest folded USD price.
    pub price_usd: Decimal,
    /// Raw volume in the bucket (decimal string).
    pub volume: String,
    /// Tracked USD volume.
    pub volume_usd: Decimal,
    /// Untracked USD volume.
    pub untracked_volume_usd: Decimal,
    /// USD fees.
    pub fees_usd: Decimal,
    /// Token TVL snapshot (decimal string).
    pub total_value_locked: String,
    /// USD value of the TVL snapshot.
    pub total_value_locked_usd: Decimal,
    /// Events folded into this bar.
    pub tx_count: i64,
}

impl From<CandleRecord> for CandleDto {
    fn from(record: CandleRecord) -> Self {
        Self {
            token_address: record.token_address,
            bucket_start: record.bucket_start,
            status: record.status,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            price_usd: record.price_usd,
            volume: record.volume,
            volume_usd: record.volume_usd,
            untracked_volume_usd: record.untracked_volume_usd,
            fees_usd: record.fees_usd,
            total_value_locked: record.total_value_locked,
            total_value_locked_usd: record.total_value_locked_usd,
            tx_count: record.tx_count,
        }
    }
}

/// Sync progress for the indexed pool manager.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SyncStatusDto {
    /// Pool manager contract address.
    pub pool_manager_address: String,
    /// Last fully applied block.
    pub last_synced_block: i64,
    /// Head observed at the last checkpoint.
    pub current_block: i64,
    /// Whether backfill has reached the head.
    pub is_initial_sync_complete: bool,
    /// Wall-clock time of the last checkpoint (RFC 3339).
    pub last_synced_at: String,
}

impl From<SyncStateRecord> for SyncStatusDto {
    fn from(record: SyncStateRecord) -> Self {
        Self {
            pool_manager_address: record.pool_manager_address,
            last_synced_block: record.last_synced_block,
            current_block: record.current_block,
            is_initial_sync_complete: record.is_initial_sync_complete,
            last_synced_at: record.last_synced_at.to_rfc3339(),
        }
    }
}

/// Query parameters for candle listings.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CandleQuery {
    /// Interval name: `minute`, `hour`, or `day`. Defaults to `minute`.
    #[serde(default = "default_interval")]
    pub interval: String,
    /// Maximum rows to return (clamped to 1..=1000). Defaults to 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

/// Query parameters for plain list endpoints.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LimitQuery {
    /// Maximum rows to return (clamped to 1..=1000). Defaults to 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_interval() -> String {
    "minute".to_string()
}

fn default_limit() -> i64 {
    100
}

/// Clamps a client-supplied limit to the allowed window.
#[must_use]
pub fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(1, 1000)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn limits_are_clamped() {
        assert_eq!(clamp_limit(0), 1);
        assert_eq!(clamp_limit(-5), 1);
        assert_eq!(clamp_limit(50), 50);
        assert_eq!(clamp_limit(10_000), 1000);
    }

    #[test]
    fn candle_query_defaults() {
        let query: CandleQuery = serde_json::from_str("{}").unwrap_or_else(|_| {
            panic!("empty query should deserialize");
        });
        assert_eq!(query.interval, "minute");
        assert_eq!(query.limit, 100);
    }
}
