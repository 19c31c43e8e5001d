//! Database row types for the indexer's durable collections.
//!
//! Big on-chain integers (amounts, sqrt prices, liquidity, TVL) live in
//! `NUMERIC(78,0)` columns and cross the boundary as decimal strings,
//! since they can exceed every native integer width. USD-scale values
//! fit a [`Decimal`] and map to plain `NUMERIC` columns.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A pool row, created by `Initialize` and mutated by `Swap` /
/// `ModifyLiquidity`. Keyed by the 32-byte pool ID in lowercase hex.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PoolRecord {
    /// 32-byte pool identifier (lowercase `0x…`).
    pub pool_id: String,
    /// First token address as declared by the pool (lowercase `0x…`).
    pub currency0: String,
    /// Second token address as declared by the pool (lowercase `0x…`).
    pub currency1: String,
    /// Fee tier in hundredths of a basis point.
    pub fee: i64,
    /// Tick spacing of the pool.
    pub tick_spacing: i32,
    /// Hooks contract address (lowercase `0x…`).
    pub hooks: String,
    /// Current `sqrtPriceX96` (decimal string).
    pub sqrt_price_x96: String,
    /// Current tick.
    pub tick: i32,
    /// Current in-range liquidity (decimal string).
    pub liquidity: String,
    /// Net token0 locked in the pool (signed decimal string; converges
    /// non-negative).
    pub total_value_locked_token0: String,
    /// Net token1 locked in the pool (signed decimal string).
    pub total_value_locked_token1: String,
    /// token0 per 1 token1, decimal-adjusted.
    pub token0_price: Decimal,
    /// token1 per 1 token0, decimal-adjusted.
    pub token1_price: Decimal,
    /// Block that carried the `Initialize` event.
    pub created_block: i64,
    /// Timestamp of that block (epoch seconds).
    pub created_at_timestamp: i64,
    /// Transaction that initialized the pool.
    pub created_tx_hash: String,
}

/// A persisted swap, keyed by `(transaction_hash, log_index)`.
///
/// Token addresses are denormalized from the pool row so per-token
/// queries skip the join.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SwapEventRecord {
    /// Transaction hash (lowercase `0x…`).
    pub transaction_hash: String,
    /// Log index within the transaction's block.
    pub log_index: i64,
    /// Pool the swap executed in.
    pub pool_id: String,
    /// Pool's currency0 (lowercase `0x…`).
    pub token0: String,
    /// Pool's currency1 (lowercase `0x…`).
    pub token1: String,
    /// Swap router / sender address.
    pub sender: String,
    /// Signed token0 delta (positive = into the pool).
    pub amount0: String,
    /// Signed token1 delta (positive = into the pool).
    pub amount1: String,
    /// Pool `sqrtPriceX96` after the swap (decimal string).
    pub sqrt_price_x96: String,
    /// Pool liquidity after the swap (decimal string).
    pub liquidity: String,
    /// Pool tick after the swap.
    pub tick: i32,
    /// Fee tier applied, hundredths of a basis point.
    pub fee: i64,
    /// Block number carrying the event.
    pub block_number: i64,
    /// Block timestamp (epoch seconds).
    pub block_timestamp: i64,
}

/// A token row with cumulative stats, keyed by lowercase address.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TokenRecord {
    /// Token address (lowercase `0x…`).
    pub address: String,
    /// ERC-20 decimals (0–255).
    pub decimals: i16,
    /// ERC-20 symbol, `"UNKNOWN"` until fetched.
    pub symbol: String,
    /// ERC-20 name, `"Unknown Token"` until fetched.
    pub name: String,
    /// Cumulative swap volume in raw token units (non-negative decimal
    /// string, monotonically non-decreasing).
    pub volume: String,
    /// Cumulative tracked USD volume.
    pub volume_usd: Decimal,
    /// Cumulative USD volume including tokens without a trusted price.
    pub untracked_volume_usd: Decimal,
    /// Cumulative USD fees paid on swaps touching this token.
    pub fees_usd: Decimal,
    /// Net raw token units locked across all pools (signed decimal
    /// string).
    pub total_value_locked: String,
    /// USD value of `total_value_locked` at the latest derived price.
    pub total_value_locked_usd: Decimal,
    /// Price in the wrapped-native reference unit.
    pub derived_native: Decimal,
    /// Number of swap events touching this token (monotonic).
    pub tx_count: i64,
    /// Pool IDs in which this token trades against a whitelisted
    /// reference token (set semantics).
    pub whitelist_pools: Vec<String>,
}

/// One OHLC bar for a token over a fixed bucket.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CandleRecord {
    /// Token the bar aggregates (lowercase `0x…`).
    pub token_address: String,
    /// Bucket start, epoch seconds, UTC-aligned.
    pub bucket_start: i64,
    /// `"current"` or `"finalized"`.
    pub status: String,
    /// First trade price of the bucket (USD).
    pub open: Decimal,
    /// Highest trade price of the bucket (USD).
    pub high: Decimal,
    /// Lowest non-zero trade price of the bucket (USD).
    pub low: Decimal,
    /// Last trade price of the bucket (USD).
    pub close: Decimal,
    /// Latest derived USD price folded into the bucket.
    pub price_usd: Decimal,
    /// Raw token volume in the bucket (decimal string).
    pub volume: String,
    /// Tracked USD volume in the bucket.
    pub volume_usd: Decimal,
    /// USD volume including untrusted prices.
    pub untracked_volume_usd: Decimal,
    /// USD fees accrued in the bucket.
    pub fees_usd: Decimal,
    /// Token TVL snapshot after the last fold (raw units, decimal
    /// string).
    pub total_value_locked: String,
    /// USD value of the TVL snapshot.
    pub total_value_locked_usd: Decimal,
    /// Number of swap events folded into this bar.
    pub tx_count: i64,
}

/// Sync progress for one pool manager, driving crash-safe resume.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SyncStateRecord {
    /// Pool manager contract address (lowercase `0x…`).
    pub pool_manager_address: String,
    /// Last block whose events are fully applied (inclusive).
    pub last_synced_block: i64,
    /// Chain head observed at the last checkpoint.
    pub current_block: i64,
    /// Whether the initial backfill has reached the head at least once.
    pub is_initial_sync_complete: bool,
    /// Wall-clock time of the last checkpoint.
    pub last_synced_at: DateTime<Utc>,
}
