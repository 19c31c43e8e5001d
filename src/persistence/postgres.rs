//! PostgreSQL implementation of the persistence layer.
//!
//! Every mutation the pipeline performs is a single atomic statement:
//! inserts dedup through unique indexes (`ON CONFLICT DO NOTHING`), folds
//! run as upserts whose arithmetic happens inside Postgres, and candle
//! promotion is one guarded `UPDATE … RETURNING`. Raw on-chain integers
//! are bound and read as decimal strings against `NUMERIC(78,0)` columns.

use rust_decimal::Decimal;
use sqlx::PgPool;

use super::models::{CandleRecord, PoolRecord, SwapEventRecord, SyncStateRecord, TokenRecord};
use crate::chain::TokenMetadata;
use crate::domain::{CandleInterval, CandleStatus};
use crate::error::IndexerError;

const POOL_COLUMNS: &str = "pool_id, currency0, currency1, fee, tick_spacing, hooks, \
     sqrt_price_x96::text AS sqrt_price_x96, tick, liquidity::text AS liquidity, \
     total_value_locked_token0::text AS total_value_locked_token0, \
     total_value_locked_token1::text AS total_value_locked_token1, \
     token0_price, token1_price, created_block, created_at_timestamp, created_tx_hash";

const SWAP_COLUMNS: &str = "transaction_hash, log_index, pool_id, token0, token1, sender, \
     amount0::text AS amount0, amount1::text AS amount1, \
     sqrt_price_x96::text AS sqrt_price_x96, liquidity::text AS liquidity, \
     tick, fee, block_number, block_timestamp";

const TOKEN_COLUMNS: &str = "address, decimals, symbol, name, volume::text AS volume, \
     volume_usd, untracked_volume_usd, fees_usd, \
     total_value_locked::text AS total_value_locked, total_value_locked_usd, \
     derived_native, tx_count, whitelist_pools";

const CANDLE_COLUMNS: &str = "token_address, bucket_start, status, open, high, low, close, \
     price_usd, volume::text AS volume, volume_usd, untracked_volume_usd, fees_usd, \
     total_value_locked::text AS total_value_locked, total_value_locked_usd, tx_count";

/// PostgreSQL-backed persistence layer using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    /// Creates a new persistence layer with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---- pools -----------------------------------------------------------

    /// Inserts a pool row; a duplicate `pool_id` is a no-op.
    ///
    /// Returns `true` if the row was actually inserted.
    ///
    /// # Errors
    ///
    /// Returns [`IndexerError::Persistence`] on database failure.
    pub async fn insert_pool(&self, pool: &PoolRecord) -> Result<bool, IndexerError> {
        let result = sqlx::query(
            "INSERT INTO pools (pool_id, currency0, currency1, fee, tick_spacing, hooks, \
             sqrt_price_x96, tick, liquidity, total_value_locked_token0, \
             total_value_locked_token1, token0_price, token1_price, created_block, \
             created_at_timestamp, created_tx_hash) \
             VALUES ($1, $2, $3, $4, $5, $6, $7::numeric, $8, $9::numeric, $10::numeric, \
             $11::numeric, $12, $13, $14, $15, $16) \
             ON CONFLICT (pool_id) DO NOTHING",
        )
        .bind(&pool.pool_id)
        .bind(&pool.currency0)
        .bind(&pool.currency1)
        .bind(pool.fee)
        .bind(pool.tick_spacing)
        .bind(&pool.hooks)
        .bind(&pool.sqrt_price_x96)
        .bind(pool.tick)
        .bind(&pool.liquidity)
        .bind(&pool.total_value_locked_token0)
        .bind(&pool.total_value_locked_token1)
        .bind(pool.token0_price)
        .bind(pool.token1_price)
        .bind(pool.created_block)
        .bind(pool.created_at_timestamp)
        .bind(&pool.created_tx_hash)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Loads a pool by ID.
    ///
    /// # Errors
    ///
    /// Returns [`IndexerError::Persistence`] on database failure.
    pub async fn get_pool(&self, pool_id: &str) -> Result<Option<PoolRecord>, IndexerError> {
        let query = format!("SELECT {POOL_COLUMNS} FROM pools WHERE pool_id = $1");
        let row = sqlx::query_as::<_, PoolRecord>(&query)
            .bind(pool_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Lists pools, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`IndexerError::Persistence`] on database failure.
    pub async fn list_pools(&self, limit: i64) -> Result<Vec<PoolRecord>, IndexerError> {
        let query = format!(
            "SELECT {POOL_COLUMNS} FROM pools ORDER BY created_block DESC LIMIT $1"
        );
        let rows = sqlx::query_as::<_, PoolRecord>(&query)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Applies a swap's post-state to its pool: new price/tick/liquidity
    /// plus signed TVL deltas, in one statement.
    ///
    /// # Errors
    ///
    /// Returns [`IndexerError::Persistence`] on database failure.
    #[allow(clippy::too_many_arguments)]
    pub async fn apply_swap_to_pool(
        &self,
        pool_id: &str,
        sqrt_price_x96: &str,
        tick: i32,
        liquidity: &str,
        token0_price: Decimal,
        token1_price: Decimal,
        amount0: &str,
        amount1: &str,
    ) -> Result<(), IndexerError> {
        sqlx::query(
            "UPDATE pools SET sqrt_price_x96 = $2::numeric, tick = $3, \
             liquidity = $4::numeric, token0_price = $5, token1_price = $6, \
             total_value_locked_token0 = total_value_locked_token0 + $7::numeric, \
             total_value_locked_token1 = total_value_locked_token1 + $8::numeric \
             WHERE pool_id = $1",
        )
        .bind(pool_id)
        .bind(sqrt_price_x96)
        .bind(tick)
        .bind(liquidity)
        .bind(token0_price)
        .bind(token1_price)
        .bind(amount0)
        .bind(amount1)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Applies a liquidity change to its pool: signed liquidity delta and
    /// the token amounts that entered or left the range.
    ///
    /// # Errors
    ///
    /// Returns [`IndexerError::Persistence`] on database failure.
    pub async fn apply_liquidity_to_pool(
        &self,
        pool_id: &str,
        liquidity_delta: &str,
        amount0_delta: &str,
        amount1_delta: &str,
    ) -> Result<(), IndexerError> {
        sqlx::query(
            "UPDATE pools SET liquidity = liquidity + $2::numeric, \
             total_value_locked_token0 = total_value_locked_token0 + $3::numeric, \
             total_value_locked_token1 = total_value_locked_token1 + $4::numeric \
             WHERE pool_id = $1",
        )
        .bind(pool_id)
        .bind(liquidity_delta)
        .bind(amount0_delta)
        .bind(amount1_delta)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ---- swap events -----------------------------------------------------

    /// Persists a swap event. The `(transaction_hash, log_index)` unique
    /// key makes redelivery a no-op.
    ///
    /// Returns `true` if the row was actually inserted.
    ///
    /// # Errors
    ///
    /// Returns [`IndexerError::Persistence`] on database failure.
    pub async fn insert_swap_event(&self, swap: &SwapEventRecord) -> Result<bool, IndexerError> {
        let result = sqlx::query(
            "INSERT INTO swap_events (transaction_hash, log_index, pool_id, token0, token1, \
             sender, amount0, amount1, sqrt_price_x96, liquidity, tick, fee, block_number, \
             block_timestamp) \
             VALUES ($1, $2, $3, $4, $5, $6, $7::numeric, $8::numeric, $9::numeric, \
             $10::numeric, $11, $12, $13, $14) \
             ON CONFLICT (transaction_hash, log_index) DO NOTHING",
        )
        .bind(&swap.transaction_hash)
        .bind(swap.log_index)
        .bind(&swap.pool_id)
        .bind(&swap.token0)
        .bind(&swap.token1)
        .bind(&swap.sender)
        .bind(&swap.amount0)
        .bind(&swap.amount1)
        .bind(&swap.sqrt_price_x96)
        .bind(&swap.liquidity)
        .bind(swap.tick)
        .bind(swap.fee)
        .bind(swap.block_number)
        .bind(swap.block_timestamp)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Most recent swaps in a pool, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`IndexerError::Persistence`] on database failure.
    pub async fn recent_swaps(
        &self,
        pool_id: &str,
        limit: i64,
    ) -> Result<Vec<SwapEventRecord>, IndexerError> {
        let query = format!(
            "SELECT {SWAP_COLUMNS} FROM swap_events WHERE pool_id = $1 \
             ORDER BY block_number DESC, log_index DESC LIMIT $2"
        );
        let rows = sqlx::query_as::<_, SwapEventRecord>(&query)
            .bind(pool_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    // ---- tokens ----------------------------------------------------------

    /// Loads a token by lowercase address.
    ///
    /// # Errors
    ///
    /// Returns [`IndexerError::Persistence`] on database failure.
    pub async fn get_token(&self, address: &str) -> Result<Option<TokenRecord>, IndexerError> {
        let query = format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE address = $1");
        let row = sqlx::query_as::<_, TokenRecord>(&query)
            .bind(address)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Creates a token row with the given metadata if absent.
    ///
    /// # Errors
    ///
    /// Returns [`IndexerError::Persistence`] on database failure.
    pub async fn ensure_token(
        &self,
        address: &str,
        metadata: &TokenMetadata,
    ) -> Result<(), IndexerError> {
        sqlx::query(
            "INSERT INTO tokens (address, decimals, symbol, name) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (address) DO NOTHING",
        )
        .bind(address)
        .bind(i16::from(metadata.decimals))
        .bind(&metadata.symbol)
        .bind(&metadata.name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Patches a token row still holding the fetch-failure defaults.
    ///
    /// # Errors
    ///
    /// Returns [`IndexerError::Persistence`] on database failure.
    pub async fn patch_token_metadata(
        &self,
        address: &str,
        metadata: &TokenMetadata,
    ) -> Result<(), IndexerError> {
        sqlx::query(
            "UPDATE tokens SET decimals = $2, symbol = $3, name = $4 \
             WHERE address = $1 AND symbol = 'UNKNOWN'",
        )
        .bind(address)
        .bind(i16::from(metadata.decimals))
        .bind(&metadata.symbol)
        .bind(&metadata.name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Folds one swap side into a token's cumulative stats: volume,
    /// tx count, USD aggregates, signed TVL delta, and the fresh derived
    /// price, in one atomic upsert.
    ///
    /// Returns the token's post-fold `(total_value_locked,
    /// total_value_locked_usd)`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexerError::Persistence`] on database failure.
    #[allow(clippy::too_many_arguments)]
    pub async fn accrue_token_swap(
        &self,
        address: &str,
        metadata: &TokenMetadata,
        volume_delta: &str,
        tvl_delta: &str,
        derived_native: Decimal,
        volume_usd_delta: Decimal,
        untracked_volume_usd_delta: Decimal,
        fees_usd_delta: Decimal,
        price_usd: Decimal,
    ) -> Result<(String, Decimal), IndexerError> {
        let row = sqlx::query_as::<_, (String, Decimal)>(
            "INSERT INTO tokens (address, decimals, symbol, name, volume, volume_usd, \
             untracked_volume_usd, fees_usd, total_value_locked, total_value_locked_usd, \
             derived_native, tx_count) \
             VALUES ($1, $2, $3, $4, $5::numeric, $6, $7, $8, $9::numeric, \
             ($9::numeric / power(10::numeric, $2::numeric)) * $10, $11, 1) \
             ON CONFLICT (address) DO UPDATE SET \
                 volume = tokens.volume + EXCLUDED.volume, \
                 volume_usd = tokens.volume_usd + EXCLUDED.volume_usd, \
                 untracked_volume_usd = tokens.untracked_volume_usd + EXCLUDED.untracked_volume_usd, \
                 fees_usd = tokens.fees_usd + EXCLUDED.fees_usd, \
                 total_value_locked = tokens.total_value_locked + EXCLUDED.total_value_locked, \
                 total_value_locked_usd = ((tokens.total_value_locked + EXCLUDED.total_value_locked) \
                     / power(10::numeric, tokens.decimals::numeric)) * $10, \
                 derived_native = EXCLUDED.derived_native, \
                 tx_count = tokens.tx_count + 1 \
             RETURNING total_value_locked::text, total_value_locked_usd",
        )
        .bind(address)
        .bind(i16::from(metadata.decimals))
        .bind(&metadata.symbol)
        .bind(&metadata.name)
        .bind(volume_delta)
        .bind(volume_usd_delta)
        .bind(untracked_volume_usd_delta)
        .bind(fees_usd_delta)
        .bind(tvl_delta)
        .bind(price_usd)
        .bind(derived_native)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Adds a pool to a token's whitelist set. The membership check keeps
    /// the array a set under replays.
    ///
    /// # Errors
    ///
    /// Returns [`IndexerError::Persistence`] on database failure.
    pub async fn add_whitelist_pool(
        &self,
        token_address: &str,
        pool_id: &str,
    ) -> Result<(), IndexerError> {
        sqlx::query(
            "UPDATE tokens SET whitelist_pools = array_append(whitelist_pools, $2) \
             WHERE address = $1 AND NOT ($2 = ANY(whitelist_pools))",
        )
        .bind(token_address)
        .bind(pool_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ---- candles ---------------------------------------------------------

    /// Folds one swap side into the token's current candle for the given
    /// interval: OHLC, volume, USD aggregates, fees, TVL snapshot, and
    /// tx count in one guarded upsert.
    ///
    /// Returns the number of rows touched. Zero means the bucket was
    /// already finalized; the caller logs and moves on. A finalized
    /// candle is never mutated.
    ///
    /// # Errors
    ///
    /// Returns [`IndexerError::Persistence`] on database failure.
    #[allow(clippy::too_many_arguments)]
    pub async fn fold_candle(
        &self,
        interval: CandleInterval,
        token_address: &str,
        bucket_start: i64,
        price_usd: Decimal,
        volume_delta: &str,
        volume_usd_delta: Decimal,
        untracked_volume_usd_delta: Decimal,
        fees_usd_delta: Decimal,
        total_value_locked: &str,
        total_value_locked_usd: Decimal,
    ) -> Result<u64, IndexerError> {
        let table = interval.table();
        let current = CandleStatus::Current.as_str();
        let query = format!(
            "INSERT INTO {table} AS c (token_address, bucket_start, status, open, high, low, \
             close, price_usd, volume, volume_usd, untracked_volume_usd, fees_usd, \
             total_value_locked, total_value_locked_usd, tx_count) \
             VALUES ($1, $2, '{current}', $3, $3, $3, $3, $3, $4::numeric, $5, $6, $7, \
             $8::numeric, $9, 1) \
             ON CONFLICT (token_address, bucket_start) DO UPDATE SET \
                 high = GREATEST(c.high, EXCLUDED.close), \
                 low = CASE WHEN c.low = 0 THEN EXCLUDED.close \
                            ELSE LEAST(c.low, EXCLUDED.close) END, \
                 close = EXCLUDED.close, \
                 open = CASE WHEN c.open = 0 THEN EXCLUDED.close ELSE c.open END, \
                 price_usd = EXCLUDED.price_usd, \
                 volume = c.volume + EXCLUDED.volume, \
                 volume_usd = c.volume_usd + EXCLUDED.volume_usd, \
                 untracked_volume_usd = c.untracked_volume_usd + EXCLUDED.untracked_volume_usd, \
                 fees_usd = c.fees_usd + EXCLUDED.fees_usd, \
                 total_value_locked = EXCLUDED.total_value_locked, \
                 total_value_locked_usd = EXCLUDED.total_value_locked_usd, \
                 tx_count = c.tx_count + 1 \
             WHERE c.status = '{current}'"
        );
        let result = sqlx::query(&query)
            .bind(token_address)
            .bind(bucket_start)
            .bind(price_usd)
            .bind(volume_delta)
            .bind(volume_usd_delta)
            .bind(untracked_volume_usd_delta)
            .bind(fees_usd_delta)
            .bind(total_value_locked)
            .bind(total_value_locked_usd)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Promotes every `current` candle in buckets strictly before
    /// `before_bucket` to `finalized`, returning the frozen rows.
    ///
    /// The flip happens in a single statement, so each row is promoted
    /// exactly once even if two finalizers race.
    ///
    /// # Errors
    ///
    /// Returns [`IndexerError::Persistence`] on database failure.
    pub async fn finalize_candles(
        &self,
        interval: CandleInterval,
        before_bucket: i64,
    ) -> Result<Vec<CandleRecord>, IndexerError> {
        let table = interval.table();
        let current = CandleStatus::Current.as_str();
        let finalized = CandleStatus::Finalized.as_str();
        let query = format!(
            "UPDATE {table} SET status = '{finalized}' \
             WHERE bucket_start < $1 AND status = '{current}' \
             RETURNING {CANDLE_COLUMNS}"
        );
        let rows = sqlx::query_as::<_, CandleRecord>(&query)
            .bind(before_bucket)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Recent candles for a token, newest bucket first.
    ///
    /// # Errors
    ///
    /// Returns [`IndexerError::Persistence`] on database failure.
    pub async fn get_candles(
        &self,
        interval: CandleInterval,
        token_address: &str,
        limit: i64,
    ) -> Result<Vec<CandleRecord>, IndexerError> {
        let table = interval.table();
        let query = format!(
            "SELECT {CANDLE_COLUMNS} FROM {table} WHERE token_address = $1 \
             ORDER BY bucket_start DESC LIMIT $2"
        );
        let rows = sqlx::query_as::<_, CandleRecord>(&query)
            .bind(token_address)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    // ---- sync state ------------------------------------------------------

    /// Loads the sync checkpoint for a pool manager.
    ///
    /// # Errors
    ///
    /// Returns [`IndexerError::Persistence`] on database failure.
    pub async fn get_sync_state(
        &self,
        pool_manager_address: &str,
    ) -> Result<Option<SyncStateRecord>, IndexerError> {
        let row = sqlx::query_as::<_, SyncStateRecord>(
            "SELECT pool_manager_address, last_synced_block, current_block, \
             is_initial_sync_complete, last_synced_at \
             FROM sync_state WHERE pool_manager_address = $1",
        )
        .bind(pool_manager_address)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Writes the sync checkpoint after a committed batch.
    ///
    /// # Errors
    ///
    /// Returns [`IndexerError::Persistence`] on database failure.
    pub async fn upsert_sync_state(
        &self,
        pool_manager_address: &str,
        last_synced_block: i64,
        current_block: i64,
        is_initial_sync_complete: bool,
    ) -> Result<(), IndexerError> {
        sqlx::query(
            "INSERT INTO sync_state (pool_manager_address, last_synced_block, current_block, \
             is_initial_sync_complete, last_synced_at) VALUES ($1, $2, $3, $4, now()) \
             ON CONFLICT (pool_manager_address) DO UPDATE SET \
                 last_synced_block = EXCLUDED.last_synced_block, \
                 current_block = EXCLUDED.current_block, \
                 is_initial_sync_complete = EXCLUDED.is_initial_sync_complete, \
                 last_synced_at = now()",
        )
        .bind(pool_manager_address)
        .bind(last_synced_block)
        .bind(current_block)
        .bind(is_initial_sync_complete)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
