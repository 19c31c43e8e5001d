//! Schema bootstrap: tables, uniqueness constraints, and query indexes.
//!
//! Runs idempotently at startup. Uniqueness constraints are the
//! deduplication mechanism for the whole pipeline: a replayed log stream
//! must not change any collection.

use sqlx::PgPool;

use crate::domain::CandleInterval;
use crate::error::IndexerError;

const POOLS: &str = "
CREATE TABLE IF NOT EXISTS pools (
    pool_id                    TEXT PRIMARY KEY,
    currency0                  TEXT NOT NULL,
    currency1                  TEXT NOT NULL,
    fee                        BIGINT NOT NULL,
    tick_spacing               INTEGER NOT NULL,
    hooks                      TEXT NOT NULL,
    sqrt_price_x96             NUMERIC(78,0) NOT NULL,
    tick                       INTEGER NOT NULL,
    liquidity                  NUMERIC(78,0) NOT NULL DEFAULT 0,
    total_value_locked_token0  NUMERIC(78,0) NOT NULL DEFAULT 0,
    total_value_locked_token1  NUMERIC(78,0) NOT NULL DEFAULT 0,
    token0_price               NUMERIC(50,18) NOT NULL DEFAULT 0,
    token1_price               NUMERIC(50,18) NOT NULL DEFAULT 0,
    created_block              BIGINT NOT NULL,
    created_at_timestamp       BIGINT NOT NULL,
    created_tx_hash            TEXT NOT NULL
)";

const SWAP_EVENTS: &str = "
CREATE TABLE IF NOT EXISTS swap_events (
    transaction_hash  TEXT NOT NULL,
    log_index         BIGINT NOT NULL,
    pool_id           TEXT NOT NULL,
    token0            TEXT NOT NULL,
    token1            TEXT NOT NULL,
    sender            TEXT NOT NULL,
    amount0           NUMERIC(78,0) NOT NULL,
    amount1           NUMERIC(78,0) NOT NULL,
    sqrt_price_x96    NUMERIC(78,0) NOT NULL,
    liquidity         NUMERIC(78,0) NOT NULL,
    tick              INTEGER NOT NULL,
    fee               BIGINT NOT NULL,
    block_number      BIGINT NOT NULL,
    block_timestamp   BIGINT NOT NULL,
    PRIMARY KEY (transaction_hash, log_index)
)";

const TOKENS: &str = "
CREATE TABLE IF NOT EXISTS tokens (
    address                 TEXT PRIMARY KEY,
    decimals                SMALLINT NOT NULL DEFAULT 18,
    symbol                  TEXT NOT NULL DEFAULT 'UNKNOWN',
    name                    TEXT NOT NULL DEFAULT 'Unknown Token',
    volume                  NUMERIC(78,0) NOT NULL DEFAULT 0,
    volume_usd              NUMERIC(50,18) NOT NULL DEFAULT 0,
    untracked_volume_usd    NUMERIC(50,18) NOT NULL DEFAULT 0,
    fees_usd                NUMERIC(50,18) NOT NULL DEFAULT 0,
    total_value_locked      NUMERIC(78,0) NOT NULL DEFAULT 0,
    total_value_locked_usd  NUMERIC(50,18) NOT NULL DEFAULT 0,
    derived_native          NUMERIC(50,18) NOT NULL DEFAULT 0,
    tx_count                BIGINT NOT NULL DEFAULT 0,
    whitelist_pools         TEXT[] NOT NULL DEFAULT '{}'
)";

const SYNC_STATE: &str = "
CREATE TABLE IF NOT EXISTS sync_state (
    pool_manager_address      TEXT PRIMARY KEY,
    last_synced_block         BIGINT NOT NULL,
    current_block             BIGINT NOT NULL,
    is_initial_sync_complete  BOOLEAN NOT NULL DEFAULT FALSE,
    last_synced_at            TIMESTAMPTZ NOT NULL DEFAULT now()
)";

const SECONDARY_INDEXES: [&str; 4] = [
    "CREATE INDEX IF NOT EXISTS idx_swap_events_pool ON swap_events (pool_id)",
    "CREATE INDEX IF NOT EXISTS idx_swap_events_timestamp ON swap_events (block_timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_pools_currency0 ON pools (currency0)",
    "CREATE INDEX IF NOT EXISTS idx_pools_currency1 ON pools (currency1)",
];

/// Creates every table and index if missing.
///
/// # Errors
///
/// Returns [`IndexerError::Persistence`] on database failure.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), IndexerError> {
    sqlx::query(POOLS).execute(pool).await?;
    sqlx::query(SWAP_EVENTS).execute(pool).await?;
    sqlx::query(TOKENS).execute(pool).await?;
    sqlx::query(SYNC_STATE).execute(pool).await?;

    for interval in CandleInterval::ALL {
        let table = interval.table();
        let candles = format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                token_address           TEXT NOT NULL,
                bucket_start            BIGINT NOT NULL,
                status                  TEXT NOT NULL DEFAULT 'current',
                open                    NUMERIC(50,18) NOT NULL DEFAULT 0,
                high                    NUMERIC(50,18) NOT NULL DEFAULT 0,
                low                     NUMERIC(50,18) NOT NULL DEFAULT 0,
                close                   NUMERIC(50,18) NOT NULL DEFAULT 0,
                price_usd               NUMERIC(50,18) NOT NULL DEFAULT 0,
                volume                  NUMERIC(78,0) NOT NULL DEFAULT 0,
                volume_usd              NUMERIC(50,18) NOT NULL DEFAULT 0,
                untracked_volume_usd    NUMERIC(50,18) NOT NULL DEFAULT 0,
                fees_usd                NUMERIC(50,18) NOT NULL DEFAULT 0,
                total_value_locked      NUMERIC(78,0) NOT NULL DEFAULT 0,
                total_value_locked_usd  NUMERIC(50,18) NOT NULL DEFAULT 0,
                tx_count                BIGINT NOT NULL DEFAULT 0,
                PRIMARY KEY (token_address, bucket_start)
            )"
        );
        sqlx::query(&candles).execute(pool).await?;
        let status_index = format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_status ON {table} (status, bucket_start)"
        );
        sqlx::query(&status_index).execute(pool).await?;
    }

    for statement in SECONDARY_INDEXES {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}
