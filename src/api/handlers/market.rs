//! Market read endpoints: pools, swaps, tokens, candles.

use std::str::FromStr;

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::market_dto::clamp_limit;
use crate::api::dto::{CandleDto, CandleQuery, LimitQuery, PoolDto, SwapDto, TokenDto};
use crate::app_state::AppState;
use crate::domain::CandleInterval;
use crate::error::IndexerError;

/// `GET /api/v1/pools` — List pools, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/pools",
    tag = "Pools",
    summary = "List pools",
    params(
        ("limit" = Option<i64>, Query, description = "Maximum rows (1–1000, default 100)"),
    ),
    responses(
        (status = 200, description = "Pools, newest first", body = Vec<PoolDto>),
    )
)]
pub async fn list_pools(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<PoolDto>>, IndexerError> {
    let rows = state.persistence.list_pools(clamp_limit(query.limit)).await?;
    Ok(Json(rows.into_iter().map(PoolDto::from).collect()))
}

/// `GET /api/v1/pools/{pool_id}` — Pool state by ID.
#[utoipa::path(
    get,
    path = "/api/v1/pools/{pool_id}",
    tag = "Pools",
    summary = "Get one pool",
    params(
        ("pool_id" = String, Path, description = "32-byte pool ID, 0x-prefixed hex"),
    ),
    responses(
        (status = 200, description = "Pool state", body = PoolDto),
        (status = 404, description = "Unknown pool", body = crate::error::ErrorResponse),
    )
)]
pub async fn get_pool(
    State(state): State<AppState>,
    Path(pool_id): Path<String>,
) -> Result<Json<PoolDto>, IndexerError> {
    let pool_id = normalize_pool_id(&pool_id)?;
    let pool = state
        .persistence
        .get_pool(&pool_id)
        .await?
        .ok_or(IndexerError::PoolNotFound(pool_id))?;
    Ok(Json(PoolDto::from(pool)))
}

/// `GET /api/v1/pools/{pool_id}/swaps` — Recent swaps in a pool.
#[utoipa::path(
    get,
    path = "/api/v1/pools/{pool_id}/swaps",
    tag = "Pools",
    summary = "Recent swaps",
    params(
        ("pool_id" = String, Path, description = "32-byte pool ID, 0x-prefixed hex"),
        ("limit" = Option<i64>, Query, description = "Maximum rows (1–1000, default 100)"),
    ),
    responses(
        (status = 200, description = "Swaps, newest first", body = Vec<SwapDto>),
    )
)]
pub async fn pool_swaps(
    State(state): State<AppState>,
    Path(pool_id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<SwapDto>>, IndexerError> {
    let pool_id = normalize_pool_id(&pool_id)?;
    let rows = state
        .persistence
        .recent_swaps(&pool_id, clamp_limit(query.limit))
        .await?;
    Ok(Json(rows.into_iter().map(SwapDto::from).collect()))
}

/// `GET /api/v1/tokens/{address}` — Token stats by address.
#[utoipa::path(
    get,
    path = "/api/v1/tokens/{address}",
    tag = "Tokens",
    summary = "Get one token",
    params(
        ("address" = String, Path, description = "20-byte token address, 0x-prefixed hex"),
    ),
    responses(
        (status = 200, description = "Token stats", body = TokenDto),
        (status = 404, description = "Unknown token", body = crate::error::ErrorResponse),
    )
)]
pub async fn get_token(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<TokenDto>, IndexerError> {
    let address = normalize_address(&address)?;
    let token = state
        .persistence
        .get_token(&address)
        .await?
        .ok_or(IndexerError::NotFound(address))?;
    Ok(Json(TokenDto::from(token)))
}

/// `GET /api/v1/tokens/{address}/candles` — Candles for a token.
#[utoipa::path(
    get,
    path = "/api/v1/tokens/{address}/candles",
    tag = "Tokens",
    summary = "Token candles",
    params(
        ("address" = String, Path, description = "20-byte token address, 0x-prefixed hex"),
        ("interval" = Option<String>, Query, description = "minute | hour | day (default minute)"),
        ("limit" = Option<i64>, Query, description = "Maximum rows (1–1000, default 100)"),
    ),
    responses(
        (status = 200, description = "Candles, newest bucket first", body = Vec<CandleDto>),
        (status = 400, description = "Unknown interval", body = crate::error::ErrorResponse),
    )
)]
pub async fn token_candles(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(query): Query<CandleQuery>,
) -> Result<Json<Vec<CandleDto>>, IndexerError> {
    let address = normalize_address(&address)?;
    let interval = CandleInterval::from_str(&query.interval)
        .map_err(IndexerError::InvalidRequest)?;
    let rows = state
        .persistence
        .get_candles(interval, &address, clamp_limit(query.limit))
        .await?;
    Ok(Json(rows.into_iter().map(CandleDto::from).collect()))
}

/// Market routes composed under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/pools", get(list_pools))
        .route("/pools/{pool_id}", get(get_pool))
        .route("/pools/{pool_id}/swaps", get(pool_swaps))
        .route("/tokens/{address}", get(get_token))
        .route("/tokens/{address}/candles", get(token_candles))
}

fn normalize_pool_id(raw: &str) -> Result<String, IndexerError> {
    use alloy_primitives::B256;
    let parsed = B256::from_str(raw)
        .map_err(|_| IndexerError::InvalidRequest(format!("invalid pool id '{raw}'")))?;
    Ok(crate::domain::b256_hex(&parsed))
}

fn normalize_address(raw: &str) -> Result<String, IndexerError> {
    use alloy_primitives::Address;
    let parsed = Address::from_str(raw)
        .map_err(|_| IndexerError::InvalidRequest(format!("invalid address '{raw}'")))?;
    Ok(crate::domain::address_hex(&parsed))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn normalize_address_lowercases_checksummed_input() {
        let normalized = normalize_address("0x6B175474E89094C44Da98b954EedeAC495271d0F");
        assert_eq!(
            normalized.ok(),
            Some("0x6b175474e89094c44da98b954eedeac495271d0f".to_string())
        );
    }

    #[test]
    fn normalize_address_rejects_garbage() {
        assert!(normalize_address("hello").is_err());
        assert!(normalize_address("0x123").is_err());
    }

    #[test]
    fn normalize_pool_id_requires_32_bytes() {
        assert!(normalize_pool_id("0xaa").is_err());
        let full = format!("0x{}", "ab".repeat(32));
        assert_eq!(normalize_pool_id(&full).ok(), Some(full));
    }
}
