//! REST API layer: route handlers, DTOs, and router composition.
//!
//! The query surface is read-only. All market endpoints are mounted
//! under `/api/v1`; `/health` and `/sync` live at the root for
//! monitoring.

pub mod dto;
pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI documentation for the v4-indexer REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "v4-indexer",
        version = "0.1.0",
        description = "Market-data query surface for the v4 pool manager indexer.",
        license(name = "MIT"),
    ),
    tags(
        (name = "System", description = "Health check and sync progress"),
        (name = "Pools", description = "Pool state and swap history"),
        (name = "Tokens", description = "Token stats and candles"),
    ),
    paths(
        handlers::system::health_handler,
        handlers::system::sync_handler,
        handlers::market::list_pools,
        handlers::market::get_pool,
        handlers::market::pool_swaps,
        handlers::market::get_token,
        handlers::market::token_candles,
    ),
    components(schemas(
        crate::error::ErrorResponse,
        crate::error::ErrorBody,
        dto::PoolDto,
        dto::SwapDto,
        dto::TokenDto,
        dto::CandleDto,
        dto::SyncStatusDto,
    ))
)]
#[derive(Debug)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
}
