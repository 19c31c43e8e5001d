//! System endpoints: health check and sync progress.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::dto::SyncStatusDto;
use crate::app_state::AppState;
use crate::error::IndexerError;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy"),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// `GET /sync` — Sync progress for the indexed pool manager.
#[utoipa::path(
    get,
    path = "/sync",
    tag = "System",
    summary = "Sync progress",
    description = "Returns the SyncState row for the indexed pool manager.",
    responses(
        (status = 200, description = "Current sync state", body = SyncStatusDto),
        (status = 404, description = "No sync has run yet", body = crate::error::ErrorResponse),
    )
)]
pub async fn sync_handler(
    State(state): State<AppState>,
) -> Result<Json<SyncStatusDto>, IndexerError> {
    let row = state
        .persistence
        .get_sync_state(&state.pool_manager_address)
        .await?
        .ok_or_else(|| IndexerError::NotFound("no sync state yet".to_string()))?;
    Ok(Json(SyncStatusDto::from(row)))
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/sync", get(sync_handler))
}
