//! v4-indexer entry point.
//!
//! Composition root: loads configuration, connects the database, wires
//! the pipeline components together, and runs the orchestrator, the
//! candle finalizers, and the Axum HTTP/WebSocket server until shutdown.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use v4_indexer::api;
use v4_indexer::app_state::AppState;
use v4_indexer::chain::{ChainReader, HttpChainReader};
use v4_indexer::config::IndexerConfig;
use v4_indexer::domain::{EventBus, address_hex};
use v4_indexer::indexer::{
    Orchestrator, PoolTracker, PriceOracle, TokenAggregator, TokenMetadataCache, spawn_finalizers,
};
use v4_indexer::persistence::{PostgresPersistence, schema};
use v4_indexer::ws::handler::ws_handler;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = IndexerConfig::from_env()?;
    let pool_manager = address_hex(&config.pool_manager_address);
    tracing::info!(addr = %config.listen_addr, pool_manager = %pool_manager,
        "starting v4-indexer");

    // Database: connection pool + schema bootstrap. An unreachable
    // database is fatal here and fatal later; the supervisor restarts
    // us and SyncState drives resume.
    let db = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
        .connect(&config.database_url)
        .await?;
    schema::ensure_schema(&db).await?;

    // Build the pipeline
    let persistence = PostgresPersistence::new(db);
    let event_bus = EventBus::new(config.event_bus_capacity);
    let chain: Arc<dyn ChainReader> = Arc::new(HttpChainReader::new(
        config.rpc_url.clone(),
        config.pool_manager_address,
        Duration::from_secs(config.rpc_timeout_secs),
    )?);
    let metadata = Arc::new(TokenMetadataCache::new(Arc::clone(&chain), persistence.clone()));
    let oracle = PriceOracle::new(persistence.clone(), &config);
    let aggregator = Arc::new(TokenAggregator::new(
        persistence.clone(),
        Arc::clone(&metadata),
        oracle,
        event_bus.clone(),
        &config,
    ));
    let tracker = PoolTracker::new(persistence.clone(), Arc::clone(&metadata));
    let orchestrator = Orchestrator::new(
        Arc::clone(&chain),
        persistence.clone(),
        tracker,
        Arc::clone(&aggregator),
        &config,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let finalizers = spawn_finalizers(Arc::clone(&aggregator), shutdown_rx.clone());
    let mut pipeline = tokio::spawn(orchestrator.run(shutdown_rx));

    // HTTP + WebSocket collaborators (read-only)
    let app_state = AppState {
        persistence,
        event_bus,
        pool_manager_address: pool_manager,
    };
    let app = Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");
    let mut server = tokio::spawn(async move { axum::serve(listener, app).await });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received, draining pipeline");
            let _ = shutdown_tx.send(true);
            let _ = (&mut pipeline).await;
        }
        result = &mut pipeline => {
            let _ = shutdown_tx.send(true);
            match result {
                Ok(Ok(())) => tracing::info!("pipeline finished"),
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "pipeline failed");
                    return Err(e.into());
                }
                Err(e) => {
                    tracing::error!(error = %e, "pipeline task panicked");
                    return Err(e.into());
                }
            }
        }
        result = &mut server => {
            let _ = shutdown_tx.send(true);
            result??;
        }
    }

    for handle in finalizers {
        handle.abort();
    }
    server.abort();
    Ok(())
}
