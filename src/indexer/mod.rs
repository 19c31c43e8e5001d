//! Core pipeline: pool state machine, token aggregation, derived
//! pricing, the ingest orchestrator, and the candle finalizers.

pub mod aggregator;
pub mod finalizer;
pub mod metadata;
pub mod oracle;
pub mod orchestrator;
pub mod pool_tracker;

pub use aggregator::TokenAggregator;
pub use finalizer::spawn_finalizers;
pub use metadata::TokenMetadataCache;
pub use oracle::PriceOracle;
pub use orchestrator::Orchestrator;
pub use pool_tracker::PoolTracker;
