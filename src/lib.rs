//! # v4-indexer
//!
//! Event-ingestion and market-data indexer for a Uniswap-V4-style pool
//! manager contract. The indexer consumes `Initialize` / `Swap` /
//! `ModifyLiquidity` logs in strict on-chain order, maintains per-pool
//! state (price, tick, liquidity, TVL) and per-token rolling candles
//! (minute / hour / day), and streams live updates to subscribers.
//!
//! ## Architecture
//!
//! ```text
//! Ethereum JSON-RPC
//!     │
//!     ├── ChainReader (chain/)          batched getLogs + head polling
//!     │
//!     ├── Orchestrator (indexer/)       backfill ∪ live, ordered dispatch
//!     │       ├── PoolTracker           Initialize / Swap / ModifyLiquidity
//!     │       ├── TokenAggregator       token stats + candle folds
//!     │       │       └── PriceOracle   derived native / USD prices
//!     │       └── SyncState checkpoints
//!     │
//!     ├── Finalizers (indexer/)         minute / hour / day promotion
//!     ├── EventBus (domain/)            swap.created, candle.finalized
//!     │
//!     ├── REST handlers (api/)          read-only query surface
//!     ├── WS handler (ws/)              event fan-out
//!     │
//!     └── PostgreSQL persistence
//! ```

pub mod api;
pub mod app_state;
pub mod chain;
pub mod config;
pub mod domain;
pub mod error;
pub mod indexer;
pub mod persistence;
pub mod ws;
