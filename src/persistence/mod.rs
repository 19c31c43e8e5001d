//! Persistence layer: PostgreSQL-backed durable collections.

pub mod models;
pub mod postgres;
pub mod schema;

pub use postgres::PostgresPersistence;
