//! Shared application state injected into all Axum handlers.

use crate::domain::EventBus;
use crate::persistence::PostgresPersistence;

/// Shared application state available to all handlers via Axum's
/// `State` extractor. The read surface only ever touches persistence
/// and the bus; it never writes.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Read access to the durable collections.
    pub persistence: PostgresPersistence,
    /// Event bus for WebSocket subscriptions.
    pub event_bus: EventBus,
    /// Pool manager address (lowercase hex) whose SyncState row is the
    /// monitoring surface.
    pub pool_manager_address: String,
}
