//! WebSocket layer: event fan-out to subscribed clients.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;
