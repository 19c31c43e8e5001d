//! WebSocket connection state machine.
//!
//! Handles the read/write loop for a single WebSocket connection,
//! dispatching subscription commands and forwarding filtered events.
//! A lagging client gets a warning and loses the dropped events; the
//! publisher is never back-pressured.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::messages::{WsCommand, WsMessage, WsMessageType};
use super::subscription::SubscriptionManager;
use crate::domain::MarketEvent;

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads commands from the client and dispatches them.
/// - Forwards matching events from the [`broadcast::Receiver`] to the
///   client.
pub async fn run_connection(socket: WebSocket, mut event_rx: broadcast::Receiver<MarketEvent>) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut subs = SubscriptionManager::new();

    loop {
        tokio::select! {
            // Incoming message from client
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let response = handle_text_message(&text, &mut subs);
                        if let Some(resp_json) = response
                            && ws_tx.send(Message::text(resp_json)).await.is_err() {
                                break;
                            }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
            // Event from the bus
            event = event_rx.recv() => {
                match event {
                    Ok(market_event) => {
                        if subs.matches_any(&market_event.token_addresses()) {
                            tracing::trace!(topic = market_event.topic(), "forwarding event");
                            let msg = WsMessage {
                                id: uuid::Uuid::new_v4().to_string(),
                                msg_type: WsMessageType::Event,
                                timestamp: chrono::Utc::now(),
                                payload: serde_json::to_value(&market_event).unwrap_or_default(),
                            };
                            let json = serde_json::to_string(&msg).unwrap_or_default();
                            if ws_tx.send(Message::text(json)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, "ws client lagged behind event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::debug!("ws connection closed");
}

/// Handles a text message from the client, returning an optional JSON
/// response.
fn handle_text_message(text: &str, subs: &mut SubscriptionManager) -> Option<String> {
    let Ok(msg) = serde_json::from_str::<WsMessage>(text) else {
        let err = WsMessage {
            id: String::new(),
            msg_type: WsMessageType::Error,
            timestamp: chrono::Utc::now(),
            payload: serde_json::json!({
                "code": 400,
                "message": "malformed JSON"
            }),
        };
        return serde_json::to_string(&err).ok();
    };

    match serde_json::from_value::<WsCommand>(msg.payload.clone()) {
        Ok(WsCommand::Subscribe { tokens }) => {
            subs.subscribe(&tokens);
            let response = WsMessage {
                id: msg.id,
                msg_type: WsMessageType::Response,
                timestamp: chrono::Utc::now(),
                payload: serde_json::json!({
                    "subscribed": tokens,
                    "count": subs.count(),
                    "wildcard": subs.is_subscribed_all(),
                }),
            };
            serde_json::to_string(&response).ok()
        }
        Ok(WsCommand::Unsubscribe { tokens }) => {
            subs.unsubscribe(&tokens);
            let response = WsMessage {
                id: msg.id,
                msg_type: WsMessageType::Response,
                timestamp: chrono::Utc::now(),
                payload: serde_json::json!({
                    "unsubscribed": tokens,
                    "remaining_count": subs.count(),
                }),
            };
            serde_json::to_string(&response).ok()
        }
        Err(_) => {
            let err = WsMessage {
                id: msg.id,
                msg_type: WsMessageType::Error,
                timestamp: chrono::Utc::now(),
                payload: serde_json::json!({
                    "code": 404,
                    "message": "unknown command"
                }),
            };
            serde_json::to_string(&err).ok()
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn envelope(payload: serde_json::Value) -> String {
        serde_json::to_string(&WsMessage {
            id: "req-1".to_string(),
            msg_type: WsMessageType::Command,
            timestamp: chrono::Utc::now(),
            payload,
        })
        .unwrap_or_default()
    }

    #[test]
    fn subscribe_command_registers_tokens() {
        let mut subs = SubscriptionManager::new();
        let text = envelope(serde_json::json!({
            "command": "subscribe",
            "tokens": ["0x6b175474e89094c44da98b954eedeac495271d0f"],
        }));
        let response = handle_text_message(&text, &mut subs);
        assert!(response.is_some());
        assert_eq!(subs.count(), 1);
    }

    #[test]
    fn malformed_json_yields_error_envelope() {
        let mut subs = SubscriptionManager::new();
        let response = handle_text_message("not json", &mut subs);
        let Some(response) = response else {
            panic!("expected an error response");
        };
        assert!(response.contains("malformed JSON"));
    }

    #[test]
    fn unknown_command_yields_error_envelope() {
        let mut subs = SubscriptionManager::new();
        let text = envelope(serde_json::json!({ "command": "swap" }));
        let response = handle_text_message(&text, &mut subs);
        let Some(response) = response else {
            panic!("expected an error response");
        };
        assert!(response.contains("unknown command"));
    }
}
