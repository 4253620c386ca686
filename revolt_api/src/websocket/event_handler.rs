use async_trait::async_trait;
use serde_json::Value;

use crate::{
    client::RevoltClient,
    types::{message::Message, websocket::ServerToClientEvent},
};

/// Callbacks for gateway events, in the spirit of Serenity's `EventHandler`.
/// Every method has an empty default.
///
/// The gateway awaits each callback before reading the next frame, so
/// handlers observe events strictly one at a time.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    /// Called for *every* event the server sends.
    async fn on_event(&self, _client: &RevoltClient, _event: &ServerToClientEvent) {}

    /// Called when an `Error` event is received (e.g. a rejected token).
    async fn on_error_event(&self, _client: &RevoltClient, _error_id: &str) {}

    /// Called once the connection is authenticated.
    async fn on_authenticated(&self, _client: &RevoltClient) {}

    /// Called on `Ready`, with the full payload.
    async fn on_ready(&self, _client: &RevoltClient, _ready: &ReadyEvent) {}

    /// Called for each new message.
    async fn on_message(&self, _client: &RevoltClient, _message: &Message) {}
}

/// Data for a "Ready" event.
#[derive(Debug, Clone)]
pub struct ReadyEvent {
    pub users: Vec<Value>,
    pub servers: Vec<Value>,
    pub channels: Vec<Value>,
}
