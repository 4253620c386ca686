//! Gateway session: authentication, heartbeat, event dispatch and
//! reconnection with exponential backoff.

use std::{sync::Arc, time::Duration};

use async_recursion::async_recursion;
use futures::{stream::SplitStream, SinkExt, StreamExt};
use tokio::time::{interval, sleep};
use tungstenite::protocol::{frame::coding::CloseCode, CloseFrame, Message as WsMessage};
use tracing::{debug, error, info, warn};

use super::{
    event_handler::{EventHandler, ReadyEvent},
    transport::{self, WsStream},
};
use crate::{
    client::{RevoltClient, DEFAULT_WS_URL},
    error::RevoltError,
    types::{
        message::Message as RevoltMessage,
        websocket::{ClientToServerEvent, ServerToClientEvent},
    },
};

/// Connection state for the WebSocket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closing,
    Reconnecting,
}

const HEARTBEAT: Duration = Duration::from_secs(30);
const MAX_RETRIES: u32 = 10;
const MAX_BACKOFF: Duration = Duration::from_secs(60);

impl RevoltClient {
    /// Register the handler that receives gateway events.
    pub async fn event_handler<E: EventHandler>(&self, handler: E) {
        *self.event_handler.lock().await = Some(Arc::new(handler));
    }

    fn gateway_url(&self) -> &str {
        self.ws_url.as_deref().unwrap_or(DEFAULT_WS_URL)
    }

    /// Connect the gateway, authenticate, and spawn the heartbeat and read
    /// loop. Returns once the socket is up.
    pub async fn start(&self) -> Result<(), RevoltError> {
        if self.ws_tx.lock().await.is_some() {
            return Err(RevoltError::Gateway(
                "WebSocket is already running on this client".into(),
            ));
        }
        self.set_state(ConnectionState::Connecting).await;

        let read = match self.open_session().await {
            Ok(read) => read,
            Err(e) => {
                self.set_state(ConnectionState::Disconnected).await;
                return Err(e);
            }
        };

        tokio::spawn({
            let client = self.clone();
            async move {
                let mut ticker = interval(HEARTBEAT);
                loop {
                    ticker.tick().await;
                    if client.connection_state().await == ConnectionState::Disconnected {
                        break;
                    }
                    if let Err(e) = client.ping(None).await {
                        debug!(error = %e, "heartbeat skipped");
                    }
                }
            }
        });

        tokio::spawn({
            let client = self.clone();
            async move { client.read_with_reconnect(read).await }
        });

        Ok(())
    }

    /// Connect, install the writer half and authenticate.
    async fn open_session(&self) -> Result<SplitStream<WsStream>, RevoltError> {
        let ws = transport::connect(self.gateway_url(), self.proxy.as_deref()).await?;
        let (write, read) = ws.split();
        *self.ws_tx.lock().await = Some(write);
        self.set_state(ConnectionState::Connected).await;

        let token = self.token.lock().await.clone();
        if let Some(token) = token {
            if let Err(e) = self.send_authenticate(token.secret()).await {
                *self.ws_tx.lock().await = None;
                return Err(e);
            }
        }
        Ok(read)
    }

    async fn read_with_reconnect(&self, read: SplitStream<WsStream>) {
        self.read_loop(read).await;

        let mut attempts = 0;
        let mut delay = Duration::from_secs(1);

        loop {
            if self.connection_state().await == ConnectionState::Closing {
                info!("gateway closed, not reconnecting");
                self.set_state(ConnectionState::Disconnected).await;
                return;
            }
            self.set_state(ConnectionState::Reconnecting).await;

            warn!(
                attempt = attempts + 1,
                max = MAX_RETRIES,
                delay = ?delay,
                "gateway connection lost, reconnecting"
            );
            sleep(delay).await;

            match self.open_session().await {
                Ok(read) => {
                    info!("gateway reconnected");
                    attempts = 0;
                    delay = Duration::from_secs(1);
                    self.read_loop(read).await;
                }
                Err(e) => {
                    error!(error = %e, "gateway reconnection attempt failed");
                    attempts += 1;
                    if attempts >= MAX_RETRIES {
                        error!("maximum gateway reconnection attempts reached, giving up");
                        self.set_state(ConnectionState::Disconnected).await;
                        return;
                    }
                    delay = std::cmp::min(delay * 2, MAX_BACKOFF);
                }
            }
        }
    }

    /// Read frames until the socket closes or errors, dispatching each event
    /// before reading the next.
    async fn read_loop(&self, mut read: SplitStream<WsStream>) {
        while let Some(frame) = read.next().await {
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(error = %e, "gateway read error");
                    break;
                }
            };

            let event = match frame {
                WsMessage::Text(txt) => serde_json::from_str::<ServerToClientEvent>(&txt)
                    .map_err(|e| warn!(error = %e, raw = %txt, "failed to decode gateway event")),
                WsMessage::Binary(bin) => rmp_serde::from_slice::<ServerToClientEvent>(&bin)
                    .map_err(|e| warn!(error = %e, "failed to decode MsgPack gateway event")),
                WsMessage::Close(cf) => {
                    info!(frame = ?cf, "gateway close frame received");
                    break;
                }
                WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => continue,
            };

            if let Ok(event) = event {
                self.handle_event(event).await;
            }
        }

        *self.ws_tx.lock().await = None;
    }

    pub async fn connection_state(&self) -> ConnectionState {
        *self.connection_state.lock().await
    }

    async fn set_state(&self, state: ConnectionState) {
        *self.connection_state.lock().await = state;
    }

    /// Dispatch one event, unwrapping `Bulk` recursively.
    #[async_recursion]
    async fn handle_event(&self, event: ServerToClientEvent) {
        if let ServerToClientEvent::Bulk { v } = event {
            for sub_event in v {
                self.handle_event(sub_event).await;
            }
            return;
        }

        let handler = self.event_handler.lock().await.clone();
        let Some(handler) = handler else {
            return;
        };

        handler.on_event(self, &event).await;

        match event {
            ServerToClientEvent::Error { error } => {
                handler.on_error_event(self, &error).await;
            }
            ServerToClientEvent::Authenticated => {
                handler.on_authenticated(self).await;
            }
            ServerToClientEvent::Ready {
                users,
                servers,
                channels,
            } => {
                let ready = ReadyEvent {
                    users,
                    servers,
                    channels,
                };
                handler.on_ready(self, &ready).await;
            }
            ServerToClientEvent::Message {
                id,
                channel,
                author,
                content,
                extra,
            } => {
                let mut payload = extra;
                if !payload.is_object() {
                    payload = serde_json::json!({});
                }
                if let Some(obj) = payload.as_object_mut() {
                    obj.insert("_id".into(), id.into());
                    obj.insert("channel".into(), channel.into());
                    obj.insert("author".into(), author.into());
                    obj.insert("content".into(), content.into());
                }

                match serde_json::from_value::<RevoltMessage>(payload) {
                    Ok(message) => handler.on_message(self, &message).await,
                    Err(e) => warn!(error = %e, "could not parse gateway message"),
                }
            }
            _ => {}
        }
    }

    /// Send an `Authenticate` event with the given token.
    pub async fn send_authenticate(&self, token: &str) -> Result<(), RevoltError> {
        self.send_ws(ClientToServerEvent::Authenticate {
            token: token.to_string(),
        })
        .await
    }

    /// Send a Ping to the server. If `data` is None, defaults to 0.
    pub async fn ping(&self, data: Option<i64>) -> Result<(), RevoltError> {
        self.send_ws(ClientToServerEvent::Ping {
            data: data.unwrap_or(0),
        })
        .await
    }

    async fn send_ws(&self, payload: ClientToServerEvent) -> Result<(), RevoltError> {
        let mut guard = self.ws_tx.lock().await;
        let Some(writer) = guard.as_mut() else {
            return Err(RevoltError::Gateway("WebSocket not connected".into()));
        };

        let text = serde_json::to_string(&payload)?;
        writer
            .send(WsMessage::Text(text.into()))
            .await
            .map_err(|e| RevoltError::Gateway(format!("failed to send frame: {e}")))
    }

    /// Close the gateway without triggering a reconnect.
    pub async fn close_ws(&self, reason: Option<&str>) -> Result<(), RevoltError> {
        self.set_state(ConnectionState::Closing).await;

        let mut guard = self.ws_tx.lock().await;
        if let Some(writer) = guard.as_mut() {
            let frame = CloseFrame {
                code: CloseCode::Normal,
                reason: reason.unwrap_or("Closing").into(),
            };
            writer
                .send(WsMessage::Close(Some(frame)))
                .await
                .map_err(|e| RevoltError::Gateway(format!("error sending close frame: {e}")))?;
        }
        *guard = None;
        Ok(())
    }
}
