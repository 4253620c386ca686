//! Revolt HTTP-and-WebSocket client.
//!
//! An optional HTTP proxy is used for both REST calls and the gateway
//! socket. Accepted formats:
//! * `http://USERNAME:PASSWORD@IP:PORT`
//! * `http://IP:PORT`

use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::SplitSink;
use reqwest::{Client, ClientBuilder, Method, Proxy, Response};
use tokio::{net::TcpStream, sync::Mutex};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tungstenite::protocol::Message as WsMessage;

use crate::error::RevoltError;
use crate::websocket::event_handler::EventHandler;
use crate::websocket::gateway::ConnectionState;

pub(crate) type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, WsMessage>;

const USER_AGENT: &str = concat!("revolt_api/", env!("CARGO_PKG_VERSION"));
pub(crate) const DEFAULT_WS_URL: &str = "wss://ws.revolt.chat/";

/// Bot account token, sent as `X-Bot-Token`.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn bot(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub(crate) fn header(&self) -> (&'static str, &str) {
        ("X-Bot-Token", &self.0)
    }

    pub(crate) fn secret(&self) -> &str {
        &self.0
    }
}

impl Debug for AuthToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

/// Main client to interact with the Revolt API.
#[derive(Clone)]
pub struct RevoltClient {
    pub base_url: String,
    pub ws_url: Option<String>,
    /// Optional HTTP proxy; `http://` is assumed when no scheme is given.
    pub proxy: Option<String>,

    pub(crate) http: Client,
    pub(crate) token: Arc<Mutex<Option<AuthToken>>>,
    pub(crate) ws_tx: Arc<Mutex<Option<WsSink>>>,
    pub(crate) event_handler: Arc<Mutex<Option<Arc<dyn EventHandler>>>>,
    pub(crate) connection_state: Arc<Mutex<ConnectionState>>,
}

impl Debug for RevoltClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("RevoltClient")
            .field("base_url", &self.base_url)
            .field("ws_url", &self.ws_url)
            .field("proxy", &self.proxy)
            .field("connection_state", &self.connection_state)
            .finish_non_exhaustive()
    }
}

/// Prefix `http://` onto a proxy address that has no scheme.
pub(crate) fn normalize_proxy(raw: &str) -> String {
    if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    }
}

impl RevoltClient {
    /// Construct a new [`RevoltClient`].
    ///
    /// * `base_url` – REST endpoint (e.g. `https://api.revolt.chat`).
    /// * `ws_url` – gateway endpoint; `None` means `wss://ws.revolt.chat/`.
    /// * `proxy` – optional proxy URL in one of the formats listed above.
    pub fn new(
        base_url: String,
        ws_url: Option<String>,
        proxy: Option<String>,
    ) -> Result<Self, RevoltError> {
        let mut builder = ClientBuilder::new()
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(Duration::from_secs(30))
            .use_rustls_tls();

        if let Some(p) = &proxy {
            let full = normalize_proxy(p);
            let req_proxy = Proxy::all(&full)
                .map_err(|e| RevoltError::Config(format!("invalid proxy URL `{full}`: {e}")))?;
            builder = builder.proxy(req_proxy);
        }

        let http = builder.build()?;

        Ok(Self {
            base_url,
            ws_url,
            proxy,
            http,
            token: Arc::new(Mutex::new(None)),
            ws_tx: Arc::new(Mutex::new(None)),
            event_handler: Arc::new(Mutex::new(None)),
            connection_state: Arc::new(Mutex::new(ConnectionState::Disconnected)),
        })
    }

    /// Set or clear the credentials used for REST and the gateway.
    pub async fn set_token(&self, token: Option<AuthToken>) {
        *self.token.lock().await = token;
    }

    async fn authed_request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        let token = self.token.lock().await.clone();

        let mut req = self
            .http
            .request(method, url)
            .header("Accept", "application/json");

        if let Some(token) = &token {
            let (name, value) = token.header();
            req = req.header(name, value);
        }
        req
    }

    pub async fn authed_get(&self, url: &str) -> Result<Response, RevoltError> {
        Ok(self.authed_request(Method::GET, url).await.send().await?)
    }

    pub async fn authed_post<T: serde::Serialize>(
        &self,
        url: &str,
        body: &T,
        extra_headers: &[(&str, &str)],
    ) -> Result<Response, RevoltError> {
        let mut req = self.authed_request(Method::POST, url).await.json(body);
        for (k, v) in extra_headers {
            req = req.header(*k, *v);
        }
        Ok(req.send().await?)
    }
}

/// Parse the body as JSON **iff** the response status is success.
pub async fn parse_json_if_ok<T: serde::de::DeserializeOwned>(
    resp: Response,
) -> Result<T, RevoltError> {
    let status = resp.status();
    let bytes = resp.bytes().await?;

    if !status.is_success() {
        if let Ok(api_err) = serde_json::from_slice::<crate::types::ApiError>(&bytes) {
            return Err(RevoltError::ApiError(api_err));
        }
        return Err(RevoltError::HttpStatus {
            code: status.as_u16(),
            body: String::from_utf8_lossy(&bytes).to_string(),
        });
    }

    Ok(serde_json::from_slice::<T>(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_debug_is_redacted() {
        let token = AuthToken::bot("super-secret");
        let shown = format!("{token:?}");
        assert!(!shown.contains("super-secret"));
        assert_eq!(token.header(), ("X-Bot-Token", "super-secret"));
    }

    #[test]
    fn proxy_without_scheme_gets_http() {
        assert_eq!(normalize_proxy("10.0.0.1:8080"), "http://10.0.0.1:8080");
        assert_eq!(normalize_proxy("https://p:1"), "https://p:1");
    }

    #[test]
    fn bad_proxy_is_a_config_error() {
        let err = RevoltClient::new("https://api".into(), None, Some("http://[::".into()))
            .unwrap_err();
        assert!(matches!(err, RevoltError::Config(_)));
    }
}
