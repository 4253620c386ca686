//! Gateway transport: TCP (optionally through an HTTP `CONNECT` proxy),
//! TLS via rustls, and a hand-written WebSocket upgrade.
//!
//! Response heads are read one byte at a time so no bytes belonging to the
//! first WebSocket frame are swallowed by a buffered reader.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use http::Uri;
use sha1::{Digest, Sha1};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
};
use rustls::{pki_types::ServerName, ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tungstenite::{handshake::client::generate_key, protocol::Role};
use url::Url;

use crate::{client::normalize_proxy, error::RevoltError};

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";
const MAX_HEAD_BYTES: usize = 16 * 1024;

fn gw_err(msg: impl Into<String>) -> RevoltError {
    RevoltError::Gateway(msg.into())
}

#[derive(Debug, PartialEq, Eq)]
struct Target {
    tls: bool,
    host: String,
    port: u16,
    authority: String,
    path: String,
}

impl Target {
    fn parse(ws_url: &str) -> Result<Self, RevoltError> {
        let uri: Uri = ws_url
            .parse()
            .map_err(|e| gw_err(format!("invalid WebSocket URL: {e}")))?;

        let tls = match uri.scheme_str() {
            Some("ws") => false,
            Some("wss") => true,
            Some(other) => return Err(gw_err(format!("unsupported WebSocket scheme: {other}"))),
            None => return Err(gw_err("WebSocket URL missing scheme")),
        };
        let host = uri
            .host()
            .ok_or_else(|| gw_err("WebSocket URL missing host"))?
            .to_string();
        let port = uri.port_u16().unwrap_or(if tls { 443 } else { 80 });
        let authority = uri
            .authority()
            .map_or_else(|| host.clone(), |a| a.as_str().to_string());
        let path = uri
            .path_and_query()
            .map_or("/", |pq| pq.as_str())
            .to_string();

        Ok(Self {
            tls,
            host,
            port,
            authority,
            path,
        })
    }
}

/// Open a WebSocket connection to `ws_url`, through `proxy` when given.
pub(crate) async fn connect(ws_url: &str, proxy: Option<&str>) -> Result<WsStream, RevoltError> {
    let target = Target::parse(ws_url)?;

    let tcp = match proxy {
        Some(raw) => tunnel(raw, &target).await?,
        None => {
            let addr = format!("{}:{}", target.host, target.port);
            TcpStream::connect(&addr)
                .await
                .map_err(|e| gw_err(format!("failed to connect TCP to {addr}: {e}")))?
        }
    };

    let stream = secure(tcp, &target).await?;
    upgrade(stream, &target).await
}

/// Establish a `CONNECT` tunnel to the target through an HTTP proxy.
async fn tunnel(proxy_raw: &str, target: &Target) -> Result<TcpStream, RevoltError> {
    let proxy_url =
        Url::parse(&normalize_proxy(proxy_raw)).map_err(|e| gw_err(format!("invalid proxy URL: {e}")))?;
    let proxy_host = proxy_url
        .host_str()
        .ok_or_else(|| gw_err("proxy URL missing host"))?;
    let proxy_port = proxy_url
        .port_or_known_default()
        .ok_or_else(|| gw_err("proxy URL missing port"))?;

    let proxy_addr = format!("{proxy_host}:{proxy_port}");
    let mut stream = TcpStream::connect(&proxy_addr)
        .await
        .map_err(|e| gw_err(format!("failed to connect to proxy {proxy_addr}: {e}")))?;

    let connect_target = format!("{}:{}", target.host, target.port);
    let mut request = format!("CONNECT {connect_target} HTTP/1.1\r\nHost: {connect_target}\r\n");
    if let Some(pass) = proxy_url.password() {
        let creds = BASE64_STANDARD.encode(format!("{}:{pass}", proxy_url.username()));
        request.push_str(&format!("Proxy-Authorization: Basic {creds}\r\n"));
    }
    request.push_str("Proxy-Connection: Keep-Alive\r\n\r\n");

    stream
        .write_all(request.as_bytes())
        .await
        .map_err(|e| gw_err(format!("failed to send CONNECT: {e}")))?;

    let head = read_head(&mut stream).await?;
    let status = head.first().map(String::as_str).unwrap_or_default();
    if !(status.starts_with("HTTP/1.1 200") || status.starts_with("HTTP/1.0 200")) {
        return Err(gw_err(format!("proxy tunnel failed: {status}")));
    }
    Ok(stream)
}

/// Wrap the TCP stream in TLS when the target scheme is `wss`.
async fn secure(tcp: TcpStream, target: &Target) -> Result<MaybeTlsStream<TcpStream>, RevoltError> {
    if !target.tls {
        return Ok(MaybeTlsStream::Plain(tcp));
    }

    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();

    let server_name = ServerName::try_from(target.host.clone())
        .map_err(|e| gw_err(format!("invalid DNS name '{}': {e}", target.host)))?;

    let tls = TlsConnector::from(Arc::new(config))
        .connect(server_name, tcp)
        .await
        .map_err(|e| gw_err(format!("TLS handshake to {} failed: {e}", target.host)))?;
    Ok(MaybeTlsStream::Rustls(tls))
}

/// Perform the HTTP/1.1 upgrade and hand the socket to tungstenite.
async fn upgrade(
    mut stream: MaybeTlsStream<TcpStream>,
    target: &Target,
) -> Result<WsStream, RevoltError> {
    let key = generate_key();
    let request = format!(
        "GET {path} HTTP/1.1\r\n\
         Host: {authority}\r\n\
         User-Agent: revolt_api\r\n\
         Connection: Upgrade\r\n\
         Upgrade: websocket\r\n\
         Sec-WebSocket-Version: 13\r\n\
         Sec-WebSocket-Key: {key}\r\n\r\n",
        path = target.path,
        authority = target.authority,
    );

    stream
        .write_all(request.as_bytes())
        .await
        .map_err(|e| gw_err(format!("handshake send error: {e}")))?;
    stream
        .flush()
        .await
        .map_err(|e| gw_err(format!("handshake flush error: {e}")))?;

    let head = read_head(&mut stream).await?;
    validate_upgrade(&head, &key)?;

    Ok(WebSocketStream::from_raw_socket(stream, Role::Client, None).await)
}

fn accept_key(key: &str) -> String {
    let mut sha1 = Sha1::new();
    sha1.update(key.as_bytes());
    sha1.update(WS_GUID.as_bytes());
    BASE64_STANDARD.encode(sha1.finalize())
}

fn validate_upgrade(head: &[String], key: &str) -> Result<(), RevoltError> {
    let Some((status, headers)) = head.split_first() else {
        return Err(gw_err("empty handshake response"));
    };
    if !status.starts_with("HTTP/1.1 101") {
        return Err(gw_err(format!("unexpected handshake status: {status}")));
    }

    let expected = accept_key(key);
    let (mut upgrade, mut connection, mut accept) = (false, false, false);
    for line in headers {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match name.trim().to_ascii_lowercase().as_str() {
            "upgrade" => upgrade = value.eq_ignore_ascii_case("websocket"),
            "connection" => {
                connection = value
                    .split(',')
                    .any(|v| v.trim().eq_ignore_ascii_case("upgrade"));
            }
            "sec-websocket-accept" => accept = value == expected,
            _ => {}
        }
    }

    if upgrade && connection && accept {
        Ok(())
    } else {
        Err(gw_err("malformed WebSocket handshake response"))
    }
}

/// Read an HTTP response head (status line + headers) without reading past
/// the blank line that terminates it.
async fn read_head<S: AsyncRead + AsyncWrite + Unpin>(
    stream: &mut S,
) -> Result<Vec<String>, RevoltError> {
    let mut raw = Vec::with_capacity(512);
    let mut byte = [0u8; 1];
    while !raw.ends_with(b"\r\n\r\n") {
        let n = stream
            .read(&mut byte)
            .await
            .map_err(|e| gw_err(format!("handshake read error: {e}")))?;
        if n == 0 {
            return Err(gw_err("connection closed during handshake"));
        }
        raw.push(byte[0]);
        if raw.len() > MAX_HEAD_BYTES {
            return Err(gw_err("handshake response head too large"));
        }
    }

    Ok(String::from_utf8_lossy(&raw)
        .split("\r\n")
        .filter(|l| !l.is_empty())
        .map(str::to_owned)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_default_ports() {
        let t = Target::parse("wss://ws.revolt.chat/").unwrap();
        assert!(t.tls);
        assert_eq!(t.port, 443);
        assert_eq!(t.path, "/");

        let t = Target::parse("ws://localhost:9000/events?version=1").unwrap();
        assert!(!t.tls);
        assert_eq!(t.port, 9000);
        assert_eq!(t.authority, "localhost:9000");
        assert_eq!(t.path, "/events?version=1");
    }

    #[test]
    fn rejects_http_scheme() {
        assert!(Target::parse("https://example.com").is_err());
    }

    #[test]
    fn accept_key_matches_rfc_example() {
        // RFC 6455 section 1.3.
        assert_eq!(
            accept_key("dGhlIHNhbXBsZSBub25jZQ=="),
            "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
        );
    }

    #[test]
    fn validates_upgrade_headers() {
        let key = "dGhlIHNhbXBsZSBub25jZQ==";
        let good = vec![
            "HTTP/1.1 101 Switching Protocols".to_string(),
            "Upgrade: websocket".to_string(),
            "Connection: keep-alive, Upgrade".to_string(),
            "Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=".to_string(),
        ];
        assert!(validate_upgrade(&good, key).is_ok());

        let mut bad = good.clone();
        bad[3] = "Sec-WebSocket-Accept: nope".to_string();
        assert!(validate_upgrade(&bad, key).is_err());
    }

    #[tokio::test]
    async fn read_head_stops_at_blank_line() {
        let (mut client, mut server) = tokio::io::duplex(256);
        server
            .write_all(b"HTTP/1.1 200 OK\r\nX-A: 1\r\n\r\nFRAME")
            .await
            .unwrap();
        let head = read_head(&mut client).await.unwrap();
        assert_eq!(head, vec!["HTTP/1.1 200 OK", "X-A: 1"]);

        let mut rest = [0u8; 5];
        client.read_exact(&mut rest).await.unwrap();
        assert_eq!(&rest, b"FRAME");
    }
}
