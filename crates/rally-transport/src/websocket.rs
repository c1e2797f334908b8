//! WebSocket transport implementation using `tokio-tungstenite`.

use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request, Response,
};

use crate::{Connection, ConnectionId, Transport, TransportError};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = WebSocketStream<TcpStream>;

/// Name of the cookie and query parameter carrying the player's JWT.
const TOKEN_KEY: &str = "token";

/// A WebSocket [`Transport`] listening on a TCP socket.
pub struct WebSocketTransport {
    listener: TcpListener,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self { listener })
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        let mut token = None;
        let ws = tokio_tungstenite::accept_hdr_async(
            stream,
            |req: &Request,
             resp: Response|
             -> Result<Response, ErrorResponse> {
                let cookie = req
                    .headers()
                    .get("cookie")
                    .and_then(|value| value.to_str().ok());
                token = token_from_request_parts(req.uri().query(), cookie);
                Ok(resp)
            },
        )
        .await
        .map_err(|e| {
            TransportError::AcceptFailed(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                e,
            ))
        })?;

        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::debug!(%id, %addr, has_token = token.is_some(), "accepted WebSocket connection");

        let (sink, stream) = ws.split();
        Ok(WebSocketConnection {
            id,
            token,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        })
    }

    fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }
}

/// Extracts the auth token from the upgrade request.
///
/// The query string wins over the cookie so tools that cannot set cookies
/// can still authenticate.
pub fn token_from_request_parts(
    query: Option<&str>,
    cookie: Option<&str>,
) -> Option<String> {
    let from_query = query.and_then(|q| find_pair(q, '&'));
    from_query
        .or_else(|| cookie.and_then(|c| find_pair(c, ';')))
        .filter(|token| !token.is_empty())
}

fn find_pair(input: &str, separator: char) -> Option<String> {
    input.split(separator).find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == TOKEN_KEY).then(|| value.to_string())
    })
}

/// A single WebSocket connection.
///
/// Reading and writing use separate halves so a pending `recv` never blocks
/// the writer task.
pub struct WebSocketConnection {
    id: ConnectionId,
    token: Option<String>,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        let msg = match std::str::from_utf8(data) {
            Ok(text) => Message::Text(text.to_owned().into()),
            Err(_) => Message::Binary(data.to_vec().into()),
        };
        self.sink.lock().await.send(msg).await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(data.into()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        std::io::Error::new(
                            std::io::ErrorKind::ConnectionReset,
                            e,
                        ),
                    ));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.sink.lock().await.close().await.map_err(|e| {
            TransportError::ConnectionClosed(e.to_string())
        })
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn auth_token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_from_query() {
        let token = token_from_request_parts(Some("foo=1&token=abc"), None);
        assert_eq!(token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_token_from_cookie() {
        let token =
            token_from_request_parts(None, Some("theme=dark; token=jwt.value"));
        assert_eq!(token.as_deref(), Some("jwt.value"));
    }

    #[test]
    fn test_token_query_wins_over_cookie() {
        let token =
            token_from_request_parts(Some("token=q"), Some("token=c"));
        assert_eq!(token.as_deref(), Some("q"));
    }

    #[test]
    fn test_token_missing_or_empty_is_none() {
        assert_eq!(token_from_request_parts(Some("x=1"), None), None);
        assert_eq!(token_from_request_parts(Some("token="), None), None);
        assert_eq!(token_from_request_parts(None, None), None);
    }
}
