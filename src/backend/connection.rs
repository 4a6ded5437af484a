//! WebSocket transport setup and frame decoding.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use crate::error::TransportError;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Upper bound on TCP connect, TLS and the WebSocket handshake together.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// What one inbound WebSocket message means to the client.
#[derive(Debug, PartialEq, Eq)]
pub enum Inbound {
    /// Protocol text (binary frames decoded lossily)
    Text(String),
    /// Peer closed, with its close code if it sent one
    Closed(Option<u16>),
    /// Control frame handled by tungstenite
    Ignored,
}

/// Open a WebSocket to `endpoint`, offering `subprotocols`.
pub async fn establish_connection(
    endpoint: &str,
    subprotocols: &[String],
) -> Result<WsStream, TransportError> {
    let mut request =
        endpoint
            .into_client_request()
            .map_err(|e| TransportError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;

    if !subprotocols.is_empty() {
        let offered = HeaderValue::from_str(&subprotocols.join(", ")).map_err(|e| {
            TransportError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            }
        })?;
        request
            .headers_mut()
            .insert("Sec-WebSocket-Protocol", offered);
    }

    let (stream, response) = timeout(CONNECT_TIMEOUT, connect_async(request))
        .await
        .map_err(|_| TransportError::Timeout)??;

    let negotiated = response
        .headers()
        .get("Sec-WebSocket-Protocol")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("none");
    info!(%endpoint, subprotocol = %negotiated, "WebSocket connected");
    Ok(stream)
}

/// Map a received message onto what the client core consumes.
pub fn decode_message(message: Message) -> Inbound {
    match message {
        Message::Text(text) => Inbound::Text(text),
        Message::Binary(bytes) => Inbound::Text(String::from_utf8_lossy(&bytes).into_owned()),
        Message::Close(frame) => {
            let code = frame.map(|f| u16::from(f.code));
            debug!(?code, "Close frame received");
            Inbound::Closed(code)
        }
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => Inbound::Ignored,
    }
}
