//! WebSocket Transport
//!
//! Client side of the backend's chat socket, built on `tokio-tungstenite`.
//! Only text frames reach the codec: binary frames are accepted when they
//! hold UTF-8, control frames are handled by tungstenite and filtered out.

use async_trait::async_trait;
use futures::{future, SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message as WsMessage;

use super::traits::{Connector, Link, TransportError};

/// Opens WebSocket connections with `connect_async`
#[derive(Clone, Copy, Debug, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    /// Create a new connector
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<Link, TransportError> {
        let (ws_stream, response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| TransportError::ConnectionFailed(format!("{url}: {e}")))?;

        tracing::debug!(status = %response.status(), "WebSocket handshake complete");

        let (write, read) = ws_stream.split();

        let sink = write
            .sink_map_err(|e| TransportError::SendFailed(e.to_string()))
            .with(|text: String| future::ready(Ok::<_, TransportError>(WsMessage::Text(text))));

        let stream = read.filter_map(|item| {
            future::ready(match item {
                Ok(WsMessage::Text(text)) => Some(Ok(text)),
                Ok(WsMessage::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => Some(Ok(text)),
                    Err(_) => {
                        tracing::warn!("Dropping non UTF-8 binary frame");
                        None
                    }
                },
                Ok(WsMessage::Close(frame)) => {
                    tracing::debug!(frame = ?frame, "Close frame received");
                    None
                }
                // Ping/pong are answered by tungstenite itself
                Ok(_) => None,
                Err(e) => Some(Err(TransportError::ReceiveFailed(e.to_string()))),
            })
        });

        Ok(Link::new(sink, stream))
    }
}
