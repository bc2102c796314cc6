//! Transport Traits
//!
//! A [`Connector`] opens one connection to the backend and hands back a
//! [`Link`]: a sink for outbound text frames and a stream of inbound ones.
//! The connection manager only ever talks to this seam, so the WebSocket
//! and in-process transports are interchangeable.

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Sink, Stream};
use thiserror::Error;

/// Errors that can occur during transport operations
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection to the backend failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Connect attempt did not finish in time
    #[error("Connect timed out after {0} ms")]
    ConnectTimeout(u64),

    /// Failed to send a frame
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Failed to receive a frame
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// Frame serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Transport not in expected state
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Outbound half of a connection
pub type FrameSink = Pin<Box<dyn Sink<String, Error = TransportError> + Send>>;

/// Inbound half of a connection; ends when the peer closes
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, TransportError>> + Send>>;

/// An established connection, split into its two directions
pub struct Link {
    /// Text frames to the backend
    pub sink: FrameSink,
    /// Text frames from the backend
    pub stream: FrameStream,
}

impl Link {
    /// Build a link from any sink/stream pair
    pub fn new<S, R>(sink: S, stream: R) -> Self
    where
        S: Sink<String, Error = TransportError> + Send + 'static,
        R: Stream<Item = Result<String, TransportError>> + Send + 'static,
    {
        Self {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        }
    }
}

/// Opens connections to the backend
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Open one connection to `url`
    async fn connect(&self, url: &str) -> Result<Link, TransportError>;
}
