//! Transport Layer
//!
//! Everything between the session state machine and the network:
//! - [`Connector`]: opens one connection and returns a [`Link`]
//! - [`WebSocketConnector`]: the real backend connection (feature `websocket`)
//! - [`InProcessConnector`]: channel-backed connection for embedding and tests
//! - [`ConnectionManager`]: lifecycle, fixed-delay reconnection, teardown
//!
//! # Failure Model
//!
//! Transport failures never reach the conversation state as errors. A failed
//! connect, a peer close and a read/write error all land in `Closed`, which
//! schedules the next attempt. The session only sees the state transitions.

pub mod config;
pub mod in_process;
pub mod manager;
pub mod traits;
#[cfg(feature = "websocket")]
pub mod websocket;

// Re-exports for convenience
pub use config::{TransportConfig, DEFAULT_BASE_URL, DEFAULT_RECONNECT_DELAY_MS};
pub use in_process::{BackendPeer, InProcessBackend, InProcessConnector};
pub use manager::{ConnectionEvent, ConnectionHandle, ConnectionManager, ConnectionState};
pub use traits::{Connector, FrameSink, FrameStream, Link, TransportError};

#[cfg(feature = "websocket")]
pub use websocket::WebSocketConnector;
