//! Transport Configuration
//!
//! Where to connect and how the connection manager behaves between
//! connections.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::identity::SessionId;
use crate::protocol::MAX_FRAME_SIZE;

/// Default chat endpoint base; the session ID is appended as the last segment
pub const DEFAULT_BASE_URL: &str = "ws://localhost:8000/ws/chat";

/// Fixed delay between a close and the next connect attempt
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 3000;

/// Transport configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// WebSocket base URL (`ws://` or `wss://`), without the session segment
    pub base_url: String,

    /// Delay between entering `Closed` and the next connect attempt
    ///
    /// Fixed: it does not grow and there is no attempt limit.
    pub reconnect_delay_ms: u64,

    /// How long a single connect attempt may take before it counts as failed
    pub connect_timeout_ms: u64,

    /// Largest inbound frame accepted by the codec, in bytes
    pub max_frame_size: usize,

    /// Capacity of the channel carrying connection events to the session
    pub channel_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            connect_timeout_ms: 10_000,
            max_frame_size: MAX_FRAME_SIZE,
            channel_capacity: 100,
        }
    }
}

impl TransportConfig {
    /// Full endpoint for a session: `<base>/<session id>`
    #[must_use]
    pub fn endpoint_url(&self, session_id: &SessionId) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), session_id)
    }

    /// Reconnect delay as a `Duration`
    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Connect timeout as a `Duration`
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
