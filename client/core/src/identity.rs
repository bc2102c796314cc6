//! Session Identity
//!
//! The backend keys its conversation state by the last path segment of the
//! WebSocket URL. A client generates one [`SessionId`] when it starts and
//! keeps it until the process exits, so every reconnect lands on the same
//! backend conversation.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Opaque session identifier, stable for the lifetime of one client
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a new session ID
    ///
    /// Format: `session-<unix millis>-<8 hex chars>`. The random suffix keeps
    /// two clients started in the same millisecond apart.
    #[must_use]
    pub fn generate() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("session-{millis}-{}", &suffix[..8]))
    }

    /// Wrap an existing identifier (e.g. one supplied on the command line)
    #[must_use]
    pub fn from_existing(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as sent in the URL path
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
