//! Conversation Messages
//!
//! One [`Message`] per turn side: the user's text, or the assistant's
//! finalized reply with the experiences that arrived for it. Messages are
//! built by the session state machine and never change once appended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::experience::Experience;

/// Message identifier, unique within the process
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generate a new unique message ID
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        Self(format!("msg_{id}"))
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

/// Who authored a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Typed by the user
    User,
    /// Finalized by the backend assistant
    Assistant,
}

/// A finalized conversation message
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    role: MessageRole,
    content: String,
    attached_experiences: Vec<Experience>,
    created_at: DateTime<Utc>,
}

impl Message {
    /// A user-authored message; never carries experiences
    pub(crate) fn user(content: String) -> Self {
        Self {
            id: MessageId::new(),
            role: MessageRole::User,
            content,
            attached_experiences: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// An assistant message with the experiences collected for its turn
    pub(crate) fn assistant(content: String, experiences: Vec<Experience>) -> Self {
        Self {
            id: MessageId::new(),
            role: MessageRole::Assistant,
            content,
            attached_experiences: experiences,
            created_at: Utc::now(),
        }
    }

    /// Unique message ID
    #[must_use]
    pub fn id(&self) -> &MessageId {
        &self.id
    }

    /// Author
    #[must_use]
    pub fn role(&self) -> MessageRole {
        self.role
    }

    /// Finalized text
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Experiences attached when the message was finalized
    #[must_use]
    pub fn attached_experiences(&self) -> &[Experience] {
        &self.attached_experiences
    }

    /// Creation time
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
