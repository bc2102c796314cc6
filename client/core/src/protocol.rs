//! Frame Codec
//!
//! Wire format between the client and the chat backend. Every WebSocket text
//! frame carries exactly one JSON object.
//!
//! # Outbound
//!
//! ```text
//! { "content": "<trimmed user text>" }
//! ```
//!
//! # Inbound
//!
//! A `type` discriminant selects one of seven events:
//!
//! | type             | payload              |
//! |------------------|----------------------|
//! | `message`        | `content: string`    |
//! | `thinking_start` | -                    |
//! | `tool_start`     | `message: string`    |
//! | `tool_end`       | -                    |
//! | `experiences`    | `data: Experience[]` |
//! | `done`           | -                    |
//! | `error`          | `message: string`    |
//!
//! Anything else decodes to a [`DecodeError`]. Decoding never panics; the
//! caller logs the error and drops the frame.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::experience::Experience;

/// Maximum inbound frame size (10 MB)
///
/// Larger frames are rejected before JSON parsing.
pub const MAX_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Discriminants the client understands
const KNOWN_TYPES: [&str; 7] = [
    "message",
    "thinking_start",
    "tool_start",
    "tool_end",
    "experiences",
    "done",
    "error",
];

/// Errors produced while decoding an inbound frame
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Frame exceeds the configured size limit
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge {
        /// Actual size in bytes
        size: usize,
        /// Configured limit
        max: usize,
    },

    /// Frame is not valid JSON
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    /// Frame is JSON but not an object
    #[error("Frame is not a JSON object")]
    NotAnObject,

    /// Object has no string `type` field
    #[error("Frame has no type discriminant")]
    MissingType,

    /// `type` names an event outside the protocol
    #[error("Unrecognized event type: {0}")]
    UnknownType(String),

    /// Known `type` but the payload is missing or malformed
    #[error("Invalid {kind} payload: {reason}")]
    InvalidPayload {
        /// Event type being decoded
        kind: String,
        /// What was wrong
        reason: String,
    },
}

/// Outbound frame carrying one user turn
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundFrame {
    content: String,
}

impl OutboundFrame {
    /// The text sent to the backend
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Serialize to the JSON text sent over the wire
    ///
    /// # Errors
    ///
    /// Returns the serializer error; in practice a string field always
    /// serializes.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Encode a user turn
///
/// Total: any input is accepted and trimmed. Callers skip blank text before
/// getting here.
#[must_use]
pub fn encode_user_turn(text: &str) -> OutboundFrame {
    OutboundFrame {
        content: text.trim().to_string(),
    }
}

/// Inbound events from the backend
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    /// Finalized assistant text for the current turn
    Message {
        /// The assistant's reply
        content: String,
    },

    /// Backend started reasoning
    ThinkingStart,

    /// Backend started a tool operation
    ToolStart {
        /// Human-readable status line
        message: String,
        /// Tool name, when the backend provides it
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool: Option<String>,
    },

    /// The tool operation finished
    ToolEnd {
        /// Tool name, when the backend provides it
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool: Option<String>,
    },

    /// Side-channel experience set for the current turn
    Experiences {
        /// The full set; replaces any previous one
        data: Vec<Experience>,
    },

    /// Turn complete
    Done,

    /// Backend failure for the current turn
    Error {
        /// Failure description
        message: String,
    },
}

impl InboundEvent {
    /// Wire discriminant, for logging
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Message { .. } => "message",
            Self::ThinkingStart => "thinking_start",
            Self::ToolStart { .. } => "tool_start",
            Self::ToolEnd { .. } => "tool_end",
            Self::Experiences { .. } => "experiences",
            Self::Done => "done",
            Self::Error { .. } => "error",
        }
    }
}

/// Decode an inbound frame with the default size limit
///
/// # Errors
///
/// See [`DecodeError`].
pub fn decode(raw: &str) -> Result<InboundEvent, DecodeError> {
    decode_with_limit(raw, MAX_FRAME_SIZE)
}

/// Decode an inbound frame, rejecting frames larger than `max_size` bytes
///
/// # Errors
///
/// See [`DecodeError`].
pub fn decode_with_limit(raw: &str, max_size: usize) -> Result<InboundEvent, DecodeError> {
    if raw.len() > max_size {
        return Err(DecodeError::FrameTooLarge {
            size: raw.len(),
            max: max_size,
        });
    }

    let value: Value =
        serde_json::from_str(raw).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;

    let kind = match &value {
        Value::Object(map) => match map.get("type") {
            Some(Value::String(kind)) => kind.clone(),
            _ => return Err(DecodeError::MissingType),
        },
        _ => return Err(DecodeError::NotAnObject),
    };

    if !KNOWN_TYPES.contains(&kind.as_str()) {
        return Err(DecodeError::UnknownType(kind));
    }

    let event: InboundEvent =
        serde_json::from_value(value).map_err(|e| DecodeError::InvalidPayload {
            kind: kind.clone(),
            reason: e.to_string(),
        })?;

    if let InboundEvent::Experiences { data } = &event {
        for experience in data {
            if let Err(reason) = experience.validate() {
                tracing::warn!(
                    id = %experience.id,
                    %reason,
                    "Experience has no usable location"
                );
            }
        }
    }

    Ok(event)
}
