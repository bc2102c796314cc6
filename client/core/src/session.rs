//! Session State Machine
//!
//! The authoritative conversation state for one client. Two entry points
//! mutate it: [`Session::send_user_turn`] for the user's intent and
//! [`Session::apply_event`] for everything the backend says. Both are
//! synchronous; the caller serializes them.
//!
//! # Turn Reassembly
//!
//! A backend turn arrives as independent frames:
//!
//! ```text
//! tool_start ─ experiences ─ tool_end ─ message ─ done
//! ```
//!
//! in whatever order the backend chooses. The one ordering rule is that an
//! `experiences` set seen before the next `message` is attached to that
//! message; a set arriving after it belongs to the following turn. The set
//! is also published immediately for the side view and stays published
//! until another set replaces it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::experience::Experience;
use crate::identity::SessionId;
use crate::messages::{Message, MessageId};
use crate::protocol::{encode_user_turn, InboundEvent, OutboundFrame};
use crate::transport::{ConnectionHandle, ConnectionState, TransportError};

/// Backend-reported failure for the current turn
///
/// Non-fatal: the session stays usable and earlier messages are kept.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Backend error: {message}")]
pub struct TurnError {
    /// Message from the backend's `error` event
    pub message: String,
}

/// The in-progress backend operation shown to the user
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolActivity {
    /// Status line ("Buscando experiencias...")
    pub message: String,
    /// Tool name, when the backend sent one
    pub tool: Option<String>,
}

/// Result of a send intent
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// Frame handed to the connection and user message appended
    Sent(MessageId),
    /// Text was empty after trimming; nothing happened
    IgnoredBlank,
    /// Connection not open; nothing happened
    IgnoredNotConnected,
}

impl SendOutcome {
    /// Whether the turn was actually sent
    #[must_use]
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent(_))
    }
}

/// What applying an event changed
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventEffect {
    /// Nothing visible changed
    Unchanged,
    /// Tool status set or cleared
    ToolStatusChanged,
    /// Published experience set replaced (new length)
    ExperiencesReplaced(usize),
    /// Assistant message appended
    MessageAppended(MessageId),
    /// Turn finished; input accepted again
    TurnCompleted,
    /// Backend failed the turn
    TurnFailed(TurnError),
}

/// Where finalized user frames go
///
/// Implemented by [`ConnectionHandle`]; tests substitute a recorder.
pub trait FrameSender {
    /// Whether a send can succeed right now
    fn is_open(&self) -> bool;

    /// Hand a frame to the transport
    ///
    /// # Errors
    ///
    /// Returns the transport's reason when the frame was not accepted.
    fn send(&self, frame: &OutboundFrame) -> Result<(), TransportError>;
}

impl FrameSender for ConnectionHandle {
    fn is_open(&self) -> bool {
        ConnectionHandle::is_open(self)
    }

    fn send(&self, frame: &OutboundFrame) -> Result<(), TransportError> {
        ConnectionHandle::send(self, frame)
    }
}

/// Published view of the session, handed to the presentation layer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Session identifier
    pub session_id: SessionId,
    /// Finalized messages, oldest first
    pub messages: Vec<Message>,
    /// Experience set currently shown in the side view
    pub experiences: Vec<Experience>,
    /// In-progress backend operation
    pub tool_status: Option<ToolActivity>,
    /// A turn is in flight; input should be withheld
    pub busy: bool,
    /// Connection is open
    pub connected: bool,
    /// Most recent backend failure, until the next turn is sent
    pub last_error: Option<TurnError>,
}

/// The conversation state machine
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    connection: ConnectionState,
    history: Vec<Message>,
    published_experiences: Vec<Experience>,
    pending_experiences: Vec<Experience>,
    tool_status: Option<ToolActivity>,
    busy: bool,
    last_error: Option<TurnError>,
}

impl Session {
    /// Create an empty session; the connection starts out `Connecting`
    #[must_use]
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            connection: ConnectionState::Connecting,
            history: Vec::new(),
            published_experiences: Vec::new(),
            pending_experiences: Vec::new(),
            tool_status: None,
            busy: false,
            last_error: None,
        }
    }

    /// Session identifier
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Message history, oldest first
    #[must_use]
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Experience set currently published
    #[must_use]
    pub fn experiences(&self) -> &[Experience] {
        &self.published_experiences
    }

    /// Current tool status
    #[must_use]
    pub fn tool_status(&self) -> Option<&ToolActivity> {
        self.tool_status.as_ref()
    }

    /// Whether a turn is in flight
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Connection state as last reported by the connection manager
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    /// Whether the connection is open
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.is_open()
    }

    /// Most recent backend failure
    #[must_use]
    pub fn last_error(&self) -> Option<&TurnError> {
        self.last_error.as_ref()
    }

    /// Record a connection state change; returns whether it changed
    pub fn set_connection_state(&mut self, state: ConnectionState) -> bool {
        let changed = self.connection != state;
        self.connection = state;
        changed
    }

    /// Send a user turn
    ///
    /// Blank text or a closed connection is a silent no-op. Otherwise the
    /// frame goes out first; only if the transport accepts it is the user
    /// message appended and the session marked busy. The published
    /// experience set is left alone.
    pub fn send_user_turn(&mut self, text: &str, sender: &impl FrameSender) -> SendOutcome {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return SendOutcome::IgnoredBlank;
        }

        if !self.connection.is_open() || !sender.is_open() {
            return SendOutcome::IgnoredNotConnected;
        }

        let frame = encode_user_turn(trimmed);
        if let Err(e) = sender.send(&frame) {
            tracing::debug!(error = %e, "User turn not sent");
            return SendOutcome::IgnoredNotConnected;
        }

        let message = Message::user(frame.content().to_string());
        let id = message.id().clone();
        self.history.push(message);
        self.busy = true;
        self.last_error = None;

        SendOutcome::Sent(id)
    }

    /// Apply one decoded backend event
    pub fn apply_event(&mut self, event: InboundEvent) -> EventEffect {
        match event {
            InboundEvent::ThinkingStart => EventEffect::Unchanged,

            InboundEvent::ToolStart { message, tool } => {
                self.tool_status = Some(ToolActivity { message, tool });
                EventEffect::ToolStatusChanged
            }

            InboundEvent::ToolEnd { .. } => {
                self.tool_status = None;
                EventEffect::ToolStatusChanged
            }

            InboundEvent::Experiences { data } => {
                let count = data.len();
                self.pending_experiences.clone_from(&data);
                self.published_experiences = data;
                EventEffect::ExperiencesReplaced(count)
            }

            InboundEvent::Message { content } => {
                let attached = std::mem::take(&mut self.pending_experiences);
                let message = Message::assistant(content, attached);
                let id = message.id().clone();
                self.history.push(message);
                EventEffect::MessageAppended(id)
            }

            InboundEvent::Done => {
                self.busy = false;
                EventEffect::TurnCompleted
            }

            InboundEvent::Error { message } => {
                self.busy = false;
                self.tool_status = None;
                let error = TurnError { message };
                self.last_error = Some(error.clone());
                EventEffect::TurnFailed(error)
            }
        }
    }

    /// Forget the conversation: history, published set and pending buffer
    ///
    /// Busy flag, tool status and connection state are untouched.
    pub fn clear(&mut self) {
        self.history.clear();
        self.published_experiences.clear();
        self.pending_experiences.clear();
        self.last_error = None;
    }

    /// Copy of the published state
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.clone(),
            messages: self.history.clone(),
            experiences: self.published_experiences.clone(),
            tool_status: self.tool_status.clone(),
            busy: self.busy,
            connected: self.connection.is_open(),
            last_error: self.last_error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::MessageRole;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    /// Records frames instead of sending them
    struct Recorder {
        open: bool,
        frames: RefCell<Vec<String>>,
    }

    impl Recorder {
        fn open() -> Self {
            Self {
                open: true,
                frames: RefCell::new(Vec::new()),
            }
        }

        fn closed() -> Self {
            Self {
                open: false,
                frames: RefCell::new(Vec::new()),
            }
        }
    }

    impl FrameSender for Recorder {
        fn is_open(&self) -> bool {
            self.open
        }

        fn send(&self, frame: &OutboundFrame) -> Result<(), TransportError> {
            if !self.open {
                return Err(TransportError::InvalidState("closed".to_string()));
            }
            self.frames.borrow_mut().push(frame.to_json().unwrap());
            Ok(())
        }
    }

    fn open_session() -> Session {
        let mut session = Session::new(SessionId::from_existing("session-test"));
        session.set_connection_state(ConnectionState::Open);
        session
    }

    fn cenote() -> Experience {
        Experience::new("e1", "Cenote X").with_coordinates(20.2, -87.4)
    }

    #[test]
    fn test_send_user_turn_appends_and_sets_busy() {
        let mut session = open_session();
        let sender = Recorder::open();

        let outcome = session.send_user_turn("Cenotes cerca de Tulum", &sender);

        assert!(outcome.is_sent());
        assert_eq!(
            sender.frames.borrow().as_slice(),
            [r#"{"content":"Cenotes cerca de Tulum"}"#.to_string()]
        );
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.history()[0].role(), MessageRole::User);
        assert_eq!(session.history()[0].content(), "Cenotes cerca de Tulum");
        assert!(session.is_busy());
    }

    #[test]
    fn test_send_blank_is_noop() {
        let mut session = open_session();
        let sender = Recorder::open();

        assert_eq!(session.send_user_turn("", &sender), SendOutcome::IgnoredBlank);
        assert_eq!(
            session.send_user_turn("   ", &sender),
            SendOutcome::IgnoredBlank
        );

        assert!(session.history().is_empty());
        assert!(sender.frames.borrow().is_empty());
        assert!(!session.is_busy());
    }

    #[test]
    fn test_send_while_not_open_is_noop() {
        for state in [ConnectionState::Connecting, ConnectionState::Closed] {
            let mut session = Session::new(SessionId::generate());
            session.set_connection_state(state);
            let sender = Recorder::open();

            assert_eq!(
                session.send_user_turn("hola", &sender),
                SendOutcome::IgnoredNotConnected
            );
            assert!(session.history().is_empty());
            assert!(sender.frames.borrow().is_empty());
        }
    }

    #[test]
    fn test_send_rejected_by_transport_is_noop() {
        let mut session = open_session();
        let sender = Recorder::closed();

        assert_eq!(
            session.send_user_turn("hola", &sender),
            SendOutcome::IgnoredNotConnected
        );
        assert!(session.history().is_empty());
        assert!(!session.is_busy());
    }

    #[test]
    fn test_send_keeps_published_experiences() {
        let mut session = open_session();
        session.apply_event(InboundEvent::Experiences {
            data: vec![cenote()],
        });
        session.apply_event(InboundEvent::Message {
            content: "uno".to_string(),
        });

        session.send_user_turn("otra", &Recorder::open());
        assert_eq!(session.experiences(), [cenote()].as_slice());
    }

    #[test]
    fn test_tool_start_then_end() {
        let mut session = open_session();

        session.apply_event(InboundEvent::ToolStart {
            message: "Buscando experiencias...".to_string(),
            tool: None,
        });
        assert_eq!(
            session.tool_status().map(|t| t.message.as_str()),
            Some("Buscando experiencias...")
        );

        session.apply_event(InboundEvent::ToolEnd { tool: None });
        assert!(session.tool_status().is_none());
    }

    #[test]
    fn test_latest_tool_start_supersedes() {
        let mut session = open_session();
        session.apply_event(InboundEvent::ToolStart {
            message: "uno".to_string(),
            tool: None,
        });
        session.apply_event(InboundEvent::ToolStart {
            message: "dos".to_string(),
            tool: Some("details".to_string()),
        });
        assert_eq!(
            session.tool_status(),
            Some(&ToolActivity {
                message: "dos".to_string(),
                tool: Some("details".to_string()),
            })
        );
    }

    #[test]
    fn test_experiences_attach_to_next_message() {
        let mut session = open_session();
        let data = vec![cenote(), Experience::new("e2", "Ruinas")];

        session.apply_event(InboundEvent::Experiences { data: data.clone() });
        session.apply_event(InboundEvent::Message {
            content: "Aquí tienes".to_string(),
        });

        let last = session.history().last().unwrap();
        assert_eq!(last.role(), MessageRole::Assistant);
        assert_eq!(last.attached_experiences(), data.as_slice());
        assert_eq!(session.experiences(), data.as_slice());
        assert!(session.pending_experiences.is_empty());
    }

    #[test]
    fn test_late_experiences_belong_to_next_turn() {
        let mut session = open_session();
        let first = vec![cenote()];
        let second = vec![Experience::new("e9", "Tour")];

        session.apply_event(InboundEvent::Experiences {
            data: first.clone(),
        });
        session.apply_event(InboundEvent::Message {
            content: "uno".to_string(),
        });
        session.apply_event(InboundEvent::Experiences {
            data: second.clone(),
        });

        assert_eq!(
            session.history()[0].attached_experiences(),
            first.as_slice()
        );
        assert_eq!(session.experiences(), second.as_slice());

        session.apply_event(InboundEvent::Message {
            content: "dos".to_string(),
        });
        assert_eq!(
            session.history()[1].attached_experiences(),
            second.as_slice()
        );
    }

    #[test]
    fn test_message_without_experiences_attaches_nothing() {
        let mut session = open_session();
        session.apply_event(InboundEvent::Experiences {
            data: vec![cenote()],
        });
        session.apply_event(InboundEvent::Message {
            content: "uno".to_string(),
        });
        session.apply_event(InboundEvent::Message {
            content: "dos".to_string(),
        });

        assert!(session.history()[1].attached_experiences().is_empty());
        // Published set survives both messages
        assert_eq!(session.experiences().len(), 1);
    }

    #[test]
    fn test_done_clears_busy_only() {
        let mut session = open_session();
        session.send_user_turn("hola", &Recorder::open());
        session.apply_event(InboundEvent::Message {
            content: "respuesta".to_string(),
        });
        let before = session.history().len();

        assert_eq!(session.apply_event(InboundEvent::Done), EventEffect::TurnCompleted);
        assert!(!session.is_busy());
        assert_eq!(session.history().len(), before);
    }

    #[test]
    fn test_error_clears_busy_and_tool_status() {
        let mut session = open_session();
        session.send_user_turn("hola", &Recorder::open());
        session.apply_event(InboundEvent::ToolStart {
            message: "Buscando".to_string(),
            tool: None,
        });
        let history_before = session.history().to_vec();

        let effect = session.apply_event(InboundEvent::Error {
            message: "backend failure".to_string(),
        });

        assert_eq!(
            effect,
            EventEffect::TurnFailed(TurnError {
                message: "backend failure".to_string()
            })
        );
        assert!(!session.is_busy());
        assert!(session.tool_status().is_none());
        assert_eq!(session.history(), history_before.as_slice());
        assert_eq!(
            session.last_error().map(|e| e.message.as_str()),
            Some("backend failure")
        );
    }

    #[test]
    fn test_next_send_clears_last_error() {
        let mut session = open_session();
        session.apply_event(InboundEvent::Error {
            message: "boom".to_string(),
        });
        session.send_user_turn("reintento", &Recorder::open());
        assert!(session.last_error().is_none());
    }

    #[test]
    fn test_thinking_start_changes_nothing() {
        let mut session = open_session();
        session.apply_event(InboundEvent::ToolStart {
            message: "x".to_string(),
            tool: None,
        });
        let before = session.snapshot();

        assert_eq!(
            session.apply_event(InboundEvent::ThinkingStart),
            EventEffect::Unchanged
        );
        assert_eq!(session.snapshot(), before);
    }

    #[test]
    fn test_clear_forgets_conversation() {
        let mut session = open_session();
        session.send_user_turn("hola", &Recorder::open());
        session.apply_event(InboundEvent::Experiences {
            data: vec![cenote()],
        });
        session.clear();

        assert!(session.history().is_empty());
        assert!(session.experiences().is_empty());
        assert!(session.pending_experiences.is_empty());
        // Turn still in flight
        assert!(session.is_busy());

        session.apply_event(InboundEvent::Message {
            content: "tarde".to_string(),
        });
        assert!(session.history()[0].attached_experiences().is_empty());
    }

    #[test]
    fn test_message_ids_unique_across_history() {
        let mut session = open_session();
        let sender = Recorder::open();
        for i in 0..5 {
            session.send_user_turn(&format!("pregunta {i}"), &sender);
            session.apply_event(InboundEvent::Message {
                content: format!("respuesta {i}"),
            });
        }

        let mut ids: Vec<_> = session.history().iter().map(|m| m.id().0.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 10);
    }

    #[test]
    fn test_snapshot_reflects_connection() {
        let mut session = Session::new(SessionId::generate());
        assert!(!session.snapshot().connected);
        assert!(session.set_connection_state(ConnectionState::Open));
        assert!(!session.set_connection_state(ConnectionState::Open));
        assert!(session.snapshot().connected);
    }
}
