//! Session Client
//!
//! The single owner of a [`Session`] and its [`ConnectionManager`]. The
//! presentation layer calls [`SessionClient::send_user_turn`] for user
//! intents and drives [`SessionClient::next_update`] (or
//! [`SessionClient::drain_pending`] from a frame loop) to apply inbound
//! traffic. Every change is published as a [`SessionSnapshot`] on a watch
//! channel for renderers that only want the latest state.
//!
//! Protocol errors are logged and reported as updates; they never change
//! the conversation state or the connection.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::identity::SessionId;
use crate::protocol::{decode_with_limit, DecodeError};
use crate::session::{EventEffect, SendOutcome, Session, SessionSnapshot};
use crate::transport::{
    ConnectionEvent, ConnectionManager, ConnectionState, Connector, TransportConfig,
};

/// One unit of progress from [`SessionClient::next_update`]
#[derive(Clone, Debug, PartialEq)]
pub enum ClientUpdate {
    /// Connection lifecycle transition
    Connection(ConnectionState),
    /// A decoded event was applied to the session
    Applied(EventEffect),
    /// An inbound frame was rejected and dropped
    ProtocolError(DecodeError),
}

/// A running chat session
pub struct SessionClient {
    session: Session,
    manager: ConnectionManager,
    transport: TransportConfig,
    snapshots: watch::Sender<SessionSnapshot>,
}

impl SessionClient {
    /// Start a session against the real backend over WebSocket
    ///
    /// Must be called from within a Tokio runtime.
    #[cfg(feature = "websocket")]
    #[must_use]
    pub fn start(config: &ClientConfig) -> Self {
        Self::with_connector(
            Arc::new(crate::transport::WebSocketConnector::new()),
            config,
        )
    }

    /// Start a session with a freshly generated identity over `connector`
    #[must_use]
    pub fn with_connector(connector: Arc<dyn Connector>, config: &ClientConfig) -> Self {
        Self::with_session_id(connector, config, SessionId::generate())
    }

    /// Start a session with a caller-chosen identity
    #[must_use]
    pub fn with_session_id(
        connector: Arc<dyn Connector>,
        config: &ClientConfig,
        session_id: SessionId,
    ) -> Self {
        let transport = config.transport.clone();
        let manager = ConnectionManager::spawn(connector, &transport, &session_id);

        info!(
            session_id = %session_id,
            url = %transport.endpoint_url(&session_id),
            "Session client started"
        );

        let session = Session::new(session_id);
        let (snapshots, _) = watch::channel(session.snapshot());

        Self {
            session,
            manager,
            transport,
            snapshots,
        }
    }

    /// Session identifier used in the endpoint URL
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        self.session.id()
    }

    /// Read access to the session state
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Connection state as the session last saw it
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.session.connection_state()
    }

    /// Send a user turn; blank text or a closed connection is a no-op
    pub fn send_user_turn(&mut self, text: &str) -> SendOutcome {
        let handle = self.manager.handle();
        let outcome = self.session.send_user_turn(text, &handle);
        match &outcome {
            SendOutcome::Sent(id) => {
                debug!(message_id = %id.0, "User turn sent");
                self.publish();
            }
            SendOutcome::IgnoredNotConnected => {
                debug!(
                    state = ?self.session.connection_state(),
                    "User turn ignored, not connected"
                );
            }
            SendOutcome::IgnoredBlank => {}
        }
        outcome
    }

    /// Wait for the next connection event and apply it
    ///
    /// Returns `None` once the connection manager has stopped.
    pub async fn next_update(&mut self) -> Option<ClientUpdate> {
        let event = self.manager.next_event().await?;
        Some(self.handle_event(event))
    }

    /// Apply every event that is already waiting (non-blocking)
    pub fn drain_pending(&mut self) -> Vec<ClientUpdate> {
        let mut updates = Vec::new();
        while let Some(event) = self.manager.try_next_event() {
            updates.push(self.handle_event(event));
        }
        updates
    }

    /// Forget the conversation; the connection and any turn in flight stay
    pub fn clear(&mut self) {
        self.session.clear();
        self.publish();
    }

    /// Receiver that always holds the latest snapshot
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.subscribe()
    }

    /// Snapshot of the current state
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    /// Close the connection and cancel any pending reconnect
    pub async fn shutdown(mut self) {
        self.manager.close().await;
        if self.session.set_connection_state(ConnectionState::Closed) {
            self.publish();
        }
        info!(session_id = %self.session.id(), "Session client shut down");
    }

    fn handle_event(&mut self, event: ConnectionEvent) -> ClientUpdate {
        match event {
            ConnectionEvent::StateChanged(state) => {
                if self.session.set_connection_state(state) {
                    self.publish();
                }
                ClientUpdate::Connection(state)
            }
            ConnectionEvent::Frame(raw) => {
                match decode_with_limit(&raw, self.transport.max_frame_size) {
                    Ok(event) => {
                        let kind = event.kind();
                        let effect = self.session.apply_event(event);
                        debug!(kind, effect = ?effect, "Applied inbound event");
                        if effect != EventEffect::Unchanged {
                            self.publish();
                        }
                        ClientUpdate::Applied(effect)
                    }
                    Err(e) => {
                        warn!(error = %e, frame_len = raw.len(), "Dropping invalid frame");
                        ClientUpdate::ProtocolError(e)
                    }
                }
            }
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.session.snapshot());
    }
}
