//! Connection Manager
//!
//! Owns the transport lifecycle for one session:
//!
//! ```text
//!            connect ok                 peer close / error
//! Connecting ──────────▶ Open ──────────────────────────────▶ Closed
//!     ▲   │ connect failed / timed out                          │
//!     │   └─────────────────────────────────────────────────────▶│
//!     └──────────────────── reconnect delay ◀────────────────────┘
//! ```
//!
//! A single supervisor task drives the loop. Each entry to `Closed` arms
//! exactly one reconnect timer; the delay is fixed and retries never stop.
//! Frames are only written while `Open`: [`ConnectionHandle::send`] fails
//! immediately otherwise, and frames still queued when a connection drops
//! are discarded rather than replayed on the next one.
//!
//! The supervisor (socket, timer and all) is torn down by
//! [`ConnectionManager::close`], or aborted when the manager is dropped.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::identity::SessionId;
use crate::protocol::OutboundFrame;

use super::config::TransportConfig;
use super::traits::{Connector, Link, TransportError};

/// Connection lifecycle state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// Connect attempt in progress
    Connecting,
    /// Connected; frames can be sent
    Open,
    /// Disconnected; a reconnect is scheduled
    Closed,
}

impl ConnectionState {
    /// Whether frames can be sent in this state
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Human-readable description
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Connecting => "Connecting...",
            Self::Open => "Connected",
            Self::Closed => "Disconnected",
        }
    }
}

/// What the supervisor reports to the session owner, in order
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Lifecycle transition
    StateChanged(ConnectionState),
    /// Raw inbound text frame, not yet decoded
    Frame(String),
}

/// Cheap, cloneable sending side of a connection manager
#[derive(Clone, Debug)]
pub struct ConnectionHandle {
    state: watch::Receiver<ConnectionState>,
    outbound: mpsc::UnboundedSender<String>,
}

impl ConnectionHandle {
    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Whether [`send`](Self::send) can succeed right now
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state().is_open()
    }

    /// Queue a frame on the live connection
    ///
    /// Never blocks and never buffers across connections.
    ///
    /// # Errors
    ///
    /// - `TransportError::InvalidState` if the connection is not `Open`
    /// - `TransportError::SerializationError` if the frame cannot be encoded
    /// - `TransportError::SendFailed` if the supervisor has stopped
    pub fn send(&self, frame: &OutboundFrame) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::InvalidState(format!(
                "cannot send while {:?}",
                self.state()
            )));
        }

        let text = frame
            .to_json()
            .map_err(|e| TransportError::SerializationError(e.to_string()))?;

        self.outbound
            .send(text)
            .map_err(|_| TransportError::SendFailed("connection task stopped".to_string()))
    }
}

/// Supervises the connection for one session
pub struct ConnectionManager {
    handle: ConnectionHandle,
    events: mpsc::Receiver<ConnectionEvent>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ConnectionManager {
    /// Start supervising a connection to `<base>/<session id>`
    ///
    /// Must be called from within a Tokio runtime. The first connect attempt
    /// starts immediately.
    #[must_use]
    pub fn spawn(
        connector: Arc<dyn Connector>,
        config: &TransportConfig,
        session_id: &SessionId,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::channel(config.channel_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let supervisor = Supervisor {
            connector,
            url: config.endpoint_url(session_id),
            reconnect_delay: config.reconnect_delay(),
            connect_timeout: config.connect_timeout(),
            outbound: outbound_rx,
            events: events_tx,
            state: state_tx,
            shutdown: shutdown_rx,
        };

        let task = tokio::spawn(supervisor.run());

        Self {
            handle: ConnectionHandle {
                state: state_rx,
                outbound: outbound_tx,
            },
            events: events_rx,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }

    /// A sending handle for this connection
    #[must_use]
    pub fn handle(&self) -> ConnectionHandle {
        self.handle.clone()
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.handle.state()
    }

    /// Wait for the next connection event
    ///
    /// Returns `None` once the supervisor has stopped.
    pub async fn next_event(&mut self) -> Option<ConnectionEvent> {
        self.events.recv().await
    }

    /// Take the next connection event if one is ready (non-blocking)
    pub fn try_next_event(&mut self) -> Option<ConnectionEvent> {
        self.events.try_recv().ok()
    }

    /// Close the connection and cancel any pending reconnect
    ///
    /// Sends a close frame if connected and waits for the supervisor to exit.
    pub async fn close(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        // Unblocks a supervisor waiting for event channel capacity
        self.events.close();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "Connection task ended abnormally");
                }
            }
        }
        info!("Connection manager closed");
    }

    /// Whether the supervisor is still running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Why a live connection stopped
enum PumpExit {
    /// Teardown requested; do not reconnect
    Shutdown,
    /// Peer closed or transport failed; reconnect
    Lost(String),
}

/// The supervisor task's state
struct Supervisor {
    connector: Arc<dyn Connector>,
    url: String,
    reconnect_delay: Duration,
    connect_timeout: Duration,
    outbound: mpsc::UnboundedReceiver<String>,
    events: mpsc::Sender<ConnectionEvent>,
    state: watch::Sender<ConnectionState>,
    shutdown: oneshot::Receiver<()>,
}

impl Supervisor {
    async fn run(mut self) {
        loop {
            if !self.transition(ConnectionState::Connecting).await {
                return;
            }
            debug!(url = %self.url, "Connecting");

            let attempt =
                tokio::time::timeout(self.connect_timeout, self.connector.connect(&self.url));
            let result = tokio::select! {
                _ = &mut self.shutdown => {
                    self.state.send_replace(ConnectionState::Closed);
                    return;
                }
                result = attempt => result,
            };

            match result {
                Ok(Ok(link)) => {
                    if !self.transition(ConnectionState::Open).await {
                        return;
                    }
                    info!(url = %self.url, "Connected");

                    match self.pump(link).await {
                        PumpExit::Shutdown => {
                            self.state.send_replace(ConnectionState::Closed);
                            return;
                        }
                        PumpExit::Lost(reason) => {
                            info!(reason = %reason, "Connection lost");
                        }
                    }
                }
                Ok(Err(e)) => {
                    warn!(error = %e, "Connect failed");
                }
                Err(_) => {
                    let e = TransportError::ConnectTimeout(
                        u64::try_from(self.connect_timeout.as_millis()).unwrap_or(u64::MAX),
                    );
                    warn!(error = %e, "Connect failed");
                }
            }

            if !self.transition(ConnectionState::Closed).await {
                return;
            }
            self.discard_unsent();

            debug!(
                delay_ms = u64::try_from(self.reconnect_delay.as_millis()).unwrap_or(u64::MAX),
                "Reconnect scheduled"
            );
            tokio::select! {
                _ = &mut self.shutdown => return,
                () = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }
    }

    /// Publish a state change; `false` once nobody is listening
    async fn transition(&mut self, state: ConnectionState) -> bool {
        self.state.send_replace(state);
        self.events
            .send(ConnectionEvent::StateChanged(state))
            .await
            .is_ok()
    }

    /// Shuttle frames until the connection ends or teardown is requested
    async fn pump(&mut self, link: Link) -> PumpExit {
        let Link {
            mut sink,
            mut stream,
        } = link;

        loop {
            tokio::select! {
                _ = &mut self.shutdown => {
                    if let Err(e) = sink.close().await {
                        debug!(error = %e, "Close frame not delivered");
                    }
                    return PumpExit::Shutdown;
                }

                frame = self.outbound.recv() => match frame {
                    Some(text) => {
                        debug!(bytes = text.len(), "Sending frame");
                        if let Err(e) = sink.send(text).await {
                            return PumpExit::Lost(e.to_string());
                        }
                    }
                    // Every handle is gone, including the manager's own
                    None => return PumpExit::Shutdown,
                },

                inbound = stream.next() => match inbound {
                    Some(Ok(text)) => {
                        debug!(bytes = text.len(), "Received frame");
                        if self.events.send(ConnectionEvent::Frame(text)).await.is_err() {
                            return PumpExit::Shutdown;
                        }
                    }
                    Some(Err(e)) => return PumpExit::Lost(e.to_string()),
                    None => return PumpExit::Lost("closed by peer".to_string()),
                },
            }
        }
    }

    /// Drop frames queued for a connection that no longer exists
    fn discard_unsent(&mut self) {
        let mut dropped = 0usize;
        while self.outbound.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            warn!(dropped, "Discarded frames queued for a closed connection");
        }
    }
}
