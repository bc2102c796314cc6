//! In-Process Transport
//!
//! Channel-backed connector for embedding a backend in the same process and
//! for driving the connection manager in tests. The backend half decides
//! whether connects succeed and plays the server role on each accepted link.
//!
//! # Usage
//!
//! ```ignore
//! let (connector, mut backend) = InProcessConnector::new_pair();
//! let manager = ConnectionManager::spawn(Arc::new(connector), &config, &session_id);
//!
//! let mut peer = backend.accept().await.unwrap();
//! peer.send_event(&InboundEvent::Done);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::channel::mpsc as fmpsc;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::protocol::InboundEvent;

use super::traits::{Connector, Link, TransportError};

/// Client half: hand this to the connection manager
pub struct InProcessConnector {
    peers: mpsc::UnboundedSender<BackendPeer>,
    shared: Arc<Shared>,
}

/// Backend half: accepts links and controls connect outcomes
pub struct InProcessBackend {
    peers: mpsc::UnboundedReceiver<BackendPeer>,
    shared: Arc<Shared>,
}

struct Shared {
    accepting: AtomicBool,
    attempts: Mutex<Vec<(String, Instant)>>,
}

impl InProcessConnector {
    /// Create a connected connector/backend pair; the backend starts accepting
    #[must_use]
    pub fn new_pair() -> (Self, InProcessBackend) {
        let (peers_tx, peers_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            accepting: AtomicBool::new(true),
            attempts: Mutex::new(Vec::new()),
        });

        let connector = Self {
            peers: peers_tx,
            shared: Arc::clone(&shared),
        };
        let backend = InProcessBackend {
            peers: peers_rx,
            shared,
        };

        (connector, backend)
    }
}

#[async_trait]
impl Connector for InProcessConnector {
    async fn connect(&self, url: &str) -> Result<Link, TransportError> {
        if let Ok(mut attempts) = self.shared.attempts.lock() {
            attempts.push((url.to_string(), Instant::now()));
        }

        if !self.shared.accepting.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionFailed(
                "in-process backend refused connection".to_string(),
            ));
        }

        let (to_backend, from_client) = fmpsc::unbounded::<String>();
        let (to_client, from_backend) = fmpsc::unbounded::<Result<String, TransportError>>();

        let peer = BackendPeer {
            url: url.to_string(),
            to_client,
            from_client,
        };
        self.peers
            .send(peer)
            .map_err(|_| TransportError::ConnectionFailed("in-process backend gone".to_string()))?;

        let sink = to_backend.sink_map_err(|e| TransportError::SendFailed(e.to_string()));
        Ok(Link::new(sink, from_backend))
    }
}

impl InProcessBackend {
    /// Make subsequent connect attempts succeed or fail
    pub fn set_accepting(&self, accepting: bool) {
        self.shared.accepting.store(accepting, Ordering::SeqCst);
    }

    /// Number of connect attempts seen so far, accepted or not
    #[must_use]
    pub fn attempt_count(&self) -> usize {
        self.shared.attempts.lock().map(|a| a.len()).unwrap_or(0)
    }

    /// URL and time of every connect attempt
    #[must_use]
    pub fn attempts(&self) -> Vec<(String, Instant)> {
        self.shared
            .attempts
            .lock()
            .map(|a| a.clone())
            .unwrap_or_default()
    }

    /// Wait for the next accepted link
    pub async fn accept(&mut self) -> Option<BackendPeer> {
        self.peers.recv().await
    }
}

/// Server side of one in-process link
pub struct BackendPeer {
    url: String,
    to_client: fmpsc::UnboundedSender<Result<String, TransportError>>,
    from_client: fmpsc::UnboundedReceiver<String>,
}

impl BackendPeer {
    /// URL the client connected to
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Push a raw text frame to the client
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.to_client.unbounded_send(Ok(text.into())).is_ok()
    }

    /// Push an encoded event to the client
    pub fn send_event(&self, event: &InboundEvent) -> bool {
        match serde_json::to_string(event) {
            Ok(text) => self.send_text(text),
            Err(_) => false,
        }
    }

    /// Inject a transport error; the client treats it as a lost connection
    pub fn fail(&self, reason: &str) -> bool {
        self.to_client
            .unbounded_send(Err(TransportError::ReceiveFailed(reason.to_string())))
            .is_ok()
    }

    /// Next frame written by the client, `None` once the client hung up
    pub async fn recv(&mut self) -> Option<String> {
        self.from_client.next().await
    }

    /// Close the link from the backend side
    pub fn close(self) {
        drop(self);
    }
}
