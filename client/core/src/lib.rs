//! Experience Client Core - Session Protocol Client for the Experience Chat
//!
//! This crate holds everything a chat surface needs to talk to the
//! experience-recommendation backend, independent of how the conversation is
//! rendered. The CLI in this workspace is one such surface; a GUI or a test
//! harness can drive the same [`SessionClient`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Presentation surface                     │
//! │   send_user_turn (up)            SessionSnapshot (down)      │
//! └──────────────┬───────────────────────────────▲───────────────┘
//!                │                               │
//! ┌──────────────▼───────────────────────────────┴───────────────┐
//! │                        SessionClient                         │
//! │  ┌──────────────────────┐      ┌──────────────────────────┐  │
//! │  │ Session              │◀─────│ protocol::decode         │  │
//! │  │ (state machine)      │      │ (frame codec)            │  │
//! │  └──────────┬───────────┘      └────────────▲─────────────┘  │
//! │             │ OutboundFrame                 │ text frames    │
//! │  ┌──────────▼───────────────────────────────┴─────────────┐  │
//! │  │ ConnectionManager (Connecting / Open / Closed, retry)  │  │
//! │  └──────────────────────────┬─────────────────────────────┘  │
//! └─────────────────────────────┼────────────────────────────────┘
//!                               │ Connector
//!                 WebSocket  ◀──┴──▶  in-process
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use experience_client_core::{ClientUpdate, SessionClient, config::load_config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     let mut client = SessionClient::start(&config);
//!
//!     while let Some(update) = client.next_update().await {
//!         if matches!(update, ClientUpdate::Connection(s) if s.is_open()) {
//!             client.send_user_turn("Cenotes cerca de Tulum");
//!         }
//!         let snapshot = client.snapshot();
//!         // render snapshot.messages, snapshot.experiences, snapshot.tool_status
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`identity`]: Session identifier carried in the endpoint URL
//! - [`experience`]: Experience records recommended by the backend
//! - [`messages`]: Finalized conversation messages
//! - [`protocol`]: Frame codec (outbound user turns, inbound events)
//! - [`transport`]: Connectors and the reconnecting connection manager
//! - [`session`]: Conversation state machine and its published snapshot
//! - [`client`]: Single owner tying the session to its connection
//! - [`config`]: TOML / environment / CLI configuration
//! - [`health`]: HTTP health probe for the backend

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod experience;
pub mod health;
pub mod identity;
pub mod messages;
pub mod protocol;
pub mod session;
pub mod transport;

// Re-exports for convenience
pub use client::{ClientUpdate, SessionClient};
pub use config::{ClientConfig, ConfigError, ConfigSource};
pub use experience::Experience;
pub use health::{HealthError, HealthProbe, HealthStatus};
pub use identity::SessionId;
pub use messages::{Message, MessageId, MessageRole};
pub use protocol::{decode, encode_user_turn, DecodeError, InboundEvent, OutboundFrame};
pub use session::{
    EventEffect, FrameSender, SendOutcome, Session, SessionSnapshot, ToolActivity, TurnError,
};
pub use transport::{
    ConnectionEvent, ConnectionHandle, ConnectionManager, ConnectionState, Connector,
    InProcessConnector, TransportConfig, TransportError,
};
