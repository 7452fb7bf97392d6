//! # Desmoche
//!
//! Client for the Desmoche card game.
//!
//! A [`GameClient`] joins one game session over WebSocket, folds every
//! server event into a [`Table`], keeps the local UI intent (selection,
//! exchange guard, toasts) in step with it, and turns player actions into
//! commands.
//!
//! ```text
//!  server ──frames──→ ConnectionManager ──→ GameClient::step ──→ Table::apply
//!                                                   │                 │
//!  server ←─commands── CommandEncoder ←── intents ──┘     UiIntentController
//!                                                                    │
//!                                          watch<ClientSnapshot> ←───┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use desmoche::prelude::*;
//!
//! # async fn demo() -> Result<(), ClientError> {
//! desmoche::init_tracing();
//!
//! let config = ClientConfig::builder("42", "Alice")
//!     .host("localhost:8080")
//!     .build()?;
//! let mut client = GameClient::new(config);
//! client.connect()?;
//! client.step().await; // Connected
//! client.toggle_ready()?;
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod connection;
mod encoder;
mod error;

pub use client::{
    CONNECTED_MESSAGE, CONNECTION_ERROR_MESSAGE, ClientSnapshot, DISCONNECTED_MESSAGE,
    GAVE_UP_MESSAGE, GameClient, NOT_CONNECTED_MESSAGE, SNAPSHOT_LOG_TAIL, Step,
};
pub use config::{ClientConfig, ClientConfigBuilder, ReconnectPolicy, Route};
pub use connection::{ConnectionEvent, ConnectionManager, ConnectionState};
pub use encoder::{CommandEncoder, Intent};
pub use error::ClientError;

pub use desmoche_intent::{IntentConfig, IntentRejected, UiIntent};
pub use desmoche_protocol::{Command, Inbound, ServerEvent, TagField};
pub use desmoche_session::{
    Card, CardFormat, Color, LogEntry, LogKind, Phase, Player, Session, Suit, Table,
};

/// Installs a `tracing` subscriber that reads its filter from `RUST_LOG`,
/// defaulting to `info`.
///
/// Does nothing if a global subscriber is already set.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Everything needed to drive a client.
pub mod prelude {
    pub use crate::{
        Card, ClientConfig, ClientError, ClientSnapshot, ConnectionState, GameClient,
        IntentConfig, LogKind, Phase, ReconnectPolicy, Route, Step, Suit,
    };
}
