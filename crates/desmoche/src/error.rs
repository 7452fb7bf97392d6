//! Unified error type for the Desmoche client.

use desmoche_intent::IntentRejected;
use desmoche_protocol::ProtocolError;
use desmoche_transport::TransportError;

use crate::ConnectionState;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each wrapping variant generates a `From`
/// impl, so `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A transport-level error (connect, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A local intent was refused before anything was sent.
    #[error(transparent)]
    Intent(#[from] IntentRejected),

    /// A command was dropped because the connection isn't open.
    #[error("not connected (connection is {0})")]
    NotConnected(ConnectionState),

    /// The client configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}
