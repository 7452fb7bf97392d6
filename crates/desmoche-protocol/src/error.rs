//! Error types for the protocol layer.
//!
//! Each crate in the client defines its own error enum. A `ProtocolError`
//! always means the bytes or JSON were wrong, never that the network or the
//! game state was.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, a frame without an `event`/`action`
    /// tag, or a field with the wrong type.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A known event tag carried a payload of the wrong shape.
    #[error("malformed `{tag}` payload: {reason}")]
    Payload {
        /// The event tag whose payload was rejected.
        tag: String,
        /// Human-readable reason, usually the serde error text.
        reason: String,
    },

    /// The message is invalid at the protocol level.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
