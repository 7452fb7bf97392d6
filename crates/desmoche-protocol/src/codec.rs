//! Codec trait and the JSON implementation the game server speaks.
//!
//! A codec converts between Rust types and raw frame bytes. Everything above
//! the transport goes through [`Codec`], so the client loop never calls
//! `serde_json` directly.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because the codec lives inside the client for its
/// whole lifetime and is used from spawned tasks.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use desmoche_protocol::{Codec, Command, Frame, JsonCodec};
///
/// let codec = JsonCodec;
/// let bytes = codec.encode(&Command::ToggleReady).unwrap();
/// assert_eq!(bytes, br#"{"event":"toggle_ready"}"#);
///
/// let frame: Frame = codec
///     .decode(br#"{"event":"player_ready","message":"Bob is ready"}"#)
///     .unwrap();
/// assert_eq!(frame.event, "player_ready");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
