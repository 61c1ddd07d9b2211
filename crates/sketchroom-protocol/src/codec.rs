//! Codec trait and implementations for serializing/deserializing events.
//!
//! The rest of the server never calls `serde_json` directly. It asks a
//! [`Codec`] to turn a [`ClientEvent`](crate::ClientEvent) frame into a
//! value, or a [`ServerEvent`](crate::ServerEvent) into bytes, so the wire
//! format can change without touching the room engine.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to bytes and decodes bytes back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or do
    /// not match the expected shape.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that speaks JSON (via `serde_json`).
///
/// Browser clients consume the frames as text, so JSON is the only codec
/// the server ships with. Behind the `json` feature (enabled by default).
///
/// ## Example
///
/// ```rust
/// use sketchroom_protocol::{ClientEvent, Codec, JsonCodec, RoomId};
///
/// let codec = JsonCodec;
/// let frame = br#"{"type":"startGame","roomId":"K7Q2ZX"}"#;
/// let event: ClientEvent = codec.decode(frame).unwrap();
/// assert_eq!(event, ClientEvent::StartGame { room_id: RoomId::from("K7Q2ZX") });
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
