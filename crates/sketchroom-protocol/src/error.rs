//! Error types for the protocol layer.
//!
//! A `ProtocolError` always means the bytes or the event shape were bad,
//! never that the room rejected the request. Room-level rejections travel
//! to clients as [`ServerEvent::ErrorMessage`](crate::ServerEvent) with an
//! [`ErrorKind`](crate::ErrorKind) instead.

/// Errors that can occur while encoding or decoding wire events.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serializing an outbound event failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The frame was not valid JSON or did not match any known event.
    ///
    /// Common causes: an unknown `"type"` tag, missing fields, or a
    /// truncated frame.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The event parsed but breaks a protocol rule, e.g. a blank user id.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
