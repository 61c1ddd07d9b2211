//! Unified error type for the Sketchroom server.

use sketchroom_protocol::ProtocolError;
use sketchroom_room::RoomError;
use sketchroom_timer::TimerError;
use sketchroom_transport::TransportError;

use crate::config::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum SketchroomError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room operation failed.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The round timer refused an operation.
    #[error(transparent)]
    Timer(#[from] TimerError),

    /// The environment held an unusable setting.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A word list could not be read.
    #[error("failed to load word lists: {0}")]
    Words(#[source] std::io::Error),
}
