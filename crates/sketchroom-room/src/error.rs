//! Error types for the room layer.

use sketchroom_protocol::{ErrorKind, GamePhase, RoomId, UserId};

use crate::StoreError;

/// Errors that can occur during room operations.
///
/// Each variant maps to one wire [`ErrorKind`] via [`RoomError::kind`].
/// All of them are reported to the requesting connection only and leave
/// the room state unchanged, except [`RoomError::Store`], where the change
/// was applied in memory but could not be persisted.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist (not live and not in the store).
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// No more participant slots.
    #[error("room {0} is full")]
    RoomFull(RoomId),

    /// The user is not a participant of this room.
    #[error("user {0} is not in room {1}")]
    NotInRoom(UserId, RoomId),

    /// A host-only action was requested by someone else.
    #[error("only the host can do that ({0} is not the host)")]
    NotHost(UserId),

    /// A drawer-only action was requested by someone else.
    #[error("only the drawer can do that ({0} is not drawing)")]
    NotDrawer(UserId),

    /// Not enough participants to start.
    #[error("need at least {need} players to start, have {have}")]
    InsufficientPlayers { have: usize, need: usize },

    /// The action is not valid in the room's current phase.
    #[error("cannot {action} while the room is in {phase}")]
    WrongPhase {
        action: &'static str,
        phase: GamePhase,
    },

    /// A field was missing or malformed.
    #[error("invalid request: {0}")]
    Invalid(String),

    /// The word source returned nothing usable in time.
    #[error("no words available for this room, try again")]
    WordsUnavailable,

    /// Retries to persist the room were exhausted.
    #[error("could not save room {room_id}: {source}")]
    Store {
        room_id: RoomId,
        #[source]
        source: StoreError,
    },

    /// The room's actor stopped while the request was in flight.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),
}

impl RoomError {
    /// The wire classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Store { .. } => ErrorKind::TransientStore,
            Self::Unavailable(_) => ErrorKind::Unavailable,
            Self::RoomFull(_)
            | Self::NotInRoom(..)
            | Self::NotHost(_)
            | Self::NotDrawer(_)
            | Self::InsufficientPlayers { .. }
            | Self::WrongPhase { .. }
            | Self::Invalid(_)
            | Self::WordsUnavailable => ErrorKind::Validation,
        }
    }
}
