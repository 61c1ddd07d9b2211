//! Inbound and outbound wire events.
//!
//! Both enums use serde's internally tagged representation, so a frame
//! looks like:
//!
//! ```json
//! { "type": "submitGuess", "roomId": "K7Q2ZX", "userId": "u-1", "text": "cat" }
//! ```
//!
//! `rename_all` camelCases the tag and `rename_all_fields` camelCases the
//! fields inside every variant.

use serde::{Deserialize, Serialize};

use crate::{LeaderboardEntry, RoomId, RoomSettings, RoomSnapshot, RoomSummary, UserId};

/// Events a client sends to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Create a room. The creator becomes its host and joins it.
    CreateRoom {
        user_id: UserId,
        username: String,
        name: String,
        #[serde(default)]
        settings: Option<RoomSettings>,
    },

    /// Join (or rejoin) a room.
    JoinRoom {
        room_id: RoomId,
        user_id: UserId,
        username: String,
    },

    /// Host only: leave the lobby and start the first turn.
    StartGame { room_id: RoomId },

    /// A guess at the current word.
    SubmitGuess {
        room_id: RoomId,
        user_id: UserId,
        text: String,
    },

    /// Leave the room for good (as opposed to disconnecting).
    LeaveRoom { room_id: RoomId, user_id: UserId },

    /// Host only: stop the game early.
    EndGame { room_id: RoomId },

    /// Drawer only: one opaque stroke, relayed verbatim.
    Draw { room_id: RoomId, stroke: String },

    /// Drawer only: wipe the shared canvas.
    ClearCanvas { room_id: RoomId },

    /// List live rooms.
    ListRooms,
}

impl ClientEvent {
    /// The room this event targets, if it is room-scoped.
    pub fn room_id(&self) -> Option<&RoomId> {
        match self {
            Self::JoinRoom { room_id, .. }
            | Self::StartGame { room_id }
            | Self::SubmitGuess { room_id, .. }
            | Self::LeaveRoom { room_id, .. }
            | Self::EndGame { room_id }
            | Self::Draw { room_id, .. }
            | Self::ClearCanvas { room_id } => Some(room_id),
            Self::CreateRoom { .. } | Self::ListRooms => None,
        }
    }

    /// The acting user named inside the event, if any.
    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            Self::CreateRoom { user_id, .. }
            | Self::JoinRoom { user_id, .. }
            | Self::SubmitGuess { user_id, .. }
            | Self::LeaveRoom { user_id, .. } => Some(user_id),
            _ => None,
        }
    }
}

/// Broad class of a rejected request, so clients can branch without
/// parsing the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Bad fields, wrong phase, not the host, room full.
    Validation,
    /// Unknown room.
    NotFound,
    /// The change was applied but could not be persisted.
    TransientStore,
    /// The room stopped while the request was in flight.
    Unavailable,
    /// The frame itself could not be decoded.
    Protocol,
}

/// Events the server sends to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Full state of the room, rendered for the receiving user.
    RoomSnapshot(RoomSnapshot),

    /// Once a second while a turn is running.
    TimerTick { seconds_remaining: u32 },

    /// A new turn began.
    TurnStarted { drawer_id: UserId, round: u32 },

    /// Sent to the drawer only.
    SecretWord { word: String },

    /// Someone guessed the word.
    PlayerGuessed { user_id: UserId, points: u32 },

    /// A guess that did not match, shown as chat.
    ChatMessage { user_id: UserId, text: String },

    /// A stroke from the drawer.
    Stroke { user_id: UserId, stroke: String },

    /// The shared canvas was wiped.
    CanvasCleared,

    /// The turn ended; here is the word.
    RoundResolved { word: String },

    /// Final standings.
    GameOver { leaderboard: Vec<LeaderboardEntry> },

    /// Reply to `createRoom`.
    RoomCreated { room_id: RoomId },

    /// Reply to `listRooms`.
    RoomList { rooms: Vec<RoomSummary> },

    /// A request from this connection was rejected.
    ErrorMessage { kind: ErrorKind, message: String },
}
