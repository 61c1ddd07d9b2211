//! Identity, settings, and phase types shared by every layer.
//!
//! These are the values that appear inside wire events and snapshots.
//! JSON field names are camelCase because the consumers are browser
//! clients written in TypeScript.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A stable user identifier issued by the external auth layer.
///
/// Opaque to the server: it is compared for equality and used as a map
/// key, nothing else. `#[serde(transparent)]` keeps it a plain JSON
/// string (`"u-42"`, not `{"0":"u-42"}`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Borrows the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A human-shareable room code such as `K7Q2ZX`.
///
/// Players type this in to join a friend's room, so it stays short and
/// uppercase. Generation lives in the room registry; the protocol only
/// carries it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    /// Borrows the raw code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for RoomId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ---------------------------------------------------------------------------
// Recipient: who should receive an event?
// ---------------------------------------------------------------------------

/// Specifies which members of a room receive an outbound event.
///
/// The room engine never talks to sockets. It returns `(Recipient, event)`
/// pairs and the broadcast gateway resolves them against whoever is
/// currently connected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// Every participant with a live connection.
    All,

    /// One participant. Used for the drawer's secret word and for resyncs.
    User(UserId),

    /// Everyone except one participant, e.g. relaying a stroke back to
    /// everybody but the person who drew it.
    AllExcept(UserId),
}

impl Recipient {
    /// Returns `true` if `user` is addressed by this recipient.
    pub fn includes(&self, user: &UserId) -> bool {
        match self {
            Self::All => true,
            Self::User(target) => target == user,
            Self::AllExcept(excluded) => excluded != user,
        }
    }
}

// ---------------------------------------------------------------------------
// Room settings
// ---------------------------------------------------------------------------

/// Word difficulty requested from the word source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Easy => write!(f, "easy"),
            Self::Medium => write!(f, "medium"),
            Self::Hard => write!(f, "hard"),
        }
    }
}

/// The player-visible configuration of a room.
///
/// Sent by the host in `createRoom` and echoed back in every snapshot.
/// Missing fields fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoomSettings {
    /// Difficulty passed to the word source.
    pub difficulty: Difficulty,
    /// Word category passed to the word source (e.g. `"animals"`).
    pub category: String,
    /// Length of one drawing turn, in seconds.
    pub round_duration_secs: u32,
    /// Number of full rotations through the participant list.
    pub max_rounds: u32,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Medium,
            category: "general".to_string(),
            round_duration_secs: 80,
            max_rounds: 3,
        }
    }
}

// ---------------------------------------------------------------------------
// GamePhase
// ---------------------------------------------------------------------------

/// The state-machine phase of a room's game.
///
/// ```text
///            start            expiry / all guessed        reveal delay
///   Lobby ─────────► RoundActive ─────────────► RoundResolving ─────┐
///                        ▲                                          │
///                        └────────────── next turn ─────────────────┤
///                                                                   ▼
///                                                               GameOver
/// ```
///
/// `endGame` jumps to `GameOver` from either active phase. An empty room
/// falls back to `Lobby` from anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GamePhase {
    #[default]
    Lobby,
    RoundActive,
    RoundResolving,
    GameOver,
}

impl GamePhase {
    /// Returns `true` while a game is in progress (a turn is running or
    /// its word is being revealed).
    pub fn is_active(&self) -> bool {
        matches!(self, Self::RoundActive | Self::RoundResolving)
    }

    /// Returns `true` if guesses are scored in this phase.
    pub fn accepts_guesses(&self) -> bool {
        matches!(self, Self::RoundActive)
    }

    /// Returns `true` if new participants may join.
    pub fn is_joinable(&self) -> bool {
        !matches!(self, Self::GameOver)
    }

    /// Returns `true` if the state machine may move from `self` to
    /// `target` in one step.
    pub fn can_transition_to(self, target: Self) -> bool {
        use GamePhase::*;
        match (self, target) {
            (_, Lobby) => true,
            (Lobby, RoundActive) => true,
            (RoundActive, RoundResolving) => true,
            (RoundResolving, RoundActive) => true,
            (RoundActive | RoundResolving, GameOver) => true,
            _ => false,
        }
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lobby => write!(f, "Lobby"),
            Self::RoundActive => write!(f, "RoundActive"),
            Self::RoundResolving => write!(f, "RoundResolving"),
            Self::GameOver => write!(f, "GameOver"),
        }
    }
}
