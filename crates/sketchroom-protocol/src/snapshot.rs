//! The fixed room snapshot schema.
//!
//! Every state-changing event is followed by a full [`RoomSnapshot`] so
//! clients can replace their local copy wholesale instead of patching it.
//! A snapshot is rendered per recipient: only the drawer sees the secret
//! word while a turn is running.

use serde::{Deserialize, Serialize};

use crate::{GamePhase, RoomId, RoomSettings, UserId};

/// One row of the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub user_id: UserId,
    pub username: String,
    pub score: u32,
}

/// A participant as clients see them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantView {
    pub user_id: UserId,
    pub username: String,
    pub score: u32,
    /// `false` while the participant's transport is gone.
    pub connected: bool,
    /// Already guessed the word this turn.
    pub solved: bool,
}

/// The game portion of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub phase: GamePhase,
    pub current_round: u32,
    pub max_rounds: u32,
    /// Index into `participants`; absent in the lobby.
    pub current_turn_index: Option<usize>,
    pub drawer_id: Option<UserId>,
    /// The word itself, for the drawer during a turn and for everyone
    /// during the reveal.
    pub word: Option<String>,
    /// The word with letters blanked, for guessers during a turn.
    pub word_mask: Option<String>,
    pub seconds_remaining: Option<u32>,
    /// Unix milliseconds when the current turn began.
    pub round_started_at: Option<u64>,
}

/// Full room state, sent after every state-changing event and on
/// (re)join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    pub name: String,
    pub host_id: UserId,
    pub settings: RoomSettings,
    pub game: GameView,
    /// In turn order.
    pub participants: Vec<ParticipantView>,
    /// Sorted by score, highest first.
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// A room as it appears in `roomList`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub room_id: RoomId,
    pub name: String,
    pub phase: GamePhase,
    pub participant_count: usize,
    pub max_players: usize,
}

/// Blanks out every letter of `word`, keeping spaces and hyphens so
/// guessers can see the word's shape.
pub fn mask_word(word: &str) -> String {
    word.chars()
        .map(|c| if c.is_whitespace() || c == '-' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_word_keeps_shape() {
        assert_eq!(mask_word("cat"), "___");
        assert_eq!(mask_word("ice cream"), "___ _____");
        assert_eq!(mask_word("t-rex"), "_-___");
    }

    #[test]
    fn test_game_view_json_uses_camel_case() {
        let view = GameView {
            phase: GamePhase::RoundActive,
            current_round: 1,
            max_rounds: 3,
            current_turn_index: Some(0),
            drawer_id: Some(UserId::from("a")),
            word: None,
            word_mask: Some("___".into()),
            seconds_remaining: Some(42),
            round_started_at: Some(1_700_000_000_000),
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["phase"], "roundActive");
        assert_eq!(json["currentTurnIndex"], 0);
        assert_eq!(json["drawerId"], "a");
        assert_eq!(json["secondsRemaining"], 42);
        assert!(json["word"].is_null());
    }
}
