//! Room configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use sketchroom_protocol::RoomSettings;
use tracing::warn;

/// Configuration for one room.
///
/// `settings` is what players see and pick; the rest is server tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Player-visible settings (difficulty, category, duration, rounds).
    pub settings: RoomSettings,

    /// Minimum participants needed to start. Never below 2.
    pub min_players: usize,

    /// Maximum participants allowed in the room.
    pub max_players: usize,

    /// Share of each correct guess credited to the drawer, in percent.
    pub drawer_bonus_percent: u32,

    /// How long the word stays revealed before the next turn.
    pub reveal_delay: Duration,

    /// How long a finished room lingers before it is torn down.
    pub game_over_grace: Duration,

    /// How long a disconnected participant keeps their seat.
    pub reconnect_grace: Duration,

    /// Upper bound on waiting for the word source at game start.
    pub word_source_timeout: Duration,

    /// Save attempts per state change before giving up.
    pub store_retry_attempts: u32,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            settings: RoomSettings::default(),
            min_players: 2,
            max_players: 8,
            drawer_bonus_percent: 20,
            reveal_delay: Duration::from_secs(5),
            game_over_grace: Duration::from_secs(30),
            reconnect_grace: Duration::from_secs(60),
            word_source_timeout: Duration::from_secs(5),
            store_retry_attempts: 3,
        }
    }
}

impl RoomConfig {
    pub const MIN_ROUND_SECS: u32 = 10;
    pub const MAX_ROUND_SECS: u32 = 600;
    pub const MAX_ROUNDS: u32 = 20;
    pub const MAX_PLAYERS: usize = 50;

    /// Returns a copy of this config with different player settings.
    pub fn with_settings(mut self, settings: RoomSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Clamp and fix any out-of-range values so the config is safe to use.
    ///
    /// - round duration clamped to `10..=600` seconds
    /// - max rounds clamped to `1..=20`
    /// - `min_players` in `2..=50`, `max_players` in `min_players..=50`
    /// - drawer bonus at most 100 %
    /// - at least one store attempt
    pub fn validated(mut self) -> Self {
        let secs = self.settings.round_duration_secs;
        let clamped = secs.clamp(Self::MIN_ROUND_SECS, Self::MAX_ROUND_SECS);
        if clamped != secs {
            warn!(secs, clamped, "round_duration_secs out of range, clamping");
            self.settings.round_duration_secs = clamped;
        }

        let rounds = self.settings.max_rounds;
        let clamped = rounds.clamp(1, Self::MAX_ROUNDS);
        if clamped != rounds {
            warn!(rounds, clamped, "max_rounds out of range, clamping");
            self.settings.max_rounds = clamped;
        }

        let min = self.min_players.clamp(2, Self::MAX_PLAYERS);
        if min != self.min_players {
            warn!(min_players = self.min_players, clamped = min, "min_players out of range, clamping");
            self.min_players = min;
        }
        let max = self.max_players.clamp(self.min_players, Self::MAX_PLAYERS);
        if max != self.max_players {
            warn!(max_players = self.max_players, clamped = max, "max_players out of range, clamping");
            self.max_players = max;
        }

        if self.drawer_bonus_percent > 100 {
            warn!(percent = self.drawer_bonus_percent, "drawer_bonus_percent above 100, clamping");
            self.drawer_bonus_percent = 100;
        }

        self.store_retry_attempts = self.store_retry_attempts.max(1);
        self.settings.category = self.settings.category.trim().to_lowercase();
        if self.settings.category.is_empty() {
            self.settings.category = RoomSettings::default().category;
        }
        self
    }

    /// Length of one turn.
    pub fn round_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.settings.round_duration_secs))
    }

    /// Words to request at game start for `participants` players.
    ///
    /// Enough to cover every turn of the game without repeats when the
    /// source delivers the full batch.
    pub fn word_batch_size(&self, participants: usize) -> usize {
        (participants * 3).max(20) + 2
    }
}
