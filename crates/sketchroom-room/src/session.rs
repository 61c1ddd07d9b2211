//! The turn/round state machine of one room.
//!
//! [`RoomSession`] is plain synchronous state. Every operation mutates it
//! and returns the [`Outbound`] deltas to deliver; the room actor owns the
//! session, applies operations one at a time, and fans the deltas out.
//! The round timer and alarms live inside the session, so cancelling them
//! is part of the same state change that ends a round.

use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sketchroom_protocol::{
    Difficulty, GamePhase, GameView, LeaderboardEntry, ParticipantView, Recipient, RoomId,
    RoomSettings, RoomSnapshot, ServerEvent, UserId, mask_word,
};
use sketchroom_timer::{Alarms, RoundTimer, TimerEvent, TimerToken};

use crate::scoring::{drawer_bonus, guess_points};
use crate::store::RoomDocument;
use crate::{RoomConfig, RoomError, WordPool};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// A member of the room. Position in the participant list is turn order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub user_id: UserId,
    pub username: String,
    pub score: u32,
    /// Whether a transport handle is bound. Not persisted.
    #[serde(skip)]
    pub connected: bool,
}

/// Game progress. `current_turn_index` is meaningful only outside the
/// lobby and always indexes a live participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub phase: GamePhase,
    /// 1-based; 0 in the lobby.
    pub current_round: u32,
    pub current_turn_index: usize,
    /// Set while a turn is running or being revealed.
    pub current_word: Option<String>,
    /// Drawer of the current turn. Kept separately from the index so a
    /// drawer who left mid-reveal is still reported correctly.
    pub drawer_id: Option<UserId>,
    /// Unix milliseconds when the current turn began.
    pub round_started_at: Option<u64>,
    pub max_rounds: u32,
    /// Turns started this game.
    pub turns_played: u32,
}

impl GameState {
    /// A fresh lobby state.
    pub fn lobby(max_rounds: u32) -> Self {
        Self {
            phase: GamePhase::Lobby,
            current_round: 0,
            current_turn_index: 0,
            current_word: None,
            drawer_id: None,
            round_started_at: None,
            max_rounds,
            turns_played: 0,
        }
    }
}

/// Deadlines owned by a room besides the round countdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlarmKey {
    /// End of the word reveal; advance to the next turn.
    Reveal,
    /// End of the game-over grace window; tear the room down.
    Cleanup,
    /// A disconnected participant's seat expires.
    Evict(UserId),
}

/// A delta produced by the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Deliver an event as-is.
    Event(Recipient, ServerEvent),
    /// Deliver a snapshot, rendered per recipient at dispatch time.
    Snapshot(Recipient),
    /// The room is empty or finished; persist nothing more and shut down.
    Close,
}

impl Outbound {
    /// Snapshots mark state changes worth persisting.
    pub fn changes_state(&self) -> bool {
        matches!(self, Self::Snapshot(_) | Self::Close)
    }
}

/// A timer or alarm that came due.
#[derive(Debug, Clone, PartialEq)]
pub enum Scheduled {
    Timer(TimerEvent),
    Alarm(AlarmKey, TimerToken),
}

/// What the actor must fetch from the word source before [`RoomSession::start`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordRequest {
    pub difficulty: Difficulty,
    pub category: String,
    pub count: usize,
}

/// Trims, collapses inner whitespace, and lowercases a guess or word.
pub fn normalize_guess(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// RoomSession
// ---------------------------------------------------------------------------

/// Authoritative in-memory state of one room.
#[derive(Debug)]
pub struct RoomSession {
    room_id: RoomId,
    name: String,
    config: RoomConfig,
    host_id: UserId,
    participants: Vec<Participant>,
    state: GameState,
    pool: WordPool,
    solved: HashSet<UserId>,
    /// Set when the drawer left: the index that now holds the next drawer.
    pending_turn: Option<usize>,
    /// Countdown token of the running turn; anything else is stale.
    round_token: Option<TimerToken>,
    timer: RoundTimer,
    alarms: Alarms<AlarmKey>,
}

impl RoomSession {
    /// Creates an empty room in the lobby.
    pub fn new(room_id: RoomId, name: impl Into<String>, host_id: UserId, config: RoomConfig) -> Self {
        let config = config.validated();
        Self {
            state: GameState::lobby(config.settings.max_rounds),
            room_id,
            name: name.into(),
            config,
            host_id,
            participants: Vec::new(),
            pool: WordPool::new(),
            solved: HashSet::new(),
            pending_turn: None,
            round_token: None,
            timer: RoundTimer::new(),
            alarms: Alarms::new(),
        }
    }

    /// Rebuilds a room from its stored document.
    ///
    /// Timers do not survive a restart, so the room comes back in the
    /// lobby with participants and scores intact. Everyone starts out
    /// disconnected with a reconnect window running.
    pub fn restore(doc: RoomDocument, config: RoomConfig) -> Self {
        let mut session = Self::new(
            doc.room_id,
            doc.name,
            doc.host_id,
            config.with_settings(doc.settings),
        );
        session.participants = doc
            .participants
            .into_iter()
            .map(|p| Participant {
                connected: false,
                ..p
            })
            .collect();
        let grace = session.config.reconnect_grace;
        for p in &session.participants {
            session.alarms.arm(AlarmKey::Evict(p.user_id.clone()), grace);
        }
        tracing::info!(
            room_id = %session.room_id,
            participants = session.participants.len(),
            previous_phase = %doc.game.phase,
            "room restored from store"
        );
        session
    }

    // -- accessors --

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    pub fn host_id(&self) -> &UserId {
        &self.host_id
    }

    pub fn phase(&self) -> GamePhase {
        self.state.phase
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn participant(&self, user: &UserId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.user_id == user)
    }

    /// The participant drawing in the current turn.
    pub fn drawer(&self) -> Option<&UserId> {
        self.state.drawer_id.as_ref()
    }

    pub fn has_solved(&self, user: &UserId) -> bool {
        self.solved.contains(user)
    }

    pub fn words_left(&self) -> usize {
        self.pool.len()
    }

    /// Whether the round countdown is running.
    pub fn timer_active(&self) -> bool {
        self.timer.is_active()
    }

    /// Token of the running turn's countdown.
    pub fn round_token(&self) -> Option<TimerToken> {
        self.round_token
    }

    pub fn is_armed(&self, key: &AlarmKey) -> bool {
        self.alarms.is_armed(key)
    }

    /// Final or current standings, highest score first. Ties keep turn
    /// order.
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let mut board: Vec<LeaderboardEntry> = self
            .participants
            .iter()
            .map(|p| LeaderboardEntry {
                user_id: p.user_id.clone(),
                username: p.username.clone(),
                score: p.score,
            })
            .collect();
        board.sort_by(|a, b| b.score.cmp(&a.score));
        board
    }

    // -- membership --

    /// Adds a participant, or rebinds a known one.
    ///
    /// A rejoin only flips the participant back to connected: their score
    /// and turn position are untouched and no duplicate entry is created.
    pub fn join(&mut self, user_id: &UserId, username: &str) -> Result<Vec<Outbound>, RoomError> {
        let username = username.trim();
        if user_id.as_str().trim().is_empty() {
            return Err(RoomError::Invalid("userId must not be empty".into()));
        }
        if username.is_empty() {
            return Err(RoomError::Invalid("username must not be empty".into()));
        }

        if let Some(p) = self.participants.iter_mut().find(|p| &p.user_id == user_id) {
            p.connected = true;
            p.username = username.to_string();
            self.alarms.disarm(&AlarmKey::Evict(user_id.clone()));
            tracing::info!(room_id = %self.room_id, %user_id, "participant rejoined");

            let mut out = Vec::new();
            if self.state.phase == GamePhase::RoundActive && self.drawer() == Some(user_id) {
                if let Some(word) = &self.state.current_word {
                    out.push(Outbound::Event(
                        Recipient::User(user_id.clone()),
                        ServerEvent::SecretWord { word: word.clone() },
                    ));
                }
            }
            out.push(Outbound::Snapshot(Recipient::All));
            return Ok(out);
        }

        if !self.state.phase.is_joinable() {
            return Err(RoomError::WrongPhase {
                action: "join",
                phase: self.state.phase,
            });
        }
        if self.participants.len() >= self.config.max_players {
            return Err(RoomError::RoomFull(self.room_id.clone()));
        }

        self.participants.push(Participant {
            user_id: user_id.clone(),
            username: username.to_string(),
            score: 0,
            connected: true,
        });
        tracing::info!(
            room_id = %self.room_id,
            %user_id,
            participants = self.participants.len(),
            "participant joined"
        );
        Ok(vec![Outbound::Snapshot(Recipient::All)])
    }

    /// Marks a participant's transport as gone and starts their
    /// reconnect window. Game state is unaffected.
    pub fn disconnect(&mut self, user_id: &UserId) -> Vec<Outbound> {
        let Some(p) = self.participants.iter_mut().find(|p| &p.user_id == user_id) else {
            return Vec::new();
        };
        if !p.connected {
            return Vec::new();
        }
        p.connected = false;
        self.alarms
            .arm(AlarmKey::Evict(user_id.clone()), self.config.reconnect_grace);
        tracing::info!(room_id = %self.room_id, %user_id, "participant disconnected");
        vec![Outbound::Snapshot(Recipient::All)]
    }

    /// Removes a participant for good.
    pub fn leave(&mut self, user_id: &UserId) -> Result<Vec<Outbound>, RoomError> {
        let idx = self
            .participants
            .iter()
            .position(|p| &p.user_id == user_id)
            .ok_or_else(|| RoomError::NotInRoom(user_id.clone(), self.room_id.clone()))?;

        self.alarms.disarm(&AlarmKey::Evict(user_id.clone()));
        self.participants.remove(idx);
        self.solved.remove(user_id);
        tracing::info!(
            room_id = %self.room_id,
            %user_id,
            participants = self.participants.len(),
            "participant left"
        );

        let mut out = Vec::new();
        if self.participants.is_empty() {
            self.reset_to_lobby();
            out.push(Outbound::Close);
            return Ok(out);
        }

        if &self.host_id == user_id {
            self.host_id = self.participants[0].user_id.clone();
            tracing::info!(room_id = %self.room_id, host = %self.host_id, "host handed off");
        }

        let remaining = self.participants.len();
        if self.state.phase.is_active() {
            let was_drawer = self.drawer() == Some(user_id);
            if let Some(pending) = self.pending_turn.as_mut() {
                if idx < *pending {
                    *pending -= 1;
                }
            }
            if idx < self.state.current_turn_index {
                self.state.current_turn_index -= 1;
            } else if was_drawer {
                // Whoever slid into the drawer's slot draws next.
                self.pending_turn = Some(idx);
            }
            self.state.current_turn_index = self.state.current_turn_index.min(remaining - 1);

            if remaining < self.config.min_players {
                self.finish_game(&mut out);
            } else if self.state.phase == GamePhase::RoundActive
                && (was_drawer || self.everyone_solved())
            {
                self.end_round(&mut out);
            }
        } else {
            self.state.current_turn_index = self.state.current_turn_index.min(remaining - 1);
        }

        out.push(Outbound::Snapshot(Recipient::All));
        Ok(out)
    }

    // -- game flow --

    /// Validates a start request and describes the words it needs.
    pub fn prepare_start(&self, caller: &UserId) -> Result<WordRequest, RoomError> {
        if self.state.phase != GamePhase::Lobby {
            return Err(RoomError::WrongPhase {
                action: "start",
                phase: self.state.phase,
            });
        }
        if caller != &self.host_id {
            return Err(RoomError::NotHost(caller.clone()));
        }
        let have = self.participants.len();
        let need = self.config.min_players;
        if have < need {
            return Err(RoomError::InsufficientPlayers { have, need });
        }
        Ok(WordRequest {
            difficulty: self.config.settings.difficulty,
            category: self.config.settings.category.clone(),
            count: self.config.word_batch_size(have),
        })
    }

    /// Starts a game with a freshly fetched word batch.
    ///
    /// Scores reset to zero and the participant at index 0 draws first.
    /// An empty batch leaves the room in the lobby.
    pub fn start(&mut self, caller: &UserId, words: Vec<String>) -> Result<Vec<Outbound>, RoomError> {
        self.prepare_start(caller)?;

        let pool = WordPool::from_words(words);
        if pool.is_empty() {
            tracing::warn!(room_id = %self.room_id, "word source returned no words");
            return Err(RoomError::WordsUnavailable);
        }
        self.pool = pool;

        for p in &mut self.participants {
            p.score = 0;
        }
        self.state = GameState {
            current_round: 1,
            ..GameState::lobby(self.config.settings.max_rounds)
        };
        self.solved.clear();
        self.pending_turn = None;
        self.alarms.disarm(&AlarmKey::Cleanup);

        tracing::info!(
            room_id = %self.room_id,
            participants = self.participants.len(),
            words = self.pool.len(),
            max_rounds = self.state.max_rounds,
            "game started"
        );

        let mut out = Vec::new();
        self.start_turn(&mut out);
        out.push(Outbound::Snapshot(Recipient::All));
        Ok(out)
    }

    /// Scores a guess.
    ///
    /// Guesses outside a running turn, from the drawer, from someone who
    /// already solved this turn, or that are blank are ignored. A miss is
    /// relayed as chat.
    pub fn submit_guess(&mut self, user_id: &UserId, text: &str) -> Result<Vec<Outbound>, RoomError> {
        if self.participant(user_id).is_none() {
            return Err(RoomError::NotInRoom(user_id.clone(), self.room_id.clone()));
        }
        if !self.state.phase.accepts_guesses()
            || self.drawer() == Some(user_id)
            || self.solved.contains(user_id)
        {
            return Ok(Vec::new());
        }
        let guess = normalize_guess(text);
        if guess.is_empty() {
            return Ok(Vec::new());
        }
        let Some(word) = self.state.current_word.as_deref() else {
            return Ok(Vec::new());
        };

        if normalize_guess(word) != guess {
            return Ok(vec![Outbound::Event(
                Recipient::All,
                ServerEvent::ChatMessage {
                    user_id: user_id.clone(),
                    text: text.trim().to_string(),
                },
            )]);
        }

        let remaining = self.timer.remaining_secs().unwrap_or(0);
        let points = guess_points(remaining, self.config.settings.round_duration_secs);
        let bonus = drawer_bonus(points, self.config.drawer_bonus_percent);
        let drawer = self.state.drawer_id.clone();
        for p in &mut self.participants {
            if &p.user_id == user_id {
                p.score = p.score.saturating_add(points);
            } else if Some(&p.user_id) == drawer.as_ref() {
                p.score = p.score.saturating_add(bonus);
            }
        }
        self.solved.insert(user_id.clone());
        tracing::info!(
            room_id = %self.room_id,
            %user_id,
            points,
            drawer_bonus = bonus,
            remaining_secs = remaining,
            "correct guess"
        );

        let mut out = vec![Outbound::Event(
            Recipient::All,
            ServerEvent::PlayerGuessed {
                user_id: user_id.clone(),
                points,
            },
        )];
        if self.everyone_solved() {
            self.end_round(&mut out);
        }
        out.push(Outbound::Snapshot(Recipient::All));
        Ok(out)
    }

    /// Host-only early finish from either active phase.
    pub fn end_game(&mut self, caller: &UserId) -> Result<Vec<Outbound>, RoomError> {
        if caller != &self.host_id {
            return Err(RoomError::NotHost(caller.clone()));
        }
        if !self.state.phase.is_active() {
            return Err(RoomError::WrongPhase {
                action: "end the game",
                phase: self.state.phase,
            });
        }
        let mut out = Vec::new();
        self.finish_game(&mut out);
        out.push(Outbound::Snapshot(Recipient::All));
        Ok(out)
    }

    /// Relays a stroke from the drawer to everyone else.
    pub fn draw(&self, user_id: &UserId, stroke: String) -> Result<Vec<Outbound>, RoomError> {
        self.check_drawer(user_id, "draw")?;
        Ok(vec![Outbound::Event(
            Recipient::AllExcept(user_id.clone()),
            ServerEvent::Stroke {
                user_id: user_id.clone(),
                stroke,
            },
        )])
    }

    /// Wipes the canvas for everyone.
    pub fn clear_canvas(&self, user_id: &UserId) -> Result<Vec<Outbound>, RoomError> {
        self.check_drawer(user_id, "clear the canvas")?;
        Ok(vec![Outbound::Event(Recipient::All, ServerEvent::CanvasCleared)])
    }

    fn check_drawer(&self, user_id: &UserId, action: &'static str) -> Result<(), RoomError> {
        if self.state.phase != GamePhase::RoundActive {
            return Err(RoomError::WrongPhase {
                action,
                phase: self.state.phase,
            });
        }
        if self.drawer() != Some(user_id) {
            return Err(RoomError::NotDrawer(user_id.clone()));
        }
        Ok(())
    }

    // -- scheduled events --

    /// Waits for the round countdown or the earliest alarm.
    ///
    /// Pends forever when nothing is scheduled. Cancel safe.
    pub async fn next_scheduled(&mut self) -> Scheduled {
        tokio::select! {
            event = self.timer.next_event() => Scheduled::Timer(event),
            (key, token) = self.alarms.next() => Scheduled::Alarm(key, token),
        }
    }

    /// Applies a due timer or alarm.
    pub fn on_scheduled(&mut self, scheduled: Scheduled) -> Vec<Outbound> {
        match scheduled {
            Scheduled::Timer(event) => self.on_timer(event),
            Scheduled::Alarm(key, _) => self.on_alarm(key),
        }
    }

    /// Applies a countdown event, discarding any that does not belong to
    /// the running turn.
    pub fn on_timer(&mut self, event: TimerEvent) -> Vec<Outbound> {
        let current =
            self.round_token == Some(event.token()) && self.state.phase == GamePhase::RoundActive;
        if !current {
            tracing::debug!(room_id = %self.room_id, token = %event.token(), "discarding stale timer event");
            return Vec::new();
        }
        match event {
            TimerEvent::Tick { remaining_secs, .. } => vec![Outbound::Event(
                Recipient::All,
                ServerEvent::TimerTick {
                    seconds_remaining: remaining_secs,
                },
            )],
            TimerEvent::Expired { .. } => {
                tracing::info!(room_id = %self.room_id, round = self.state.current_round, "turn timed out");
                let mut out = Vec::new();
                self.end_round(&mut out);
                out.push(Outbound::Snapshot(Recipient::All));
                out
            }
        }
    }

    /// Applies an alarm.
    pub fn on_alarm(&mut self, key: AlarmKey) -> Vec<Outbound> {
        match key {
            AlarmKey::Reveal if self.state.phase == GamePhase::RoundResolving => {
                let mut out = Vec::new();
                self.advance_turn(&mut out);
                out.push(Outbound::Snapshot(Recipient::All));
                out
            }
            AlarmKey::Cleanup if self.state.phase == GamePhase::GameOver => {
                tracing::info!(room_id = %self.room_id, "game-over grace elapsed");
                vec![Outbound::Close]
            }
            AlarmKey::Evict(user_id) => match self.participant(&user_id) {
                Some(p) if !p.connected => {
                    tracing::info!(room_id = %self.room_id, %user_id, "reconnect window expired");
                    self.leave(&user_id).unwrap_or_default()
                }
                _ => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    // -- transitions --

    fn enter(&mut self, phase: GamePhase) {
        debug_assert!(
            self.state.phase.can_transition_to(phase),
            "illegal phase change {} -> {}",
            self.state.phase,
            phase
        );
        tracing::debug!(room_id = %self.room_id, from = %self.state.phase, to = %phase, "phase change");
        self.state.phase = phase;
    }

    fn everyone_solved(&self) -> bool {
        let drawer = self.drawer();
        let mut guessers = self
            .participants
            .iter()
            .filter(|p| Some(&p.user_id) != drawer)
            .peekable();
        guessers.peek().is_some() && guessers.all(|p| self.solved.contains(&p.user_id))
    }

    /// Draws a word and hands the turn to the participant at
    /// `current_turn_index`. An exhausted pool ends the game.
    fn start_turn(&mut self, out: &mut Vec<Outbound>) {
        let Some(drawer) = self
            .participants
            .get(self.state.current_turn_index)
            .map(|p| p.user_id.clone())
        else {
            self.finish_game(out);
            return;
        };
        let Some(word) = self.pool.draw() else {
            tracing::info!(room_id = %self.room_id, "word pool exhausted");
            self.finish_game(out);
            return;
        };

        self.timer.cancel();
        self.round_token = match self.timer.start(self.config.round_duration()) {
            Ok(token) => Some(token),
            Err(e) => {
                tracing::error!(room_id = %self.room_id, error = %e, "could not start round timer");
                None
            }
        };
        self.solved.clear();
        self.enter(GamePhase::RoundActive);
        self.state.current_word = Some(word.clone());
        self.state.drawer_id = Some(drawer.clone());
        self.state.round_started_at = Some(unix_millis());
        self.state.turns_played += 1;

        tracing::info!(
            room_id = %self.room_id,
            round = self.state.current_round,
            turn = self.state.turns_played,
            drawer = %drawer,
            "turn started"
        );
        out.push(Outbound::Event(
            Recipient::All,
            ServerEvent::TurnStarted {
                drawer_id: drawer.clone(),
                round: self.state.current_round,
            },
        ));
        out.push(Outbound::Event(
            Recipient::User(drawer),
            ServerEvent::SecretWord { word },
        ));
    }

    /// Stops the countdown and reveals the word.
    fn end_round(&mut self, out: &mut Vec<Outbound>) {
        self.timer.cancel();
        self.round_token = None;
        self.enter(GamePhase::RoundResolving);
        let word = self.state.current_word.clone().unwrap_or_default();
        out.push(Outbound::Event(Recipient::All, ServerEvent::RoundResolved { word }));
        out.push(Outbound::Event(Recipient::All, ServerEvent::CanvasCleared));
        self.alarms.arm(AlarmKey::Reveal, self.config.reveal_delay);
    }

    /// Moves to the next drawer, bumping the round on wrap-around.
    fn advance_turn(&mut self, out: &mut Vec<Outbound>) {
        self.solved.clear();
        let n = self.participants.len();
        if n < self.config.min_players {
            self.finish_game(out);
            return;
        }
        let next = self
            .pending_turn
            .take()
            .unwrap_or(self.state.current_turn_index + 1);
        if next >= n {
            self.state.current_turn_index = 0;
            self.state.current_round += 1;
        } else {
            self.state.current_turn_index = next;
        }
        if self.state.current_round > self.state.max_rounds {
            self.finish_game(out);
            return;
        }
        self.start_turn(out);
    }

    fn finish_game(&mut self, out: &mut Vec<Outbound>) {
        self.timer.cancel();
        self.round_token = None;
        self.alarms.disarm(&AlarmKey::Reveal);
        self.pending_turn = None;
        self.solved.clear();
        self.enter(GamePhase::GameOver);
        self.state.current_word = None;
        self.state.drawer_id = None;
        self.state.current_round = self.state.current_round.min(self.state.max_rounds);

        let leaderboard = self.leaderboard();
        tracing::info!(
            room_id = %self.room_id,
            turns = self.state.turns_played,
            winner = ?leaderboard.first().map(|e| &e.user_id),
            "game over"
        );
        out.push(Outbound::Event(Recipient::All, ServerEvent::GameOver { leaderboard }));
        self.alarms.arm(AlarmKey::Cleanup, self.config.game_over_grace);
    }

    fn reset_to_lobby(&mut self) {
        self.timer.cancel();
        self.alarms.clear();
        self.round_token = None;
        self.pending_turn = None;
        self.solved.clear();
        self.pool = WordPool::new();
        self.state = GameState::lobby(self.config.settings.max_rounds);
    }

    // -- views --

    /// Renders the snapshot `viewer` is allowed to see.
    pub fn snapshot_for(&self, viewer: &UserId) -> RoomSnapshot {
        let phase = self.state.phase;
        let word = self.state.current_word.as_deref();
        let (shown, masked) = match (phase, word) {
            (GamePhase::RoundActive, Some(w)) if self.drawer() == Some(viewer) => {
                (Some(w.to_string()), None)
            }
            (GamePhase::RoundActive, Some(w)) => (None, Some(mask_word(w))),
            (GamePhase::RoundResolving, Some(w)) => (Some(w.to_string()), None),
            _ => (None, None),
        };
        let in_game = phase != GamePhase::Lobby && !self.participants.is_empty();

        RoomSnapshot {
            room_id: self.room_id.clone(),
            name: self.name.clone(),
            host_id: self.host_id.clone(),
            settings: self.config.settings.clone(),
            game: GameView {
                phase,
                current_round: self.state.current_round,
                max_rounds: self.state.max_rounds,
                current_turn_index: in_game.then_some(self.state.current_turn_index),
                drawer_id: self.state.drawer_id.clone(),
                word: shown,
                word_mask: masked,
                seconds_remaining: if phase == GamePhase::RoundActive {
                    self.timer.remaining_secs()
                } else {
                    None
                },
                round_started_at: self.state.round_started_at,
            },
            participants: self
                .participants
                .iter()
                .map(|p| ParticipantView {
                    user_id: p.user_id.clone(),
                    username: p.username.clone(),
                    score: p.score,
                    connected: p.connected,
                    solved: self.solved.contains(&p.user_id),
                })
                .collect(),
            leaderboard: self.leaderboard(),
        }
    }

    /// The persisted form of this room.
    pub fn document(&self) -> RoomDocument {
        let mut solved: Vec<UserId> = self.solved.iter().cloned().collect();
        solved.sort();
        RoomDocument {
            room_id: self.room_id.clone(),
            name: self.name.clone(),
            host_id: self.host_id.clone(),
            settings: self.config.settings.clone(),
            participants: self.participants.clone(),
            game: self.state.clone(),
            remaining_words: self.pool.remaining().to_vec(),
            solved,
            saved_at: unix_millis(),
        }
    }

    /// Player-visible settings.
    pub fn settings(&self) -> &RoomSettings {
        &self.config.settings
    }
}
