//! Round countdown and one-shot alarms for Sketchroom.
//!
//! Both types are plain state owned by a room actor. Nothing here spawns
//! a task: time only passes for a timer while the actor is polling it,
//! so cancelling is a synchronous state change and an event can never be
//! delivered for a countdown that was already cancelled.
//!
//! # Integration
//!
//! Both futures are cancel safe and pend forever while idle, so they sit
//! directly inside the actor's `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* may call timer.cancel() */ }
//!         event = timer.next_event() => { /* Tick or Expired */ }
//!         (key, token) = alarms.next() => { /* reveal delay, cleanup, ... */ }
//!     }
//! }
//! ```

mod alarm;

pub use alarm::Alarms;

use std::fmt;
use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Tokens and events
// ---------------------------------------------------------------------------

/// Generation number of one countdown or alarm.
///
/// Every `start`/`arm` hands out a fresh token. Events carry the token of
/// the instance that produced them, so the owner can refuse anything that
/// does not belong to the round it is currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(u64);

impl TimerToken {
    /// Returns the raw generation number.
    pub fn into_inner(self) -> u64 {
        self.0
    }

    fn bump(generation: &mut u64) -> Self {
        *generation += 1;
        Self(*generation)
    }
}

impl fmt::Display for TimerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// What a running countdown produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// Periodic tick. `remaining_secs` is rounded up, so a countdown of
    /// 30 s ticks 29, 28, ... 1.
    Tick { token: TimerToken, remaining_secs: u32 },
    /// Time is up. Emitted once, after which the countdown is gone.
    Expired { token: TimerToken },
}

impl TimerEvent {
    /// The countdown that produced this event.
    pub fn token(&self) -> TimerToken {
        match self {
            Self::Tick { token, .. } | Self::Expired { token } => *token,
        }
    }
}

/// Errors from [`RoundTimer`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TimerError {
    /// `start` was called while a countdown is still running. Cancel it
    /// first.
    #[error("countdown {0} is still running")]
    AlreadyActive(TimerToken),
}

// ---------------------------------------------------------------------------
// RoundTimer
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Countdown {
    token: TimerToken,
    started: Instant,
    deadline: Instant,
    next_tick: Instant,
}

/// A single cancellable countdown with a fixed tick cadence.
///
/// At most one countdown exists per `RoundTimer`. Starting a second one
/// while the first is live is refused with [`TimerError::AlreadyActive`].
#[derive(Debug)]
pub struct RoundTimer {
    cadence: Duration,
    generation: u64,
    active: Option<Countdown>,
}

impl RoundTimer {
    /// Tick cadence used by [`RoundTimer::new`].
    pub const DEFAULT_CADENCE: Duration = Duration::from_secs(1);

    /// Smallest cadence accepted by [`RoundTimer::with_cadence`].
    pub const MIN_CADENCE: Duration = Duration::from_millis(1);

    /// Creates an idle timer that ticks once per second.
    pub fn new() -> Self {
        Self::with_cadence(Self::DEFAULT_CADENCE)
    }

    /// Creates an idle timer with a custom tick cadence.
    pub fn with_cadence(cadence: Duration) -> Self {
        let cadence = if cadence < Self::MIN_CADENCE {
            warn!(?cadence, min = ?Self::MIN_CADENCE, "timer cadence too small, clamping");
            Self::MIN_CADENCE
        } else {
            cadence
        };
        Self {
            cadence,
            generation: 0,
            active: None,
        }
    }

    /// Starts a countdown of `duration`.
    ///
    /// # Errors
    /// [`TimerError::AlreadyActive`] if a countdown is already running.
    pub fn start(&mut self, duration: Duration) -> Result<TimerToken, TimerError> {
        if let Some(current) = &self.active {
            return Err(TimerError::AlreadyActive(current.token));
        }
        let now = Instant::now();
        let token = TimerToken::bump(&mut self.generation);
        self.active = Some(Countdown {
            token,
            started: now,
            deadline: now + duration,
            next_tick: now + self.cadence,
        });
        debug!(%token, secs = duration.as_secs_f64(), "countdown started");
        Ok(token)
    }

    /// Cancels the running countdown, if any.
    ///
    /// Idempotent. Once this returns, [`next_event`](Self::next_event) will
    /// not yield anything for the cancelled countdown.
    pub fn cancel(&mut self) -> Option<TimerToken> {
        let token = self.active.take().map(|c| c.token);
        if let Some(token) = token {
            debug!(%token, "countdown cancelled");
        }
        token
    }

    /// Whether a countdown is running.
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Token of the running countdown.
    pub fn token(&self) -> Option<TimerToken> {
        self.active.as_ref().map(|c| c.token)
    }

    /// Returns `true` if `token` belongs to the running countdown.
    pub fn is_current(&self, token: TimerToken) -> bool {
        self.token() == Some(token)
    }

    /// Time left on the running countdown.
    pub fn remaining(&self) -> Option<Duration> {
        self.active
            .as_ref()
            .map(|c| c.deadline.saturating_duration_since(Instant::now()))
    }

    /// Time left, in whole seconds rounded up.
    pub fn remaining_secs(&self) -> Option<u32> {
        self.remaining().map(ceil_secs)
    }

    /// Time since the running countdown started.
    pub fn elapsed(&self) -> Option<Duration> {
        self.active.as_ref().map(|c| c.started.elapsed())
    }

    /// The configured tick cadence.
    pub fn cadence(&self) -> Duration {
        self.cadence
    }

    /// Waits for the next tick or the expiry of the running countdown.
    ///
    /// Pends forever while idle. Cancel safe: state only changes after the
    /// sleep completes, so dropping this future inside `select!` loses
    /// nothing.
    pub async fn next_event(&mut self) -> TimerEvent {
        let wake = match &self.active {
            Some(c) => c.next_tick.min(c.deadline),
            None => return std::future::pending::<TimerEvent>().await,
        };

        time::sleep_until(wake).await;

        let now = Instant::now();
        let cadence = self.cadence;
        match self.active.as_mut() {
            Some(c) if now < c.deadline => {
                while c.next_tick <= now {
                    c.next_tick += cadence;
                }
                let remaining_secs = ceil_secs(c.deadline - now);
                trace!(token = %c.token, remaining_secs, "countdown tick");
                TimerEvent::Tick {
                    token: c.token,
                    remaining_secs,
                }
            }
            Some(_) => match self.active.take() {
                Some(c) => {
                    debug!(token = %c.token, "countdown expired");
                    TimerEvent::Expired { token: c.token }
                }
                None => std::future::pending::<TimerEvent>().await,
            },
            None => std::future::pending::<TimerEvent>().await,
        }
    }
}

impl Default for RoundTimer {
    fn default() -> Self {
        Self::new()
    }
}

fn ceil_secs(d: Duration) -> u32 {
    let whole = d.as_secs() + u64::from(d.subsec_nanos() > 0);
    u32::try_from(whole).unwrap_or(u32::MAX)
}
