//! Keyed one-shot alarms.

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::trace;

use crate::TimerToken;

#[derive(Debug)]
struct Entry<K> {
    key: K,
    at: Instant,
    token: TimerToken,
}

/// A small set of one-shot deadlines, at most one per key.
///
/// Arming a key that is already armed replaces its deadline, so a stale
/// deadline for the same key can never fire. Intended for a handful of
/// entries per room (reveal delay, cleanup grace, reconnect windows), so
/// lookups are linear.
#[derive(Debug)]
pub struct Alarms<K> {
    entries: Vec<Entry<K>>,
    generation: u64,
}

impl<K: PartialEq + std::fmt::Debug> Alarms<K> {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            generation: 0,
        }
    }

    /// Arms `key` to fire after `after`, replacing any earlier deadline
    /// for the same key.
    pub fn arm(&mut self, key: K, after: Duration) -> TimerToken {
        let token = TimerToken::bump(&mut self.generation);
        let at = Instant::now() + after;
        self.entries.retain(|e| e.key != key);
        trace!(?key, %token, ms = after.as_millis() as u64, "alarm armed");
        self.entries.push(Entry { key, at, token });
        token
    }

    /// Disarms `key`. Returns `true` if it was armed.
    pub fn disarm(&mut self, key: &K) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| &e.key != key);
        before != self.entries.len()
    }

    /// Disarms everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Whether `key` is armed.
    pub fn is_armed(&self, key: &K) -> bool {
        self.entries.iter().any(|e| &e.key == key)
    }

    /// Token of the armed deadline for `key`.
    pub fn token(&self, key: &K) -> Option<TimerToken> {
        self.entries.iter().find(|e| &e.key == key).map(|e| e.token)
    }

    /// Number of armed keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is armed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Waits for the earliest deadline, disarms it, and returns its key.
    ///
    /// Pends forever while nothing is armed. Cancel safe.
    pub async fn next(&mut self) -> (K, TimerToken) {
        let Some((at, token)) = self
            .entries
            .iter()
            .min_by_key(|e| (e.at, e.token))
            .map(|e| (e.at, e.token))
        else {
            return std::future::pending().await;
        };

        time::sleep_until(at).await;

        match self.entries.iter().position(|e| e.token == token) {
            Some(idx) => {
                let entry = self.entries.remove(idx);
                trace!(key = ?entry.key, %token, "alarm fired");
                (entry.key, entry.token)
            }
            None => std::future::pending().await,
        }
    }
}

impl<K: PartialEq + std::fmt::Debug> Default for Alarms<K> {
    fn default() -> Self {
        Self::new()
    }
}
