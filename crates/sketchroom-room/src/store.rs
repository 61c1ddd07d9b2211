//! Document store contract and the in-memory implementation.
//!
//! The store is the durability boundary, not the concurrency boundary:
//! each room's actor is the only writer of its document, and its
//! in-memory state wins whenever the two disagree.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use sketchroom_protocol::{RoomId, RoomSettings, UserId};
use tokio::sync::Mutex;

use crate::session::{GameState, Participant};

/// Errors reported by a [`RoomStore`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The backend could not be reached or refused the write.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// The persisted form of a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDocument {
    pub room_id: RoomId,
    pub name: String,
    pub host_id: UserId,
    pub settings: RoomSettings,
    pub participants: Vec<Participant>,
    pub game: GameState,
    pub remaining_words: Vec<String>,
    pub solved: Vec<UserId>,
    /// Unix milliseconds of the save.
    pub saved_at: u64,
}

/// Where room documents are kept between persistence points.
pub trait RoomStore: Send + Sync + 'static {
    /// Loads a room, `Ok(None)` if it was never saved or was deleted.
    fn get(
        &self,
        room_id: &RoomId,
    ) -> impl Future<Output = Result<Option<RoomDocument>, StoreError>> + Send;

    /// Inserts or overwrites a room.
    fn save(&self, doc: &RoomDocument) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Removes a room. Deleting a missing room is not an error.
    fn delete(&self, room_id: &RoomId) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// A [`RoomStore`] backed by a map, with failure injection for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<RoomId, RoomDocument>>,
    failing_saves: AtomicU32,
    saves: AtomicU64,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` calls to `save` fail with `Unavailable`.
    pub fn fail_next_saves(&self, n: u32) {
        self.failing_saves.store(n, Ordering::SeqCst);
    }

    /// Successful saves so far.
    pub fn save_count(&self) -> u64 {
        self.saves.load(Ordering::SeqCst)
    }

    /// Whether a document for `room_id` is stored.
    pub async fn contains(&self, room_id: &RoomId) -> bool {
        self.docs.lock().await.contains_key(room_id)
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.docs.lock().await.len()
    }

    /// Whether the store holds no documents.
    pub async fn is_empty(&self) -> bool {
        self.docs.lock().await.is_empty()
    }
}

impl RoomStore for MemoryStore {
    async fn get(&self, room_id: &RoomId) -> Result<Option<RoomDocument>, StoreError> {
        Ok(self.docs.lock().await.get(room_id).cloned())
    }

    async fn save(&self, doc: &RoomDocument) -> Result<(), StoreError> {
        let injected = self
            .failing_saves
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::Unavailable("injected failure".into()));
        }
        self.docs.lock().await.insert(doc.room_id.clone(), doc.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, room_id: &RoomId) -> Result<(), StoreError> {
        self.docs.lock().await.remove(room_id);
        Ok(())
    }
}

/// Delay before retry number `attempt` (1-based): 5 ms doubling to an
/// 80 ms cap, plus up to 3 ms of jitter.
pub(crate) fn backoff_delay(attempt: u32) -> Duration {
    let shift = attempt.saturating_sub(1).min(8);
    let base_ms = (5u64 << shift).min(80);
    let jitter_ms = rand::rng().random::<u64>() % 4;
    Duration::from_millis(base_ms + jitter_ms)
}
