//! Room registry: creates, tracks, and revives room actors.

use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use sketchroom_protocol::{RoomId, RoomSettings, RoomSummary, UserId};
use tokio::sync::Mutex;

use crate::gateway::ClientHandle;
use crate::room::{RoomHandle, RoomInfo, spawn_room};
use crate::session::RoomSession;
use crate::{RoomConfig, RoomError, RoomStore, WordSource};

/// Default command channel size for room actors.
pub const DEFAULT_CHANNEL_SIZE: usize = 64;

/// Alphabet for room codes; no 0/O or 1/I so codes read back unambiguously.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LEN: usize = 6;

/// Maps room ids to their live coordinators.
///
/// The map lock only guards lookups and inserts. It is never held while
/// waiting on a room actor or the store, so a room that is busy (loading
/// words, retrying saves) never delays requests for any other room.
///
/// A room's actor exits on its own when the room empties or its
/// game-over grace runs out; the registry notices lazily and prunes the
/// dead handle on the next lookup.
pub struct RoomRegistry<S, W> {
    rooms: Mutex<HashMap<RoomId, RoomHandle>>,
    store: Arc<S>,
    words: Arc<W>,
    config: RoomConfig,
    channel_size: usize,
}

impl<S: RoomStore, W: WordSource> RoomRegistry<S, W> {
    /// Creates an empty registry. `config` is the template for new rooms.
    pub fn new(store: Arc<S>, words: Arc<W>, config: RoomConfig) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            store,
            words,
            config: config.validated(),
            channel_size: DEFAULT_CHANNEL_SIZE,
        }
    }

    /// The template config for new rooms.
    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Creates a new, empty room hosted by `host` and returns its code.
    ///
    /// The host still has to join it.
    pub async fn create_room(
        &self,
        host: UserId,
        name: &str,
        settings: Option<RoomSettings>,
    ) -> Result<RoomId, RoomError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RoomError::Invalid("room name must not be empty".into()));
        }
        let config = match settings {
            Some(settings) => self.config.clone().with_settings(settings),
            None => self.config.clone(),
        };

        let mut rooms = self.rooms.lock().await;
        rooms.retain(|_, handle| !handle.is_closed());
        let room_id = fresh_code(&rooms);
        let session = RoomSession::new(room_id.clone(), name, host.clone(), config);
        rooms.insert(room_id.clone(), self.spawn(session));
        tracing::info!(%room_id, %host, "room created");
        Ok(room_id)
    }

    fn spawn(&self, session: RoomSession) -> RoomHandle {
        spawn_room(
            session,
            Arc::clone(&self.store),
            Arc::clone(&self.words),
            self.channel_size,
        )
    }

    /// The live room for `room_id`, reviving it from the store if needed.
    ///
    /// The store is read without the map lock; if two callers revive the
    /// same room at once, the first insert wins and the other adopts it.
    pub async fn resolve(&self, room_id: &RoomId) -> Result<RoomHandle, RoomError> {
        if let Some(handle) = self.handle(room_id).await {
            return Ok(handle);
        }

        let doc = self
            .store
            .get(room_id)
            .await
            .map_err(|source| RoomError::Store {
                room_id: room_id.clone(),
                source,
            })?
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;

        let mut rooms = self.rooms.lock().await;
        if let Some(handle) = rooms.get(room_id).filter(|h| !h.is_closed()) {
            return Ok(handle.clone());
        }
        let handle = self.spawn(RoomSession::restore(doc, self.config.clone()));
        rooms.insert(room_id.clone(), handle.clone());
        tracing::info!(%room_id, "room revived from store");
        Ok(handle)
    }

    /// Joins `user_id` to a room, reviving it first if it is not live.
    ///
    /// A room that exits between lookup and join is resolved once more.
    pub async fn join(
        &self,
        room_id: &RoomId,
        user_id: UserId,
        username: &str,
        client: ClientHandle,
    ) -> Result<RoomHandle, RoomError> {
        let handle = self.resolve(room_id).await?;
        match handle.join(user_id.clone(), username, client.clone()).await {
            Err(RoomError::Unavailable(_)) => {
                self.forget(room_id, &handle).await;
                let handle = self.resolve(room_id).await?;
                handle.join(user_id, username, client).await?;
                Ok(handle)
            }
            result => result.map(|()| handle),
        }
    }

    /// Drops `stale` from the map, unless it was already replaced.
    async fn forget(&self, room_id: &RoomId, stale: &RoomHandle) {
        let mut rooms = self.rooms.lock().await;
        if rooms.get(room_id).is_some_and(|h| h.same_actor(stale)) {
            rooms.remove(room_id);
        }
    }

    /// The live handle for `room_id`, if any.
    pub async fn handle(&self, room_id: &RoomId) -> Option<RoomHandle> {
        let mut rooms = self.rooms.lock().await;
        match rooms.get(room_id) {
            Some(handle) if !handle.is_closed() => Some(handle.clone()),
            Some(_) => {
                rooms.remove(room_id);
                None
            }
            None => None,
        }
    }

    /// Returns info about a live room.
    pub async fn get_room_info(&self, room_id: &RoomId) -> Result<RoomInfo, RoomError> {
        let handle = self
            .handle(room_id)
            .await
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;
        handle.get_info().await
    }

    /// Summaries of every live room, sorted by id.
    ///
    /// Built from what each actor last published, so a busy room shows
    /// its previous state instead of holding up the list.
    pub async fn list_rooms(&self) -> Vec<RoomSummary> {
        let mut rooms: Vec<RoomSummary> = self
            .room_handles()
            .await
            .iter()
            .map(|handle| handle.latest_info().summary())
            .collect();
        rooms.sort_by(|a, b| a.room_id.cmp(&b.room_id));
        rooms
    }

    /// Cloned handles to all live rooms.
    pub async fn room_handles(&self) -> Vec<RoomHandle> {
        self.rooms
            .lock()
            .await
            .values()
            .filter(|h| !h.is_closed())
            .cloned()
            .collect()
    }

    /// Drops handles whose actor has exited. Returns how many went.
    pub async fn prune(&self) -> usize {
        let mut rooms = self.rooms.lock().await;
        let before = rooms.len();
        rooms.retain(|room_id, handle| {
            let live = !handle.is_closed();
            if !live {
                tracing::debug!(%room_id, "pruning closed room");
            }
            live
        });
        before - rooms.len()
    }

    /// Shuts a room down and forgets it.
    pub async fn destroy_room(&self, room_id: &RoomId) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .lock()
            .await
            .remove(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;
        let _ = handle.shutdown().await;
        tracing::info!(%room_id, "room destroyed");
        Ok(())
    }

    /// Number of tracked rooms, including any not yet pruned.
    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }
}

fn fresh_code(rooms: &HashMap<RoomId, RoomHandle>) -> RoomId {
    let mut rng = rand::rng();
    loop {
        let code: String = (0..CODE_LEN)
            .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
            .collect();
        let room_id = RoomId(code);
        if !rooms.contains_key(&room_id) {
            return room_id;
        }
    }
}
