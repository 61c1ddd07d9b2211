//! Room engine for Sketchroom.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! turn state machine, round timer, and fan-out to connected players.
//!
//! # Key types
//!
//! - [`RoomSession`]: the synchronous turn/round state machine
//! - [`RoomRegistry`]: creates, revives and tracks rooms
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`RoomConfig`]: per-room settings and server tuning
//! - [`RoomStore`] / [`MemoryStore`]: where room documents are kept
//! - [`WordSource`] / [`StaticWordSource`]: where words come from

mod config;
mod error;
mod gateway;
mod manager;
mod room;
pub mod scoring;
pub mod session;
mod store;
mod words;

pub use config::RoomConfig;
pub use error::RoomError;
pub use gateway::{BroadcastGateway, ClientHandle, ClientSender};
pub use manager::{DEFAULT_CHANNEL_SIZE, RoomRegistry};
pub use room::{RoomHandle, RoomInfo, spawn_room};
pub use session::{AlarmKey, GameState, Outbound, Participant, RoomSession};
pub use store::{MemoryStore, RoomDocument, RoomStore, StoreError};
pub use words::{FALLBACK_CATEGORY, StaticWordSource, WordPool, WordSource};
