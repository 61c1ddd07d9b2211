//! # Sketchroom
//!
//! Server for a real-time multiplayer drawing and guessing game.
//!
//! Players gather in a room; each turn one of them draws a secret word
//! while the rest race to guess it against a countdown. The server is
//! authoritative for turn order, timing, scoring and what each player is
//! allowed to see.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sketchroom::prelude::*;
//!
//! # async fn run() -> Result<(), SketchroomError> {
//! let server = SketchroomServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build(Arc::new(MemoryStore::new()), Arc::new(StaticWordSource::builtin()))
//!     .await?;
//! server.run().await
//! # }
//! ```

pub mod config;
mod error;
mod handler;
mod server;

pub use config::{ConfigError, ServerConfig};
pub use error::SketchroomError;
pub use server::{SketchroomServer, SketchroomServerBuilder};

/// Everything needed to run a server or talk to one.
pub mod prelude {
    pub use crate::{
        ConfigError, ServerConfig, SketchroomError, SketchroomServer, SketchroomServerBuilder,
    };
    pub use sketchroom_protocol::{
        ClientEvent, Codec, Difficulty, ErrorKind, GamePhase, JsonCodec, LeaderboardEntry,
        RoomId, RoomSettings, RoomSnapshot, RoomSummary, ServerEvent, UserId,
    };
    pub use sketchroom_room::{
        MemoryStore, RoomConfig, RoomError, RoomStore, StaticWordSource, StoreError, WordSource,
    };
}
