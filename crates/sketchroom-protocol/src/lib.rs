//! Wire protocol for Sketchroom.
//!
//! This crate defines what clients and the server say to each other:
//!
//! - **Types** ([`UserId`], [`RoomId`], [`GamePhase`], [`RoomSettings`],
//!   [`Recipient`]): identities and values shared by every layer.
//! - **Events** ([`ClientEvent`], [`ServerEvent`], [`ErrorKind`]): the
//!   frames on the wire.
//! - **Snapshot** ([`RoomSnapshot`] and its parts): the fixed full-state
//!   schema sent after every state change.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how frames become bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! The protocol layer knows nothing about connections or rooms; it only
//! shapes and (de)serializes data.

mod codec;
mod error;
mod events;
mod snapshot;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use events::{ClientEvent, ErrorKind, ServerEvent};
pub use snapshot::{
    GameView, LeaderboardEntry, ParticipantView, RoomSnapshot, RoomSummary, mask_word,
};
pub use types::{Difficulty, GamePhase, Recipient, RoomId, RoomSettings, UserId};
