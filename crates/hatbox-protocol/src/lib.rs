//! Wire protocol for hatbox.
//!
//! This crate defines the "language" that game clients and the server speak:
//!
//! - **Types** ([`ClientCommand`], [`ServerEvent`], shared shapes like
//!   [`EditWord`] and [`PlayerScore`]) — the structures that travel on the
//!   wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while encoding or
//!   decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between the transport (raw WebSocket frames) and
//! the room layer (game state). It knows nothing about connections, rosters
//! or timers — only how messages are shaped.
//!
//! ```text
//! Transport (frames) → Protocol (commands/events) → Room (game state)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientCommand, Disposition, EditWord, PlayerEntry, PlayerScore, RoomKey,
    RoomState, ServerEvent, TurnPhase,
};
