//! Room lifecycle and game state machine for hatbox.
//!
//! Each room runs as an isolated Tokio task (actor model) owning its
//! roster, word pool, and turn state. Client commands, registry
//! queries, and timer firings all flow through the room's single
//! command queue, which is the whole concurrency story: per room,
//! effects happen in exactly the order commands arrive.
//!
//! # Key types
//!
//! - [`RoomRegistry`] — key→room map; spawn-on-first-join, lazy pruning
//! - [`RoomHandle`] — send commands to a running room actor
//! - [`PlayerAction`] — the game commands a connection can issue
//! - [`GameRoom`] — the bare state machine, usable without any runtime
//! - [`WordSource`] — pluggable word supply ([`NumberedWords`] built in)

mod error;
mod game;
mod pairing;
mod registry;
mod room;
mod roster;
mod words;

pub use error::GameError;
pub use game::{Audience, Effect, GameRoom, RoomSummary};
pub use registry::{DEFAULT_CHANNEL_SIZE, RoomRegistry};
pub use room::{PlayerAction, RoomHandle};
pub use roster::PlayerSender;
pub use words::{NumberedWords, WORD_COUNT, WordSource};
