//! Hatbox: a WebSocket server for the hat word game.
//!
//! A room hosts one game. Players join by key, the host starts the game,
//! and pairs take turns explaining words against the clock until the pool
//! runs dry. This crate ties the layers together — [`hatbox_transport`]
//! accepts sockets, [`hatbox_protocol`] speaks JSON, [`hatbox_room`] runs
//! each room as an actor — and adds the per-connection handler plus the
//! server builder.
//!
//! # Example
//!
//! ```rust,ignore
//! use hatbox::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), HatboxError> {
//!     let server = HatboxServer::builder()
//!         .bind("0.0.0.0:5000")
//!         .build()
//!         .await?;
//!     server.run().await
//! }
//! ```

mod error;
mod handler;
mod server;

pub use error::HatboxError;
pub use server::{HatboxServer, HatboxServerBuilder};

/// Single-import surface for embedding the server or driving it from
/// tests.
pub mod prelude {
    pub use hatbox_protocol::{
        ClientCommand, Disposition, EditWord, PlayerEntry, PlayerScore,
        RoomKey, RoomState, ServerEvent, TurnPhase,
    };
    pub use hatbox_room::{NumberedWords, WORD_COUNT, WordSource};
    pub use hatbox_timer::TurnTimings;

    pub use crate::error::HatboxError;
    pub use crate::server::{HatboxServer, HatboxServerBuilder};
}
