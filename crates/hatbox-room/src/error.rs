//! Error types for the room layer.
//!
//! Every variant is a recoverable, client-caused rejection. The `Display`
//! strings are exactly what goes on the wire as the `message` of a
//! `Failure` event, so changing one changes the protocol.

/// A rejected room or game command. No state is mutated when one of
/// these is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// The connection is already bound to a room.
    #[error("already in a room")]
    AlreadyInRoom,

    /// The submitted room key is empty.
    #[error("room key must not be empty")]
    InvalidKey,

    /// The submitted username is empty.
    #[error("username must not be empty")]
    InvalidUsername,

    /// Another online player in this room holds the username.
    #[error("username already taken")]
    UsernameTaken,

    /// The username is unseen and the room is past the join phase.
    /// Only players who were in the roster when the game started may
    /// (re)join a playing room.
    #[error("the game is already in progress")]
    GameInProgress,

    /// The room is not in the state the command requires.
    #[error("game state is not '{expected}'")]
    WrongState { expected: &'static str },

    /// The room is not in the turn phase the command requires.
    #[error("turn phase is not '{expected}'")]
    WrongSubstate { expected: &'static str },

    /// Only the host (first online player) may start the game.
    #[error("only the host can start the game")]
    NotHost,

    /// The command is reserved for the current speaker.
    #[error("you are not the speaker")]
    NotSpeaker,

    /// The command is reserved for the current listener.
    #[error("you are not the listener")]
    NotListener,

    /// The caller's ready flag is already set for this turn.
    #[error("already marked ready")]
    AlreadyReady,

    /// Starting needs at least two online players.
    #[error("at least two online players are required")]
    NotEnoughPlayers,

    /// `EndWordExplanation` arrived before the lead-in elapsed.
    #[error("the explanation has not started yet")]
    TooEarly,

    /// The edit list length differs from the pending list.
    #[error("expected {expected} edited words, got {got}")]
    EditCountMismatch { expected: usize, got: usize },

    /// The edit list names a different word at this position.
    #[error("word at position {position} does not match")]
    EditWordMismatch { position: usize },

    /// The connection is not bound to any room.
    #[error("not in a room")]
    NotInRoom,

    /// The room was deleted while the command was in flight.
    #[error("the room no longer exists")]
    InvalidRoom,
}
