//! Core protocol types for hatbox's wire format.
//!
//! Every structure here travels on the wire as a JSON text frame, externally
//! tagged by a `type` field with camelCase payload fields:
//!
//! ```json
//! { "type": "ExplanationStarted", "startTime": 1724578000000 }
//! ```
//!
//! Inbound frames decode to [`ClientCommand`], outbound frames encode from
//! [`ServerEvent`]. Both sides share the small value types below
//! ([`Disposition`], [`EditWord`], [`PlayerEntry`], ...), so a client SDK can
//! reuse one schema for requests and responses.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Room keys
// ---------------------------------------------------------------------------

/// A normalized room key.
///
/// Keys are short codes typed (or pasted) by players, so they are matched
/// case-insensitively: [`RoomKey::new`] lowercases the raw text and rejects
/// empty input. The newtype keeps normalized and raw strings apart — a
/// `RoomKey` in a map lookup has always been through `new`.
///
/// `#[serde(transparent)]` serializes the key as a plain JSON string, not as
/// a wrapper object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomKey(String);

impl RoomKey {
    /// Normalizes a raw key. Returns `None` when the key is empty.
    pub fn new(raw: &str) -> Option<RoomKey> {
        if raw.is_empty() {
            None
        } else {
            Some(RoomKey(raw.to_lowercase()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Shared value types
// ---------------------------------------------------------------------------

/// One roster entry as shown in `playerList` payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerEntry {
    pub username: String,
    pub online: bool,
}

/// What happened to a word during an explanation.
///
/// Doubles as the `cause` of an `EndWordExplanation` command and as the
/// per-word state in edit lists. Serialized in camelCase:
/// `"explained" | "mistake" | "notExplained"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Disposition {
    /// The listener guessed the word.
    Explained,
    /// The speaker broke a rule; the word leaves the pool without scoring.
    Mistake,
    /// Time ran out (or the speaker gave up); the word returns to the pool.
    NotExplained,
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disposition::Explained => write!(f, "explained"),
            Disposition::Mistake => write!(f, "mistake"),
            Disposition::NotExplained => write!(f, "notExplained"),
        }
    }
}

/// A word together with its (proposed or confirmed) disposition.
///
/// Appears in `WordsToEdit` (proposed, awaiting the speaker), in
/// `WordsEdited` (the speaker's verdict) and in `NextTurn` (confirmed,
/// leaving the pool).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditWord {
    pub word: String,
    pub disposition: Disposition,
}

/// Room lifecycle state. Serialized as `"waiting" | "playing" | "ended"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RoomState {
    Waiting,
    Playing,
    Ended,
}

impl fmt::Display for RoomState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomState::Waiting => write!(f, "waiting"),
            RoomState::Playing => write!(f, "playing"),
            RoomState::Ended => write!(f, "ended"),
        }
    }
}

/// Substate of a playing room. Serialized as
/// `"awaitingReady" | "explaining" | "editing"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TurnPhase {
    AwaitingReady,
    Explaining,
    Editing,
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnPhase::AwaitingReady => write!(f, "awaitingReady"),
            TurnPhase::Explaining => write!(f, "explaining"),
            TurnPhase::Editing => write!(f, "editing"),
        }
    }
}

/// Final standing of one player, as sent in `GameEnded`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerScore {
    pub username: String,
    pub score_explained: u32,
    pub score_guessed: u32,
}

// ---------------------------------------------------------------------------
// Client commands
// ---------------------------------------------------------------------------

/// Everything a client can ask the server to do.
///
/// `#[serde(tag = "type")]` produces internally tagged JSON —
/// `{ "type": "JoinRoom", "key": "77", "username": "ada" }` — and
/// `rename_all_fields` makes every payload field camelCase on the wire
/// (`editWords`), while the Rust side stays snake_case.
///
/// The raw `key` strings here are unnormalized; the server runs them
/// through [`RoomKey::new`] before touching the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ClientCommand {
    /// Join (or create) the room behind `key` as `username`.
    JoinRoom { key: String, username: String },

    /// Leave the current room (stay connected).
    LeaveRoom,

    /// Host only: start the game in the current room.
    StartGame,

    /// Current speaker confirms they are ready for the next explanation.
    SpeakerReady,

    /// Current listener confirms they are ready for the next explanation.
    ListenerReady,

    /// Speaker reports the fate of the current word.
    EndWordExplanation { cause: Disposition },

    /// Speaker confirms (possibly amended) dispositions for the turn.
    WordsEdited { edit_words: Vec<EditWord> },

    /// Ask for a fresh random room key.
    FreeKey,

    /// Pre-join discovery: what does the room behind `key` look like?
    RoomInfo { key: String },
}

impl ClientCommand {
    /// The wire tag of this command, used as the `request` field of a
    /// [`ServerEvent::Failure`].
    pub fn name(&self) -> &'static str {
        match self {
            ClientCommand::JoinRoom { .. } => "JoinRoom",
            ClientCommand::LeaveRoom => "LeaveRoom",
            ClientCommand::StartGame => "StartGame",
            ClientCommand::SpeakerReady => "SpeakerReady",
            ClientCommand::ListenerReady => "ListenerReady",
            ClientCommand::EndWordExplanation { .. } => "EndWordExplanation",
            ClientCommand::WordsEdited { .. } => "WordsEdited",
            ClientCommand::FreeKey => "FreeKey",
            ClientCommand::RoomInfo { .. } => "RoomInfo",
        }
    }
}

// ---------------------------------------------------------------------------
// Server events
// ---------------------------------------------------------------------------

/// Everything the server can tell a client.
///
/// Same wire conventions as [`ClientCommand`]. Optional fields of
/// [`YouJoined`](ServerEvent::YouJoined) are omitted entirely when absent
/// (never `null`), so clients can feature-test with a plain key check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// A command was rejected. Unicast to the requester, never broadcast.
    /// `request` names the offending command tag ("Decode" when the frame
    /// itself was unreadable).
    Failure { request: String, message: String },

    /// Someone joined the room (the joiner receives this too).
    PlayerJoined {
        username: String,
        player_list: Vec<PlayerEntry>,
        host: Option<String>,
    },

    /// Unicast follow-up to a successful join, shaped per phase so a
    /// rejoining client can resynchronize mid-game.
    YouJoined {
        key: RoomKey,
        player_list: Vec<PlayerEntry>,
        host: Option<String>,
        state: RoomState,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        substate: Option<TurnPhase>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        speaker: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        listener: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start_time: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        word: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        words_count: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        edit_words: Option<Vec<EditWord>>,
    },

    /// Someone left the room or dropped their connection.
    PlayerLeft {
        username: String,
        player_list: Vec<PlayerEntry>,
        host: Option<String>,
    },

    /// The game started; the first speaker/listener pair is set.
    GameStarted {
        speaker: String,
        listener: String,
        words_count: usize,
    },

    /// Both roles are ready; explanation begins at `start_time` (Unix ms).
    ExplanationStarted { start_time: u64 },

    /// Unicast to the speaker: the word to explain next.
    NewWord { word: String },

    /// The explanation phase is over for everyone.
    ExplanationEnded { words_count: usize },

    /// Unicast to the speaker: the turn's words, awaiting confirmation.
    WordsToEdit { edit_words: Vec<EditWord> },

    /// One word was resolved mid-explanation. Sent to the two role holders.
    WordExplanationEnded {
        cause: Disposition,
        words_count: usize,
    },

    /// The edit was confirmed; the next pair is up. `words` lists what left
    /// the pool this turn.
    NextTurn {
        speaker: String,
        listener: String,
        words: Vec<EditWord>,
    },

    /// The pool is empty; final standings, best first.
    GameEnded { results: Vec<PlayerScore> },

    /// Reply to [`ClientCommand::FreeKey`].
    FreeKey { key: String },

    /// Reply to [`ClientCommand::RoomInfo`]. Unknown keys answer as an
    /// empty waiting room.
    RoomInfo {
        state: RoomState,
        player_list: Vec<PlayerEntry>,
        host: Option<String>,
    },
}

// =========================================================================
// Tests
// =========================================================================
