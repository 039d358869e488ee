//! The hat: word supply and per-turn accounting.
//!
//! A [`WordPool`] owns every word a game will ever see and tracks which
//! bucket each one is in. Exactly one bucket holds a given word at any
//! time:
//!
//! - `fresh` — not yet drawn; a stack, drawn top-down;
//! - `in_flight` — the word currently being explained;
//! - `pending` — covered this turn, awaiting the speaker's confirmation;
//! - `used` — confirmed out of the game, with its final disposition.
//!
//! Words only re-enter `fresh` at a random position below the top of the
//! stack, so a returned word is never the very next draw.

use std::collections::HashMap;

use hatbox_protocol::{Disposition, EditWord, RoomKey};
use rand::Rng;

use crate::error::GameError;

/// Pool size for a standard game.
pub const WORD_COUNT: usize = 40;

// ---------------------------------------------------------------------------
// WordSource
// ---------------------------------------------------------------------------

/// Supplies the initial word list for a game.
///
/// The server ships with [`NumberedWords`]; real dictionaries plug in
/// here without touching the game logic.
pub trait WordSource: Send + Sync {
    /// Produces the full pool for a game in the given room. The last
    /// element is drawn first.
    fn generate(&self, key: &RoomKey) -> Vec<String>;
}

/// Placeholder source producing `word-0 .. word-N`.
#[derive(Debug, Clone)]
pub struct NumberedWords {
    pub count: usize,
}

impl Default for NumberedWords {
    fn default() -> Self {
        Self { count: WORD_COUNT }
    }
}

impl WordSource for NumberedWords {
    fn generate(&self, _key: &RoomKey) -> Vec<String> {
        (0..self.count).map(|i| format!("word-{i}")).collect()
    }
}

// ---------------------------------------------------------------------------
// WordPool
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct PendingWord {
    word: String,
    proposed: Disposition,
}

/// Per-game word accounting. Created at game start, dropped with the room.
#[derive(Debug)]
pub(crate) struct WordPool {
    fresh: Vec<String>,
    in_flight: Option<String>,
    pending: Vec<PendingWord>,
    used: HashMap<String, Disposition>,
}

/// Outcome of a confirmed edit: what scored and what left the pool.
#[derive(Debug)]
pub(crate) struct Confirmation {
    pub(crate) explained: u32,
    pub(crate) transferred: Vec<EditWord>,
}

impl WordPool {
    pub(crate) fn new(words: Vec<String>) -> Self {
        Self {
            fresh: words,
            in_flight: None,
            pending: Vec::new(),
            used: HashMap::new(),
        }
    }

    /// Pops the top fresh word into the in-flight slot.
    pub(crate) fn draw(&mut self) -> Option<&str> {
        self.in_flight = self.fresh.pop();
        self.in_flight.as_deref()
    }

    /// The word currently being explained, if any.
    pub(crate) fn current(&self) -> Option<&str> {
        self.in_flight.as_deref()
    }

    pub(crate) fn fresh_is_empty(&self) -> bool {
        self.fresh.is_empty()
    }

    /// How many words a client would count in the hat.
    ///
    /// Includes the in-flight word and any pending word proposed as
    /// `notExplained` — the latter returns to `fresh` once the edit
    /// confirms it, and clients never see it leave.
    pub(crate) fn drawable(&self) -> usize {
        self.fresh.len()
            + usize::from(self.in_flight.is_some())
            + self
                .pending
                .iter()
                .filter(|p| p.proposed == Disposition::NotExplained)
                .count()
    }

    /// Moves the in-flight word to the pending list under the given
    /// proposed disposition. No-op when nothing is in flight.
    pub(crate) fn resolve_current(&mut self, proposed: Disposition) {
        if let Some(word) = self.in_flight.take() {
            self.pending.push(PendingWord { word, proposed });
        }
    }

    /// Returns the in-flight word to the stack. Used when a forced finish
    /// interrupts an explanation mid-word.
    pub(crate) fn return_current_to_fresh(&mut self, rng: &mut impl Rng) {
        if let Some(word) = self.in_flight.take() {
            self.reinsert(word, rng);
        }
    }

    /// The pending list as it is sent to the speaker for confirmation.
    pub(crate) fn pending_list(&self) -> Vec<EditWord> {
        self.pending
            .iter()
            .map(|p| EditWord {
                word: p.word.clone(),
                disposition: p.proposed,
            })
            .collect()
    }

    /// Applies the speaker's confirmed edit to the pool.
    ///
    /// Validation is two-pass: the whole list is checked against the
    /// pending list before anything moves, so a mismatch leaves the pool
    /// untouched. Confirmed `explained`/`mistake` words move to `used`;
    /// `notExplained` words go back into `fresh` at a random position.
    pub(crate) fn confirm(
        &mut self,
        edits: &[EditWord],
        rng: &mut impl Rng,
    ) -> Result<Confirmation, GameError> {
        if edits.len() != self.pending.len() {
            return Err(GameError::EditCountMismatch {
                expected: self.pending.len(),
                got: edits.len(),
            });
        }
        for (position, (edit, pending)) in edits.iter().zip(&self.pending).enumerate() {
            if edit.word != pending.word {
                return Err(GameError::EditWordMismatch { position });
            }
        }

        let mut explained = 0;
        let mut transferred = Vec::new();
        for edit in edits {
            match edit.disposition {
                Disposition::Explained => {
                    explained += 1;
                    self.used.insert(edit.word.clone(), Disposition::Explained);
                    transferred.push(edit.clone());
                }
                Disposition::Mistake => {
                    self.used.insert(edit.word.clone(), Disposition::Mistake);
                    transferred.push(edit.clone());
                }
                Disposition::NotExplained => {
                    self.reinsert(edit.word.clone(), rng);
                }
            }
        }
        self.pending.clear();
        Ok(Confirmation {
            explained,
            transferred,
        })
    }

    /// Inserts below the top of the stack: with two or more fresh words
    /// the position is uniform over everything but the top slot, so the
    /// returned word is never the next draw.
    fn reinsert(&mut self, word: String, rng: &mut impl Rng) {
        let index = if self.fresh.len() < 2 {
            0
        } else {
            rng.random_range(0..self.fresh.len() - 1)
        };
        self.fresh.insert(index, word);
    }

    /// Total words across every bucket, for accounting checks.
    #[cfg(test)]
    fn accounted(&self) -> usize {
        self.fresh.len()
            + usize::from(self.in_flight.is_some())
            + self.pending.len()
            + self.used.len()
    }
}

// =========================================================================
// Tests
// =========================================================================
