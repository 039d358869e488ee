//! The per-room game state machine.
//!
//! [`GameRoom`] owns everything one room knows: the roster, the word
//! pool, and the current phase. Every command handler validates, then
//! mutates, then returns the [`Effect`]s the caller must execute —
//! the state machine itself never touches a channel or a timer, which
//! is what keeps it testable without a runtime.
//!
//! Handlers run to completion synchronously; the room actor guarantees
//! no two of them ever interleave for the same room.

use std::sync::Arc;

use hatbox_protocol::{
    Disposition, EditWord, PlayerEntry, RoomKey, RoomState, ServerEvent, TurnPhase,
};
use hatbox_timer::{ExplanationSchedule, TimerEvent, TimerFired, TurnTimings};
use hatbox_transport::ConnectionId;
use tokio::time::Instant;
use tracing::{debug, info, trace};

use crate::error::GameError;
use crate::pairing;
use crate::roster::{PlayerSender, Roster};
use crate::words::{WordPool, WordSource};

// ---------------------------------------------------------------------------
// Effects
// ---------------------------------------------------------------------------

/// Who receives an outbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Every online player in the room.
    Room,
    /// One roster seat.
    Player(usize),
}

/// A side effect requested by a command handler.
///
/// The room actor executes these in order: deliveries go out through the
/// roster's event channels, timer requests spawn fenced timers that feed
/// back into the room's own command queue.
#[derive(Debug)]
pub enum Effect {
    Deliver(Audience, ServerEvent),
    ArmTimers {
        turn: u64,
        reveal_at: Instant,
        force_finish_at: Instant,
    },
}

/// Snapshot answering a room-info query.
#[derive(Debug, Clone)]
pub struct RoomSummary {
    pub state: RoomState,
    pub players: Vec<PlayerEntry>,
    pub host: Option<String>,
}

impl RoomSummary {
    /// What an unknown key reports: an empty, joinable room.
    pub fn empty() -> Self {
        Self {
            state: RoomState::Waiting,
            players: Vec::new(),
            host: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum Stage {
    AwaitingReady {
        speaker_ready: bool,
        listener_ready: bool,
    },
    Explaining {
        schedule: ExplanationSchedule,
    },
    Editing,
}

impl Stage {
    fn wire(&self) -> TurnPhase {
        match self {
            Stage::AwaitingReady { .. } => TurnPhase::AwaitingReady,
            Stage::Explaining { .. } => TurnPhase::Explaining,
            Stage::Editing => TurnPhase::Editing,
        }
    }
}

#[derive(Debug)]
struct Play {
    pool: WordPool,
    speaker: usize,
    listener: usize,
    /// Completed-turn counter; fences stale timers.
    turn: u64,
    stage: Stage,
}

enum Phase {
    Waiting,
    Playing(Play),
    Ended,
}

// ---------------------------------------------------------------------------
// GameRoom
// ---------------------------------------------------------------------------

/// One room's complete state.
pub struct GameRoom {
    key: RoomKey,
    timings: TurnTimings,
    words: Arc<dyn WordSource>,
    roster: Roster,
    phase: Phase,
}

impl GameRoom {
    pub fn new(key: RoomKey, timings: TurnTimings, words: Arc<dyn WordSource>) -> Self {
        Self {
            key,
            timings,
            words,
            roster: Roster::default(),
            phase: Phase::Waiting,
        }
    }

    pub fn key(&self) -> &RoomKey {
        &self.key
    }

    /// `true` once the game has ended; the room is then torn down.
    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Ended)
    }

    fn state(&self) -> RoomState {
        match self.phase {
            Phase::Waiting => RoomState::Waiting,
            Phase::Playing(_) => RoomState::Playing,
            Phase::Ended => RoomState::Ended,
        }
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            state: self.state(),
            players: self.roster.entries(),
            host: self.roster.host_username(),
        }
    }

    pub(crate) fn sender(&self, index: usize) -> Option<&PlayerSender> {
        self.roster.sender(index)
    }

    pub(crate) fn online_senders(&self) -> impl Iterator<Item = &PlayerSender> {
        self.roster.online_senders()
    }

    pub(crate) fn sender_by_conn(&self, conn: ConnectionId) -> Option<&PlayerSender> {
        self.roster.sender_by_conn(conn)
    }

    // -----------------------------------------------------------------------
    // Joining and leaving
    // -----------------------------------------------------------------------

    /// Adds a new player, or reattaches a returning one by username.
    pub fn join(
        &mut self,
        username: &str,
        conn: ConnectionId,
        sender: PlayerSender,
    ) -> Result<Vec<Effect>, GameError> {
        if username.is_empty() {
            return Err(GameError::InvalidUsername);
        }
        let index = match self.roster.position_by_username(username) {
            // Checked before the in-progress rule: a duplicate of an
            // online player is told the name is taken, not that the
            // game has started.
            Some(i) if self.roster.is_online(i) => return Err(GameError::UsernameTaken),
            Some(i) => {
                self.roster.reattach(i, conn, sender);
                i
            }
            None => {
                if !matches!(self.phase, Phase::Waiting) {
                    return Err(GameError::GameInProgress);
                }
                self.roster.add(username.to_string(), conn, sender)
            }
        };
        info!(room = %self.key, username, %conn, "player joined");

        Ok(vec![
            Effect::Deliver(
                Audience::Room,
                ServerEvent::PlayerJoined {
                    username: username.to_string(),
                    player_list: self.roster.entries(),
                    host: self.roster.host_username(),
                },
            ),
            Effect::Deliver(Audience::Player(index), self.you_joined(index)),
        ])
    }

    /// The resync event a joiner receives, shaped per phase.
    fn you_joined(&self, index: usize) -> ServerEvent {
        let mut substate = None;
        let mut speaker = None;
        let mut listener = None;
        let mut start_time = None;
        let mut word = None;
        let mut words_count = None;
        let mut edit_words = None;

        if let Phase::Playing(play) = &self.phase {
            substate = Some(play.stage.wire());
            words_count = Some(play.pool.drawable());
            match &play.stage {
                Stage::AwaitingReady { .. } => {
                    speaker = Some(self.roster.username(play.speaker).to_string());
                    listener = Some(self.roster.username(play.listener).to_string());
                }
                Stage::Explaining { schedule } => {
                    speaker = Some(self.roster.username(play.speaker).to_string());
                    listener = Some(self.roster.username(play.listener).to_string());
                    start_time = Some(schedule.start_unix_ms());
                    // The word in play is secret from everyone but its
                    // speaker.
                    if index == play.speaker {
                        word = play.pool.current().map(str::to_string);
                    }
                }
                Stage::Editing => {
                    edit_words = Some(Vec::new());
                }
            }
        }

        ServerEvent::YouJoined {
            key: self.key.clone(),
            player_list: self.roster.entries(),
            host: self.roster.host_username(),
            state: self.state(),
            substate,
            speaker,
            listener,
            start_time,
            word,
            words_count,
            edit_words,
        }
    }

    pub fn leave(&mut self, conn: ConnectionId) -> Result<Vec<Effect>, GameError> {
        let index = self
            .roster
            .position_by_conn(conn)
            .ok_or(GameError::NotInRoom)?;
        Ok(self.depart(index))
    }

    /// Like [`Self::leave`], but silent when the connection is unknown —
    /// a dropped socket is not a protocol error.
    pub fn disconnect(&mut self, conn: ConnectionId) -> Vec<Effect> {
        match self.roster.position_by_conn(conn) {
            Some(index) => self.depart(index),
            None => Vec::new(),
        }
    }

    fn depart(&mut self, index: usize) -> Vec<Effect> {
        let username = self.roster.username(index).to_string();
        self.roster.depart(index);
        info!(room = %self.key, username, "player left");
        vec![Effect::Deliver(
            Audience::Room,
            ServerEvent::PlayerLeft {
                username,
                player_list: self.roster.entries(),
                host: self.roster.host_username(),
            },
        )]
    }

    // -----------------------------------------------------------------------
    // Game commands
    // -----------------------------------------------------------------------

    pub fn start_game(&mut self, conn: ConnectionId) -> Result<Vec<Effect>, GameError> {
        let caller = self
            .roster
            .position_by_conn(conn)
            .ok_or(GameError::NotInRoom)?;
        if self.roster.host() != Some(caller) {
            return Err(GameError::NotHost);
        }
        if !matches!(self.phase, Phase::Waiting) {
            return Err(GameError::WrongState {
                expected: "waiting",
            });
        }
        if self.roster.online_count() < 2 {
            return Err(GameError::NotEnoughPlayers);
        }

        // The rotation freezes now. Seats that are offline at this
        // moment are dropped for good; their usernames count as unseen
        // if they try to come back.
        self.roster.prune_offline();

        let pool = WordPool::new(self.words.generate(&self.key));
        let words_count = pool.drawable();
        let (speaker, listener) = pairing::first_pair(self.roster.len());
        self.phase = Phase::Playing(Play {
            pool,
            speaker,
            listener,
            turn: 0,
            stage: Stage::AwaitingReady {
                speaker_ready: false,
                listener_ready: false,
            },
        });
        info!(
            room = %self.key,
            players = self.roster.len(),
            words = words_count,
            "game started"
        );

        Ok(vec![Effect::Deliver(
            Audience::Room,
            ServerEvent::GameStarted {
                speaker: self.roster.username(speaker).to_string(),
                listener: self.roster.username(listener).to_string(),
                words_count,
            },
        )])
    }

    pub fn speaker_ready(&mut self, conn: ConnectionId) -> Result<Vec<Effect>, GameError> {
        let caller = self
            .roster
            .position_by_conn(conn)
            .ok_or(GameError::NotInRoom)?;
        let Phase::Playing(play) = &mut self.phase else {
            return Err(GameError::WrongState {
                expected: "playing",
            });
        };
        let Stage::AwaitingReady {
            speaker_ready,
            listener_ready,
        } = &mut play.stage
        else {
            return Err(GameError::WrongSubstate {
                expected: "awaitingReady",
            });
        };
        if caller != play.speaker {
            return Err(GameError::NotSpeaker);
        }
        if *speaker_ready {
            return Err(GameError::AlreadyReady);
        }
        *speaker_ready = true;
        if *listener_ready {
            Ok(Self::begin_explanation(&self.key, &self.timings, play))
        } else {
            Ok(Vec::new())
        }
    }

    pub fn listener_ready(&mut self, conn: ConnectionId) -> Result<Vec<Effect>, GameError> {
        let caller = self
            .roster
            .position_by_conn(conn)
            .ok_or(GameError::NotInRoom)?;
        let Phase::Playing(play) = &mut self.phase else {
            return Err(GameError::WrongState {
                expected: "playing",
            });
        };
        let Stage::AwaitingReady {
            speaker_ready,
            listener_ready,
        } = &mut play.stage
        else {
            return Err(GameError::WrongSubstate {
                expected: "awaitingReady",
            });
        };
        if caller != play.listener {
            return Err(GameError::NotListener);
        }
        if *listener_ready {
            return Err(GameError::AlreadyReady);
        }
        *listener_ready = true;
        if *speaker_ready {
            Ok(Self::begin_explanation(&self.key, &self.timings, play))
        } else {
            Ok(Vec::new())
        }
    }

    /// Both roles are ready: draw a word, arm the timers, tell the room.
    ///
    /// The drawn word is not in any effect here — it reaches the speaker
    /// only when the reveal timer fires at the start instant.
    fn begin_explanation(key: &RoomKey, timings: &TurnTimings, play: &mut Play) -> Vec<Effect> {
        let schedule = ExplanationSchedule::new(timings);
        play.pool.draw();
        play.stage = Stage::Explaining { schedule };
        debug!(room = %key, turn = play.turn, "explanation scheduled");
        vec![
            Effect::ArmTimers {
                turn: play.turn,
                reveal_at: schedule.reveal_at(),
                force_finish_at: schedule.force_finish_at(),
            },
            Effect::Deliver(
                Audience::Room,
                ServerEvent::ExplanationStarted {
                    start_time: schedule.start_unix_ms(),
                },
            ),
        ]
    }

    pub fn end_word_explanation(
        &mut self,
        conn: ConnectionId,
        cause: Disposition,
    ) -> Result<Vec<Effect>, GameError> {
        let caller = self
            .roster
            .position_by_conn(conn)
            .ok_or(GameError::NotInRoom)?;
        let Phase::Playing(play) = &mut self.phase else {
            return Err(GameError::WrongState {
                expected: "playing",
            });
        };
        let Stage::Explaining { schedule } = &play.stage else {
            return Err(GameError::WrongSubstate {
                expected: "explaining",
            });
        };
        if caller != play.speaker {
            return Err(GameError::NotSpeaker);
        }
        if !schedule.started() {
            return Err(GameError::TooEarly);
        }
        let schedule = *schedule;

        play.pool.resolve_current(cause);

        // Only the two seats playing the word learn how it went; the
        // rest of the room sees counts move at phase end.
        let resolved = ServerEvent::WordExplanationEnded {
            cause,
            words_count: play.pool.drawable(),
        };
        let mut effects = vec![
            Effect::Deliver(Audience::Player(play.speaker), resolved.clone()),
            Effect::Deliver(Audience::Player(play.listener), resolved),
        ];

        match cause {
            Disposition::Explained => {
                if schedule.past_deadline() || play.pool.fresh_is_empty() {
                    effects.extend(Self::finish_explanation(play));
                } else if let Some(word) = play.pool.draw() {
                    let word = word.to_string();
                    effects.push(Effect::Deliver(
                        Audience::Player(play.speaker),
                        ServerEvent::NewWord { word },
                    ));
                }
            }
            // A mistake burns the word; a pass keeps it claimable. Either
            // way the turn's explaining is over.
            Disposition::Mistake | Disposition::NotExplained => {
                effects.extend(Self::finish_explanation(play));
            }
        }
        Ok(effects)
    }

    /// Closes the explanation: any in-flight word returns to the hat,
    /// the room learns the phase is over, the speaker gets the pending
    /// list to confirm.
    fn finish_explanation(play: &mut Play) -> Vec<Effect> {
        play.pool.return_current_to_fresh(&mut rand::rng());
        play.stage = Stage::Editing;
        vec![
            Effect::Deliver(
                Audience::Room,
                ServerEvent::ExplanationEnded {
                    words_count: play.pool.drawable(),
                },
            ),
            Effect::Deliver(
                Audience::Player(play.speaker),
                ServerEvent::WordsToEdit {
                    edit_words: play.pool.pending_list(),
                },
            ),
        ]
    }

    pub fn words_edited(
        &mut self,
        conn: ConnectionId,
        edits: Vec<EditWord>,
    ) -> Result<Vec<Effect>, GameError> {
        let caller = self
            .roster
            .position_by_conn(conn)
            .ok_or(GameError::NotInRoom)?;
        let Phase::Playing(play) = &mut self.phase else {
            return Err(GameError::WrongState {
                expected: "playing",
            });
        };
        if !matches!(play.stage, Stage::Editing) {
            return Err(GameError::WrongSubstate {
                expected: "editing",
            });
        }
        if caller != play.speaker {
            return Err(GameError::NotSpeaker);
        }

        let outcome = play.pool.confirm(&edits, &mut rand::rng())?;
        self.roster.award(play.speaker, play.listener, outcome.explained);

        if play.pool.fresh_is_empty() {
            return Ok(self.end_game());
        }

        play.turn += 1;
        play.stage = Stage::AwaitingReady {
            speaker_ready: false,
            listener_ready: false,
        };
        let n = self.roster.len();
        let (next_speaker, next_listener) = pairing::next_pair(n, play.speaker, play.listener);
        play.speaker = next_speaker;
        play.listener = next_listener;
        debug!(
            room = %self.key,
            turn = play.turn,
            speaker = next_speaker,
            listener = next_listener,
            "next turn"
        );

        Ok(vec![Effect::Deliver(
            Audience::Room,
            ServerEvent::NextTurn {
                speaker: self.roster.username(next_speaker).to_string(),
                listener: self.roster.username(next_listener).to_string(),
                words: outcome.transferred,
            },
        )])
    }

    fn end_game(&mut self) -> Vec<Effect> {
        self.phase = Phase::Ended;
        let results = self.roster.standings();
        info!(room = %self.key, "game ended");
        vec![Effect::Deliver(
            Audience::Room,
            ServerEvent::GameEnded { results },
        )]
    }

    // -----------------------------------------------------------------------
    // Timers
    // -----------------------------------------------------------------------

    /// Handles a timer firing. Stale firings — wrong turn, or a phase
    /// that already closed — are silently dropped; that fencing is what
    /// makes the timer race-free against client signals.
    pub fn timer_fired(&mut self, fired: TimerFired) -> Vec<Effect> {
        let Phase::Playing(play) = &mut self.phase else {
            return Vec::new();
        };
        if fired.turn != play.turn {
            trace!(
                room = %self.key,
                armed = fired.turn,
                current = play.turn,
                "stale timer ignored"
            );
            return Vec::new();
        }
        if !matches!(play.stage, Stage::Explaining { .. }) {
            return Vec::new();
        }
        match fired.event {
            TimerEvent::RevealWord => match play.pool.current() {
                Some(word) => {
                    let word = word.to_string();
                    vec![Effect::Deliver(
                        Audience::Player(play.speaker),
                        ServerEvent::NewWord { word },
                    )]
                }
                None => Vec::new(),
            },
            TimerEvent::ForceFinish => {
                debug!(room = %self.key, turn = play.turn, "forced finish");
                Self::finish_explanation(play)
            }
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
