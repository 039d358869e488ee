//! Room actor: an isolated Tokio task that owns one game.
//!
//! Each room runs in its own task, communicating with the outside world
//! through an mpsc channel. Client commands, queries, and timer firings
//! all arrive on the same queue, so everything that touches a room's
//! state is totally ordered — there is no lock to hold and no lock to
//! forget.

use std::sync::Arc;

use hatbox_protocol::{Disposition, EditWord, RoomKey, ServerEvent};
use hatbox_timer::{TimerEvent, TimerFired, TurnTimings};
use hatbox_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};

use crate::error::GameError;
use crate::game::{Audience, Effect, GameRoom, RoomSummary};
use crate::roster::PlayerSender;
use crate::words::WordSource;

/// A game command issued by one player's connection.
///
/// These are fire-and-forget: rejections come back as `Failure` events
/// on the player's own channel rather than as replies.
#[derive(Debug, Clone)]
pub enum PlayerAction {
    StartGame,
    SpeakerReady,
    ListenerReady,
    EndWordExplanation { cause: Disposition },
    WordsEdited { edit_words: Vec<EditWord> },
}

impl PlayerAction {
    /// The wire tag of the originating command; used as the `request`
    /// field when the action is rejected.
    pub fn name(&self) -> &'static str {
        match self {
            PlayerAction::StartGame => "StartGame",
            PlayerAction::SpeakerReady => "SpeakerReady",
            PlayerAction::ListenerReady => "ListenerReady",
            PlayerAction::EndWordExplanation { .. } => "EndWordExplanation",
            PlayerAction::WordsEdited { .. } => "WordsEdited",
        }
    }
}

/// Commands sent to a room actor through its channel.
///
/// The `oneshot::Sender` in some variants is a reply channel — the
/// caller sends a command and waits for the response on it. Timer
/// firings enter here too, which is what puts them in the same total
/// order as everything else.
pub(crate) enum RoomCommand {
    /// Add a player, or reattach a returning one.
    Join {
        username: String,
        conn: ConnectionId,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<(), GameError>>,
    },

    /// Remove a player at their own request.
    Leave {
        conn: ConnectionId,
        reply: oneshot::Sender<Result<(), GameError>>,
    },

    /// A connection dropped without saying goodbye.
    Disconnect { conn: ConnectionId },

    /// A game command from a player.
    Action {
        conn: ConnectionId,
        action: PlayerAction,
    },

    /// Request a metadata snapshot.
    Summary {
        reply: oneshot::Sender<RoomSummary>,
    },

    /// An armed timer went off.
    Timer(TimerFired),
}

/// Handle to a running room actor.
///
/// Cheap to clone — it is just an `mpsc::Sender` wrapper plus the key.
/// Every method that finds the channel closed reports
/// [`GameError::InvalidRoom`]: the room ended while the command was on
/// its way.
#[derive(Clone)]
pub struct RoomHandle {
    key: RoomKey,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn key(&self) -> &RoomKey {
        &self.key
    }

    /// `true` once the actor has stopped. Used by the registry to prune
    /// dead rooms lazily.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub async fn join(
        &self,
        username: String,
        conn: ConnectionId,
        sender: PlayerSender,
    ) -> Result<(), GameError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Join {
                username,
                conn,
                sender,
                reply: reply_tx,
            })
            .await
            .map_err(|_| GameError::InvalidRoom)?;
        reply_rx.await.map_err(|_| GameError::InvalidRoom)?
    }

    pub async fn leave(&self, conn: ConnectionId) -> Result<(), GameError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Leave {
                conn,
                reply: reply_tx,
            })
            .await
            .map_err(|_| GameError::InvalidRoom)?;
        reply_rx.await.map_err(|_| GameError::InvalidRoom)?
    }

    /// Best-effort: a disconnect racing the room's end needs no answer.
    pub async fn disconnect(&self, conn: ConnectionId) {
        let _ = self.sender.send(RoomCommand::Disconnect { conn }).await;
    }

    /// Sends a game command (fire-and-forget).
    pub async fn act(&self, conn: ConnectionId, action: PlayerAction) -> Result<(), GameError> {
        self.sender
            .send(RoomCommand::Action { conn, action })
            .await
            .map_err(|_| GameError::InvalidRoom)
    }

    pub async fn summary(&self) -> Result<RoomSummary, GameError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Summary { reply: reply_tx })
            .await
            .map_err(|_| GameError::InvalidRoom)?;
        reply_rx.await.map_err(|_| GameError::InvalidRoom)
    }
}

/// The room actor. Runs inside a Tokio task; exclusive owner of the
/// room's state.
struct RoomActor {
    game: GameRoom,
    receiver: mpsc::Receiver<RoomCommand>,
    /// Clone handed to armed timers so firings re-enter the queue.
    self_tx: mpsc::Sender<RoomCommand>,
}

impl RoomActor {
    /// Processes commands until the game ends.
    ///
    /// The actor holds a sender to its own queue, so the channel never
    /// closes on its own; the only exit is the game finishing. Waiting
    /// rooms whose players all left stay resident until the process
    /// does — the roster must survive for them to come back to.
    async fn run(mut self) {
        tracing::info!(room = %self.game.key(), "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle(cmd);
            if self.game.is_finished() {
                break;
            }
        }

        tracing::info!(room = %self.game.key(), "room actor stopped");
    }

    fn handle(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join {
                username,
                conn,
                sender,
                reply,
            } => match self.game.join(&username, conn, sender) {
                Ok(effects) => {
                    let _ = reply.send(Ok(()));
                    self.dispatch(effects);
                }
                Err(err) => {
                    let _ = reply.send(Err(err));
                }
            },
            RoomCommand::Leave { conn, reply } => match self.game.leave(conn) {
                Ok(effects) => {
                    let _ = reply.send(Ok(()));
                    self.dispatch(effects);
                }
                Err(err) => {
                    let _ = reply.send(Err(err));
                }
            },
            RoomCommand::Disconnect { conn } => {
                let effects = self.game.disconnect(conn);
                self.dispatch(effects);
            }
            RoomCommand::Action { conn, action } => {
                self.handle_action(conn, action);
            }
            RoomCommand::Summary { reply } => {
                let _ = reply.send(self.game.summary());
            }
            RoomCommand::Timer(fired) => {
                let effects = self.game.timer_fired(fired);
                self.dispatch(effects);
            }
        }
    }

    fn handle_action(&mut self, conn: ConnectionId, action: PlayerAction) {
        let request = action.name();
        let result = match action {
            PlayerAction::StartGame => self.game.start_game(conn),
            PlayerAction::SpeakerReady => self.game.speaker_ready(conn),
            PlayerAction::ListenerReady => self.game.listener_ready(conn),
            PlayerAction::EndWordExplanation { cause } => {
                self.game.end_word_explanation(conn, cause)
            }
            PlayerAction::WordsEdited { edit_words } => self.game.words_edited(conn, edit_words),
        };
        match result {
            Ok(effects) => self.dispatch(effects),
            Err(err) => self.fail(conn, request, err),
        }
    }

    /// Reports a rejected command back to whoever sent it.
    fn fail(&self, conn: ConnectionId, request: &str, err: GameError) {
        tracing::debug!(
            room = %self.game.key(),
            %conn,
            request,
            %err,
            "command rejected"
        );
        match self.game.sender_by_conn(conn) {
            Some(sender) => {
                let _ = sender.send(ServerEvent::Failure {
                    request: request.to_string(),
                    message: err.to_string(),
                });
            }
            None => {
                // The connection left between queueing and processing.
                tracing::warn!(
                    room = %self.game.key(),
                    %conn,
                    "failure reply dropped, connection unknown"
                );
            }
        }
    }

    /// Executes the effects a command handler produced, in order.
    fn dispatch(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Deliver(Audience::Room, event) => {
                    for sender in self.game.online_senders() {
                        let _ = sender.send(event.clone());
                    }
                }
                Effect::Deliver(Audience::Player(index), event) => {
                    // Silently dropped when the seat is offline.
                    if let Some(sender) = self.game.sender(index) {
                        let _ = sender.send(event);
                    }
                }
                Effect::ArmTimers {
                    turn,
                    reveal_at,
                    force_finish_at,
                } => {
                    hatbox_timer::arm(
                        reveal_at,
                        self.self_tx.clone(),
                        RoomCommand::Timer(TimerFired {
                            turn,
                            event: TimerEvent::RevealWord,
                        }),
                    );
                    hatbox_timer::arm(
                        force_finish_at,
                        self.self_tx.clone(),
                        RoomCommand::Timer(TimerFired {
                            turn,
                            event: TimerEvent::ForceFinish,
                        }),
                    );
                }
            }
        }
    }
}

/// Spawns a new room actor task and returns a handle to it.
///
/// `channel_size` bounds the command queue; senders wait when it fills.
pub(crate) fn spawn_room(
    key: RoomKey,
    timings: TurnTimings,
    words: Arc<dyn WordSource>,
    channel_size: usize,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size);

    let actor = RoomActor {
        game: GameRoom::new(key.clone(), timings, words),
        receiver: rx,
        self_tx: tx.clone(),
    };

    tokio::spawn(actor.run());

    RoomHandle { key, sender: tx }
}
