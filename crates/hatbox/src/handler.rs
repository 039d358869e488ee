//! Per-connection handler: decode, dispatch, deliver.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Spawn a writer task that pumps room events onto the socket
//!   2. Loop: receive frames → decode `ClientCommand` → dispatch
//!   3. On exit (close or error): tell the room, release the binding
//!
//! There is no handshake and no idle timeout. Players legitimately sit
//! silent for whole turns while others explain, so the socket stays open
//! until the client closes it or the transport reports an error.

use std::sync::Arc;

use hatbox_protocol::{ClientCommand, Codec, RoomKey, ServerEvent};
use hatbox_room::{GameError, PlayerAction, PlayerSender, RoomSummary};
use hatbox_transport::{Connection, ConnectionId, WebSocketConnection};
use rand::Rng;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::HatboxError;
use crate::server::ServerState;

/// Drop guard that detaches the connection from its room when the
/// handler exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the async part.
struct ConnectionGuard {
    conn: ConnectionId,
    state: Arc<ServerState>,
    writer: JoinHandle<()>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.writer.abort();
        let conn = self.conn;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let room = { state.registry.lock().await.room_of(conn) };
            if let Some(room) = room {
                room.disconnect(conn).await;
            }
            state.registry.lock().await.unbind(conn);
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<ServerState>,
) -> Result<(), HatboxError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    // Room events for this player funnel through one queue so their
    // order on the socket matches their order inside the room.
    let (events, events_rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_events(conn.clone(), state.codec, events_rx));

    let _guard = ConnectionGuard {
        conn: conn_id,
        state: Arc::clone(&state),
        writer,
    };

    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::debug!(%conn_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                return Err(e.into());
            }
        };

        let command: ClientCommand = match state.codec.decode(&data) {
            Ok(cmd) => cmd,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode command");
                send_failure(&conn, &state.codec, "Decode", &e.to_string()).await?;
                continue;
            }
        };

        dispatch(&conn, &state, conn_id, &events, command).await?;
    }

    // _guard drops here → room disconnect fires.
    Ok(())
}

/// Writer task: encodes queued events and puts them on the socket.
///
/// Exits when the queue closes (handler done) or the socket dies; the
/// handler's recv loop notices the latter on its own.
async fn write_events(
    conn: WebSocketConnection,
    codec: impl Codec,
    mut events: mpsc::UnboundedReceiver<ServerEvent>,
) {
    while let Some(event) = events.recv().await {
        let bytes = match codec.encode(&event) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "dropping unencodable event");
                continue;
            }
        };
        if conn.send(&bytes).await.is_err() {
            break;
        }
    }
}

/// Routes one decoded command.
async fn dispatch(
    conn: &WebSocketConnection,
    state: &Arc<ServerState>,
    conn_id: ConnectionId,
    events: &PlayerSender,
    command: ClientCommand,
) -> Result<(), HatboxError> {
    match command {
        ClientCommand::JoinRoom { key, username } => {
            join_room(conn, state, conn_id, events, key, username).await
        }
        ClientCommand::LeaveRoom => leave_room(conn, state, conn_id).await,
        ClientCommand::FreeKey => free_key(conn, state).await,
        ClientCommand::RoomInfo { key } => room_info(conn, state, key).await,
        ClientCommand::StartGame => {
            act(conn, state, conn_id, PlayerAction::StartGame).await
        }
        ClientCommand::SpeakerReady => {
            act(conn, state, conn_id, PlayerAction::SpeakerReady).await
        }
        ClientCommand::ListenerReady => {
            act(conn, state, conn_id, PlayerAction::ListenerReady).await
        }
        ClientCommand::EndWordExplanation { cause } => {
            act(conn, state, conn_id, PlayerAction::EndWordExplanation { cause }).await
        }
        ClientCommand::WordsEdited { edit_words } => {
            act(conn, state, conn_id, PlayerAction::WordsEdited { edit_words }).await
        }
    }
}

/// Resolves the target room and hands the connection to it.
///
/// Rejection order is part of the protocol: a bound connection is told
/// "already in a room" even when the key or username is also bad.
async fn join_room(
    conn: &WebSocketConnection,
    state: &Arc<ServerState>,
    conn_id: ConnectionId,
    events: &PlayerSender,
    key: String,
    username: String,
) -> Result<(), HatboxError> {
    let verdict = {
        let mut registry = state.registry.lock().await;
        if registry.room_of(conn_id).is_some() {
            Err(GameError::AlreadyInRoom)
        } else {
            match RoomKey::new(&key) {
                None => Err(GameError::InvalidKey),
                // Checked before get_or_spawn so a bad name cannot leave
                // an empty room behind.
                Some(_) if username.is_empty() => Err(GameError::InvalidUsername),
                Some(key) => Ok(registry.get_or_spawn(&key)),
            }
        }
    };

    let room = match verdict {
        Ok(room) => room,
        Err(e) => {
            return send_failure(conn, &state.codec, "JoinRoom", &e.to_string()).await;
        }
    };

    match room.join(username, conn_id, events.clone()).await {
        Ok(()) => {
            state.registry.lock().await.bind(conn_id, room);
            Ok(())
        }
        Err(e) => send_failure(conn, &state.codec, "JoinRoom", &e.to_string()).await,
    }
}

async fn leave_room(
    conn: &WebSocketConnection,
    state: &Arc<ServerState>,
    conn_id: ConnectionId,
) -> Result<(), HatboxError> {
    let room = { state.registry.lock().await.room_of(conn_id) };
    let Some(room) = room else {
        return send_failure(
            conn,
            &state.codec,
            "LeaveRoom",
            &GameError::NotInRoom.to_string(),
        )
        .await;
    };

    // Unbind even if the leave is rejected: the only rejections mean the
    // room is gone or never knew us, so the binding is stale either way.
    let result = room.leave(conn_id).await;
    state.registry.lock().await.unbind(conn_id);

    if let Err(e) = result {
        return send_failure(conn, &state.codec, "LeaveRoom", &e.to_string()).await;
    }
    Ok(())
}

/// Routes a game command to the caller's room.
///
/// In-game validation failures come back through the player's event
/// queue; only "no room at all" is reported from here.
async fn act(
    conn: &WebSocketConnection,
    state: &Arc<ServerState>,
    conn_id: ConnectionId,
    action: PlayerAction,
) -> Result<(), HatboxError> {
    let request = action.name();
    let room = { state.registry.lock().await.room_of(conn_id) };
    let result = match room {
        Some(room) => room.act(conn_id, action).await,
        None => Err(GameError::NotInRoom),
    };

    if let Err(e) = result {
        return send_failure(conn, &state.codec, request, &e.to_string()).await;
    }
    Ok(())
}

/// Hands out a random nine-digit key, re-rolled while it collides with
/// a live room.
async fn free_key(
    conn: &WebSocketConnection,
    state: &Arc<ServerState>,
) -> Result<(), HatboxError> {
    let key = {
        let mut registry = state.registry.lock().await;
        loop {
            let candidate = rand::rng()
                .random_range(100_000_000u64..=999_999_999)
                .to_string();
            match RoomKey::new(&candidate) {
                Some(key) if registry.get(&key).is_some() => continue,
                _ => break candidate,
            }
        }
    };

    send_event(conn, &state.codec, &ServerEvent::FreeKey { key }).await
}

/// Answers a pre-join room query. Unknown keys (and rooms that die
/// while the query is in flight) answer as an empty waiting room.
async fn room_info(
    conn: &WebSocketConnection,
    state: &Arc<ServerState>,
    key: String,
) -> Result<(), HatboxError> {
    let Some(key) = RoomKey::new(&key) else {
        return send_failure(
            conn,
            &state.codec,
            "RoomInfo",
            &GameError::InvalidKey.to_string(),
        )
        .await;
    };

    let room = { state.registry.lock().await.get(&key) };
    let summary = match room {
        Some(room) => room.summary().await.unwrap_or_else(|_| RoomSummary::empty()),
        None => RoomSummary::empty(),
    };

    send_event(
        conn,
        &state.codec,
        &ServerEvent::RoomInfo {
            state: summary.state,
            player_list: summary.players,
            host: summary.host,
        },
    )
    .await
}

/// Sends one event straight to the socket, bypassing the room queue.
/// Used for request-scoped replies before or outside room membership.
async fn send_event(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    event: &ServerEvent,
) -> Result<(), HatboxError> {
    let bytes = codec.encode(event)?;
    conn.send(&bytes).await?;
    Ok(())
}

/// Sends a `Failure` reply to the client.
async fn send_failure(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    request: &str,
    message: &str,
) -> Result<(), HatboxError> {
    send_event(
        conn,
        codec,
        &ServerEvent::Failure {
            request: request.to_string(),
            message: message.to_string(),
        },
    )
    .await
}
