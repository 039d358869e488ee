//! Process-wide room registry.
//!
//! Two maps: key → room for joins and queries, connection → room for
//! everything else. Rooms are spawned on first join and never torn down
//! explicitly — a room whose game ended closes its own channel, and the
//! registry sweeps the dead handle on the next lookup that touches it,
//! or in bulk when any connection unbinds.

use std::collections::HashMap;
use std::sync::Arc;

use hatbox_protocol::RoomKey;
use hatbox_timer::TurnTimings;
use hatbox_transport::ConnectionId;

use crate::room::{RoomHandle, spawn_room};
use crate::words::WordSource;

/// Default command-queue depth per room.
pub const DEFAULT_CHANNEL_SIZE: usize = 64;

/// Owns every live room and the connection bindings into them.
///
/// All operations are synchronous map work; nothing here awaits into a
/// room, so callers can keep this behind a mutex without ever holding
/// that lock across a room operation.
pub struct RoomRegistry {
    timings: TurnTimings,
    words: Arc<dyn WordSource>,
    channel_size: usize,
    rooms: HashMap<RoomKey, RoomHandle>,
    by_conn: HashMap<ConnectionId, RoomHandle>,
}

impl RoomRegistry {
    pub fn new(timings: TurnTimings, words: Arc<dyn WordSource>, channel_size: usize) -> Self {
        Self {
            timings,
            words,
            channel_size,
            rooms: HashMap::new(),
            by_conn: HashMap::new(),
        }
    }

    /// The room this connection is bound to, if that room is still
    /// alive. A binding into an ended room is swept here, so a client
    /// whose game finished counts as roomless on its next command.
    pub fn room_of(&mut self, conn: ConnectionId) -> Option<RoomHandle> {
        match self.by_conn.get(&conn) {
            Some(handle) if !handle.is_closed() => Some(handle.clone()),
            Some(_) => {
                tracing::debug!(%conn, "swept binding to ended room");
                self.by_conn.remove(&conn);
                None
            }
            None => None,
        }
    }

    /// Looks up a live room by key, sweeping a dead one.
    pub fn get(&mut self, key: &RoomKey) -> Option<RoomHandle> {
        match self.rooms.get(key) {
            Some(handle) if !handle.is_closed() => Some(handle.clone()),
            Some(_) => {
                tracing::debug!(room = %key, "swept ended room");
                self.rooms.remove(key);
                None
            }
            None => None,
        }
    }

    /// Returns the room under `key`, spawning a fresh one when the key
    /// is unseen — or when its previous room has ended, so a key can be
    /// reused for game after game.
    pub fn get_or_spawn(&mut self, key: &RoomKey) -> RoomHandle {
        if let Some(handle) = self.get(key) {
            return handle;
        }
        let handle = spawn_room(
            key.clone(),
            self.timings,
            Arc::clone(&self.words),
            self.channel_size,
        );
        self.rooms.insert(key.clone(), handle.clone());
        handle
    }

    /// Records that a connection belongs to a room.
    pub fn bind(&mut self, conn: ConnectionId, handle: RoomHandle) {
        self.by_conn.insert(conn, handle);
    }

    /// Releases a connection's binding and sweeps ended rooms from both
    /// maps. Disconnects follow every finished game, so dead handles are
    /// collected even for keys that are never requested again.
    pub fn unbind(&mut self, conn: ConnectionId) {
        self.by_conn.remove(&conn);
        self.rooms.retain(|key, handle| {
            if handle.is_closed() {
                tracing::debug!(room = %key, "swept ended room");
                false
            } else {
                true
            }
        });
        self.by_conn.retain(|_, handle| !handle.is_closed());
    }

    /// Number of rooms still tracked. An ended room stays counted until
    /// a lookup or an unbind sweeps it out.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
