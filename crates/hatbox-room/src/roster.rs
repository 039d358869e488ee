//! The player roster: identity, presence, and scores.
//!
//! Roster order is the turn rotation order. Once a game starts the order
//! is frozen: rejoins reattach an existing seat, never reorder. Identity
//! is the username; the connection handle and event channel are ephemeral
//! and replaced wholesale on every reattach.

use hatbox_protocol::{PlayerEntry, PlayerScore, ServerEvent};
use hatbox_transport::ConnectionId;
use tokio::sync::mpsc;

/// Channel for pushing events to one player's connection.
pub type PlayerSender = mpsc::UnboundedSender<ServerEvent>;

#[derive(Debug)]
struct Player {
    username: String,
    conn: Option<ConnectionId>,
    sender: Option<PlayerSender>,
    online: bool,
    score_explained: u32,
    score_guessed: u32,
}

/// Ordered list of everyone who has joined the room.
#[derive(Debug, Default)]
pub(crate) struct Roster {
    players: Vec<Player>,
}

impl Roster {
    pub(crate) fn len(&self) -> usize {
        self.players.len()
    }

    pub(crate) fn position_by_username(&self, username: &str) -> Option<usize> {
        self.players.iter().position(|p| p.username == username)
    }

    pub(crate) fn position_by_conn(&self, conn: ConnectionId) -> Option<usize> {
        self.players.iter().position(|p| p.conn == Some(conn))
    }

    pub(crate) fn is_online(&self, index: usize) -> bool {
        self.players[index].online
    }

    pub(crate) fn username(&self, index: usize) -> &str {
        &self.players[index].username
    }

    /// Appends a new seat at the end of the rotation.
    pub(crate) fn add(
        &mut self,
        username: String,
        conn: ConnectionId,
        sender: PlayerSender,
    ) -> usize {
        self.players.push(Player {
            username,
            conn: Some(conn),
            sender: Some(sender),
            online: true,
            score_explained: 0,
            score_guessed: 0,
        });
        self.players.len() - 1
    }

    /// Rebinds an existing seat to a new connection.
    pub(crate) fn reattach(&mut self, index: usize, conn: ConnectionId, sender: PlayerSender) {
        let player = &mut self.players[index];
        player.conn = Some(conn);
        player.sender = Some(sender);
        player.online = true;
    }

    /// Marks a seat offline and drops its connection state. The seat
    /// itself survives so the player can come back by username.
    pub(crate) fn depart(&mut self, index: usize) {
        let player = &mut self.players[index];
        player.conn = None;
        player.sender = None;
        player.online = false;
    }

    /// The host seat: first player in roster order who is online.
    pub(crate) fn host(&self) -> Option<usize> {
        self.players.iter().position(|p| p.online)
    }

    pub(crate) fn host_username(&self) -> Option<String> {
        self.host().map(|i| self.players[i].username.clone())
    }

    pub(crate) fn online_count(&self) -> usize {
        self.players.iter().filter(|p| p.online).count()
    }

    /// Drops every offline seat. Only valid before the rotation is
    /// frozen, so callers use it at game start and never after.
    pub(crate) fn prune_offline(&mut self) {
        self.players.retain(|p| p.online);
    }

    pub(crate) fn entries(&self) -> Vec<PlayerEntry> {
        self.players
            .iter()
            .map(|p| PlayerEntry {
                username: p.username.clone(),
                online: p.online,
            })
            .collect()
    }

    pub(crate) fn sender(&self, index: usize) -> Option<&PlayerSender> {
        self.players.get(index).and_then(|p| p.sender.as_ref())
    }

    pub(crate) fn online_senders(&self) -> impl Iterator<Item = &PlayerSender> {
        self.players.iter().filter_map(|p| p.sender.as_ref())
    }

    pub(crate) fn sender_by_conn(&self, conn: ConnectionId) -> Option<&PlayerSender> {
        self.position_by_conn(conn).and_then(|i| self.sender(i))
    }

    /// Credits a turn's explained count to the pair that played it.
    pub(crate) fn award(&mut self, speaker: usize, listener: usize, explained: u32) {
        self.players[speaker].score_explained += explained;
        self.players[listener].score_guessed += explained;
    }

    /// Final standings: total score descending, ties in roster order.
    pub(crate) fn standings(&self) -> Vec<PlayerScore> {
        let mut results: Vec<PlayerScore> = self
            .players
            .iter()
            .map(|p| PlayerScore {
                username: p.username.clone(),
                score_explained: p.score_explained,
                score_guessed: p.score_guessed,
            })
            .collect();
        // Stable sort, so equal totals keep their roster order.
        results.sort_by_key(|r| std::cmp::Reverse(r.score_explained + r.score_guessed));
        results
    }
}

// =========================================================================
// Tests
// =========================================================================
