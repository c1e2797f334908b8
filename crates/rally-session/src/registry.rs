//! The session registry: connection → player → match.
//!
//! Owned by the engine's single serialization context, so it is a plain
//! set of `HashMap`s with no locking of its own.

use std::collections::HashMap;
use std::sync::Arc;

use rally_protocol::{MatchId, PlayerId, ServerMessage};
use rally_transport::ConnectionId;

use crate::{Outbound, Player, SessionError};

/// Result of [`SessionRegistry::bind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub player_id: PlayerId,
    /// `true` when an existing player was re-pointed to a new connection.
    pub rebound: bool,
}

/// Tracks every known player.
///
/// ## Invariants
///
/// - One `Player` per `PlayerId`; rebinding never duplicates it.
/// - A connection maps to at most one player, and a player's previous
///   connection entry is dropped in the same call that installs the new one.
/// - A player occupies at most one match.
#[derive(Default)]
pub struct SessionRegistry {
    players: HashMap<PlayerId, Player>,
    connections: HashMap<ConnectionId, PlayerId>,
    matches: HashMap<PlayerId, MatchId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates `link` with the player `id`, creating the player on first
    /// sight. This is also the reconnection path.
    pub fn bind(
        &mut self,
        link: Arc<dyn Outbound>,
        id: PlayerId,
        display_name: impl Into<String>,
    ) -> Binding {
        let conn = link.connection_id();
        let display_name = display_name.into();

        // The connection may previously have belonged to someone else.
        if let Some(previous) = self.connections.insert(conn, id) {
            if previous != id {
                if let Some(other) = self.players.get_mut(&previous) {
                    if other.connection_id() == Some(conn) {
                        other.drop_link();
                    }
                }
            }
        }

        match self.players.get_mut(&id) {
            Some(player) => {
                player.display_name = display_name;
                if let Some(old) = player.replace_link(link) {
                    let old_conn = old.connection_id();
                    if old_conn != conn {
                        self.connections.remove(&old_conn);
                    }
                }
                tracing::info!(player_id = %id, %conn, "player rebound to new connection");
                Binding { player_id: id, rebound: true }
            }
            None => {
                self.players.insert(id, Player::new(id, display_name, link));
                tracing::info!(player_id = %id, %conn, "player registered");
                Binding { player_id: id, rebound: false }
            }
        }
    }

    /// Re-points a known player to `link` without changing their name.
    ///
    /// Used when a message arrives on a connection that no longer resolves
    /// but declares a player id. Unknown ids are not created.
    pub fn rebind(&mut self, link: Arc<dyn Outbound>, id: PlayerId) -> Option<&Player> {
        let name = self.players.get(&id)?.display_name.clone();
        self.bind(link, id, name);
        self.players.get(&id)
    }

    /// The player bound to `conn`.
    pub fn resolve(&self, conn: ConnectionId) -> Option<&Player> {
        self.connections
            .get(&conn)
            .and_then(|id| self.players.get(id))
    }

    /// Forgets `conn`. The player stays registered without a link if `conn`
    /// was their current connection.
    pub fn release(&mut self, conn: ConnectionId) -> Option<PlayerId> {
        let id = self.connections.remove(&conn)?;
        if let Some(player) = self.players.get_mut(&id) {
            if player.connection_id() == Some(conn) {
                player.drop_link();
            }
        }
        Some(id)
    }

    /// Permanently removes a player and every entry pointing at them.
    pub fn remove(&mut self, id: PlayerId) -> Option<Player> {
        let player = self.players.remove(&id)?;
        self.connections.retain(|_, pid| *pid != id);
        self.matches.remove(&id);
        tracing::info!(player_id = %id, "player removed");
        Some(player)
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.players.contains_key(&id)
    }

    /// Display name of a known player.
    pub fn display_name(&self, id: PlayerId) -> Option<&str> {
        self.players.get(&id).map(|p| p.display_name.as_str())
    }

    pub fn is_connected(&self, id: PlayerId) -> bool {
        self.players.get(&id).is_some_and(Player::is_connected)
    }

    /// Queues `msg` for player `id`.
    pub fn send(&self, id: PlayerId, msg: ServerMessage) -> Result<(), SessionError> {
        self.players
            .get(&id)
            .ok_or(SessionError::NotFound(id))?
            .send(msg)
    }

    /// The match the player occupies, if any.
    pub fn current_match_of(&self, id: PlayerId) -> Option<MatchId> {
        self.matches.get(&id).copied()
    }

    pub fn is_in_match(&self, id: PlayerId) -> bool {
        self.matches.contains_key(&id)
    }

    /// Records that `id` now occupies `match_id`.
    pub fn enter_match(&mut self, id: PlayerId, match_id: MatchId) -> Result<(), SessionError> {
        if let Some(current) = self.matches.get(&id) {
            return Err(SessionError::AlreadyInMatch {
                player: id,
                current: *current,
            });
        }
        self.matches.insert(id, match_id);
        Ok(())
    }

    /// Clears the player's match entry if it still points at `match_id`.
    pub fn leave_match(&mut self, id: PlayerId, match_id: MatchId) -> bool {
        if self.matches.get(&id) == Some(&match_id) {
            self.matches.remove(&id);
            true
        } else {
            false
        }
    }

    /// Number of known players, connected or not.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
