//! Error types for the session layer.

use rally_protocol::{MatchId, PlayerId};
use rally_transport::ConnectionId;

/// A message could not be handed to a connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    /// The connection's writer is gone.
    #[error("connection {0} is closed")]
    Closed(ConnectionId),
}

/// Errors that can occur in the session layer.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The token was missing, invalid or expired.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// No player with this id is registered.
    #[error("player {0} not found")]
    NotFound(PlayerId),

    /// The player exists but has no live connection (disconnected, inside a
    /// grace period).
    #[error("player {0} is offline")]
    Offline(PlayerId),

    /// The player already occupies a match.
    #[error("player {player} is already in match {current}")]
    AlreadyInMatch { player: PlayerId, current: MatchId },

    /// Delivery to the player's connection failed.
    #[error("send to player {player} failed: {source}")]
    Send {
        player: PlayerId,
        #[source]
        source: SendError,
    },
}

impl SessionError {
    /// Whether this error means the player's connection is dead and the
    /// disconnect path should run.
    pub fn is_connection_loss(&self) -> bool {
        matches!(self, Self::Send { .. })
    }
}
