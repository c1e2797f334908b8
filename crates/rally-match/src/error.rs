//! Error types for the match layer.

use rally_protocol::{MatchId, PlayerId};

/// Errors that can occur while creating or driving a match.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    /// No live match has this id.
    #[error("match {0} not found")]
    NotFound(MatchId),

    /// The player is not one of the match's two sides.
    #[error("player {player} is not in match {match_id}")]
    NotParticipant { player: PlayerId, match_id: MatchId },

    /// Both sides of a pairing are the same player.
    #[error("player {0} cannot play against themselves")]
    SamePlayer(PlayerId),

    /// The match already reached game over.
    #[error("match {0} is already over")]
    Finished(MatchId),
}
