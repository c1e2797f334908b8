//! Error types for the tournament layer.

use rally_protocol::{PlayerId, TournamentId, TournamentStatus};

/// Errors returned to a player whose tournament request was refused.
#[derive(Debug, thiserror::Error)]
pub enum TournamentError {
    #[error("tournament {0} not found")]
    NotFound(TournamentId),

    /// Codes are `CODE_LEN` letters or digits.
    #[error("invalid tournament code '{0}'")]
    InvalidCode(TournamentId),

    #[error("player {player} is not in tournament {tournament}")]
    NotParticipant {
        player: PlayerId,
        tournament: TournamentId,
    },

    /// Joins are only accepted before the bracket is drawn.
    #[error("tournament {tournament} is no longer accepting players ({status})")]
    Closed {
        tournament: TournamentId,
        status: TournamentStatus,
    },

    /// The request does not apply in the tournament's current status.
    #[error("cannot do that while tournament {tournament} is {status}")]
    WrongStatus {
        tournament: TournamentId,
        status: TournamentStatus,
    },
}
