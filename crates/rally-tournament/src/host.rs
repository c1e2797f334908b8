//! The seam between a tournament and the engine that runs its matches.

use std::time::Duration;

use rally_protocol::{MatchId, PlayerId, ServerMessage, TournamentId};
use serde::{Deserialize, Serialize};

use crate::Entrant;

/// One-shot timers a tournament may arm. At most one of each kind is
/// pending per tournament; arming again replaces the deadline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TournamentTimer {
    /// Forfeits every active player not yet ready for the round.
    ReadyTimeout(TournamentId),
    /// Retries bracket-matches deferred because a player was busy.
    KickoffRetry(TournamentId),
}

impl TournamentTimer {
    pub fn tournament(&self) -> &TournamentId {
        match self {
            Self::ReadyTimeout(id) | Self::KickoffRetry(id) => id,
        }
    }
}

/// Result forwarded to the ledger when a tournament produces a champion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentRecord {
    pub tournament_id: TournamentId,
    pub winner_id: PlayerId,
    pub players: Vec<PlayerId>,
    /// Number of bracket-matches in each round, first round first.
    pub rounds: Vec<usize>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

/// Everything a tournament needs from the world around it.
///
/// The engine implements this over its session and match registries. Every
/// call happens inside the engine's serialization context, so a tournament
/// never observes a half-applied change.
pub trait TournamentHost {
    /// Queues a message for a player. Delivery failures are the host's
    /// concern and never reported back.
    fn send(&mut self, to: PlayerId, msg: ServerMessage);

    fn is_connected(&self, player: PlayerId) -> bool;

    /// Whether the player currently occupies any live match.
    fn is_in_match(&self, player: PlayerId) -> bool;

    /// Starts a live match for a bracket pairing and subscribes
    /// `tournament` to its outcome. `None` if the match could not be
    /// created.
    fn start_match(
        &mut self,
        tournament: &TournamentId,
        left: &Entrant,
        right: &Entrant,
    ) -> Option<MatchId>;

    /// Tears down a live match because `loser` forfeited. The tournament's
    /// own subscription is not notified.
    fn end_match(&mut self, match_id: MatchId, loser: PlayerId, reason: &str);

    /// `(left, right)` score of a live match.
    fn live_score(&self, match_id: MatchId) -> Option<(u32, u32)>;

    fn schedule(&mut self, timer: TournamentTimer, after: Duration);

    fn cancel(&mut self, timer: &TournamentTimer);

    /// Hands a finished tournament to the outcome sink.
    fn persist(&mut self, record: TournamentRecord);
}
