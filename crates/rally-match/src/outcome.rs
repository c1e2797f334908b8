//! What a finished match reports to its listeners and to match history.

use rally_protocol::{MatchId, PlayerId, Side};
use serde::{Deserialize, Serialize};

/// Whether a match is a casual game or part of a tournament bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchKind {
    Casual,
    Tournament,
}

impl MatchKind {
    /// The `match_type` label used by the match-history service.
    pub fn history_label(self) -> &'static str {
        match self {
            Self::Casual => "online",
            Self::Tournament => "tournament",
        }
    }
}

/// Why a match ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndReason {
    /// One side reached the score limit.
    ScoreLimit,
    /// `loser` forfeited: grace expiry, tournament disconnect, leave or
    /// ready timeout.
    Forfeit { loser: PlayerId, reason: String },
}

/// One side of a finished match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideResult {
    pub player: PlayerId,
    pub name: String,
    pub score: u32,
}

/// Final result of a match, delivered once to the match's subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    pub match_id: MatchId,
    pub kind: MatchKind,
    pub left: SideResult,
    pub right: SideResult,
    pub winner: PlayerId,
    pub reason: EndReason,
}

impl MatchOutcome {
    pub fn winner_side(&self) -> Side {
        if self.winner == self.left.player {
            Side::Left
        } else {
            Side::Right
        }
    }

    pub fn loser(&self) -> PlayerId {
        match self.winner_side() {
            Side::Left => self.right.player,
            Side::Right => self.left.player,
        }
    }

    pub fn is_forfeit(&self) -> bool {
        matches!(self.reason, EndReason::Forfeit { .. })
    }

    /// The row posted to the match-history service.
    pub fn to_record(&self) -> MatchRecord {
        MatchRecord {
            player1_id: self.left.player,
            player2_id: self.right.player,
            player1_username: self.left.name.clone(),
            player2_username: self.right.name.clone(),
            player1_score: self.left.score,
            player2_score: self.right.score,
            match_type: self.kind.history_label().to_string(),
        }
    }
}

/// Match-history payload, in the history service's snake_case schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub player1_id: PlayerId,
    pub player2_id: PlayerId,
    pub player1_username: String,
    pub player2_username: String,
    pub player1_score: u32,
    pub player2_score: u32,
    pub match_type: String,
}
