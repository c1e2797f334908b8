//! Messages pushed by the server to a player's connection.

use serde::{Deserialize, Serialize};

use crate::{MatchId, PlayerId, Side, TournamentId};

/// Authoritative ball position and velocity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallView {
    pub x: f64,
    pub y: f64,
    pub dx: f64,
    pub dy: f64,
}

/// One paddle as seen in a `state` frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaddleView {
    pub x: f64,
    pub y: f64,
    pub score: u32,
}

/// Full match state framed from one participant's perspective:
/// `player` is always the recipient, `opponent` the other side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientState {
    pub ball: BallView,
    pub player: PaddleView,
    pub opponent: PaddleView,
    pub player_user_id: PlayerId,
    pub player_username: String,
    pub opponent_user_id: PlayerId,
    pub opponent_username: String,
    pub game_over: bool,
    /// Seconds left before the ball goes live; absent once play starts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub countdown: Option<u32>,
}

/// Physical event that triggered a `ballSync`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncEvent {
    PaddleHit,
    WallBounce,
    Score,
    Reset,
}

/// Lifecycle of a tournament.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TournamentStatus {
    Created,
    Starting,
    InProgress,
    Completed,
}

impl TournamentStatus {
    /// Whether new entrants may still join.
    pub fn accepts_joins(self) -> bool {
        matches!(self, Self::Created | Self::Starting)
    }
}

impl std::fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Starting => "starting",
            Self::InProgress => "inProgress",
            Self::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// Status field of a `tournamentUpdate` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpdateStatus {
    Created,
    Starting,
    InProgress,
    Completed,
    Left,
    Error,
}

impl From<TournamentStatus> for UpdateStatus {
    fn from(status: TournamentStatus) -> Self {
        match status {
            TournamentStatus::Created => Self::Created,
            TournamentStatus::Starting => Self::Starting,
            TournamentStatus::InProgress => Self::InProgress,
            TournamentStatus::Completed => Self::Completed,
        }
    }
}

/// Roster entry in `tournamentParticipants`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantView {
    pub id: PlayerId,
    pub username: String,
    pub ready: bool,
}

/// A player slot inside a bracket entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrantView {
    pub id: PlayerId,
    pub username: String,
}

/// One bracket-match in `tournamentBracket`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketEntryView {
    pub left: Option<EntrantView>,
    pub right: Option<EntrantView>,
    pub winner: Option<EntrantView>,
    pub in_progress: bool,
    pub game_id: Option<MatchId>,
    pub left_score: u32,
    pub right_score: u32,
}

/// Every notification the server sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Periodic full state (about 20 Hz).
    State { state: ClientState },

    /// Event-triggered ball truth between full frames.
    BallSync {
        event: SyncEvent,
        ball: BallView,
        left_score: u32,
        right_score: u32,
        /// Milliseconds since the Unix epoch when the event was emitted.
        timestamp: u64,
    },

    GameStart,

    PauseUpdate {
        paused: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    GameOver {
        won: bool,
        reason: String,
        message: String,
    },

    OpponentDisconnecting { grace_period_ms: u64, message: String },
    OpponentDisconnected { message: String },

    RematchRequest,
    RematchAccepted,

    TournamentUpdate {
        tournament_id: TournamentId,
        status: UpdateStatus,
        message: String,
    },
    TournamentParticipants {
        tournament_id: TournamentId,
        count: usize,
        round: usize,
        status: TournamentStatus,
        participants: Vec<ParticipantView>,
    },
    TournamentBracket {
        tournament_id: TournamentId,
        round: usize,
        bracket: Vec<Vec<BracketEntryView>>,
    },
    TournamentMatch {
        tournament_id: TournamentId,
        round: usize,
        opponent_id: PlayerId,
        opponent_username: String,
        role: Side,
    },
    TournamentRoundComplete {
        tournament_id: TournamentId,
        round: usize,
        message: String,
    },
    TournamentRoundReady {
        tournament_id: TournamentId,
        round: usize,
        ready_players: Vec<PlayerId>,
        active_players: Vec<PlayerId>,
    },
    TournamentReadyTimeout {
        tournament_id: TournamentId,
        timeout_seconds: u64,
        message: String,
    },
    TournamentForfeit {
        tournament_id: TournamentId,
        forfeited_player_id: PlayerId,
        forfeited_username: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        winner_id: Option<PlayerId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        winner_username: Option<String>,
        reason: String,
        message: String,
    },
    TournamentCompleted {
        tournament_id: TournamentId,
        winner_id: PlayerId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    Error { message: String },
}

impl ServerMessage {
    /// Convenience constructor for `error` replies.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error { message: message.into() }
    }
}
