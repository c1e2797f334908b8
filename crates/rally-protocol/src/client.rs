//! Messages sent by a player's connection to the server.

use serde::{Deserialize, Serialize};

use crate::{PlayerId, TournamentId};

/// Every request a client can make.
///
/// Wire format: `{"type": "joinTournament", "tournamentId": "K7QX"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Paddle control for the sender's current match.
    ///
    /// `player_id` is only consulted when the server cannot resolve the
    /// sending connection (recovery path).
    Input {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player_id: Option<PlayerId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        paddle_up: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        paddle_down: Option<bool>,
    },

    /// Start a casual match for a pairing made by the lobby service.
    /// The key has the form `"<idA>-<idB>"`.
    StartGame { lobby_key: String },

    RequestRematch,
    PauseGame,
    ResumeGame,

    CreateTournament,
    JoinTournament { tournament_id: TournamentId },
    SetTournamentReady { tournament_id: TournamentId, ready: bool },
    RejoinTournament { tournament_id: TournamentId },
    LeaveTournament { tournament_id: TournamentId },
}

impl ClientMessage {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Input { .. } => "input",
            Self::StartGame { .. } => "startGame",
            Self::RequestRematch => "requestRematch",
            Self::PauseGame => "pauseGame",
            Self::ResumeGame => "resumeGame",
            Self::CreateTournament => "createTournament",
            Self::JoinTournament { .. } => "joinTournament",
            Self::SetTournamentReady { .. } => "setTournamentReady",
            Self::RejoinTournament { .. } => "rejoinTournament",
            Self::LeaveTournament { .. } => "leaveTournament",
        }
    }
}
