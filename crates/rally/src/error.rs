//! Unified error type for the Rally server.

use rally_match::MatchError;
use rally_protocol::ProtocolError;
use rally_session::SessionError;
use rally_tournament::TournamentError;
use rally_transport::TransportError;

/// Top-level error wrapping every layer's error.
///
/// `#[from]` on each variant lets `?` convert layer errors directly.
#[derive(Debug, thiserror::Error)]
pub enum RallyError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    Tournament(#[from] TournamentError),

    #[error(transparent)]
    Lobby(#[from] LobbyError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A required setting is missing or malformed.
    #[error("configuration: {0}")]
    Config(String),

    /// The engine task has stopped and no longer accepts commands.
    #[error("engine is not running")]
    EngineStopped,
}

/// Failures talking to the lobby service behind `startGame`.
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    /// The key is not of the form `"<idA>-<idB>"`.
    #[error("invalid lobby key {0:?}")]
    InvalidKey(String),

    #[error("lobby service request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("lobby service answered with status {0}")]
    Status(u16),
}
