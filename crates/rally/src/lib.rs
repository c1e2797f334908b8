//! # Rally
//!
//! Real-time Pong match and tournament server.
//!
//! Players connect over WebSocket with a JWT, start casual matches agreed
//! in an external lobby, and play single-elimination tournaments of four
//! or eight. The server owns the ball: it ticks every match at 60 Hz,
//! decides every point, and streams state to both sides.
//!
//! All game state lives in one [`Engine`], driven by a single actor task
//! (see [`spawn_engine`]). Connections never touch that state directly;
//! they forward decoded messages to the actor and receive outbound
//! messages through a channel-backed [`Outbound`] link.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rally::prelude::*;
//!
//! # async fn start() -> Result<(), RallyError> {
//! let server = RallyServerBuilder::new()
//!     .bind("0.0.0.0:3000")
//!     .build(JwtAuthenticator::new("secret"))
//!     .await?;
//! server.run().await
//! # }
//! ```
//!
//! [`Outbound`]: rally_session::Outbound

mod actor;
mod config;
mod engine;
mod error;
mod handler;
mod lobby;
mod matches;
mod rematch;
mod server;
mod sink;
mod supervisor;
mod tournaments;

pub use actor::{EngineHandle, spawn_engine};
pub use config::{EngineConfig, ServerConfig, TournamentDisconnectPolicy};
pub use engine::{Engine, EngineStats};
pub use error::{LobbyError, RallyError};
pub use lobby::{HttpLobbyService, LobbyInfo, LobbyKey, LobbyRequest, LobbyService};
pub use server::{RallyServer, RallyServerBuilder};
pub use sink::{HttpOutcomeSink, LogSink, OutcomeSink, RecordingSink};

/// Everything needed to run or embed a server.
pub mod prelude {
    pub use crate::{
        Engine, EngineConfig, EngineHandle, HttpLobbyService, HttpOutcomeSink, LobbyService,
        OutcomeSink, RallyError, RallyServer, RallyServerBuilder, ServerConfig, spawn_engine,
    };
    pub use rally_protocol::{ClientMessage, MatchId, PlayerId, ServerMessage, TournamentId};
    pub use rally_session::{Authenticator, Identity, JwtAuthenticator};
}
