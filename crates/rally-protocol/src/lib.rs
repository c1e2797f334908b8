//! Wire protocol for the Rally match server.
//!
//! - **Identifiers** ([`PlayerId`], [`MatchId`], [`TournamentId`])
//! - **Inbound messages** ([`ClientMessage`]) sent by a player's connection
//! - **Outbound messages** ([`ServerMessage`]) and the view structs they carry
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) turning them into frames
//!
//! Every message is an internally tagged JSON object: `{"type": "input", ...}`
//! with camelCase field names, which is what the browser client speaks.

mod client;
mod clock;
mod codec;
mod error;
mod ids;
mod server;

pub use client::ClientMessage;
pub use clock::unix_millis;
pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use ids::{MatchId, PlayerId, Side, TournamentId};
pub use server::{
    BallView, BracketEntryView, ClientState, EntrantView, PaddleView,
    ParticipantView, ServerMessage, SyncEvent, TournamentStatus, UpdateStatus,
};
