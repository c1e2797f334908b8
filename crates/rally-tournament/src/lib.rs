//! Single-elimination tournaments for Rally.
//!
//! A [`Tournament`] is a pure state machine over its roster and
//! [`Bracket`]. It never owns a live match or a timer; it asks a
//! [`TournamentHost`] to start and end matches, arm timers and deliver
//! messages, and the host reports back through
//! [`Tournament::match_finished`] and [`Tournament::on_timer`].
//!
//! # Key types
//!
//! - [`TournamentRegistry`]: short-code lookup, on-demand creation, cleanup
//! - [`Tournament`]: join phase, draw, rounds, forfeits, champion
//! - [`Bracket`] / [`BracketMatch`]: the rounds and their pairings
//! - [`TournamentHost`]: what the engine provides
//! - [`TournamentRecord`]: the result handed to the ledger

mod bracket;
mod config;
mod error;
mod host;
mod registry;
mod tournament;

pub use bracket::{Bracket, BracketMatch, Entrant};
pub use config::TournamentConfig;
pub use error::TournamentError;
pub use host::{TournamentHost, TournamentRecord, TournamentTimer};
pub use registry::{CODE_ALPHABET, CODE_LEN, TournamentRegistry};
pub use tournament::Tournament;
