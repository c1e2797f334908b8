//! Pong matches for Rally.
//!
//! The physics model, the per-match state machine driven one 60 Hz frame at
//! a time, and the registry that owns every live match. Nothing here talks
//! to a connection or a clock; the engine in the `rally` crate does that.
//!
//! # Key types
//!
//! - [`Match`]: one match's state machine (countdown, scoring, pause)
//! - [`MatchRegistry`]: creates and owns live matches, orders sides by id
//! - [`TickReport`]: what one frame produced (sync events, points, game over)
//! - [`MatchOutcome`] / [`MatchRecord`]: results for listeners and history
//! - [`physics`]: ball and paddle arithmetic

mod config;
mod error;
mod game;
mod outcome;
pub mod physics;
mod registry;

pub use config::{MatchConfig, MatchPhase};
pub use error::MatchError;
pub use game::{BallSync, Match, Slot, TickReport};
pub use outcome::{EndReason, MatchKind, MatchOutcome, MatchRecord, SideResult};
pub use registry::{Contender, MatchRegistry};
