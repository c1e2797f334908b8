//! Player identity and connection tracking for the Rally match server.
//!
//! 1. **Authentication**: the [`Authenticator`] trait turns the token
//!    presented on connect into an [`Identity`]; [`JwtAuthenticator`] is the
//!    production implementation.
//! 2. **Connection capability**: the engine reaches a player only through an
//!    [`Outbound`] link (`send` + liveness), never a socket.
//! 3. **Registry**: [`SessionRegistry`] maps connections to players and
//!    players to the match they occupy, and re-points a player's link when
//!    they reconnect.
//!
//! ```text
//! Match / Tournament layers (above)  <- ask "who is this?" and "are they busy?"
//!     |
//! Session layer (this crate)         <- identity, links, player -> match
//!     |
//! Protocol / Transport (below)       <- PlayerId, ServerMessage, ConnectionId
//! ```

#![allow(async_fn_in_trait)]

mod auth;
mod error;
mod outbound;
mod player;
mod registry;

pub use auth::{Authenticator, Identity, JwtAuthenticator, JwtClaims};
pub use error::{SendError, SessionError};
pub use outbound::{ChannelOutbound, Outbound};
pub use player::Player;
pub use registry::{Binding, SessionRegistry};
