//! The registry's record of one player.

use std::fmt;
use std::sync::Arc;

use rally_protocol::{PlayerId, ServerMessage};
use rally_transport::ConnectionId;

use crate::{Outbound, SessionError};

/// A known player. Survives reconnects; the link is what gets replaced.
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    link: Option<Arc<dyn Outbound>>,
}

impl Player {
    pub(crate) fn new(id: PlayerId, display_name: String, link: Arc<dyn Outbound>) -> Self {
        Self {
            id,
            display_name,
            link: Some(link),
        }
    }

    /// Whether the player has a link and it is still open.
    pub fn is_connected(&self) -> bool {
        self.link.as_ref().is_some_and(|link| link.is_alive())
    }

    /// Connection the player is currently bound to, alive or not.
    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.link.as_ref().map(|link| link.connection_id())
    }

    pub(crate) fn replace_link(&mut self, link: Arc<dyn Outbound>) -> Option<Arc<dyn Outbound>> {
        self.link.replace(link)
    }

    pub(crate) fn drop_link(&mut self) {
        self.link = None;
    }

    /// Queues a message on the player's current link.
    pub fn send(&self, msg: ServerMessage) -> Result<(), SessionError> {
        let link = self.link.as_ref().ok_or(SessionError::Offline(self.id))?;
        link.send(msg).map_err(|source| SessionError::Send {
            player: self.id,
            source,
        })
    }
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("connected", &self.is_connected())
            .finish()
    }
}
