//! The connection capability handed to the engine.

use rally_protocol::ServerMessage;
use rally_transport::ConnectionId;
use tokio::sync::mpsc;

use crate::SendError;

/// Something the engine can push messages into.
///
/// `send` must never block: the engine calls it from inside match ticks.
pub trait Outbound: Send + Sync + 'static {
    /// The connection this link writes to.
    fn connection_id(&self) -> ConnectionId;

    /// Queues a message for delivery.
    fn send(&self, msg: ServerMessage) -> Result<(), SendError>;

    /// Whether the connection can still accept messages.
    fn is_alive(&self) -> bool;
}

/// An [`Outbound`] backed by an unbounded channel drained by the
/// connection's writer task.
///
/// When the writer exits (socket closed) the receiver drops and every
/// further `send` fails with [`SendError::Closed`].
#[derive(Debug, Clone)]
pub struct ChannelOutbound {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<ServerMessage>,
}

impl ChannelOutbound {
    /// Creates a link and the receiver its writer task should drain.
    pub fn new(id: ConnectionId) -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { id, tx }, rx)
    }
}

impl Outbound for ChannelOutbound {
    fn connection_id(&self) -> ConnectionId {
        self.id
    }

    fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.tx.send(msg).map_err(|_| SendError::Closed(self.id))
    }

    fn is_alive(&self) -> bool {
        !self.tx.is_closed()
    }
}
