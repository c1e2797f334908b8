//! The engine actor: one Tokio task that owns the [`Engine`].
//!
//! Connections talk to it through an [`EngineHandle`], which is a thin
//! wrapper around an `mpsc::Sender`. The task wakes for the next command
//! or the next engine timer, whichever comes first, so matches tick
//! without a separate clock task.

use std::sync::Arc;
use std::time::Instant;

use rally_protocol::ClientMessage;
use rally_session::{Binding, Identity, Outbound};
use rally_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};

use crate::engine::EngineStats;
use crate::lobby::{LobbyInfo, LobbyRequest, LobbyService};
use crate::{Engine, LobbyError, RallyError};

/// Commands accepted by the engine task.
pub(crate) enum Command {
    Connect {
        link: Arc<dyn Outbound>,
        identity: Identity,
        reply: oneshot::Sender<Binding>,
    },
    Disconnect {
        conn: ConnectionId,
    },
    Inbound {
        link: Arc<dyn Outbound>,
        msg: ClientMessage,
    },
    /// A lobby lookup finished off the engine task.
    LobbyResolved {
        request: LobbyRequest,
        result: Result<LobbyInfo, LobbyError>,
    },
    Stats {
        reply: oneshot::Sender<EngineStats>,
    },
    Shutdown,
}

/// How many commands may queue before senders wait.
const INBOX_CAPACITY: usize = 1024;

/// Handle to the running engine task. Cheap to clone.
#[derive(Clone)]
pub struct EngineHandle {
    sender: mpsc::Sender<Command>,
}

impl EngineHandle {
    /// Binds an authenticated connection and waits for the result.
    pub async fn connect(
        &self,
        link: Arc<dyn Outbound>,
        identity: Identity,
    ) -> Result<Binding, RallyError> {
        let (reply, rx) = oneshot::channel();
        self.submit(Command::Connect {
            link,
            identity,
            reply,
        })
        .await?;
        rx.await.map_err(|_| RallyError::EngineStopped)
    }

    pub async fn disconnect(&self, conn: ConnectionId) -> Result<(), RallyError> {
        self.submit(Command::Disconnect { conn }).await
    }

    /// Delivers one decoded message from `link` (fire-and-forget).
    pub async fn inbound(&self, link: Arc<dyn Outbound>, msg: ClientMessage) -> Result<(), RallyError> {
        self.submit(Command::Inbound { link, msg }).await
    }

    pub async fn stats(&self) -> Result<EngineStats, RallyError> {
        let (reply, rx) = oneshot::channel();
        self.submit(Command::Stats { reply }).await?;
        rx.await.map_err(|_| RallyError::EngineStopped)
    }

    /// Stops the engine task. Live matches are dropped without results.
    pub async fn shutdown(&self) -> Result<(), RallyError> {
        self.submit(Command::Shutdown).await
    }

    async fn submit(&self, cmd: Command) -> Result<(), RallyError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RallyError::EngineStopped)
    }
}

/// Moves `engine` onto its own task and returns the handle to it.
///
/// `lobby` answers `startGame` lookups; each lookup runs on a spawned task
/// and its answer comes back through the inbox.
pub fn spawn_engine<L: LobbyService>(engine: Engine, lobby: L) -> EngineHandle {
    let (sender, receiver) = mpsc::channel(INBOX_CAPACITY);
    let actor = EngineActor {
        engine,
        lobby: Arc::new(lobby),
        receiver,
        loopback: sender.downgrade(),
    };
    tokio::spawn(actor.run());
    EngineHandle { sender }
}

/// The engine clock. Follows Tokio's clock so paused-time tests stay
/// deterministic.
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

struct EngineActor<L> {
    engine: Engine,
    lobby: Arc<L>,
    receiver: mpsc::Receiver<Command>,
    /// Weak so the task still stops once every handle is gone.
    loopback: mpsc::WeakSender<Command>,
}

impl<L: LobbyService> EngineActor<L> {
    async fn run(mut self) {
        tracing::info!("engine started");

        loop {
            let deadline = self.engine.next_deadline();
            let wake = async move {
                match deadline {
                    Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(Command::Shutdown) | None => break,
                    Some(cmd) => self.dispatch(cmd),
                },
                () = wake => self.engine.advance(now()),
            }
        }

        tracing::info!("engine stopped");
    }

    fn dispatch(&mut self, cmd: Command) {
        let now = now();
        match cmd {
            Command::Connect {
                link,
                identity,
                reply,
            } => {
                let binding = self.engine.connect(link, identity, now);
                let _ = reply.send(binding);
            }
            Command::Disconnect { conn } => self.engine.disconnect(conn, now),
            Command::Inbound { link, msg } => {
                if let Some(request) = self.engine.handle(&link, msg, now) {
                    self.lookup(request);
                }
            }
            Command::LobbyResolved { request, result } => {
                self.engine.resolve_lobby(request, result, now);
            }
            Command::Stats { reply } => {
                let _ = reply.send(self.engine.stats());
            }
            Command::Shutdown => {}
        }
    }

    fn lookup(&self, request: LobbyRequest) {
        let lobby = Arc::clone(&self.lobby);
        let loopback = self.loopback.clone();
        tokio::spawn(async move {
            let result = lobby.lobby_info(&request.key, request.player).await;
            match loopback.upgrade() {
                Some(inbox) => {
                    let _ = inbox.send(Command::LobbyResolved { request, result }).await;
                }
                None => tracing::debug!(player_id = %request.player, "engine gone, lobby answer dropped"),
            }
        });
    }
}
