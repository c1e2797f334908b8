//! `RallyServer` builder and accept loop.
//!
//! This is the entry point for running a Rally server. It ties together
//! every layer: transport → protocol → session → engine actor.

use std::sync::Arc;
use std::time::Duration;

use rally_session::Authenticator;
use rally_transport::{Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{
    Engine, EngineConfig, EngineHandle, HttpLobbyService, LobbyService, LogSink, OutcomeSink,
    RallyError, ServerConfig, spawn_engine,
};

/// Builder for configuring and starting a Rally server.
///
/// # Example
///
/// ```rust,ignore
/// use rally::prelude::*;
///
/// let server = RallyServerBuilder::new()
///     .bind("0.0.0.0:3000")
///     .lobby(HttpLobbyService::new("http://user-service:5100"))
///     .build(JwtAuthenticator::new("secret"))
///     .await?;
/// server.run().await
/// ```
pub struct RallyServerBuilder<L = HttpLobbyService> {
    bind_addr: String,
    engine_config: EngineConfig,
    sink: Arc<dyn OutcomeSink>,
    lobby: L,
    idle_timeout: Option<Duration>,
}

impl RallyServerBuilder {
    /// Creates a builder with default settings. Lobby lookups go to the
    /// default user service until [`lobby`](Self::lobby) replaces it.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            engine_config: EngineConfig::default(),
            sink: Arc::new(LogSink),
            lobby: HttpLobbyService::new(ServerConfig::DEFAULT_USER_SERVICE_URL),
            idle_timeout: None,
        }
    }
}

impl Default for RallyServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: LobbyService> RallyServerBuilder<L> {
    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    pub fn engine_config(mut self, config: EngineConfig) -> Self {
        self.engine_config = config;
        self
    }

    /// Where match and tournament results go. Defaults to [`LogSink`].
    pub fn outcome_sink(mut self, sink: impl OutcomeSink) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    pub fn lobby<L2: LobbyService>(self, lobby: L2) -> RallyServerBuilder<L2> {
        RallyServerBuilder {
            bind_addr: self.bind_addr,
            engine_config: self.engine_config,
            sink: self.sink,
            lobby,
            idle_timeout: self.idle_timeout,
        }
    }

    /// Drops connections that send nothing for this long. `None`, the
    /// default, keeps silent connections open.
    pub fn idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Binds the listener and starts the engine task.
    pub async fn build<A: Authenticator>(self, auth: A) -> Result<RallyServer<A>, RallyError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let engine = spawn_engine(Engine::new(self.engine_config, self.sink), self.lobby);
        Ok(RallyServer {
            transport,
            engine,
            auth: Arc::new(auth),
            idle_timeout: self.idle_timeout,
        })
    }
}

/// A bound Rally server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct RallyServer<A: Authenticator> {
    transport: WebSocketTransport,
    engine: EngineHandle,
    auth: Arc<A>,
    idle_timeout: Option<Duration>,
}

impl<A: Authenticator> RallyServer<A> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// A handle to the engine task, for embedding and tests.
    pub fn engine(&self) -> EngineHandle {
        self.engine.clone()
    }

    /// Runs the accept loop. Each connection is handled on its own task.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), RallyError> {
        tracing::info!("rally server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let auth = Arc::clone(&self.auth);
                    let engine = self.engine.clone();
                    let idle_timeout = self.idle_timeout;
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, auth, engine, idle_timeout).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
