//! `rally-server`: the Pong match and tournament server.
//!
//! Configured from `RALLY_*` environment variables; see
//! [`ServerConfig::from_env`]. Log verbosity follows `RUST_LOG`.

use rally::{HttpLobbyService, HttpOutcomeSink, RallyError, RallyServerBuilder, ServerConfig};
use rally_session::JwtAuthenticator;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), RallyError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env()?;
    tracing::info!(
        bind = %config.bind_addr,
        user_service = %config.user_service_url,
        ledger = config.ledger_url.as_deref().unwrap_or("disabled"),
        "starting rally server"
    );

    let server = RallyServerBuilder::new()
        .bind(&config.bind_addr)
        .engine_config(config.engine.clone())
        .idle_timeout(config.idle_timeout)
        .outcome_sink(HttpOutcomeSink::new(&config.user_service_url, config.ledger_url.clone()))
        .lobby(HttpLobbyService::new(&config.user_service_url))
        .build(JwtAuthenticator::new(&config.jwt_secret))
        .await?;
    tracing::info!(addr = ?server.local_addr().ok(), "listening");

    server.run().await
}
