//! Per-connection handler: auth, binding and message pumping.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Authenticate the token from the upgrade request
//!   2. Bind the player in the engine through a channel-backed link
//!   3. Spawn a writer that drains the link into the socket
//!   4. Loop: decode frames and forward them to the engine
//!   5. Report the disconnect exactly once, however the loop ended

use std::sync::Arc;
use std::time::Duration;

use rally_protocol::{ClientMessage, Codec, JsonCodec, ServerMessage};
use rally_session::{Authenticator, ChannelOutbound, Outbound};
use rally_transport::{Connection, WebSocketConnection};

use crate::{EngineHandle, RallyError};

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<A: Authenticator>(
    conn: WebSocketConnection,
    auth: Arc<A>,
    engine: EngineHandle,
    idle_timeout: Option<Duration>,
) -> Result<(), RallyError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let identity = match auth.authenticate(conn.auth_token().unwrap_or_default()).await {
        Ok(identity) => identity,
        Err(e) => {
            tracing::info!(%conn_id, error = %e, "authentication failed, closing");
            let _ = conn.close().await;
            return Err(e.into());
        }
    };
    let player_id = identity.id;

    let conn = Arc::new(conn);
    let (outbound, mut outbox) = ChannelOutbound::new(conn_id);
    let link: Arc<dyn Outbound> = Arc::new(outbound);

    let writer = {
        let conn = Arc::clone(&conn);
        tokio::spawn(async move {
            while let Some(msg) = outbox.recv().await {
                let bytes = match JsonCodec.encode(&msg) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::warn!(%conn_id, error = %e, "failed to encode outbound message");
                        continue;
                    }
                };
                if let Err(e) = conn.send(&bytes).await {
                    tracing::debug!(%conn_id, error = %e, "write failed, stopping writer");
                    break;
                }
            }
        })
    };

    let result = match engine.connect(Arc::clone(&link), identity).await {
        Ok(binding) => {
            tracing::info!(%conn_id, %player_id, rebound = binding.rebound, "player connected");
            pump(&conn, &link, &engine, idle_timeout).await
        }
        Err(e) => Err(e),
    };

    if let Err(e) = engine.disconnect(conn_id).await {
        tracing::debug!(%conn_id, error = %e, "disconnect not delivered");
    }
    writer.abort();
    result
}

/// Forwards inbound frames until the peer goes away or, with an idle
/// limit, falls silent.
async fn pump(
    conn: &WebSocketConnection,
    link: &Arc<dyn Outbound>,
    engine: &EngineHandle,
    idle_timeout: Option<Duration>,
) -> Result<(), RallyError> {
    let conn_id = conn.id();
    loop {
        let next = match idle_timeout {
            Some(limit) => tokio::time::timeout(limit, conn.recv()).await,
            None => Ok(conn.recv().await),
        };
        let data = match next {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                return Ok(());
            }
            Ok(Err(e)) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                return Ok(());
            }
            Err(_) => {
                tracing::info!(%conn_id, "connection idle, closing");
                let _ = conn.close().await;
                return Ok(());
            }
        };

        let msg: ClientMessage = match JsonCodec.decode(&data) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode message");
                let _ = link.send(ServerMessage::error("Invalid message."));
                continue;
            }
        };
        engine.inbound(Arc::clone(link), msg).await?;
    }
}
