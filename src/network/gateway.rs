//! Gateway - WebSocket listener that accepts incoming connections.
//!
//! The Gateway binds the listen socket, performs the WebSocket handshake
//! (rejecting disallowed origins with 403) and spawns a Connection task for
//! each client.

use crate::auth::Authenticator;
use crate::config::ListenConfig;
use crate::handlers::Registry;
use crate::network::Connection;
use crate::state::Hub;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tracing::{error, info, instrument, warn};

/// The Gateway accepts incoming WebSocket connections and spawns handlers.
pub struct Gateway {
    listener: TcpListener,
    listen: ListenConfig,
    hub: Arc<Hub>,
    registry: Arc<Registry>,
    auth: Arc<dyn Authenticator>,
}

impl Gateway {
    /// Bind the gateway to the configured address.
    pub async fn bind(
        listen: ListenConfig,
        hub: Arc<Hub>,
        auth: Arc<dyn Authenticator>,
    ) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(listen.address).await?;
        let registry = Arc::new(Registry::new());
        info!(address = %listener.local_addr()?, actions = registry.action_count(), "WebSocket listener bound");

        Ok(Self {
            listener,
            listen,
            hub,
            registry,
            auth,
        })
    }

    /// The bound address; differs from the configured one when port 0 was requested.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the gateway, accepting connections forever.
    #[instrument(skip(self), name = "gateway")]
    pub async fn run(self) -> anyhow::Result<()> {
        let listen = Arc::new(self.listen);

        loop {
            let (stream, addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                    continue;
                }
            };

            let hub = Arc::clone(&self.hub);
            let registry = Arc::clone(&self.registry);
            let auth = Arc::clone(&self.auth);
            let listen = Arc::clone(&listen);
            let conn_id = hub.conn_ids.next();

            tokio::spawn(async move {
                let origin_check = |req: &Request, response: Response| {
                    let origin = req
                        .headers()
                        .get(http::header::ORIGIN)
                        .and_then(|o| o.to_str().ok());
                    if listen.origin_allowed(origin) {
                        return Ok(response);
                    }
                    warn!(%addr, origin = ?origin, "WebSocket origin rejected");
                    Err(forbidden())
                };

                match accept_hdr_async(stream, origin_check).await {
                    Ok(ws) => {
                        let connection =
                            Connection::new(conn_id.clone(), ws, addr, hub, registry, auth);
                        if let Err(e) = connection.run().await {
                            warn!(conn = %conn_id, %addr, error = %e, "Connection error");
                        }
                    }
                    Err(e) => {
                        warn!(%addr, error = %e, "WebSocket handshake failed");
                    }
                }
            });
        }
    }
}

fn forbidden() -> ErrorResponse {
    let mut response = ErrorResponse::new(Some("origin not allowed".to_string()));
    *response.status_mut() = http::StatusCode::FORBIDDEN;
    response
}
