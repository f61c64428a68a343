//! Connection - Handles an individual WebSocket client.
//!
//! Each Connection runs in its own Tokio task:
//!
//! ```text
//!   WebSocket read half ──► parse Request ──► Registry::dispatch ──► Reply ──┐
//!                                                                            ▼
//!   RoomBroadcaster ──► outbound mpsc ──────────────────────────────► write half
//! ```
//!
//! Replies are written directly; events arrive through the outbound queue
//! the broadcaster owns. When the broadcaster drops a slow connection the
//! queue closes and the loop exits.

use crate::auth::Authenticator;
use crate::error::ServiceError;
use crate::handlers::{ConnectionState, Context, Registry};
use crate::network::limit::CommandLimiter;
use crate::state::{ConnId, Hub};
use crate::telemetry::spans;
use bidstage_proto::{Reply, Request, ServerFrame};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{Instrument, debug, info, warn};

/// A client connection handler.
pub struct Connection {
    conn_id: ConnId,
    addr: SocketAddr,
    hub: Arc<Hub>,
    registry: Arc<Registry>,
    auth: Arc<dyn Authenticator>,
    ws: WebSocketStream<TcpStream>,
}

impl Connection {
    /// Create a new connection handler.
    pub fn new(
        conn_id: ConnId,
        ws: WebSocketStream<TcpStream>,
        addr: SocketAddr,
        hub: Arc<Hub>,
        registry: Arc<Registry>,
        auth: Arc<dyn Authenticator>,
    ) -> Self {
        Self {
            conn_id,
            addr,
            hub,
            registry,
            auth,
            ws,
        }
    }

    /// Run the connection until the client leaves or is dropped.
    pub async fn run(self) -> anyhow::Result<()> {
        let span = spans::connection(&self.conn_id, &self.addr.to_string());
        self.serve().instrument(span).await
    }

    async fn serve(self) -> anyhow::Result<()> {
        let Self {
            conn_id,
            addr,
            hub,
            registry,
            auth,
            ws,
        } = self;

        crate::metrics::add_connected_clients(1);
        info!("Client connected");

        let (tx, mut outbound) = mpsc::channel::<Arc<str>>(hub.limits.outbound_queue_capacity.max(1));
        hub.rooms.attach(&conn_id, tx);

        let (mut sink, mut stream) = ws.split();
        let limiter = CommandLimiter::new(hub.limits.commands_per_second);
        let mut state = ConnectionState::default();

        let result: anyhow::Result<()> = async {
            loop {
                tokio::select! {
                    incoming = stream.next() => {
                        let text = match incoming {
                            Some(Ok(Message::Text(text))) => text,
                            Some(Ok(Message::Binary(_))) => {
                                let reply = Reply::err(None, "invalid-parameter", "binary frames are not supported");
                                sink.send(Message::Text(ServerFrame::Reply(reply).to_text())).await?;
                                continue;
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                info!("Client disconnected");
                                break;
                            }
                            Some(Ok(_)) => continue,
                            Some(Err(e)) => {
                                warn!(error = %e, "Read error");
                                break;
                            }
                        };

                        let allowed = limiter.check();
                        let reply = match text.parse::<Request>() {
                            Ok(request) if !allowed => {
                                crate::metrics::inc_rate_limited();
                                debug!(action = request.command.action(), "Command rate limit exceeded");
                                ServiceError::RateLimited.to_reply(request.id)
                            }
                            Ok(request) => {
                                let mut ctx = Context {
                                    conn: &conn_id,
                                    hub: &hub,
                                    auth: auth.as_ref(),
                                    state: &mut state,
                                    remote_addr: addr,
                                };
                                registry.dispatch(&mut ctx, &request).await
                            }
                            Err(_) if !allowed => {
                                crate::metrics::inc_rate_limited();
                                ServiceError::RateLimited.to_reply(None)
                            }
                            Err(e) => {
                                debug!(error = %e, "Malformed request");
                                Reply::err(None, "invalid-parameter", e.to_string())
                            }
                        };

                        sink.send(Message::Text(ServerFrame::Reply(reply).to_text())).await?;
                    }

                    frame = outbound.recv() => {
                        match frame {
                            Some(text) => sink.send(Message::Text(text.to_string())).await?,
                            None => {
                                warn!("Outbound queue closed by broadcaster");
                                break;
                            }
                        }
                    }
                }
            }
            Ok::<(), anyhow::Error>(())
        }
        .await;

        // Subscriptions end with the socket; open sessions stay open.
        hub.rooms.detach(&conn_id);
        crate::metrics::add_connected_clients(-1);
        let _ = sink.close().await;
        info!(host = ?state.host_id, "Connection closed");

        result
    }
}
