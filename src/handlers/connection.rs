//! Connection-level handlers: auth and ping.

use super::core::{Context, Handler, HandlerResult, mismatched};
use crate::error::ServiceError;
use async_trait::async_trait;
use bidstage_proto::{ClientCommand, Topic};
use serde_json::json;
use tracing::{debug, info};

/// Handler for `auth`.
///
/// Binds the connection to a host and subscribes it to `host:{id}`.
pub struct AuthHandler;

#[async_trait]
impl Handler for AuthHandler {
    async fn handle(&self, ctx: &mut Context<'_>, cmd: &ClientCommand) -> HandlerResult {
        let ClientCommand::Auth { credential } = cmd else {
            return Err(mismatched(cmd));
        };

        let host_id = ctx.auth.verify(credential).await.map_err(|e| {
            debug!(conn = %ctx.conn, error = %e, "Credential rejected");
            ServiceError::NotAuthenticated
        })?;

        if let Some(previous) = ctx.state.host_id.take()
            && previous != host_id
        {
            ctx.hub.rooms.leave(ctx.conn, &Topic::host(&previous));
        }

        ctx.hub.rooms.join(ctx.conn, Topic::host(&host_id));
        info!(conn = %ctx.conn, addr = %ctx.remote_addr, host = %host_id, "Connection authenticated");
        ctx.state.host_id = Some(host_id.clone());

        Ok(json!({ "hostId": host_id }))
    }
}

/// Handler for `ping`.
pub struct PingHandler;

#[async_trait]
impl Handler for PingHandler {
    async fn handle(&self, _ctx: &mut Context<'_>, _cmd: &ClientCommand) -> HandlerResult {
        Ok(json!("pong"))
    }
}
