//! Session lifecycle handlers.

use super::core::{Context, Handler, HandlerResult, mismatched, to_value};
use async_trait::async_trait;
use bidstage_proto::ClientCommand;

/// Handler for `open-session`.
pub struct OpenSessionHandler;

#[async_trait]
impl Handler for OpenSessionHandler {
    fn requires_auth(&self) -> bool {
        true
    }

    async fn handle(&self, ctx: &mut Context<'_>, cmd: &ClientCommand) -> HandlerResult {
        let ClientCommand::OpenSession { establishment_id } = cmd else {
            return Err(mismatched(cmd));
        };
        let host_id = ctx.host_id()?;
        to_value(ctx.hub.open_session(host_id, establishment_id)?)
    }
}

/// Handler for `close-session`.
pub struct CloseSessionHandler;

#[async_trait]
impl Handler for CloseSessionHandler {
    fn requires_auth(&self) -> bool {
        true
    }

    async fn handle(&self, ctx: &mut Context<'_>, _cmd: &ClientCommand) -> HandlerResult {
        let host_id = ctx.host_id()?;
        to_value(ctx.hub.close_session(host_id).await?)
    }
}

/// Handler for `current-session`. Replies `null` when nothing is open.
pub struct CurrentSessionHandler;

#[async_trait]
impl Handler for CurrentSessionHandler {
    fn requires_auth(&self) -> bool {
        true
    }

    async fn handle(&self, ctx: &mut Context<'_>, _cmd: &ClientCommand) -> HandlerResult {
        let host_id = ctx.host_id()?;
        to_value(ctx.hub.registry.current(host_id))
    }
}

/// Handler for `session-history`.
pub struct SessionHistoryHandler;

#[async_trait]
impl Handler for SessionHistoryHandler {
    fn requires_auth(&self) -> bool {
        true
    }

    async fn handle(&self, ctx: &mut Context<'_>, _cmd: &ClientCommand) -> HandlerResult {
        let host_id = ctx.host_id()?;
        to_value(ctx.hub.registry.history(host_id))
    }
}
