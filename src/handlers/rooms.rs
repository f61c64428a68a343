//! Room subscription handlers: join and leave.

use super::core::{Context, Handler, HandlerResult, mismatched, to_value};
use async_trait::async_trait;
use bidstage_proto::ClientCommand;
use serde_json::json;

/// Handler for `join`.
///
/// The snapshot is also pushed as a `snapshot` event ahead of any live event.
pub struct JoinHandler;

#[async_trait]
impl Handler for JoinHandler {
    async fn handle(&self, ctx: &mut Context<'_>, cmd: &ClientCommand) -> HandlerResult {
        let ClientCommand::Join {
            session_id,
            establishment_id,
        } = cmd
        else {
            return Err(mismatched(cmd));
        };

        let snapshot = ctx
            .hub
            .queues
            .join(ctx.conn, session_id, establishment_id.clone())
            .await?;
        to_value(snapshot)
    }
}

/// Handler for `leave`.
pub struct LeaveHandler;

#[async_trait]
impl Handler for LeaveHandler {
    async fn handle(&self, ctx: &mut Context<'_>, cmd: &ClientCommand) -> HandlerResult {
        let ClientCommand::Leave {
            session_id,
            establishment_id,
        } = cmd
        else {
            return Err(mismatched(cmd));
        };

        ctx.hub
            .queues
            .leave(ctx.conn, session_id, establishment_id.as_deref());
        Ok(json!({ "left": session_id }))
    }
}
