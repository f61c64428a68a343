//! Queue handlers: enqueue, queue, advance, reject.

use super::core::{Context, Handler, HandlerResult, mismatched, to_value};
use async_trait::async_trait;
use bidstage_proto::ClientCommand;

/// Handler for `enqueue`. Open to patrons; no auth.
pub struct EnqueueHandler;

#[async_trait]
impl Handler for EnqueueHandler {
    async fn handle(&self, ctx: &mut Context<'_>, cmd: &ClientCommand) -> HandlerResult {
        let ClientCommand::Enqueue {
            session_id,
            title,
            artist,
            requester,
            price,
        } = cmd
        else {
            return Err(mismatched(cmd));
        };

        let item = ctx
            .hub
            .queues
            .enqueue(
                session_id,
                title.clone(),
                artist.clone(),
                requester.clone(),
                *price,
            )
            .await?;
        to_value(item)
    }
}

/// Handler for `queue`.
pub struct QueueHandler;

#[async_trait]
impl Handler for QueueHandler {
    async fn handle(&self, ctx: &mut Context<'_>, cmd: &ClientCommand) -> HandlerResult {
        let ClientCommand::Queue { session_id } = cmd else {
            return Err(mismatched(cmd));
        };
        to_value(ctx.hub.queues.queue(session_id).await?)
    }
}

/// Handler for `advance`. Host only, on its own session.
pub struct AdvanceHandler;

#[async_trait]
impl Handler for AdvanceHandler {
    fn requires_auth(&self) -> bool {
        true
    }

    async fn handle(&self, ctx: &mut Context<'_>, cmd: &ClientCommand) -> HandlerResult {
        let ClientCommand::Advance { session_id } = cmd else {
            return Err(mismatched(cmd));
        };
        ctx.ensure_owns_session(session_id)?;
        to_value(ctx.hub.queues.advance(session_id).await?)
    }
}

/// Handler for `reject`. Host only, on its own session.
pub struct RejectHandler;

#[async_trait]
impl Handler for RejectHandler {
    fn requires_auth(&self) -> bool {
        true
    }

    async fn handle(&self, ctx: &mut Context<'_>, cmd: &ClientCommand) -> HandlerResult {
        let ClientCommand::Reject {
            session_id,
            item_id,
        } = cmd
        else {
            return Err(mismatched(cmd));
        };
        ctx.ensure_owns_session(session_id)?;
        to_value(ctx.hub.queues.reject(session_id, *item_id).await?)
    }
}
