//! Ledger handlers: transfer, wallet, ledger.

use super::core::{Context, Handler, HandlerResult, mismatched, to_value};
use async_trait::async_trait;
use bidstage_proto::ClientCommand;

/// Handler for `transfer`.
pub struct TransferHandler;

#[async_trait]
impl Handler for TransferHandler {
    fn requires_auth(&self) -> bool {
        true
    }

    async fn handle(&self, ctx: &mut Context<'_>, cmd: &ClientCommand) -> HandlerResult {
        let ClientCommand::Transfer {
            patron_id,
            monto,
            modo,
        } = cmd
        else {
            return Err(mismatched(cmd));
        };
        let host_id = ctx.host_id()?;
        to_value(ctx.hub.transfer(host_id, patron_id, monto, modo).await?)
    }
}

/// Handler for `wallet`.
pub struct WalletHandler;

#[async_trait]
impl Handler for WalletHandler {
    fn requires_auth(&self) -> bool {
        true
    }

    async fn handle(&self, ctx: &mut Context<'_>, _cmd: &ClientCommand) -> HandlerResult {
        let host_id = ctx.host_id()?;
        to_value(ctx.hub.ledger.wallet(host_id).await?)
    }
}

/// Handler for `ledger`. The page size is capped by `limits.ledger_page_size`.
pub struct LedgerHandler;

#[async_trait]
impl Handler for LedgerHandler {
    fn requires_auth(&self) -> bool {
        true
    }

    async fn handle(&self, ctx: &mut Context<'_>, cmd: &ClientCommand) -> HandlerResult {
        let ClientCommand::Ledger { limit } = cmd else {
            return Err(mismatched(cmd));
        };
        let host_id = ctx.host_id()?;
        let max = ctx.hub.limits.ledger_page_size.max(1);
        let limit = limit.unwrap_or(max).clamp(1, max);
        to_value(ctx.hub.ledger.entries(host_id, limit).await?)
    }
}
