//! Command handler registry and dispatch.
//!
//! The `Registry` maps wire actions to handlers and wraps every dispatch in a
//! tracing span, a latency timer and error accounting.

use super::context::{Context, Handler};
use crate::error::ServiceError;
use crate::handlers::{
    connection::{AuthHandler, PingHandler},
    ledger::{LedgerHandler, TransferHandler, WalletHandler},
    queue::{AdvanceHandler, EnqueueHandler, QueueHandler, RejectHandler},
    rooms::{JoinHandler, LeaveHandler},
    session::{
        CloseSessionHandler, CurrentSessionHandler, OpenSessionHandler, SessionHistoryHandler,
    },
};
use crate::telemetry::{CommandTimer, spans};
use bidstage_proto::{Reply, Request};
use std::collections::HashMap;
use tracing::{Instrument, debug};

/// Registry of command handlers.
pub struct Registry {
    handlers: HashMap<&'static str, Box<dyn Handler>>,
}

impl Registry {
    /// Create a new registry with all handlers registered.
    pub fn new() -> Self {
        let mut handlers: HashMap<&'static str, Box<dyn Handler>> = HashMap::new();

        // Connection handlers
        handlers.insert("auth", Box::new(AuthHandler));
        handlers.insert("ping", Box::new(PingHandler));

        // Room handlers
        handlers.insert("join", Box::new(JoinHandler));
        handlers.insert("leave", Box::new(LeaveHandler));

        // Queue handlers
        handlers.insert("enqueue", Box::new(EnqueueHandler));
        handlers.insert("queue", Box::new(QueueHandler));
        handlers.insert("advance", Box::new(AdvanceHandler));
        handlers.insert("reject", Box::new(RejectHandler));

        // Session handlers
        handlers.insert("open-session", Box::new(OpenSessionHandler));
        handlers.insert("close-session", Box::new(CloseSessionHandler));
        handlers.insert("current-session", Box::new(CurrentSessionHandler));
        handlers.insert("session-history", Box::new(SessionHistoryHandler));

        // Ledger handlers
        handlers.insert("transfer", Box::new(TransferHandler));
        handlers.insert("wallet", Box::new(WalletHandler));
        handlers.insert("ledger", Box::new(LedgerHandler));

        Self { handlers }
    }

    /// Dispatch a request and build its reply.
    pub async fn dispatch(&self, ctx: &mut Context<'_>, request: &Request) -> Reply {
        let action = request.command.action();
        let id = request.id.clone();

        let Some(handler) = self.handlers.get(action) else {
            crate::metrics::record_command_error(action, "unknown-action");
            return Reply::err(id, "invalid-parameter", format!("unknown action {action}"));
        };

        let span = spans::command(action, ctx.conn, ctx.state.host_id.as_deref());
        let _timer = CommandTimer::new(action);

        let result = if handler.requires_auth() && ctx.state.host_id.is_none() {
            Err(ServiceError::NotAuthenticated)
        } else {
            handler.handle(ctx, &request.command).instrument(span).await
        };

        match result {
            Ok(data) => Reply::ok(id, data),
            Err(e) => {
                crate::metrics::record_command_error(action, e.error_code());
                debug!(action = %action, conn = %ctx.conn, error = %e, "Command error");
                e.to_reply(id)
            }
        }
    }

    /// Number of registered actions.
    pub fn action_count(&self) -> usize {
        self.handlers.len()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
