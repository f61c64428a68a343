//! Command handler context and core types.

use crate::auth::Authenticator;
use crate::error::{ServiceError, ServiceResult};
use crate::state::Hub;
use async_trait::async_trait;
use bidstage_proto::ClientCommand;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;

/// Per-connection state that outlives a single command.
#[derive(Debug, Default)]
pub struct ConnectionState {
    /// Host bound by a successful `auth`.
    pub host_id: Option<String>,
}

/// Handler context passed to each command handler.
pub struct Context<'a> {
    /// The connection's unique ID.
    pub conn: &'a str,
    /// Shared server state.
    pub hub: &'a Arc<Hub>,
    /// Credential verifier.
    pub auth: &'a dyn Authenticator,
    /// Connection state.
    pub state: &'a mut ConnectionState,
    /// Remote address of the client.
    pub remote_addr: SocketAddr,
}

impl Context<'_> {
    /// The authenticated host, or `NotAuthenticated`.
    pub fn host_id(&self) -> ServiceResult<&str> {
        self.state
            .host_id
            .as_deref()
            .ok_or(ServiceError::NotAuthenticated)
    }

    /// Fail with `NotFound` unless `session_id` belongs to the authenticated host.
    pub fn ensure_owns_session(&self, session_id: &str) -> ServiceResult<()> {
        let host_id = self.host_id()?;
        match self.hub.registry.find(session_id) {
            Some(session) if session.host_id == host_id => Ok(()),
            _ => Err(ServiceError::NotFound(format!("session {session_id}"))),
        }
    }
}

/// Successful handlers return the reply payload.
pub type HandlerResult = ServiceResult<Value>;

/// A command handler.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Whether the command needs an authenticated host.
    fn requires_auth(&self) -> bool {
        false
    }

    async fn handle(&self, ctx: &mut Context<'_>, cmd: &ClientCommand) -> HandlerResult;
}

/// Error for a command routed to the wrong handler.
pub fn mismatched(cmd: &ClientCommand) -> ServiceError {
    ServiceError::InvalidParameter(format!("unexpected payload for {}", cmd.action()))
}

/// Serialize a reply payload.
pub fn to_value(data: impl serde::Serialize) -> HandlerResult {
    serde_json::to_value(data).map_err(|e| ServiceError::StorageFailure(e.to_string()))
}
