//! Unified error handling for bidstage.
//!
//! This module provides the error taxonomy shared by the ledger, the session
//! registry and the queue, with stable codes for client replies and metric
//! labels.

use bidstage_proto::{ItemState, Reply};
use thiserror::Error;

// ============================================================================
// Service Errors (core operations)
// ============================================================================

/// Errors returned by core operations.
///
/// None of these are retried by the server; the caller decides.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("insufficient funds: {available} available above reserve, {required} required")]
    InsufficientFunds { available: i64, required: i64 },

    #[error("session {0} is already open for this host")]
    SessionAlreadyOpen(String),

    #[error("no active session")]
    NoActiveSession,

    #[error("illegal state transition: {from:?} -> {to:?}")]
    IllegalStateTransition { from: ItemState, to: ItemState },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage failure: {0}")]
    StorageFailure(String),

    #[error("authentication required")]
    NotAuthenticated,

    #[error("too many commands")]
    RateLimited,
}

impl ServiceError {
    /// Get a static error code string for replies and metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidParameter(_) => "invalid-parameter",
            Self::InsufficientFunds { .. } => "insufficient-funds",
            Self::SessionAlreadyOpen(_) => "session-already-open",
            Self::NoActiveSession => "no-active-session",
            Self::IllegalStateTransition { .. } => "illegal-state-transition",
            Self::NotFound(_) => "not-found",
            Self::StorageFailure(_) => "storage-failure",
            Self::NotAuthenticated => "not-authenticated",
            Self::RateLimited => "rate-limited",
        }
    }

    /// Convert to a client reply.
    ///
    /// Storage failures are reported generically; the detail stays in the logs.
    pub fn to_reply(&self, id: Option<String>) -> Reply {
        let message = match self {
            Self::StorageFailure(_) => "temporary failure, retry later".to_string(),
            other => other.to_string(),
        };
        Reply::err(id, self.error_code(), message)
    }
}

/// Result type for core operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<crate::db::DbError> for ServiceError {
    fn from(err: crate::db::DbError) -> Self {
        match err {
            crate::db::DbError::WalletNotFound(host) => {
                ServiceError::NotFound(format!("wallet for host {host}"))
            }
            crate::db::DbError::PatronNotFound(id) => {
                ServiceError::NotFound(format!("patron {id}"))
            }
            other => ServiceError::StorageFailure(other.to_string()),
        }
    }
}
