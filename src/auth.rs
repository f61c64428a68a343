//! Credential verification.
//!
//! Token issuance lives outside this service. The gateway only needs
//! `verify(credential) -> host id`, so that is the whole seam.

use crate::config::AuthConfig;
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

/// Authentication failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("credential rejected")]
    Rejected,
    #[error("empty credential")]
    Empty,
}

/// Turns a bearer credential into a host id.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<String, AuthError>;
}

/// Authenticator backed by the `[[auth.tokens]]` table.
pub struct StaticTokenAuthenticator {
    tokens: HashMap<String, String>,
}

impl StaticTokenAuthenticator {
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            tokens: config
                .tokens
                .iter()
                .map(|t| (t.token.clone(), t.host_id.clone()))
                .collect(),
        }
    }
}

#[async_trait]
impl Authenticator for StaticTokenAuthenticator {
    async fn verify(&self, credential: &str) -> Result<String, AuthError> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(AuthError::Empty);
        }
        let credential = credential.strip_prefix("Bearer ").unwrap_or(credential);
        self.tokens.get(credential).cloned().ok_or(AuthError::Rejected)
    }
}
