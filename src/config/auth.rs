//! Credential table for the static auth collaborator.

use serde::Deserialize;

/// Auth configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Accepted bearer tokens.
    #[serde(default)]
    pub tokens: Vec<TokenBlock>,
}

/// One accepted bearer token and the host it resolves to.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenBlock {
    /// Opaque bearer credential.
    pub token: String,
    /// Host account the token belongs to.
    pub host_id: String,
}
