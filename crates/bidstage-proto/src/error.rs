//! Error types for the wire protocol.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Failures decoding frames or topics.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The frame was not valid JSON or did not match any known action.
    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),

    /// A topic string did not have the `kind:id` shape.
    #[error("invalid topic: {0}")]
    InvalidTopic(String),
}
