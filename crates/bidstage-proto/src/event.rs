//! Server to client frames.

use crate::error::ProtocolError;
use crate::topic::Topic;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// Event names, fixed for client compatibility.
pub mod events {
    /// Ordered pending+playing list, on `session:{id}`.
    pub const QUEUE_UPDATED: &str = "queue-updated";
    /// Session snapshot, on `venue:{id}`.
    pub const SESSION_STARTED: &str = "session-started";
    /// Session snapshot (may include `nowPlaying`), on `venue:{id}`.
    pub const SESSION_UPDATED: &str = "session-updated";
    /// Final session snapshot, on `venue:{id}`.
    pub const SESSION_ENDED: &str = "session-ended";
    /// Cumulative revenue series, on `session:{id}`.
    pub const STATS_TIMELINE: &str = "stats-timeline";
    /// Join-time state sync, sent only to the joining connection.
    pub const SNAPSHOT: &str = "snapshot";
    /// Host wallet balances after a ledger change, on `host:{id}`.
    pub const WALLET_UPDATED: &str = "wallet-updated";
}

/// Error carried in a failed reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable kebab-case code (`insufficient-funds`, `session-already-open`, ...).
    pub code: String,
    /// Human readable detail.
    pub message: String,
}

/// Answer to exactly one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    /// The request id, if the client sent one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Result data on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Failure details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Reply {
    /// Successful reply.
    pub fn ok(id: Option<String>, data: Value) -> Self {
        Self {
            id,
            data: Some(data),
            error: None,
        }
    }

    /// Failed reply.
    pub fn err(id: Option<String>, code: &str, message: impl Into<String>) -> Self {
        Self {
            id,
            data: None,
            error: Some(ErrorBody {
                code: code.to_string(),
                message: message.into(),
            }),
        }
    }

    /// Whether this reply carries an error.
    pub fn is_err(&self) -> bool {
        self.error.is_some()
    }

    /// The error code, if any.
    pub fn error_code(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.code.as_str())
    }
}

/// A pushed event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event name, see [`events`].
    pub event: String,
    /// Topic it was published on.
    pub topic: Topic,
    /// Event payload.
    pub payload: Value,
}

/// Any frame the server writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerFrame {
    /// Answer to a request.
    Reply(Reply),
    /// Broadcast or snapshot.
    Event(Event),
}

impl ServerFrame {
    /// Build an event frame from any serializable payload.
    pub fn event(name: &str, topic: Topic, payload: impl Serialize) -> Self {
        Self::Event(Event {
            event: name.to_string(),
            topic,
            payload: serde_json::to_value(payload).unwrap_or(Value::Null),
        })
    }

    /// Serialize to a text frame.
    pub fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// The event name, for event frames.
    pub fn event_name(&self) -> Option<&str> {
        match self {
            Self::Event(e) => Some(e.event.as_str()),
            Self::Reply(_) => None,
        }
    }
}

impl FromStr for ServerFrame {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(serde_json::from_str(s)?)
    }
}
