//! Broadcast topics.
//!
//! A topic names a room that connections subscribe to:
//!
//! - `host:{hostId}`: host-scoped notifications (wallet changes, cross-venue).
//! - `venue:{establishmentId}`: session lifecycle (started/updated/ended).
//! - `session:{sessionId}`: queue and stats updates.

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A broadcast room identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Topic {
    /// Events scoped to one host account.
    Host(String),
    /// Session lifecycle events for one establishment.
    Venue(String),
    /// Queue and stats events for one session.
    Session(String),
}

impl Topic {
    /// Topic for a host account.
    pub fn host(id: impl Into<String>) -> Self {
        Self::Host(id.into())
    }

    /// Topic for an establishment.
    pub fn venue(id: impl Into<String>) -> Self {
        Self::Venue(id.into())
    }

    /// Topic for a live session.
    pub fn session(id: impl Into<String>) -> Self {
        Self::Session(id.into())
    }

    /// The kind prefix (`host`, `venue` or `session`).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Host(_) => "host",
            Self::Venue(_) => "venue",
            Self::Session(_) => "session",
        }
    }

    /// The id part after the colon.
    pub fn id(&self) -> &str {
        match self {
            Self::Host(id) | Self::Venue(id) | Self::Session(id) => id,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

impl FromStr for Topic {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| ProtocolError::InvalidTopic(s.to_string()))?;
        if id.is_empty() {
            return Err(ProtocolError::InvalidTopic(s.to_string()));
        }
        match kind {
            "host" => Ok(Self::Host(id.to_string())),
            "venue" => Ok(Self::Venue(id.to_string())),
            "session" => Ok(Self::Session(id.to_string())),
            _ => Err(ProtocolError::InvalidTopic(s.to_string())),
        }
    }
}

impl From<Topic> for String {
    fn from(topic: Topic) -> Self {
        topic.to_string()
    }
}

impl TryFrom<String> for Topic {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
