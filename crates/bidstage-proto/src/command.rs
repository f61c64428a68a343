//! Client to server requests.

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One inbound frame: an optional correlation id plus the command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Echoed back in the [`Reply`](crate::Reply).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The action and its fields.
    #[serde(flatten)]
    pub command: ClientCommand,
}

impl FromStr for Request {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(serde_json::from_str(s)?)
    }
}

impl Request {
    /// Build a request with a correlation id.
    pub fn new(id: impl Into<String>, command: ClientCommand) -> Self {
        Self {
            id: Some(id.into()),
            command,
        }
    }

    /// Serialize to a text frame.
    pub fn to_text(&self) -> String {
        // Plain data with string keys; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Every action a client may request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientCommand {
    /// Present a bearer credential; success binds the connection to a host.
    Auth {
        /// Opaque credential.
        credential: String,
    },
    /// Liveness probe.
    Ping,
    /// Subscribe to a session (and optionally its venue) and receive a snapshot.
    Join {
        /// Session to follow.
        session_id: String,
        /// Venue whose lifecycle events to follow.
        #[serde(default)]
        establishment_id: Option<String>,
    },
    /// Undo a join. Idempotent.
    Leave {
        /// Session to stop following.
        session_id: String,
        /// Venue to stop following.
        #[serde(default)]
        establishment_id: Option<String>,
    },
    /// Bid a song into a session queue.
    Enqueue {
        /// Target session.
        session_id: String,
        /// Song title.
        title: String,
        /// Song artist.
        artist: String,
        /// Patron display name.
        requester: String,
        /// Bid in minor units.
        price: i64,
    },
    /// Read the live queue.
    Queue {
        /// Target session.
        session_id: String,
    },
    /// Start a session at an establishment.
    OpenSession {
        /// Where the host is live.
        establishment_id: String,
    },
    /// End the host's open session.
    CloseSession,
    /// Read the host's open session.
    CurrentSession,
    /// Read the host's closed sessions, newest first.
    SessionHistory,
    /// Finish the playing item and start the next pending one.
    Advance {
        /// Target session.
        session_id: String,
    },
    /// Decline a pending item.
    Reject {
        /// Target session.
        session_id: String,
        /// Item to decline.
        item_id: u64,
    },
    /// Recharge a patron from the host wallet.
    Transfer {
        /// Receiving patron.
        patron_id: String,
        /// Catalog amount id.
        monto: String,
        /// Bonus mode id.
        modo: String,
    },
    /// Read the host wallet.
    Wallet,
    /// Read recent ledger entries, newest first.
    Ledger {
        /// Maximum entries to return.
        #[serde(default)]
        limit: Option<u32>,
    },
}

impl ClientCommand {
    /// The wire name of this action, used for dispatch and metrics.
    pub fn action(&self) -> &'static str {
        match self {
            Self::Auth { .. } => "auth",
            Self::Ping => "ping",
            Self::Join { .. } => "join",
            Self::Leave { .. } => "leave",
            Self::Enqueue { .. } => "enqueue",
            Self::Queue { .. } => "queue",
            Self::OpenSession { .. } => "open-session",
            Self::CloseSession => "close-session",
            Self::CurrentSession => "current-session",
            Self::SessionHistory => "session-history",
            Self::Advance { .. } => "advance",
            Self::Reject { .. } => "reject",
            Self::Transfer { .. } => "transfer",
            Self::Wallet => "wallet",
            Self::Ledger { .. } => "ledger",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_fields() {
        let req: Request = r#"{"id":"1","action":"enqueue","sessionId":"s","title":"Song","artist":"Band","requester":"ana","price":500}"#
            .parse()
            .unwrap();
        assert_eq!(req.id.as_deref(), Some("1"));
        assert_eq!(
            req.command,
            ClientCommand::Enqueue {
                session_id: "s".into(),
                title: "Song".into(),
                artist: "Band".into(),
                requester: "ana".into(),
                price: 500,
            }
        );
    }

    #[test]
    fn unit_actions_need_no_fields() {
        let req: Request = r#"{"action":"close-session"}"#.parse().unwrap();
        assert_eq!(req.id, None);
        assert_eq!(req.command.action(), "close-session");
    }

    #[test]
    fn optional_establishment_defaults_to_none() {
        let req: Request = r#"{"action":"join","sessionId":"s1"}"#.parse().unwrap();
        assert_eq!(
            req.command,
            ClientCommand::Join {
                session_id: "s1".into(),
                establishment_id: None
            }
        );
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert!(r#"{"action":"drop-tables"}"#.parse::<Request>().is_err());
        assert!("not json".parse::<Request>().is_err());
    }

    #[test]
    fn to_text_uses_action_tag() {
        let text = Request::new("9", ClientCommand::Advance { session_id: "s".into() }).to_text();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["action"], "advance");
        assert_eq!(value["sessionId"], "s");
        assert_eq!(value["id"], "9");
    }
}
