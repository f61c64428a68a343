//! # bidstage-proto
//!
//! Wire types for the bidstage live request protocol.
//!
//! Clients talk to the daemon over WebSocket text frames carrying JSON. Every
//! inbound frame is a [`Request`] (an optional correlation `id` plus a
//! [`ClientCommand`] tagged by `action`). The server answers each request with
//! exactly one [`Reply`] and pushes [`Event`]s to every connection subscribed
//! to a [`Topic`].
//!
//! ## Quick Start
//!
//! ```rust
//! use bidstage_proto::{ClientCommand, Request};
//!
//! let raw = r#"{"id":"7","action":"join","sessionId":"s-1","establishmentId":"bar-9"}"#;
//! let req: Request = raw.parse().expect("valid request");
//! assert_eq!(req.command.action(), "join");
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod command;
pub mod error;
pub mod event;
pub mod topic;
pub mod view;

pub use command::{ClientCommand, Request};
pub use error::{ProtocolError, Result};
pub use event::{ErrorBody, Event, Reply, ServerFrame, events};
pub use topic::Topic;
pub use view::{
    Initiator, ItemState, LedgerEntryView, LedgerKind, QueueItemView, SessionState, SessionTotals,
    SessionView, SnapshotView, TimelinePoint, TransferReceipt, WalletView,
};
