//! Snapshot views carried in replies and event payloads.
//!
//! These are transient, derived copies of server-owned state. Clients never
//! send them back; the server never reads them as input.

use serde::{Deserialize, Serialize};

/// Lifecycle of a queued song request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemState {
    /// Waiting to be played.
    Pending,
    /// Currently on air. At most one per session.
    Playing,
    /// Finished playing.
    Played,
    /// Declined by the host.
    Rejected,
}

impl ItemState {
    /// Whether the item is part of the live view (`pending` or `playing`).
    pub fn is_live(self) -> bool {
        matches!(self, Self::Pending | Self::Playing)
    }
}

/// A song request as seen by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItemView {
    /// Item id, unique within the server.
    pub id: u64,
    /// Owning session.
    pub session_id: String,
    /// Song title.
    pub title: String,
    /// Song artist.
    pub artist: String,
    /// Display name of the patron who bid.
    pub requester: String,
    /// Bid, in minor currency units.
    pub price: i64,
    /// Strictly increasing within a session.
    pub priority: u64,
    /// Current lifecycle state.
    pub state: ItemState,
    /// Creation time (unix millis).
    pub created_at: i64,
    /// Start-of-play or end-of-play time (unix millis).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub played_at: Option<i64>,
}

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// The host is live.
    Open,
    /// Terminal; the session is read-only history.
    Closed,
}

/// Running totals for a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTotals {
    /// Requests enqueued.
    pub song_count: u32,
    /// Requests that finished playing.
    pub played_count: u32,
    /// Sum of enqueued prices, in minor units.
    pub revenue: i64,
    /// Distinct requester names seen.
    pub attendee_count: u32,
}

/// A session as seen by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    /// Session id.
    pub id: String,
    /// Owning host.
    pub host_id: String,
    /// Establishment where the session runs.
    pub establishment_id: String,
    /// Lifecycle state.
    pub state: SessionState,
    /// Open time (unix millis).
    pub started_at: i64,
    /// Close time (unix millis), once closed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<i64>,
    /// Running totals.
    pub totals: SessionTotals,
    /// Item currently on air, when included.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub now_playing: Option<QueueItemView>,
}

/// One point of the cumulative revenue series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePoint {
    /// Sample time (unix millis).
    pub at: i64,
    /// Cumulative revenue at that time.
    pub revenue: i64,
}

/// State sent to a connection right after it joins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotView {
    /// The joined session, if known.
    pub session: Option<SessionView>,
    /// Pending and playing items, by priority.
    pub queue: Vec<QueueItemView>,
}

/// Wallet balances for one host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletView {
    /// Owning host.
    pub host_id: String,
    /// Withdrawable funds, minor units.
    pub real_balance: i64,
    /// Promotional funds, minor units.
    pub bonus_balance: i64,
}

/// Which balances a ledger entry moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LedgerKind {
    /// Recharge paid entirely from bonus funds.
    RechargeBonus,
    /// Recharge paid entirely from real funds.
    RechargeReal,
    /// Recharge that exhausted bonus and drew the rest from real funds.
    RechargeMixed,
    /// Out-of-band credit to the host wallet.
    Deposit,
}

impl LedgerKind {
    /// Stable storage name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RechargeBonus => "recharge-bonus",
            Self::RechargeReal => "recharge-real",
            Self::RechargeMixed => "recharge-mixed",
            Self::Deposit => "deposit",
        }
    }

    /// Inverse of [`LedgerKind::as_str`].
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "recharge-bonus" => Some(Self::RechargeBonus),
            "recharge-real" => Some(Self::RechargeReal),
            "recharge-mixed" => Some(Self::RechargeMixed),
            "deposit" => Some(Self::Deposit),
            _ => None,
        }
    }
}

/// Who caused a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Initiator {
    /// Automatic server action.
    System,
    /// Operator action.
    Admin,
    /// The host themselves.
    User,
}

impl Initiator {
    /// Stable storage name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Admin => "admin",
            Self::User => "user",
        }
    }

    /// Inverse of [`Initiator::as_str`].
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "system" => Some(Self::System),
            "admin" => Some(Self::Admin),
            "user" => Some(Self::User),
            _ => None,
        }
    }
}

/// An immutable ledger record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntryView {
    /// Entry id (monotonic).
    pub id: i64,
    /// Wallet owner.
    pub host_id: String,
    /// Operation kind.
    pub kind: LedgerKind,
    /// Signed change to real funds.
    pub real_delta: i64,
    /// Signed change to bonus funds.
    pub bonus_delta: i64,
    /// Real balance after the change.
    pub real_balance: i64,
    /// Bonus balance after the change.
    pub bonus_balance: i64,
    /// Patron on the other side, for recharges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty_id: Option<String>,
    /// Free text.
    pub description: String,
    /// Who caused it.
    pub initiator: Initiator,
    /// Commit time (unix millis).
    pub created_at: i64,
}

/// Result of a committed recharge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReceipt {
    /// Host balances after commit.
    pub wallet: WalletView,
    /// Amount moved to the patron.
    pub cost: i64,
    /// Bonus songs granted to the patron.
    pub songs: u32,
    /// Bonus connections granted to the patron.
    pub connections: u32,
    /// Patron display name.
    pub counterparty: String,
    /// The ledger entry recorded for this transfer.
    pub entry: LedgerEntryView,
}
