use crate::error::{ServiceError, ServiceResult};
use crate::state::uid::ConnId;
use bidstage_proto::{ItemState, QueueItemView, SnapshotView};
use tokio::sync::oneshot;

/// A bid waiting to be appended to a session queue.
#[derive(Debug, Clone)]
pub struct NewRequest {
    pub title: String,
    pub artist: String,
    pub requester: String,
    pub price: i64,
}

impl NewRequest {
    /// Reject blank text fields and negative prices.
    pub fn validate(&self) -> ServiceResult<()> {
        if self.title.trim().is_empty() {
            return Err(ServiceError::InvalidParameter("title must not be empty".into()));
        }
        if self.requester.trim().is_empty() {
            return Err(ServiceError::InvalidParameter(
                "requester must not be empty".into(),
            ));
        }
        if self.price < 0 {
            return Err(ServiceError::InvalidParameter(format!(
                "price must not be negative, got {}",
                self.price
            )));
        }
        Ok(())
    }
}

/// Move an item along `pending -> playing -> played` or `pending -> rejected`.
///
/// Any other move is `IllegalStateTransition` and leaves the item untouched.
pub fn transition(item: &mut QueueItemView, to: ItemState, at: i64) -> ServiceResult<()> {
    let allowed = matches!(
        (item.state, to),
        (ItemState::Pending, ItemState::Playing)
            | (ItemState::Playing, ItemState::Played)
            | (ItemState::Pending, ItemState::Rejected)
    );
    if !allowed {
        return Err(ServiceError::IllegalStateTransition {
            from: item.state,
            to,
        });
    }

    item.state = to;
    if matches!(to, ItemState::Playing | ItemState::Played) {
        item.played_at = Some(at);
    }
    Ok(())
}

/// Events that can be sent to a Session Actor.
#[derive(Debug)]
pub enum SessionEvent {
    /// Append a bid.
    Enqueue {
        request: NewRequest,
        reply_tx: oneshot::Sender<ServiceResult<QueueItemView>>,
    },
    /// Finish the playing item and start the oldest pending one.
    Advance {
        reply_tx: oneshot::Sender<ServiceResult<Option<QueueItemView>>>,
    },
    /// Decline a pending item.
    Reject {
        item_id: u64,
        reply_tx: oneshot::Sender<ServiceResult<QueueItemView>>,
    },
    /// Read the live queue.
    PendingQueue {
        reply_tx: oneshot::Sender<Vec<QueueItemView>>,
    },
    /// Subscribe a connection and send it a snapshot in one step.
    Join {
        conn: ConnId,
        establishment_id: Option<String>,
        reply_tx: oneshot::Sender<SnapshotView>,
    },
    /// Stop the actor, handing back every item for the archive.
    Shutdown {
        reply_tx: oneshot::Sender<Vec<QueueItemView>>,
    },
}
