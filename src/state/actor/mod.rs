//! Actor model for live session queues.
//!
//! Each open session runs a `SessionActor` in its own Tokio task. The actor
//! owns the session's queue items and totals and processes events one at a
//! time, so enqueue, advance, reject and join never interleave for the same
//! session while different sessions proceed in parallel.
//!
//! Every publish on `session:{id}` originates here, which is what makes the
//! join snapshot gap-free: the subscription and the snapshot happen inside a
//! single event, before any later mutation can publish.

use crate::state::{RoomBroadcaster, SessionRegistry};
use bidstage_proto::{QueueItemView, SessionTotals, TimelinePoint};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use tokio::sync::mpsc;
use tracing::debug;

mod handlers;
mod types;

pub use types::*;

/// Oldest timeline points are discarded past this length.
const MAX_TIMELINE_POINTS: usize = 1024;

/// The Session Actor.
pub struct SessionActor {
    session_id: String,
    establishment_id: String,
    /// Items in priority order. Append-only.
    items: Vec<QueueItemView>,
    /// Index into `items` of the playing item.
    playing: Option<usize>,
    /// No item before this index is pending.
    pending_cursor: usize,
    next_priority: u64,
    totals: SessionTotals,
    requesters: HashSet<String>,
    timeline: Vec<TimelinePoint>,
    item_ids: Arc<AtomicU64>,
    registry: Arc<SessionRegistry>,
    rooms: Arc<RoomBroadcaster>,
}

/// Everything a new actor needs from its manager.
pub struct SessionActorParams {
    pub session_id: String,
    pub establishment_id: String,
    pub item_ids: Arc<AtomicU64>,
    pub registry: Arc<SessionRegistry>,
    pub rooms: Arc<RoomBroadcaster>,
    pub capacity: usize,
}

impl SessionActor {
    /// Create a Session Actor and spawn it.
    pub fn spawn(params: SessionActorParams) -> mpsc::Sender<SessionEvent> {
        let (tx, rx) = mpsc::channel(params.capacity);

        let actor = Self {
            session_id: params.session_id,
            establishment_id: params.establishment_id,
            items: Vec::new(),
            playing: None,
            pending_cursor: 0,
            next_priority: 1,
            totals: SessionTotals::default(),
            requesters: HashSet::new(),
            timeline: Vec::new(),
            item_ids: params.item_ids,
            registry: params.registry,
            rooms: params.rooms,
        };

        tokio::spawn(async move {
            actor.run(rx).await;
        });

        tx
    }

    /// The main actor loop.
    pub async fn run(mut self, mut rx: mpsc::Receiver<SessionEvent>) {
        while let Some(event) = rx.recv().await {
            if !self.handle_event(event) {
                break;
            }
        }
        debug!(session = %self.session_id, "Session actor stopped");
    }

    /// Returns false when the actor should stop.
    fn handle_event(&mut self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::Enqueue { request, reply_tx } => {
                let _ = reply_tx.send(self.handle_enqueue(request));
            }
            SessionEvent::Advance { reply_tx } => {
                let _ = reply_tx.send(self.handle_advance());
            }
            SessionEvent::Reject { item_id, reply_tx } => {
                let _ = reply_tx.send(self.handle_reject(item_id));
            }
            SessionEvent::PendingQueue { reply_tx } => {
                let _ = reply_tx.send(self.pending_queue());
            }
            SessionEvent::Join {
                conn,
                establishment_id,
                reply_tx,
            } => {
                let _ = reply_tx.send(self.handle_join(&conn, establishment_id));
            }
            SessionEvent::Shutdown { reply_tx } => {
                let _ = reply_tx.send(std::mem::take(&mut self.items));
                return false;
            }
        }
        true
    }

    /// Pending and playing items, by priority.
    fn pending_queue(&self) -> Vec<QueueItemView> {
        self.items
            .iter()
            .filter(|item| item.state.is_live())
            .cloned()
            .collect()
    }

    fn now_playing(&self) -> Option<QueueItemView> {
        self.playing.and_then(|idx| self.items.get(idx).cloned())
    }
}
