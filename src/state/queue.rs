//! Queue management state.
//!
//! `QueueManager` tracks one `SessionActor` per open session and the archived
//! items of closed ones. All mutations go through the owning actor.

use crate::error::{ServiceError, ServiceResult};
use crate::state::actor::{NewRequest, SessionActor, SessionActorParams, SessionEvent};
use crate::state::dashmap_ext::DashMapExt;
use crate::state::{RoomBroadcaster, SessionRegistry};
use bidstage_proto::{QueueItemView, SessionView, SnapshotView, Topic};
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

/// Routes queue operations to session actors.
pub struct QueueManager {
    actors: DashMap<String, mpsc::Sender<SessionEvent>>,
    archive: DashMap<String, Vec<QueueItemView>>,
    item_ids: Arc<AtomicU64>,
    registry: Arc<SessionRegistry>,
    rooms: Arc<RoomBroadcaster>,
    mailbox_capacity: usize,
}

impl QueueManager {
    pub fn new(
        registry: Arc<SessionRegistry>,
        rooms: Arc<RoomBroadcaster>,
        mailbox_capacity: usize,
    ) -> Self {
        Self {
            actors: DashMap::new(),
            archive: DashMap::new(),
            item_ids: Arc::new(AtomicU64::new(1)),
            registry,
            rooms,
            mailbox_capacity: mailbox_capacity.max(1),
        }
    }

    /// Start the actor for a freshly opened session, clearing residual state.
    pub fn start(&self, session: &SessionView) {
        self.archive.remove(&session.id);
        let tx = SessionActor::spawn(SessionActorParams {
            session_id: session.id.clone(),
            establishment_id: session.establishment_id.clone(),
            item_ids: Arc::clone(&self.item_ids),
            registry: Arc::clone(&self.registry),
            rooms: Arc::clone(&self.rooms),
            capacity: self.mailbox_capacity,
        });
        self.actors.insert(session.id.clone(), tx);
        debug!(session = %session.id, "Session actor started");
    }

    fn actor(&self, session_id: &str) -> ServiceResult<mpsc::Sender<SessionEvent>> {
        if let Some(tx) = self.actors.get_cloned(session_id) {
            return Ok(tx);
        }
        // Open but not yet started, or closed and archived.
        if self.registry.is_open(session_id) || self.archive.contains_key(session_id) {
            Err(ServiceError::NoActiveSession)
        } else {
            Err(ServiceError::NotFound(format!("session {session_id}")))
        }
    }

    async fn request<T>(
        &self,
        session_id: &str,
        make: impl FnOnce(oneshot::Sender<T>) -> SessionEvent,
    ) -> ServiceResult<T> {
        let tx = self.actor(session_id)?;
        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(make(reply_tx))
            .await
            .map_err(|_| ServiceError::NoActiveSession)?;
        reply_rx.await.map_err(|_| ServiceError::NoActiveSession)
    }

    /// Append a bid to the session queue.
    pub async fn enqueue(
        &self,
        session_id: &str,
        title: String,
        artist: String,
        requester: String,
        price: i64,
    ) -> ServiceResult<QueueItemView> {
        let request = NewRequest {
            title,
            artist,
            requester,
            price,
        };
        request.validate()?;
        self.request(session_id, |reply_tx| SessionEvent::Enqueue { request, reply_tx })
            .await?
    }

    /// Finish the playing item and start the oldest pending one.
    pub async fn advance(&self, session_id: &str) -> ServiceResult<Option<QueueItemView>> {
        self.request(session_id, |reply_tx| SessionEvent::Advance { reply_tx })
            .await?
    }

    /// Decline a pending item.
    pub async fn reject(&self, session_id: &str, item_id: u64) -> ServiceResult<QueueItemView> {
        self.request(session_id, |reply_tx| SessionEvent::Reject { item_id, reply_tx })
            .await?
    }

    /// Pending and playing items of an open session, by priority.
    pub async fn pending_queue(&self, session_id: &str) -> ServiceResult<Vec<QueueItemView>> {
        self.request(session_id, |reply_tx| SessionEvent::PendingQueue { reply_tx })
            .await
    }

    /// The live queue of an open session, or every item of a closed one.
    pub async fn queue(&self, session_id: &str) -> ServiceResult<Vec<QueueItemView>> {
        if let Some(items) = self.archive.get_cloned(session_id) {
            return Ok(items);
        }
        self.pending_queue(session_id).await
    }

    /// Subscribe `conn` to the session (and optionally venue) topics and
    /// return the snapshot it was sent.
    pub async fn join(
        &self,
        conn: &str,
        session_id: &str,
        establishment_id: Option<String>,
    ) -> ServiceResult<SnapshotView> {
        if self.actors.contains_key(session_id) {
            let conn = conn.to_string();
            return self
                .request(session_id, |reply_tx| SessionEvent::Join {
                    conn,
                    establishment_id,
                    reply_tx,
                })
                .await;
        }

        // No actor means no items yet (just opened) or none live (closed).
        let session = self
            .registry
            .find(session_id)
            .ok_or_else(|| ServiceError::NotFound(format!("session {session_id}")))?;
        let session_topic = Topic::session(session_id);
        self.rooms.join(conn, session_topic.clone());
        if let Some(establishment_id) = establishment_id {
            self.rooms.join(conn, Topic::venue(establishment_id));
        }
        let snapshot = SnapshotView {
            session: Some(session),
            queue: Vec::new(),
        };
        self.rooms.send_to(
            conn,
            &bidstage_proto::ServerFrame::event(
                bidstage_proto::events::SNAPSHOT,
                session_topic,
                &snapshot,
            ),
        );
        Ok(snapshot)
    }

    /// Unsubscribe `conn` from the session (and optionally venue) topics.
    pub fn leave(&self, conn: &str, session_id: &str, establishment_id: Option<&str>) {
        self.rooms.leave(conn, &Topic::session(session_id));
        if let Some(establishment_id) = establishment_id {
            self.rooms.leave(conn, &Topic::venue(establishment_id));
        }
    }

    /// Stop the actor for a closed session and archive its items.
    pub async fn close(&self, session_id: &str) -> usize {
        let Some((_, tx)) = self.actors.remove(session_id) else {
            return 0;
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        let items = if tx.send(SessionEvent::Shutdown { reply_tx }).await.is_ok() {
            reply_rx.await.unwrap_or_default()
        } else {
            Vec::new()
        };

        let count = items.len();
        self.archive.insert(session_id.to_string(), items);
        info!(session = %session_id, items = count, "Session queue archived");
        count
    }

    /// Number of live session actors.
    pub fn live_sessions(&self) -> usize {
        self.actors.len()
    }
}
