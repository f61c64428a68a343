//! Queue mutations: enqueue, advance, reject.
//!
//! Each handler consults the registry first; once the session has closed,
//! every mutation fails with `NoActiveSession` and nothing changes.

use super::super::{MAX_TIMELINE_POINTS, NewRequest, SessionActor, transition};
use crate::error::{ServiceError, ServiceResult};
use bidstage_proto::{ItemState, QueueItemView, TimelinePoint};
use std::sync::atomic::Ordering;
use tracing::debug;

impl SessionActor {
    fn ensure_open(&self) -> ServiceResult<()> {
        if self.registry.is_open(&self.session_id) {
            Ok(())
        } else {
            Err(ServiceError::NoActiveSession)
        }
    }

    pub(crate) fn handle_enqueue(&mut self, request: NewRequest) -> ServiceResult<QueueItemView> {
        self.ensure_open()?;
        request.validate()?;

        let now = chrono::Utc::now().timestamp_millis();
        let item = QueueItemView {
            id: self.item_ids.fetch_add(1, Ordering::Relaxed),
            session_id: self.session_id.clone(),
            title: request.title,
            artist: request.artist,
            requester: request.requester,
            price: request.price,
            priority: self.next_priority,
            state: ItemState::Pending,
            created_at: now,
            played_at: None,
        };
        self.next_priority += 1;

        self.totals.song_count += 1;
        self.totals.revenue += item.price;
        if self.requesters.insert(item.requester.clone()) {
            self.totals.attendee_count += 1;
        }

        self.timeline.push(TimelinePoint {
            at: now,
            revenue: self.totals.revenue,
        });
        if self.timeline.len() > MAX_TIMELINE_POINTS {
            let excess = self.timeline.len() - MAX_TIMELINE_POINTS;
            self.timeline.drain(..excess);
        }

        self.items.push(item.clone());
        debug!(session = %self.session_id, item = item.id, priority = item.priority, "Enqueued");

        self.publish_progress(true);
        Ok(item)
    }

    pub(crate) fn handle_advance(&mut self) -> ServiceResult<Option<QueueItemView>> {
        self.ensure_open()?;

        let next = self.items[self.pending_cursor.min(self.items.len())..]
            .iter()
            .position(|item| item.state == ItemState::Pending)
            .map(|offset| self.pending_cursor + offset);

        if self.playing.is_none() && next.is_none() {
            return Ok(None);
        }

        let now = chrono::Utc::now().timestamp_millis();

        if let Some(idx) = self.playing.take()
            && let Some(item) = self.items.get_mut(idx)
        {
            transition(item, ItemState::Played, now)?;
            self.totals.played_count += 1;
        }

        let started = match next {
            Some(idx) => {
                let item = &mut self.items[idx];
                transition(item, ItemState::Playing, now)?;
                self.playing = Some(idx);
                self.pending_cursor = idx + 1;
                Some(item.clone())
            }
            None => {
                self.pending_cursor = self.items.len();
                None
            }
        };

        debug!(
            session = %self.session_id,
            playing = ?started.as_ref().map(|i| i.id),
            "Advanced"
        );

        self.publish_progress(false);
        Ok(started)
    }

    pub(crate) fn handle_reject(&mut self, item_id: u64) -> ServiceResult<QueueItemView> {
        self.ensure_open()?;

        let now = chrono::Utc::now().timestamp_millis();
        let item = self
            .items
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or_else(|| ServiceError::NotFound(format!("queue item {item_id}")))?;

        transition(item, ItemState::Rejected, now)?;
        let rejected = item.clone();

        debug!(session = %self.session_id, item = item_id, "Rejected");
        self.publish_progress(false);
        Ok(rejected)
    }
}
