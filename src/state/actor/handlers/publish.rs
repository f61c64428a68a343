//! Fan-out after a queue mutation.

use super::super::SessionActor;
use bidstage_proto::{Topic, events};
use tracing::debug;

impl SessionActor {
    /// Push the new queue, the session snapshot and, after an enqueue, the
    /// revenue timeline. Order is fixed: queue first, then session, then stats.
    pub(crate) fn publish_progress(&self, with_timeline: bool) {
        let session_topic = Topic::session(&self.session_id);

        self.rooms
            .publish(&session_topic, events::QUEUE_UPDATED, self.pending_queue());

        match self
            .registry
            .record_progress(&self.session_id, self.totals, self.now_playing())
        {
            Ok(view) => {
                self.rooms.publish(
                    &Topic::venue(&self.establishment_id),
                    events::SESSION_UPDATED,
                    &view,
                );
            }
            Err(e) => debug!(session = %self.session_id, error = %e, "Skipping session update"),
        }

        if with_timeline {
            self.rooms
                .publish(&session_topic, events::STATS_TIMELINE, &self.timeline);
        }
    }
}
