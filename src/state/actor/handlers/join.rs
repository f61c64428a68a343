//! Join: subscribe and snapshot as one step.

use super::super::SessionActor;
use bidstage_proto::{ServerFrame, SnapshotView, Topic, events};
use tracing::debug;

impl SessionActor {
    pub(crate) fn handle_join(
        &mut self,
        conn: &str,
        establishment_id: Option<String>,
    ) -> SnapshotView {
        let session_topic = Topic::session(&self.session_id);
        self.rooms.join(conn, session_topic.clone());
        if let Some(establishment_id) = establishment_id {
            self.rooms.join(conn, Topic::venue(establishment_id));
        }

        let snapshot = SnapshotView {
            session: self.registry.find(&self.session_id),
            queue: self.pending_queue(),
        };

        let frame = ServerFrame::event(events::SNAPSHOT, session_topic, &snapshot);
        if !self.rooms.send_to(conn, &frame) {
            debug!(session = %self.session_id, conn = %conn, "Snapshot not delivered");
        }

        snapshot
    }
}
