//! Session lifecycle.
//!
//! Each host has at most one open session. The open entry is the single
//! source of truth for "is this session live"; the queue consults it before
//! every mutation rather than caching it.

use crate::error::{ServiceError, ServiceResult};
use crate::metrics;
use bidstage_proto::{QueueItemView, SessionState, SessionTotals, SessionView};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::info;
use uuid::Uuid;

/// Owns open sessions and per-host history.
#[derive(Default)]
pub struct SessionRegistry {
    /// Open session per host.
    current: DashMap<String, SessionView>,
    /// Open session id -> host id.
    open_index: DashMap<String, String>,
    /// Closed sessions per host, most recent first.
    history: DashMap<String, Vec<SessionView>>,
    /// Closed session id -> host id.
    closed_index: DashMap<String, String>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session for `host_id`.
    pub fn open(&self, host_id: &str, establishment_id: &str) -> ServiceResult<SessionView> {
        if establishment_id.trim().is_empty() {
            return Err(ServiceError::InvalidParameter(
                "establishmentId must not be empty".to_string(),
            ));
        }

        let session = match self.current.entry(host_id.to_string()) {
            Entry::Occupied(existing) => {
                return Err(ServiceError::SessionAlreadyOpen(existing.get().id.clone()));
            }
            Entry::Vacant(slot) => {
                let session = SessionView {
                    id: Uuid::new_v4().to_string(),
                    host_id: host_id.to_string(),
                    establishment_id: establishment_id.to_string(),
                    state: SessionState::Open,
                    started_at: chrono::Utc::now().timestamp_millis(),
                    ended_at: None,
                    totals: SessionTotals::default(),
                    now_playing: None,
                };
                slot.insert(session.clone());
                session
            }
        };

        self.open_index
            .insert(session.id.clone(), host_id.to_string());
        metrics::add_open_sessions(1);
        info!(host = %host_id, session = %session.id, establishment = %establishment_id, "Session opened");
        Ok(session)
    }

    /// Close the open session for `host_id` and move it to history.
    pub fn close(&self, host_id: &str) -> ServiceResult<SessionView> {
        let (_, mut session) = self
            .current
            .remove(host_id)
            .ok_or(ServiceError::NoActiveSession)?;
        self.open_index.remove(&session.id);

        session.state = SessionState::Closed;
        session.ended_at = Some(chrono::Utc::now().timestamp_millis());
        session.now_playing = None;

        self.closed_index
            .insert(session.id.clone(), host_id.to_string());
        self.history
            .entry(host_id.to_string())
            .or_default()
            .insert(0, session.clone());

        metrics::add_open_sessions(-1);
        info!(
            host = %host_id,
            session = %session.id,
            songs = session.totals.song_count,
            revenue = session.totals.revenue,
            "Session closed"
        );
        Ok(session)
    }

    /// The open session for `host_id`, if any.
    pub fn current(&self, host_id: &str) -> Option<SessionView> {
        self.current.get(host_id).map(|s| s.clone())
    }

    /// Closed sessions for `host_id`, most recent first.
    pub fn history(&self, host_id: &str) -> Vec<SessionView> {
        self.history
            .get(host_id)
            .map(|h| h.clone())
            .unwrap_or_default()
    }

    /// Whether `session_id` is currently open.
    pub fn is_open(&self, session_id: &str) -> bool {
        self.open_index.contains_key(session_id)
    }

    /// Look up a session by id, open or closed.
    pub fn find(&self, session_id: &str) -> Option<SessionView> {
        if let Some(host) = self.open_index.get(session_id).map(|h| h.clone())
            && let Some(session) = self.current.get(&host)
            && session.id == session_id
        {
            return Some(session.clone());
        }

        let host = self.closed_index.get(session_id).map(|h| h.clone())?;
        self.history
            .get(&host)?
            .iter()
            .find(|s| s.id == session_id)
            .cloned()
    }

    /// Record queue progress on an open session.
    ///
    /// Returns the updated snapshot, or `NoActiveSession` once it has closed.
    pub fn record_progress(
        &self,
        session_id: &str,
        totals: SessionTotals,
        now_playing: Option<QueueItemView>,
    ) -> ServiceResult<SessionView> {
        let host = self
            .open_index
            .get(session_id)
            .map(|h| h.clone())
            .ok_or(ServiceError::NoActiveSession)?;

        let mut session = self
            .current
            .get_mut(&host)
            .filter(|s| s.id == session_id)
            .ok_or(ServiceError::NoActiveSession)?;
        session.totals = totals;
        session.now_playing = now_playing;
        Ok(session.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_twice_is_rejected_and_first_untouched() {
        let registry = SessionRegistry::new();
        let first = registry.open("h1", "bar-1").unwrap();

        let err = registry.open("h1", "bar-2").unwrap_err();
        assert_eq!(err, ServiceError::SessionAlreadyOpen(first.id.clone()));

        let current = registry.current("h1").unwrap();
        assert_eq!(current, first);
        assert_eq!(current.establishment_id, "bar-1");
    }

    #[test]
    fn hosts_are_independent() {
        let registry = SessionRegistry::new();
        let a = registry.open("h1", "bar-1").unwrap();
        let b = registry.open("h2", "bar-1").unwrap();
        assert_ne!(a.id, b.id);
        assert!(registry.is_open(&a.id));
        assert!(registry.is_open(&b.id));
    }

    #[test]
    fn close_without_open_session_fails() {
        let registry = SessionRegistry::new();
        assert_eq!(registry.close("h1"), Err(ServiceError::NoActiveSession));
    }

    #[test]
    fn close_moves_session_to_history_most_recent_first() {
        let registry = SessionRegistry::new();
        let first = registry.open("h1", "bar-1").unwrap();
        registry.close("h1").unwrap();
        let second = registry.open("h1", "bar-1").unwrap();
        let closed = registry.close("h1").unwrap();

        assert_eq!(closed.state, SessionState::Closed);
        assert!(closed.ended_at.is_some());
        assert!(registry.current("h1").is_none());
        assert!(!registry.is_open(&second.id));

        let history = registry.history("h1");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, second.id);
        assert_eq!(history[1].id, first.id);
        assert_eq!(registry.find(&first.id).unwrap().state, SessionState::Closed);
    }

    #[test]
    fn progress_updates_only_open_sessions() {
        let registry = SessionRegistry::new();
        let session = registry.open("h1", "bar-1").unwrap();
        let totals = SessionTotals {
            song_count: 2,
            played_count: 1,
            revenue: 3_000,
            attendee_count: 2,
        };

        let updated = registry.record_progress(&session.id, totals, None).unwrap();
        assert_eq!(updated.totals, totals);

        let closed = registry.close("h1").unwrap();
        assert_eq!(closed.totals, totals);
        assert_eq!(
            registry.record_progress(&session.id, SessionTotals::default(), None),
            Err(ServiceError::NoActiveSession)
        );
    }

    #[test]
    fn empty_establishment_is_invalid() {
        let registry = SessionRegistry::new();
        assert!(matches!(
            registry.open("h1", " "),
            Err(ServiceError::InvalidParameter(_))
        ));
    }
}
