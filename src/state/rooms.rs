//! Topic fan-out.
//!
//! The broadcaster owns the only long-lived handle to each connection's
//! outbound queue. Publishing never blocks: a connection whose queue is full
//! is detached, which drops that handle and lets the connection task observe
//! a closed queue and shut down.

use crate::metrics;
use crate::state::dashmap_ext::DashMapExt;
use crate::state::uid::ConnId;
use bidstage_proto::{ServerFrame, Topic};
use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// Serialized frames queued for one connection.
pub type Outbound = mpsc::Sender<Arc<str>>;

/// Subscription topology and fan-out.
#[derive(Default)]
pub struct RoomBroadcaster {
    connections: DashMap<ConnId, Outbound>,
    topics: DashMap<Topic, HashSet<ConnId>>,
    memberships: DashMap<ConnId, HashSet<Topic>>,
}

enum Delivery {
    Sent,
    Slow,
    Gone,
}

impl RoomBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection's outbound queue.
    pub fn attach(&self, conn: &str, tx: Outbound) {
        self.connections.insert(conn.to_string(), tx);
    }

    /// Subscribe a connection to a topic. Returns false for unknown connections.
    pub fn join(&self, conn: &str, topic: Topic) -> bool {
        if !self.connections.contains_key(conn) {
            return false;
        }
        self.topics
            .entry(topic.clone())
            .or_default()
            .insert(conn.to_string());
        self.memberships
            .entry(conn.to_string())
            .or_default()
            .insert(topic);
        true
    }

    /// Unsubscribe a connection from a topic. Idempotent.
    pub fn leave(&self, conn: &str, topic: &Topic) -> bool {
        let was_member = self
            .memberships
            .get_mut(conn)
            .map(|mut topics| topics.remove(topic))
            .unwrap_or(false);
        self.remove_from_topic(topic, conn);
        was_member
    }

    fn remove_from_topic(&self, topic: &Topic, conn: &str) {
        if let Some(mut members) = self.topics.get_mut(topic) {
            members.remove(conn);
        }
        self.topics.remove_if(topic, |_, members| members.is_empty());
    }

    /// Remove a connection from every topic and drop its outbound handle.
    ///
    /// Returns the number of topics it was subscribed to.
    pub fn detach(&self, conn: &str) -> usize {
        self.connections.remove(conn);
        let Some((_, topics)) = self.memberships.remove(conn) else {
            return 0;
        };
        for topic in &topics {
            self.remove_from_topic(topic, conn);
        }
        topics.len()
    }

    /// Publish an event to every subscriber of `topic`.
    ///
    /// Returns the number of connections the frame was queued for.
    pub fn publish(&self, topic: &Topic, event: &str, payload: impl Serialize) -> usize {
        let frame = ServerFrame::event(event, topic.clone(), payload);
        self.publish_frame(topic, &frame)
    }

    /// Publish a pre-built frame to every subscriber of `topic`.
    pub fn publish_frame(&self, topic: &Topic, frame: &ServerFrame) -> usize {
        let targets: Vec<ConnId> = self
            .topics
            .get(topic)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default();

        if targets.is_empty() {
            metrics::record_fanout(0);
            return 0;
        }

        let text: Arc<str> = Arc::from(frame.to_text());
        let mut delivered = 0;
        for conn in &targets {
            match self.deliver(conn, &text) {
                Delivery::Sent => delivered += 1,
                Delivery::Slow => self.drop_slow(conn),
                Delivery::Gone => {
                    self.detach(conn);
                }
            }
        }

        metrics::record_fanout(delivered);
        delivered
    }

    /// Queue a frame for a single connection, under the same drop policy.
    pub fn send_to(&self, conn: &str, frame: &ServerFrame) -> bool {
        let text: Arc<str> = Arc::from(frame.to_text());
        match self.deliver(conn, &text) {
            Delivery::Sent => true,
            Delivery::Slow => {
                self.drop_slow(conn);
                false
            }
            Delivery::Gone => {
                self.detach(conn);
                false
            }
        }
    }

    fn deliver(&self, conn: &str, text: &Arc<str>) -> Delivery {
        let Some(tx) = self.connections.get_cloned(conn) else {
            return Delivery::Gone;
        };
        match tx.try_send(Arc::clone(text)) {
            Ok(()) => Delivery::Sent,
            Err(TrySendError::Full(_)) => Delivery::Slow,
            Err(TrySendError::Closed(_)) => Delivery::Gone,
        }
    }

    fn drop_slow(&self, conn: &str) {
        warn!(conn = %conn, "Outbound queue full, dropping connection");
        metrics::inc_dropped_subscribers();
        let topics = self.detach(conn);
        debug!(conn = %conn, topics, "Slow connection detached");
    }

    /// Number of connections subscribed to `topic`.
    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.topics.get(topic).map(|m| m.len()).unwrap_or(0)
    }

    /// Whether `conn` is subscribed to `topic`.
    pub fn is_subscribed(&self, conn: &str, topic: &Topic) -> bool {
        self.memberships
            .get(conn)
            .map(|topics| topics.contains(topic))
            .unwrap_or(false)
    }

    /// Number of attached connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}
