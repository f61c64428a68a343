//! Integration tests for queue operations and fan-out.

mod common;

use bidstage_proto::{
    ClientCommand, ItemState, QueueItemView, SessionView, SnapshotView, TimelinePoint, events,
};
use common::client::payload;
use common::{TestClient, TestServer};

fn enqueue(session_id: &str, title: &str, requester: &str, price: i64) -> ClientCommand {
    ClientCommand::Enqueue {
        session_id: session_id.to_string(),
        title: title.to_string(),
        artist: "Various".to_string(),
        requester: requester.to_string(),
        price,
    }
}

async fn live_session(server: &TestServer) -> (TestClient, SessionView) {
    let mut host = server.connect().await.unwrap();
    host.auth("tok-alice").await.unwrap();
    let session: SessionView = host
        .call(ClientCommand::OpenSession {
            establishment_id: "bar-1".into(),
        })
        .await
        .unwrap();
    (host, session)
}

#[tokio::test]
async fn test_enqueue_fans_out_to_joined_patrons() {
    let server = TestServer::spawn().await.expect("Failed to spawn test server");
    let (_host, session) = live_session(&server).await;

    let mut ana = server.connect().await.unwrap();
    let mut ben = server.connect().await.unwrap();
    for client in [&mut ana, &mut ben] {
        client
            .call::<SnapshotView>(ClientCommand::Join {
                session_id: session.id.clone(),
                establishment_id: None,
            })
            .await
            .unwrap();
        client.next_event(events::SNAPSHOT).await.unwrap();
    }

    let item: QueueItemView = ana
        .call(enqueue(&session.id, "Song A", "Ana", 5_000))
        .await
        .unwrap();
    assert_eq!(item.state, ItemState::Pending);

    for client in [&mut ana, &mut ben] {
        let event = client.next_event(events::QUEUE_UPDATED).await.unwrap();
        let queue: Vec<QueueItemView> = payload(&event).unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].title, "Song A");

        let timeline = client.next_event(events::STATS_TIMELINE).await.unwrap();
        let points: Vec<TimelinePoint> = payload(&timeline).unwrap();
        assert_eq!(points.last().map(|p| p.revenue), Some(5_000));
    }
}

#[tokio::test]
async fn test_advance_plays_in_fifo_order() {
    let server = TestServer::spawn().await.expect("Failed to spawn test server");
    let (mut host, session) = live_session(&server).await;
    let mut patron = server.connect().await.unwrap();

    for (title, price) in [("First", 1_000), ("Second", 9_000), ("Third", 3_000)] {
        patron
            .call::<QueueItemView>(enqueue(&session.id, title, "Ana", price))
            .await
            .unwrap();
    }

    let playing: Option<QueueItemView> = host
        .call(ClientCommand::Advance {
            session_id: session.id.clone(),
        })
        .await
        .unwrap();
    assert_eq!(playing.as_ref().map(|i| i.title.as_str()), Some("First"));
    assert_eq!(playing.map(|i| i.state), Some(ItemState::Playing));

    let playing: Option<QueueItemView> = host
        .call(ClientCommand::Advance {
            session_id: session.id.clone(),
        })
        .await
        .unwrap();
    assert_eq!(playing.map(|i| i.title), Some("Second".to_string()));

    let queue: Vec<QueueItemView> = patron
        .call(ClientCommand::Queue {
            session_id: session.id.clone(),
        })
        .await
        .unwrap();
    let titles: Vec<_> = queue.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, ["Second", "Third"]);

    let current: Option<SessionView> = host.call(ClientCommand::CurrentSession).await.unwrap();
    let totals = current.unwrap().totals;
    assert_eq!(totals.song_count, 3);
    assert_eq!(totals.played_count, 1);
    assert_eq!(totals.revenue, 13_000);
    assert_eq!(totals.attendee_count, 1);
}

#[tokio::test]
async fn test_reject_and_illegal_transition() {
    let server = TestServer::spawn().await.expect("Failed to spawn test server");
    let (mut host, session) = live_session(&server).await;

    let item: QueueItemView = host
        .call(enqueue(&session.id, "Nope", "Ben", 2_000))
        .await
        .unwrap();

    let rejected: QueueItemView = host
        .call(ClientCommand::Reject {
            session_id: session.id.clone(),
            item_id: item.id,
        })
        .await
        .unwrap();
    assert_eq!(rejected.state, ItemState::Rejected);

    let code = host
        .call_err(ClientCommand::Reject {
            session_id: session.id.clone(),
            item_id: item.id,
        })
        .await
        .unwrap();
    assert_eq!(code, "illegal-state-transition");
}

#[tokio::test]
async fn test_other_host_cannot_advance() {
    let server = TestServer::spawn().await.expect("Failed to spawn test server");
    let (_alice, session) = live_session(&server).await;

    let mut bob = server.connect().await.unwrap();
    bob.auth("tok-bob").await.unwrap();
    let code = bob
        .call_err(ClientCommand::Advance {
            session_id: session.id.clone(),
        })
        .await
        .unwrap();
    assert_eq!(code, "not-found");
}

#[tokio::test]
async fn test_enqueue_validation_and_closed_session() {
    let server = TestServer::spawn().await.expect("Failed to spawn test server");
    let (mut host, session) = live_session(&server).await;
    let mut patron = server.connect().await.unwrap();

    let code = patron
        .call_err(enqueue(&session.id, "  ", "Ana", 100))
        .await
        .unwrap();
    assert_eq!(code, "invalid-parameter");

    let code = patron
        .call_err(enqueue("no-such-session", "Song", "Ana", 100))
        .await
        .unwrap();
    assert_eq!(code, "not-found");

    patron
        .call::<QueueItemView>(enqueue(&session.id, "Kept", "Ana", 100))
        .await
        .unwrap();
    host.call::<SessionView>(ClientCommand::CloseSession)
        .await
        .unwrap();

    let code = patron
        .call_err(enqueue(&session.id, "Late", "Ana", 100))
        .await
        .unwrap();
    assert_eq!(code, "no-active-session");

    // The archive stays readable.
    let archived: Vec<QueueItemView> = patron
        .call(ClientCommand::Queue {
            session_id: session.id.clone(),
        })
        .await
        .unwrap();
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].title, "Kept");
}

#[tokio::test]
async fn test_late_joiner_gets_current_queue() {
    let server = TestServer::spawn().await.expect("Failed to spawn test server");
    let (_host, session) = live_session(&server).await;
    let mut early = server.connect().await.unwrap();
    early
        .call::<QueueItemView>(enqueue(&session.id, "One", "Ana", 100))
        .await
        .unwrap();
    early
        .call::<QueueItemView>(enqueue(&session.id, "Two", "Ben", 200))
        .await
        .unwrap();

    let mut late = server.connect().await.unwrap();
    let snapshot: SnapshotView = late
        .call(ClientCommand::Join {
            session_id: session.id.clone(),
            establishment_id: None,
        })
        .await
        .unwrap();
    let titles: Vec<_> = snapshot.queue.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, ["One", "Two"]);
    assert_eq!(snapshot.session.unwrap().totals.attendee_count, 2);

    // Leaving stops the fan-out.
    late.call::<serde_json::Value>(ClientCommand::Leave {
        session_id: session.id.clone(),
        establishment_id: None,
    })
    .await
    .unwrap();
    late.drain_events(std::time::Duration::from_millis(100)).await;

    early
        .call::<QueueItemView>(enqueue(&session.id, "Three", "Ana", 300))
        .await
        .unwrap();
    let after = late
        .drain_events(std::time::Duration::from_millis(300))
        .await;
    assert!(after.iter().all(|e| e.event != events::QUEUE_UPDATED));
}
