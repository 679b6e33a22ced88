/// Chat flow against an in-memory store, driving sessions through the
/// registry instead of real sockets.
use std::sync::Arc;

use ridebuddy_db::Database;
use ridebuddy_db::models::SwipeOutcome;
use ridebuddy_gateway::chat::{ChatError, ChatService};
use ridebuddy_gateway::connection::handle_text_frame;
use ridebuddy_gateway::registry::{Registration, Room, SessionRegistry};
use ridebuddy_types::events::GatewayEvent;
use ridebuddy_types::models::Direction;
use uuid::Uuid;

struct Fixture {
    db: Arc<Database>,
    chat: ChatService,
    alice: Uuid,
    bob: Uuid,
    match_id: Uuid,
}

fn fixture() -> Fixture {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    db.create_user(alice, "alice@example.com", "hash", "Alice").unwrap();
    db.create_user(bob, "bob@example.com", "hash", "Bob").unwrap();
    db.record_swipe(alice, bob, Direction::Right).unwrap();
    let SwipeOutcome::Matched { match_id, .. } = db.record_swipe(bob, alice, Direction::Right).unwrap()
    else {
        panic!("expected a match");
    };

    let chat = ChatService::new(db.clone(), SessionRegistry::new());
    Fixture {
        db,
        chat,
        alice,
        bob,
        match_id,
    }
}

fn drop_messages_table(db: &Database) {
    db.with_conn(|conn| {
        conn.execute_batch("DROP TABLE messages")?;
        Ok(())
    })
    .unwrap();
}

fn drain(reg: &mut Registration) -> Vec<GatewayEvent> {
    let mut out = Vec::new();
    while let Ok(event) = reg.events.try_recv() {
        out.push(event);
    }
    out
}

#[tokio::test]
async fn message_reaches_room_once_and_persists_once() {
    let f = fixture();
    let mut a = f.chat.connect(f.alice).await;
    let mut b = f.chat.connect(f.bob).await;
    f.chat.join_chat(a.conn_id, f.alice, f.match_id).await.unwrap();
    f.chat.join_chat(b.conn_id, f.bob, f.match_id).await.unwrap();
    drain(&mut a);
    drain(&mut b);

    let sent = f.chat.send_message(f.alice, f.match_id, f.bob, "hello").await.unwrap();
    assert!(!sent.read);

    for reg in [&mut a, &mut b] {
        let events = drain(reg);
        assert_eq!(events, vec![GatewayEvent::NewMessage(sent.clone())]);
    }

    let stored = f.db.get_messages(f.match_id, 50, None).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, sent.id);
}

#[tokio::test]
async fn absent_receiver_gets_a_notification() {
    let f = fixture();
    let mut a = f.chat.connect(f.alice).await;
    let mut b = f.chat.connect(f.bob).await;
    f.chat.join_chat(a.conn_id, f.alice, f.match_id).await.unwrap();
    drain(&mut a);
    drain(&mut b);

    f.chat.send_message(f.alice, f.match_id, f.bob, "you there?").await.unwrap();

    let events = drain(&mut b);
    assert_eq!(
        events,
        vec![GatewayEvent::MessageNotification {
            match_id: f.match_id,
            sender_id: f.alice,
            content: "you there?".into(),
        }]
    );
}

#[tokio::test]
async fn joining_marks_unread_and_sends_receipt_to_others() {
    let f = fixture();
    let mut a = f.chat.connect(f.alice).await;
    f.chat.join_chat(a.conn_id, f.alice, f.match_id).await.unwrap();

    f.chat.send_message(f.alice, f.match_id, f.bob, "one").await.unwrap();
    f.chat.send_message(f.alice, f.match_id, f.bob, "two").await.unwrap();
    drain(&mut a);

    let mut b = f.chat.connect(f.bob).await;
    drain(&mut a);
    let count = f.chat.join_chat(b.conn_id, f.bob, f.match_id).await.unwrap();
    assert_eq!(count, 2);

    assert_eq!(
        drain(&mut a),
        vec![GatewayEvent::MessagesRead {
            match_id: f.match_id,
            reader_id: f.bob,
            count: 2,
        }]
    );
    assert!(drain(&mut b).is_empty());

    let stored = f.db.get_messages(f.match_id, 50, None).unwrap();
    assert!(stored.iter().all(|m| m.read));

    // Rejoining never flips anything back
    f.chat.join_chat(b.conn_id, f.bob, f.match_id).await.unwrap();
    assert!(f.db.get_messages(f.match_id, 50, None).unwrap().iter().all(|m| m.read));
}

#[tokio::test]
async fn outsider_cannot_send_or_join() {
    let f = fixture();
    let eve = Uuid::new_v4();
    f.db.create_user(eve, "eve@example.com", "hash", "Eve").unwrap();
    let e = f.chat.connect(eve).await;

    let err = f.chat.send_message(eve, f.match_id, f.bob, "hi").await.unwrap_err();
    assert!(matches!(err, ChatError::NotParticipant));

    let err = f.chat.join_chat(e.conn_id, eve, f.match_id).await.unwrap_err();
    assert!(matches!(err, ChatError::NotParticipant));

    assert!(f.db.get_messages(f.match_id, 50, None).unwrap().is_empty());
}

#[tokio::test]
async fn wrong_receiver_and_empty_content_are_rejected() {
    let f = fixture();

    let err = f.chat.send_message(f.alice, f.match_id, f.alice, "hi").await.unwrap_err();
    assert!(matches!(err, ChatError::InvalidReceiver));

    let err = f.chat.send_message(f.alice, f.match_id, f.bob, "   ").await.unwrap_err();
    assert!(matches!(err, ChatError::InvalidContent(_)));

    let err = f.chat.send_message(f.alice, Uuid::new_v4(), f.bob, "hi").await.unwrap_err();
    assert!(matches!(err, ChatError::MatchNotFound));

    assert!(f.db.get_messages(f.match_id, 50, None).unwrap().is_empty());
}

#[tokio::test]
async fn typing_requires_room_and_skips_sender() {
    let f = fixture();
    let mut a = f.chat.connect(f.alice).await;
    let mut b = f.chat.connect(f.bob).await;

    let err = f.chat.typing(a.conn_id, f.alice, f.match_id, true).await.unwrap_err();
    assert!(matches!(err, ChatError::NotInRoom));

    f.chat.join_chat(a.conn_id, f.alice, f.match_id).await.unwrap();
    f.chat.join_chat(b.conn_id, f.bob, f.match_id).await.unwrap();
    drain(&mut a);
    drain(&mut b);

    f.chat.typing(a.conn_id, f.alice, f.match_id, true).await.unwrap();
    assert!(drain(&mut a).is_empty());
    assert_eq!(
        drain(&mut b),
        vec![GatewayEvent::TypingIndicator {
            match_id: f.match_id,
            user_id: f.alice,
            is_typing: true,
        }]
    );
}

#[tokio::test]
async fn presence_follows_last_session() {
    let f = fixture();
    let mut b = f.chat.connect(f.bob).await;

    let first = f.chat.connect(f.alice).await;
    let second = f.chat.connect(f.alice).await;
    assert!(f.db.get_user(f.alice).unwrap().unwrap().is_online);

    let events = drain(&mut b);
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], GatewayEvent::PresenceUpdate { online: true, .. }));

    f.chat.disconnect(first.conn_id).await;
    assert!(f.db.get_user(f.alice).unwrap().unwrap().is_online);
    assert!(drain(&mut b).is_empty());

    let before = f.db.get_user(f.alice).unwrap().unwrap().last_active;
    f.chat.disconnect(second.conn_id).await;
    let user = f.db.get_user(f.alice).unwrap().unwrap();
    assert!(!user.is_online);
    assert!(user.last_active >= before);
    let events = drain(&mut b);
    assert!(matches!(events.as_slice(), [GatewayEvent::PresenceUpdate { online: false, .. }]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reconnect_racing_last_disconnect_stays_online() {
    let f = fixture();

    for _ in 0..50 {
        let old = f.chat.connect(f.alice).await;

        let chat = f.chat.clone();
        let leaving = tokio::spawn(async move { chat.disconnect(old.conn_id).await });
        let chat = f.chat.clone();
        let alice = f.alice;
        let joining = tokio::spawn(async move { chat.connect(alice).await });

        leaving.await.unwrap();
        let fresh = joining.await.unwrap();

        assert!(f.chat.registry().is_online(f.alice).await);
        assert!(f.db.get_user(f.alice).unwrap().unwrap().is_online);

        f.chat.disconnect(fresh.conn_id).await;
        assert!(!f.db.get_user(f.alice).unwrap().unwrap().is_online);
    }
}

#[tokio::test]
async fn malformed_frame_errors_only_that_session() {
    let f = fixture();
    let mut a1 = f.chat.connect(f.alice).await;
    let mut a2 = f.chat.connect(f.alice).await;
    let mut b = f.chat.connect(f.bob).await;
    drain(&mut a1);
    drain(&mut a2);
    drain(&mut b);

    handle_text_frame(&f.chat, a1.conn_id, f.alice, "{not json").await;

    let events = drain(&mut a1);
    assert!(matches!(events.as_slice(), [GatewayEvent::Error { .. }]));
    assert!(drain(&mut a2).is_empty());
    assert!(drain(&mut b).is_empty());
}

#[tokio::test]
async fn store_failure_on_send_reaches_only_sender() {
    let f = fixture();
    let mut a = f.chat.connect(f.alice).await;
    let mut b = f.chat.connect(f.bob).await;
    f.chat.join_chat(a.conn_id, f.alice, f.match_id).await.unwrap();
    f.chat.join_chat(b.conn_id, f.bob, f.match_id).await.unwrap();
    drain(&mut a);
    drain(&mut b);

    drop_messages_table(&f.db);

    let err = f.chat.send_message(f.alice, f.match_id, f.bob, "hello").await.unwrap_err();
    assert!(matches!(err, ChatError::Store(_)));
    assert_eq!(err.client_message(), "internal error");

    let frame = serde_json::json!({
        "type": "send_message",
        "data": { "match_id": f.match_id, "receiver_id": f.bob, "content": "hello" },
    })
    .to_string();
    handle_text_frame(&f.chat, a.conn_id, f.alice, &frame).await;

    assert_eq!(
        drain(&mut a),
        vec![GatewayEvent::Error {
            message: "internal error".into()
        }]
    );
    assert!(drain(&mut b).is_empty());

    let matched = f.db.get_match(f.match_id).unwrap().unwrap();
    assert_eq!(matched.last_message, None);
    assert_eq!(matched.last_message_at, None);
}

#[tokio::test]
async fn failed_join_leaves_session_outside_the_room() {
    let f = fixture();
    let a = f.chat.connect(f.alice).await;

    drop_messages_table(&f.db);

    let err = f.chat.join_chat(a.conn_id, f.alice, f.match_id).await.unwrap_err();
    assert!(matches!(err, ChatError::Store(_)));
    assert!(!f.chat.registry().is_in_room(a.conn_id, Room::Match(f.match_id)).await);
}
