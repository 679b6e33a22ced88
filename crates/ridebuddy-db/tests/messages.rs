mod common;

use chrono::{Duration, Utc};
use ridebuddy_db::Database;
use ridebuddy_db::models::{JoinEventOutcome, SwipeOutcome};
use ridebuddy_types::models::Direction;
use uuid::Uuid;

use common::user;

fn matched_pair(db: &Database) -> (Uuid, Uuid, Uuid) {
    let alice = user(db, "Alice");
    let bob = user(db, "Bob");
    db.record_swipe(alice, bob, Direction::Right).unwrap();
    match db.record_swipe(bob, alice, Direction::Right).unwrap() {
        SwipeOutcome::Matched { match_id, .. } => (alice, bob, match_id),
        other => panic!("expected match, got {:?}", other),
    }
}

#[test]
fn messages_come_back_in_send_order() {
    let db = Database::open_in_memory().unwrap();
    let (alice, bob, match_id) = matched_pair(&db);

    for i in 0..5 {
        db.insert_message(match_id, alice, bob, &format!("msg {i}")).unwrap();
    }

    let rows = db.get_messages(match_id, 50, None).unwrap();
    let contents: Vec<&str> = rows.iter().map(|r| r.content.as_str()).collect();
    assert_eq!(contents, ["msg 0", "msg 1", "msg 2", "msg 3", "msg 4"]);

    let latest = db.get_messages(match_id, 2, None).unwrap();
    assert_eq!(latest[0].content, "msg 3");
    assert_eq!(latest[1].content, "msg 4");
}

#[test]
fn insert_updates_match_preview() {
    let db = Database::open_in_memory().unwrap();
    let (alice, bob, match_id) = matched_pair(&db);

    let sent = db.insert_message(match_id, alice, bob, "see you at the trailhead").unwrap();
    assert!(!sent.read);

    let row = db.get_match(match_id).unwrap().unwrap();
    assert_eq!(row.last_message.as_deref(), Some("see you at the trailhead"));
    assert!(row.last_message_at.is_some());
}

#[test]
fn mark_read_only_touches_receivers_messages() {
    let db = Database::open_in_memory().unwrap();
    let (alice, bob, match_id) = matched_pair(&db);

    db.insert_message(match_id, alice, bob, "one").unwrap();
    db.insert_message(match_id, alice, bob, "two").unwrap();
    db.insert_message(match_id, bob, alice, "reply").unwrap();

    assert_eq!(db.mark_read(match_id, bob).unwrap(), 2);
    assert_eq!(db.mark_read(match_id, bob).unwrap(), 0);

    let rows = db.get_messages(match_id, 50, None).unwrap();
    for row in rows {
        assert_eq!(row.read, row.receiver_id == bob);
    }
}

#[test]
fn read_flag_cannot_be_cleared() {
    let db = Database::open_in_memory().unwrap();
    let (alice, bob, match_id) = matched_pair(&db);
    let msg = db.insert_message(match_id, alice, bob, "hi").unwrap();
    db.mark_read(match_id, bob).unwrap();

    let reset = db.with_conn(|conn| {
        conn.execute("UPDATE messages SET read = 0 WHERE id = ?1", [msg.id.to_string()])?;
        Ok(())
    });
    assert!(reset.is_err());
    assert!(db.get_messages(match_id, 10, None).unwrap()[0].read);
}

#[test]
fn events_list_by_date_and_join_once() {
    let db = Database::open_in_memory().unwrap();
    let alice = user(&db, "Alice");
    let bob = user(&db, "Bob");

    let later = db
        .create_event(alice, "Coast ride", "Easy pace", Utc::now() + Duration::days(7), None)
        .unwrap();
    let sooner = db
        .create_event(alice, "Night ride", "Bring lights", Utc::now() + Duration::days(1), Some((52.1, 4.3)))
        .unwrap();

    let listed: Vec<Uuid> = db.list_events().unwrap().into_iter().map(|e| e.id).collect();
    assert_eq!(listed, vec![sooner.id, later.id]);

    match db.join_event(later.id, bob).unwrap() {
        JoinEventOutcome::Joined(event) => assert_eq!(event.participants, vec![bob]),
        _ => panic!("expected join"),
    }
    assert!(matches!(db.join_event(later.id, bob).unwrap(), JoinEventOutcome::AlreadyJoined));
    assert!(matches!(db.join_event(Uuid::new_v4(), bob).unwrap(), JoinEventOutcome::NotFound));
}
