/// Swipe recording and match formation against an in-memory store.
mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use ridebuddy_db::Database;
use ridebuddy_db::models::SwipeOutcome;
use ridebuddy_types::models::Direction;

use common::{match_count, user};

#[test]
fn reciprocal_right_swipes_form_a_match() {
    let db = Database::open_in_memory().unwrap();
    let alice = user(&db, "Alice");
    let bob = user(&db, "Bob");

    assert_eq!(db.record_swipe(alice, bob, Direction::Right).unwrap(), SwipeOutcome::NoMatch);

    let SwipeOutcome::Matched { match_id, created } =
        db.record_swipe(bob, alice, Direction::Right).unwrap()
    else {
        panic!("expected a match");
    };
    assert!(created);

    let row = db.find_match_between(alice, bob).unwrap().unwrap();
    assert_eq!(row.id, match_id);
    assert_eq!(db.find_match_between(bob, alice).unwrap().unwrap().id, match_id);

    for (me, other) in [(alice, bob), (bob, alice)] {
        let listed = db.list_matches_for(me).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].other_id, other);
    }
}

#[test]
fn left_swipe_never_matches() {
    let db = Database::open_in_memory().unwrap();
    let alice = user(&db, "Alice");
    let bob = user(&db, "Bob");

    db.record_swipe(alice, bob, Direction::Left).unwrap();
    assert_eq!(db.record_swipe(bob, alice, Direction::Right).unwrap(), SwipeOutcome::NoMatch);
    assert!(db.find_match_between(alice, bob).unwrap().is_none());
}

#[test]
fn repeated_swipe_is_a_duplicate_and_adds_no_match() {
    let db = Database::open_in_memory().unwrap();
    let alice = user(&db, "Alice");
    let bob = user(&db, "Bob");

    db.record_swipe(alice, bob, Direction::Right).unwrap();
    db.record_swipe(bob, alice, Direction::Right).unwrap();

    assert_eq!(db.record_swipe(alice, bob, Direction::Right).unwrap(), SwipeOutcome::Duplicate);
    assert_eq!(db.record_swipe(bob, alice, Direction::Left).unwrap(), SwipeOutcome::Duplicate);
    assert_eq!(match_count(&db), 1);
}

#[test]
fn self_swipe_violates_the_schema() {
    let db = Database::open_in_memory().unwrap();
    let alice = user(&db, "Alice");
    assert!(db.record_swipe(alice, alice, Direction::Right).is_err());
}

#[test]
fn concurrent_reciprocal_swipes_create_one_match() {
    for _ in 0..20 {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let alice = user(&db, "Alice");
        let bob = user(&db, "Bob");
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = [(alice, bob), (bob, alice)]
            .into_iter()
            .map(|(actor, target)| {
                let db = db.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    db.record_swipe(actor, target, Direction::Right).unwrap()
                })
            })
            .collect();

        let outcomes: Vec<SwipeOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let matched = outcomes
            .iter()
            .filter(|o| matches!(o, SwipeOutcome::Matched { .. }))
            .count();
        assert_eq!(matched, 1);
        assert_eq!(match_count(&db), 1);
    }
}
