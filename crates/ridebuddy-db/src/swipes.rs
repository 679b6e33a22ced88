use anyhow::Result;
use chrono::Utc;
use rusqlite::Connection;
use tracing::info;
use uuid::Uuid;

use ridebuddy_types::models::Direction;

use crate::models::{SwipeOutcome, normalize_pair};
use crate::{Database, OptionalExt};

impl Database {
    /// Record `actor`'s decision about `target` and form a match when the
    /// reciprocal right swipe already exists.
    ///
    /// The swipe insert, the reciprocal lookup and the match insert share one
    /// transaction. The match row is keyed on the normalized pair, so two
    /// reciprocal swipes racing each other still end with a single match.
    pub fn record_swipe(&self, actor: Uuid, target: Uuid, direction: Direction) -> Result<SwipeOutcome> {
        self.with_tx(|conn| {
            let inserted = conn.execute(
                "INSERT INTO swipes (actor_id, target_id, direction, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (actor_id, target_id) DO NOTHING",
                rusqlite::params![actor.to_string(), target.to_string(), direction.as_str(), Utc::now()],
            )?;

            if inserted == 0 {
                return Ok(SwipeOutcome::Duplicate);
            }

            if direction == Direction::Left || !has_right_swipe(conn, target, actor)? {
                return Ok(SwipeOutcome::NoMatch);
            }

            let (user_a, user_b) = normalize_pair(actor, target);
            let created = conn.execute(
                "INSERT INTO matches (id, user_a, user_b, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (user_a, user_b) DO NOTHING",
                rusqlite::params![
                    Uuid::new_v4().to_string(),
                    user_a.to_string(),
                    user_b.to_string(),
                    Utc::now()
                ],
            )? == 1;

            let match_id: String = conn.query_row(
                "SELECT id FROM matches WHERE user_a = ?1 AND user_b = ?2",
                [user_a.to_string(), user_b.to_string()],
                |row| row.get(0),
            )?;
            let match_id: Uuid = match_id.parse()?;

            if created {
                info!("Match {} formed between {} and {}", match_id, user_a, user_b);
            }

            Ok(SwipeOutcome::Matched { match_id, created })
        })
    }
}

fn has_right_swipe(conn: &Connection, actor: Uuid, target: Uuid) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM swipes WHERE actor_id = ?1 AND target_id = ?2 AND direction = 'right'",
            [actor.to_string(), target.to_string()],
            |row| row.get(0),
        )
        .optional()?;

    Ok(found.is_some())
}
