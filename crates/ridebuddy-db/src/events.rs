use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use crate::models::{EventRow, JoinEventOutcome, parse_col};
use crate::{Database, OptionalExt};

const EVENT_COLUMNS: &str = "id, creator_id, title, description, date, latitude, longitude";

impl Database {
    pub fn create_event(
        &self,
        creator_id: Uuid,
        title: &str,
        description: &str,
        date: DateTime<Utc>,
        location: Option<(f64, f64)>,
    ) -> Result<EventRow> {
        let row = EventRow {
            id: Uuid::new_v4(),
            creator_id,
            title: title.to_string(),
            description: description.to_string(),
            date,
            latitude: location.map(|(lat, _)| lat),
            longitude: location.map(|(_, lon)| lon),
            participants: vec![],
        };

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO events (id, creator_id, title, description, date, latitude, longitude, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    row.id.to_string(),
                    creator_id.to_string(),
                    row.title,
                    row.description,
                    row.date,
                    row.latitude,
                    row.longitude,
                    Utc::now()
                ],
            )?;
            Ok(())
        })?;

        Ok(row)
    }

    /// All events, soonest first, with their participants.
    pub fn list_events(&self) -> Result<Vec<EventRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {EVENT_COLUMNS} FROM events ORDER BY date ASC");
            let mut stmt = conn.prepare(&sql)?;
            let mut events = stmt
                .query_map([], event_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            // One pass over the participant table instead of a query per event
            let mut stmt = conn.prepare(
                "SELECT event_id, user_id FROM event_participants ORDER BY joined_at, rowid",
            )?;
            let pairs = stmt
                .query_map([], |row| Ok((parse_col::<Uuid>(row, 0)?, parse_col::<Uuid>(row, 1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let mut by_event: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
            for (event_id, user_id) in pairs {
                by_event.entry(event_id).or_default().push(user_id);
            }
            for event in &mut events {
                event.participants = by_event.remove(&event.id).unwrap_or_default();
            }

            Ok(events)
        })
    }

    pub fn get_event(&self, id: Uuid) -> Result<Option<EventRow>> {
        self.with_conn(|conn| query_event(conn, id))
    }

    pub fn join_event(&self, event_id: Uuid, user_id: Uuid) -> Result<JoinEventOutcome> {
        self.with_tx(|conn| {
            if query_event(conn, event_id)?.is_none() {
                return Ok(JoinEventOutcome::NotFound);
            }

            let inserted = conn.execute(
                "INSERT INTO event_participants (event_id, user_id, joined_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (event_id, user_id) DO NOTHING",
                rusqlite::params![event_id.to_string(), user_id.to_string(), Utc::now()],
            )?;

            if inserted == 0 {
                return Ok(JoinEventOutcome::AlreadyJoined);
            }

            match query_event(conn, event_id)? {
                Some(event) => Ok(JoinEventOutcome::Joined(event)),
                None => Ok(JoinEventOutcome::NotFound),
            }
        })
    }
}

fn event_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EventRow> {
    Ok(EventRow {
        id: parse_col(row, 0)?,
        creator_id: parse_col(row, 1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        date: row.get(4)?,
        latitude: row.get(5)?,
        longitude: row.get(6)?,
        participants: vec![],
    })
}

fn query_event(conn: &Connection, id: Uuid) -> Result<Option<EventRow>> {
    let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1");
    let Some(mut event) = conn.query_row(&sql, [id.to_string()], event_from_row).optional()? else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT user_id FROM event_participants WHERE event_id = ?1 ORDER BY joined_at, rowid",
    )?;
    event.participants = stmt
        .query_map([id.to_string()], |row| parse_col(row, 0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Some(event))
}
