use anyhow::Result;
use rusqlite::Connection;
use uuid::Uuid;

use crate::models::{MatchListRow, MatchRow, normalize_pair, parse_col};
use crate::{Database, OptionalExt};

const MATCH_COLUMNS: &str = "id, user_a, user_b, created_at, last_message, last_message_at";

impl Database {
    pub fn get_match(&self, id: Uuid) -> Result<Option<MatchRow>> {
        self.with_conn(|conn| query_match(conn, id))
    }

    /// Unordered lookup: argument order does not matter.
    pub fn find_match_between(&self, a: Uuid, b: Uuid) -> Result<Option<MatchRow>> {
        let (user_a, user_b) = normalize_pair(a, b);
        self.with_conn(|conn| {
            let sql = format!("SELECT {MATCH_COLUMNS} FROM matches WHERE user_a = ?1 AND user_b = ?2");
            conn.query_row(&sql, [user_a.to_string(), user_b.to_string()], MatchRow::from_row)
                .optional()
        })
    }

    /// Every match of `user_id` with the other participant's card,
    /// most recent activity first.
    pub fn list_matches_for(&self, user_id: Uuid) -> Result<Vec<MatchListRow>> {
        self.with_conn(|conn| {
            // JOIN the other participant and their main image in one query
            let mut stmt = conn.prepare(
                "SELECT m.id, m.user_a, m.user_b, m.created_at, m.last_message, m.last_message_at,
                        u.id, u.name, u.is_online, u.last_active,
                        (SELECT i.url FROM profile_images i
                          WHERE i.user_id = u.id AND i.is_main = 1 LIMIT 1)
                 FROM matches m
                 JOIN users u
                   ON u.id = CASE WHEN m.user_a = ?1 THEN m.user_b ELSE m.user_a END
                 WHERE m.user_a = ?1 OR m.user_b = ?1
                 ORDER BY COALESCE(m.last_message_at, m.created_at) DESC",
            )?;

            let rows = stmt
                .query_map([user_id.to_string()], |row| {
                    Ok(MatchListRow {
                        matched: MatchRow::from_row(row)?,
                        other_id: parse_col(row, 6)?,
                        other_name: row.get(7)?,
                        other_is_online: row.get(8)?,
                        other_last_active: row.get(9)?,
                        other_main_image: row.get(10)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Ids of everyone `user_id` is matched with.
    pub fn match_partners(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT CASE WHEN user_a = ?1 THEN user_b ELSE user_a END
                 FROM matches WHERE user_a = ?1 OR user_b = ?1",
            )?;

            let rows = stmt
                .query_map([user_id.to_string()], |row| parse_col(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

fn query_match(conn: &Connection, id: Uuid) -> Result<Option<MatchRow>> {
    let sql = format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = ?1");
    conn.query_row(&sql, [id.to_string()], MatchRow::from_row).optional()
}
