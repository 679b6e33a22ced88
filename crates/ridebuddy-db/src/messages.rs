use anyhow::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::Database;
use crate::models::MessageRow;

const MESSAGE_COLUMNS: &str = "id, match_id, sender_id, receiver_id, content, read, created_at";

impl Database {
    /// Store a new unread message and bump the match's last-message preview.
    /// Participant checks belong to the caller.
    pub fn insert_message(
        &self,
        match_id: Uuid,
        sender_id: Uuid,
        receiver_id: Uuid,
        content: &str,
    ) -> Result<MessageRow> {
        let row = MessageRow {
            id: Uuid::new_v4(),
            match_id,
            sender_id,
            receiver_id,
            content: content.to_string(),
            read: false,
            created_at: Utc::now(),
        };

        self.with_tx(|conn| {
            conn.execute(
                "INSERT INTO messages (id, match_id, sender_id, receiver_id, content, read, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
                rusqlite::params![
                    row.id.to_string(),
                    match_id.to_string(),
                    sender_id.to_string(),
                    receiver_id.to_string(),
                    row.content,
                    row.created_at
                ],
            )?;

            conn.execute(
                "UPDATE matches SET last_message = ?2, last_message_at = ?3 WHERE id = ?1",
                rusqlite::params![match_id.to_string(), row.content, row.created_at],
            )?;

            Ok(())
        })?;

        Ok(row)
    }

    /// Up to `limit` messages of a match, oldest first. With `before`, only
    /// messages strictly older than that instant are considered.
    pub fn get_messages(
        &self,
        match_id: Uuid,
        limit: u32,
        before: Option<DateTime<Utc>>,
    ) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE match_id = ?1 AND (?2 IS NULL OR created_at < ?2)
                 ORDER BY rowid DESC
                 LIMIT ?3"
            );

            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt
                .query_map(
                    rusqlite::params![match_id.to_string(), before, limit],
                    MessageRow::from_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.reverse();
            Ok(rows)
        })
    }

    /// Mark every unread message addressed to `reader_id` in the match as
    /// read. Returns how many flipped. Never clears a read flag.
    pub fn mark_read(&self, match_id: Uuid, reader_id: Uuid) -> Result<usize> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE messages SET read = 1
                 WHERE match_id = ?1 AND receiver_id = ?2 AND read = 0",
                [match_id.to_string(), reader_id.to_string()],
            )?;
            Ok(updated)
        })
    }
}
