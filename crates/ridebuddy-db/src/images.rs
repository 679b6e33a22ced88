//! Profile images. Every mutation keeps the "exactly one main image when any
//! exist" invariant inside a single transaction.

use anyhow::Result;
use chrono::Utc;
use rusqlite::Connection;
use uuid::Uuid;

use crate::models::ImageRow;
use crate::{Database, OptionalExt};

impl Database {
    pub fn list_images(&self, user_id: Uuid) -> Result<Vec<ImageRow>> {
        self.with_conn(|conn| query_images(conn, user_id))
    }

    /// Batch-fetch images for a set of users.
    pub fn images_for_users(&self, user_ids: &[Uuid]) -> Result<Vec<ImageRow>> {
        if user_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=user_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT id, user_id, url, is_main, created_at FROM profile_images
                 WHERE user_id IN ({}) ORDER BY rowid",
                placeholders.join(", ")
            );

            let ids: Vec<String> = user_ids.iter().map(|id| id.to_string()).collect();
            let params: Vec<&dyn rusqlite::types::ToSql> =
                ids.iter().map(|id| id as &dyn rusqlite::types::ToSql).collect();

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params.as_slice(), ImageRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Append an image. The first image a user adds becomes the main one.
    pub fn add_image(&self, user_id: Uuid, url: &str) -> Result<ImageRow> {
        self.with_tx(|conn| {
            let existing: i64 = conn.query_row(
                "SELECT COUNT(*) FROM profile_images WHERE user_id = ?1",
                [user_id.to_string()],
                |row| row.get(0),
            )?;

            let row = ImageRow {
                id: Uuid::new_v4(),
                user_id,
                url: url.to_string(),
                is_main: existing == 0,
                created_at: Utc::now(),
            };

            conn.execute(
                "INSERT INTO profile_images (id, user_id, url, is_main, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    row.id.to_string(),
                    user_id.to_string(),
                    row.url,
                    row.is_main,
                    row.created_at
                ],
            )?;

            Ok(row)
        })
    }

    /// Remove one of the user's images. If it was the main image, the oldest
    /// remaining one takes over. Returns false if the image was not found.
    pub fn delete_image(&self, user_id: Uuid, image_id: Uuid) -> Result<bool> {
        self.with_tx(|conn| {
            let was_main: Option<bool> = conn
                .query_row(
                    "SELECT is_main FROM profile_images WHERE id = ?1 AND user_id = ?2",
                    [image_id.to_string(), user_id.to_string()],
                    |row| row.get(0),
                )
                .optional()?;

            let Some(was_main) = was_main else {
                return Ok(false);
            };

            conn.execute("DELETE FROM profile_images WHERE id = ?1", [image_id.to_string()])?;

            if was_main {
                conn.execute(
                    "UPDATE profile_images SET is_main = 1
                     WHERE rowid = (
                         SELECT rowid FROM profile_images WHERE user_id = ?1 ORDER BY rowid LIMIT 1
                     )",
                    [user_id.to_string()],
                )?;
            }

            Ok(true)
        })
    }

    /// Flag `image_id` as main and clear every other image of the user.
    /// Returns the updated list, or `None` if the image is not the user's.
    pub fn set_main_image(&self, user_id: Uuid, image_id: Uuid) -> Result<Option<Vec<ImageRow>>> {
        self.with_tx(|conn| {
            let owned: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM profile_images WHERE id = ?1 AND user_id = ?2",
                    [image_id.to_string(), user_id.to_string()],
                    |row| row.get(0),
                )
                .optional()?;

            if owned.is_none() {
                return Ok(None);
            }

            conn.execute(
                "UPDATE profile_images SET is_main = (id = ?2) WHERE user_id = ?1",
                [user_id.to_string(), image_id.to_string()],
            )?;

            query_images(conn, user_id).map(Some)
        })
    }
}

fn query_images(conn: &Connection, user_id: Uuid) -> Result<Vec<ImageRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, url, is_main, created_at FROM profile_images
         WHERE user_id = ?1 ORDER BY rowid",
    )?;

    let rows = stmt
        .query_map([user_id.to_string()], ImageRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}
