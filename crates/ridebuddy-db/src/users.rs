use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use ridebuddy_types::api::UpdateProfileRequest;

use crate::models::{USER_COLUMNS, UserRow};
use crate::{Database, OptionalExt};

impl Database {
    /// Insert a new account. Returns false when the email is already taken.
    pub fn create_user(&self, id: Uuid, email: &str, password_hash: &str, name: &str) -> Result<bool> {
        let now = Utc::now();
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, email, password, name, last_active, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                 ON CONFLICT (email) DO NOTHING",
                rusqlite::params![id.to_string(), email, password_hash, name, now],
            )?;
            Ok(inserted == 1)
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
            conn.query_row(&sql, [email], UserRow::from_row).optional()
        })
    }

    pub fn get_user(&self, id: Uuid) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, id))
    }

    pub fn user_exists(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row("SELECT 1 FROM users WHERE id = ?1", [id.to_string()], |row| row.get(0))
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Apply the provided fields and return the updated row.
    /// Callers validate ranges; the store only enforces its CHECKs.
    pub fn update_profile(&self, id: Uuid, update: &UpdateProfileRequest) -> Result<Option<UserRow>> {
        self.with_tx(|conn| {
            let Some(mut user) = query_user(conn, id)? else {
                return Ok(None);
            };

            if let Some(name) = &update.name {
                user.name = name.trim().to_string();
            }
            if let Some(bio) = &update.bio {
                user.bio = bio.clone();
            }
            if let Some(age) = update.age {
                user.age = Some(age);
            }
            if let Some(gender) = update.gender {
                user.gender = Some(gender);
            }
            if let Some(looking_for) = update.looking_for {
                user.looking_for = Some(looking_for);
            }
            if let Some(interests) = &update.interests {
                user.interests = interests.clone();
            }
            if let Some(settings) = &update.settings {
                if let Some(v) = settings.max_distance {
                    user.max_distance = v;
                }
                if let Some(v) = settings.age_min {
                    user.age_min = v;
                }
                if let Some(v) = settings.age_max {
                    user.age_max = v;
                }
                if let Some(v) = settings.notify_matches {
                    user.notify_matches = v;
                }
                if let Some(v) = settings.notify_messages {
                    user.notify_messages = v;
                }
            }

            conn.execute(
                "UPDATE users SET name = ?2, bio = ?3, age = ?4, gender = ?5, looking_for = ?6,
                    interests = ?7, max_distance = ?8, age_min = ?9, age_max = ?10,
                    notify_matches = ?11, notify_messages = ?12
                 WHERE id = ?1",
                rusqlite::params![
                    id.to_string(),
                    user.name,
                    user.bio,
                    user.age,
                    user.gender.map(|g| g.as_str()),
                    user.looking_for.map(|l| l.as_str()),
                    serde_json::to_string(&user.interests)?,
                    user.max_distance,
                    user.age_min,
                    user.age_max,
                    user.notify_matches,
                    user.notify_messages,
                ],
            )?;

            Ok(Some(user))
        })
    }

    /// Persist last-known presence.
    pub fn set_presence(&self, id: Uuid, online: bool, at: DateTime<Utc>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET is_online = ?2, last_active = ?3 WHERE id = ?1",
                rusqlite::params![id.to_string(), online, at],
            )?;
            Ok(())
        })
    }

    /// Profiles `user` has not swiped on yet and that fit their age range and
    /// gender preference. A candidate without an age passes the age filter;
    /// one without a gender never passes a gender preference. A caller with
    /// no preference sees every gender.
    pub fn candidate_profiles(&self, user: &UserRow, limit: u32) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let genders: Vec<&'static str> = user
                .looking_for
                .map(|l| l.accepted_genders().iter().map(|g| g.as_str()).collect())
                .unwrap_or_default();

            let gender_clause = if genders.is_empty() {
                String::new()
            } else {
                let placeholders: Vec<String> =
                    (0..genders.len()).map(|i| format!("?{}", i + 5)).collect();
                format!("AND u.gender IN ({})", placeholders.join(", "))
            };

            let sql = format!(
                "SELECT {cols} FROM users u
                 WHERE u.id <> ?1
                   AND NOT EXISTS (
                       SELECT 1 FROM swipes s WHERE s.actor_id = ?1 AND s.target_id = u.id
                   )
                   AND (u.age IS NULL OR u.age BETWEEN ?2 AND ?3)
                   {gender_clause}
                 ORDER BY u.last_active DESC
                 LIMIT ?4",
                cols = prefixed_user_columns("u"),
            );

            let id = user.id.to_string();
            let mut params: Vec<&dyn rusqlite::types::ToSql> =
                vec![&id, &user.age_min, &user.age_max, &limit];
            for g in &genders {
                params.push(g);
            }

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params.as_slice(), UserRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

pub(crate) fn query_user(conn: &Connection, id: Uuid) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    conn.query_row(&sql, [id.to_string()], UserRow::from_row).optional()
}

fn prefixed_user_columns(alias: &str) -> String {
    USER_COLUMNS
        .split(',')
        .map(|c| format!("{alias}.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}
