//! Database row types. Distinct from the wire models in `ridebuddy-types`
//! so the store can change shape without touching the API.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Type;
use uuid::Uuid;

use ridebuddy_types::models::{Gender, LookingFor};

pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub password: String,
    pub name: String,
    pub bio: String,
    pub age: Option<u8>,
    pub gender: Option<Gender>,
    pub looking_for: Option<LookingFor>,
    pub interests: Vec<String>,
    pub max_distance: u32,
    pub age_min: u8,
    pub age_max: u8,
    pub notify_matches: bool,
    pub notify_messages: bool,
    pub is_online: bool,
    pub last_active: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

pub(crate) const USER_COLUMNS: &str = "id, email, password, name, bio, age, gender, looking_for, \
     interests, max_distance, age_min, age_max, notify_matches, notify_messages, \
     is_online, last_active, created_at";

impl UserRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let interests: String = row.get(8)?;
        let interests = serde_json::from_str(&interests)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(8, Type::Text, Box::new(e)))?;

        Ok(Self {
            id: parse_col(row, 0)?,
            email: row.get(1)?,
            password: row.get(2)?,
            name: row.get(3)?,
            bio: row.get(4)?,
            age: row.get(5)?,
            gender: parse_opt_col(row, 6)?,
            looking_for: parse_opt_col(row, 7)?,
            interests,
            max_distance: row.get(9)?,
            age_min: row.get(10)?,
            age_max: row.get(11)?,
            notify_matches: row.get(12)?,
            notify_messages: row.get(13)?,
            is_online: row.get(14)?,
            last_active: row.get(15)?,
            created_at: row.get(16)?,
        })
    }
}

pub struct ImageRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub url: String,
    pub is_main: bool,
    pub created_at: DateTime<Utc>,
}

impl ImageRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_col(row, 0)?,
            user_id: parse_col(row, 1)?,
            url: row.get(2)?,
            is_main: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

/// Result of recording a swipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeOutcome {
    /// The actor already swiped on this target; nothing changed.
    Duplicate,
    /// Stored, no reciprocal right swipe (or a left swipe).
    NoMatch,
    /// Both right swipes exist. `created` is false when another request
    /// inserted the match first.
    Matched { match_id: Uuid, created: bool },
}

pub struct MatchRow {
    pub id: Uuid,
    pub user_a: Uuid,
    pub user_b: Uuid,
    pub created_at: DateTime<Utc>,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
}

impl MatchRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_col(row, 0)?,
            user_a: parse_col(row, 1)?,
            user_b: parse_col(row, 2)?,
            created_at: row.get(3)?,
            last_message: row.get(4)?,
            last_message_at: row.get(5)?,
        })
    }

    pub fn has_participant(&self, user_id: Uuid) -> bool {
        self.user_a == user_id || self.user_b == user_id
    }

    /// The other participant, or `None` if `user_id` is not in this match.
    pub fn other(&self, user_id: Uuid) -> Option<Uuid> {
        if self.user_a == user_id {
            Some(self.user_b)
        } else if self.user_b == user_id {
            Some(self.user_a)
        } else {
            None
        }
    }
}

/// A match joined with the other participant's card, as listed for one user.
pub struct MatchListRow {
    pub matched: MatchRow,
    pub other_id: Uuid,
    pub other_name: String,
    pub other_main_image: Option<String>,
    pub other_is_online: bool,
    pub other_last_active: DateTime<Utc>,
}

pub struct MessageRow {
    pub id: Uuid,
    pub match_id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl MessageRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_col(row, 0)?,
            match_id: parse_col(row, 1)?,
            sender_id: parse_col(row, 2)?,
            receiver_id: parse_col(row, 3)?,
            content: row.get(4)?,
            read: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

pub struct EventRow {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub title: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub participants: Vec<Uuid>,
}

/// Result of joining an event.
pub enum JoinEventOutcome {
    NotFound,
    AlreadyJoined,
    Joined(EventRow),
}

/// Store an unordered pair in its canonical order.
pub fn normalize_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b { (a, b) } else { (b, a) }
}

pub(crate) fn parse_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(idx)?;
    text.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn parse_opt_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: Option<String> = row.get(idx)?;
    text.map(|t| {
        t.parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}
