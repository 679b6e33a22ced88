use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              TEXT PRIMARY KEY,
            email           TEXT NOT NULL UNIQUE,
            password        TEXT NOT NULL,
            name            TEXT NOT NULL,
            bio             TEXT NOT NULL DEFAULT '',
            age             INTEGER CHECK (age IS NULL OR age BETWEEN 18 AND 120),
            gender          TEXT,
            looking_for     TEXT,
            interests       TEXT NOT NULL DEFAULT '[]',
            max_distance    INTEGER NOT NULL DEFAULT 50,
            age_min         INTEGER NOT NULL DEFAULT 18,
            age_max         INTEGER NOT NULL DEFAULT 100,
            notify_matches  INTEGER NOT NULL DEFAULT 1,
            notify_messages INTEGER NOT NULL DEFAULT 1,
            is_online       INTEGER NOT NULL DEFAULT 0,
            last_active     TEXT NOT NULL,
            created_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS profile_images (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            url         TEXT NOT NULL,
            is_main     INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_profile_images_user
            ON profile_images(user_id);

        CREATE TABLE IF NOT EXISTS swipes (
            actor_id    TEXT NOT NULL REFERENCES users(id),
            target_id   TEXT NOT NULL REFERENCES users(id),
            direction   TEXT NOT NULL CHECK (direction IN ('left', 'right')),
            created_at  TEXT NOT NULL,
            PRIMARY KEY (actor_id, target_id),
            CHECK (actor_id <> target_id)
        );

        -- Pairs are stored normalized so the unordered pair is unique.
        CREATE TABLE IF NOT EXISTS matches (
            id              TEXT PRIMARY KEY,
            user_a          TEXT NOT NULL REFERENCES users(id),
            user_b          TEXT NOT NULL REFERENCES users(id),
            created_at      TEXT NOT NULL,
            last_message    TEXT,
            last_message_at TEXT,
            CHECK (user_a < user_b),
            UNIQUE (user_a, user_b)
        );

        CREATE INDEX IF NOT EXISTS idx_matches_user_b
            ON matches(user_b);

        CREATE TABLE IF NOT EXISTS messages (
            id              TEXT PRIMARY KEY,
            match_id        TEXT NOT NULL REFERENCES matches(id),
            sender_id       TEXT NOT NULL REFERENCES users(id),
            receiver_id     TEXT NOT NULL REFERENCES users(id),
            content         TEXT NOT NULL,
            read            INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_match
            ON messages(match_id, created_at);

        CREATE INDEX IF NOT EXISTS idx_messages_unread
            ON messages(match_id, receiver_id, read);

        CREATE TRIGGER IF NOT EXISTS messages_read_is_monotonic
            BEFORE UPDATE OF read ON messages
            WHEN OLD.read = 1 AND NEW.read = 0
        BEGIN
            SELECT RAISE(ABORT, 'read flag cannot be cleared');
        END;

        CREATE TABLE IF NOT EXISTS events (
            id          TEXT PRIMARY KEY,
            creator_id  TEXT NOT NULL REFERENCES users(id),
            title       TEXT NOT NULL,
            description TEXT NOT NULL,
            date        TEXT NOT NULL,
            latitude    REAL,
            longitude   REAL,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS event_participants (
            event_id    TEXT NOT NULL REFERENCES events(id) ON DELETE CASCADE,
            user_id     TEXT NOT NULL REFERENCES users(id),
            joined_at   TEXT NOT NULL,
            PRIMARY KEY (event_id, user_id)
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
