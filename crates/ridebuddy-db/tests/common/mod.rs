use ridebuddy_db::Database;
use uuid::Uuid;

pub fn user(db: &Database, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    db.create_user(id, &format!("{}@example.com", name.to_lowercase()), "hash", name)
        .unwrap();
    id
}

pub fn match_count(db: &Database) -> i64 {
    db.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM matches", [], |row| row.get(0))?))
        .unwrap()
}
