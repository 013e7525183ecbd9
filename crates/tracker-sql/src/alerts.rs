use rusqlite::{Connection, OptionalExtension};

/// Returns true if the alert `alert_type` was already delivered for `entity_id`.
pub fn exists(conn: &Connection, entity_id: &str, alert_type: &str) -> rusqlite::Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM alerts_sent WHERE flight_id = ?1 AND alert_type = ?2",
            [entity_id, alert_type],
            |row| row.get(0),
        )
        .optional()?;

    Ok(found.is_some())
}

/// Record delivery of `alert_type` for `entity_id`.
/// Returns false if it had already been recorded.
pub fn insert(conn: &Connection, entity_id: &str, alert_type: &str) -> rusqlite::Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO alerts_sent (flight_id, alert_type) VALUES (?1, ?2)",
        [entity_id, alert_type],
    )?;
    Ok(inserted != 0)
}
