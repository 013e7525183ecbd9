use models::{EntityFilter, TrackedEntity};
use rusqlite::{params, Connection, OptionalExtension, Row};

const COLUMNS: &str = "id, flight_number, slack_channel, slack_user_id, departure";

fn from_row(row: &Row<'_>) -> rusqlite::Result<TrackedEntity> {
    Ok(TrackedEntity {
        id: row.get(0)?,
        flight_number: row.get(1)?,
        channel: row.get(2)?,
        owner: row.get(3)?,
        departure: row.get(4)?,
    })
}

pub fn insert(conn: &Connection, entity: &TrackedEntity) -> rusqlite::Result<()> {
    let TrackedEntity {
        id,
        flight_number,
        channel,
        owner,
        departure,
    } = entity;

    conn.execute(
        &format!("INSERT INTO flights ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
        params![id, flight_number, channel, owner, departure],
    )?;
    Ok(())
}

pub fn get(conn: &Connection, id: &str) -> rusqlite::Result<Option<TrackedEntity>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM flights WHERE id = ?1"),
        [id],
        from_row,
    )
    .optional()
}

/// List tracked entities matched by `filter`, ordered on departure.
pub fn list(conn: &Connection, filter: &EntityFilter) -> rusqlite::Result<Vec<TrackedEntity>> {
    let EntityFilter {
        owner,
        flight_number,
        channel,
        departs_before,
        departs_after,
    } = filter;

    let mut stmt = conn.prepare_cached(&format!(
        r#"SELECT {COLUMNS} FROM flights
        WHERE (?1 IS NULL OR slack_user_id = ?1)
          AND (?2 IS NULL OR flight_number = ?2)
          AND (?3 IS NULL OR slack_channel = ?3)
          AND (?4 IS NULL OR departure < ?4)
          AND (?5 IS NULL OR departure > ?5)
        ORDER BY departure, id"#
    ))?;

    let rows = stmt.query_map(
        params![owner, flight_number, channel, departs_before, departs_after],
        from_row,
    )?;
    rows.collect()
}

/// Delete the entity `id` with its latest snapshot, returning whether it existed.
/// Records of sent alerts are kept.
pub fn delete(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    let txn = conn.unchecked_transaction()?;
    txn.execute("DELETE FROM flight_state WHERE flight_id = ?1", [id])?;
    let deleted = txn.execute("DELETE FROM flights WHERE id = ?1", [id])?;
    txn.commit()?;

    Ok(deleted != 0)
}
