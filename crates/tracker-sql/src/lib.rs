use anyhow::Context;
use rusqlite::Connection;
use std::time::Duration;

pub mod alerts;
pub mod entities;
pub mod snapshots;

/// Open the database at `uri` and bootstrap its schema.
/// `:memory:` opens a private, in-memory database.
pub fn open(uri: &str) -> anyhow::Result<Connection> {
    let conn = Connection::open(uri).with_context(|| format!("failed to open database {uri}"))?;

    // rusqlite is a bit finicky about this pragma and we must use query_row.
    let journal_mode: String = conn
        .query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))
        .context("failed to set journal_mode pragma")?;
    conn.busy_timeout(BUSY_TIMEOUT)
        .context("failed to set busy timeout")?;

    bootstrap(&conn).context("failed to bootstrap the database")?;
    tracing::debug!(%uri, %journal_mode, "opened tracker database");

    Ok(conn)
}

pub fn bootstrap(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(BOOTSTRAP)
}

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const BOOTSTRAP: &str = r#"
    -- Flights which users asked to be notified about.
    CREATE TABLE IF NOT EXISTS flights (
        id            TEXT PRIMARY KEY NOT NULL,
        flight_number TEXT NOT NULL,
        slack_channel TEXT NOT NULL,
        slack_user_id TEXT NOT NULL,
        departure     INTEGER NOT NULL
    );

    -- Delivered alerts, keyed on their dedup key. Rows are never updated.
    CREATE TABLE IF NOT EXISTS alerts_sent (
        flight_id  TEXT NOT NULL,
        alert_type TEXT NOT NULL,
        sent_at    INTEGER NOT NULL DEFAULT (CAST(strftime('%s', 'now') AS INTEGER)),
        PRIMARY KEY (flight_id, alert_type)
    );

    -- Latest observed state of each flight.
    CREATE TABLE IF NOT EXISTS flight_state (
        flight_id         TEXT PRIMARY KEY NOT NULL,
        status            TEXT NOT NULL DEFAULT '',
        origin_gate       TEXT NOT NULL DEFAULT '',
        origin_terminal   TEXT NOT NULL DEFAULT '',
        dest_gate         TEXT NOT NULL DEFAULT '',
        dest_terminal     TEXT NOT NULL DEFAULT '',
        dep_scheduled     INTEGER NOT NULL DEFAULT 0,
        dep_estimated     INTEGER NOT NULL DEFAULT 0,
        dep_actual        INTEGER NOT NULL DEFAULT 0,
        takeoff_estimated INTEGER NOT NULL DEFAULT 0,
        takeoff_actual    INTEGER NOT NULL DEFAULT 0,
        landing_estimated INTEGER NOT NULL DEFAULT 0,
        landing_actual    INTEGER NOT NULL DEFAULT 0,
        arr_scheduled     INTEGER NOT NULL DEFAULT 0,
        arr_estimated     INTEGER NOT NULL DEFAULT 0,
        arr_actual        INTEGER NOT NULL DEFAULT 0,
        altitude          INTEGER NOT NULL DEFAULT 0,
        groundspeed       INTEGER NOT NULL DEFAULT 0,
        updated_at        INTEGER NOT NULL DEFAULT 0
    );

    CREATE INDEX IF NOT EXISTS flights_departure ON flights (departure);
    "#;
