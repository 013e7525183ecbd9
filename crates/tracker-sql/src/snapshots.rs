use models::StateSnapshot;
use rusqlite::{named_params, Connection, OptionalExtension};

pub fn fetch(conn: &Connection, entity_id: &str) -> rusqlite::Result<Option<StateSnapshot>> {
    conn.query_row(
        r#"SELECT
            flight_id,
            status,
            origin_gate,
            origin_terminal,
            dest_gate,
            dest_terminal,
            dep_scheduled,
            dep_estimated,
            dep_actual,
            takeoff_estimated,
            takeoff_actual,
            landing_estimated,
            landing_actual,
            arr_scheduled,
            arr_estimated,
            arr_actual,
            altitude,
            groundspeed,
            updated_at
        FROM flight_state WHERE flight_id = ?1"#,
        [entity_id],
        |row| {
            Ok(StateSnapshot {
                entity_id: row.get(0)?,
                status: row.get(1)?,
                origin_gate: row.get(2)?,
                origin_terminal: row.get(3)?,
                dest_gate: row.get(4)?,
                dest_terminal: row.get(5)?,
                dep_scheduled: row.get(6)?,
                dep_estimated: row.get(7)?,
                dep_actual: row.get(8)?,
                takeoff_estimated: row.get(9)?,
                takeoff_actual: row.get(10)?,
                landing_estimated: row.get(11)?,
                landing_actual: row.get(12)?,
                arr_scheduled: row.get(13)?,
                arr_estimated: row.get(14)?,
                arr_actual: row.get(15)?,
                altitude: row.get(16)?,
                groundspeed: row.get(17)?,
                updated_at: row.get(18)?,
            })
        },
    )
    .optional()
}

/// Insert or replace the stored snapshot of `snapshot.entity_id`.
pub fn upsert(conn: &Connection, snapshot: &StateSnapshot) -> rusqlite::Result<()> {
    let StateSnapshot {
        entity_id,
        status,
        origin_gate,
        origin_terminal,
        dest_gate,
        dest_terminal,
        dep_scheduled,
        dep_estimated,
        dep_actual,
        takeoff_estimated,
        takeoff_actual,
        landing_estimated,
        landing_actual,
        arr_scheduled,
        arr_estimated,
        arr_actual,
        altitude,
        groundspeed,
        updated_at,
    } = snapshot;

    conn.execute(
        r#"INSERT INTO flight_state (
            flight_id, status, origin_gate, origin_terminal, dest_gate, dest_terminal,
            dep_scheduled, dep_estimated, dep_actual, takeoff_estimated, takeoff_actual,
            landing_estimated, landing_actual, arr_scheduled, arr_estimated, arr_actual,
            altitude, groundspeed, updated_at
        ) VALUES (
            :flight_id, :status, :origin_gate, :origin_terminal, :dest_gate, :dest_terminal,
            :dep_scheduled, :dep_estimated, :dep_actual, :takeoff_estimated, :takeoff_actual,
            :landing_estimated, :landing_actual, :arr_scheduled, :arr_estimated, :arr_actual,
            :altitude, :groundspeed, :updated_at
        )
        ON CONFLICT (flight_id) DO UPDATE SET
            status = excluded.status,
            origin_gate = excluded.origin_gate,
            origin_terminal = excluded.origin_terminal,
            dest_gate = excluded.dest_gate,
            dest_terminal = excluded.dest_terminal,
            dep_scheduled = excluded.dep_scheduled,
            dep_estimated = excluded.dep_estimated,
            dep_actual = excluded.dep_actual,
            takeoff_estimated = excluded.takeoff_estimated,
            takeoff_actual = excluded.takeoff_actual,
            landing_estimated = excluded.landing_estimated,
            landing_actual = excluded.landing_actual,
            arr_scheduled = excluded.arr_scheduled,
            arr_estimated = excluded.arr_estimated,
            arr_actual = excluded.arr_actual,
            altitude = excluded.altitude,
            groundspeed = excluded.groundspeed,
            updated_at = excluded.updated_at
        "#,
        named_params! {
            ":flight_id": entity_id,
            ":status": status,
            ":origin_gate": origin_gate,
            ":origin_terminal": origin_terminal,
            ":dest_gate": dest_gate,
            ":dest_terminal": dest_terminal,
            ":dep_scheduled": dep_scheduled,
            ":dep_estimated": dep_estimated,
            ":dep_actual": dep_actual,
            ":takeoff_estimated": takeoff_estimated,
            ":takeoff_actual": takeoff_actual,
            ":landing_estimated": landing_estimated,
            ":landing_actual": landing_actual,
            ":arr_scheduled": arr_scheduled,
            ":arr_estimated": arr_estimated,
            ":arr_actual": arr_actual,
            ":altitude": altitude,
            ":groundspeed": groundspeed,
            ":updated_at": updated_at,
        },
    )?;
    Ok(())
}
