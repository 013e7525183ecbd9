use crate::flightaware::FlightDetail;

/// StateSnapshot is the canonical state of a tracked flight at one poll.
///
/// Timestamps are unix seconds and zero when unknown. Strings are empty
/// when unknown.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StateSnapshot {
    pub entity_id: String,
    pub status: String,
    pub origin_gate: String,
    pub origin_terminal: String,
    pub dest_gate: String,
    pub dest_terminal: String,
    pub dep_scheduled: i64,
    pub dep_estimated: i64,
    pub dep_actual: i64,
    pub takeoff_estimated: i64,
    pub takeoff_actual: i64,
    pub landing_estimated: i64,
    pub landing_actual: i64,
    pub arr_scheduled: i64,
    pub arr_estimated: i64,
    pub arr_actual: i64,
    pub altitude: i64,
    pub groundspeed: i64,
    /// Time at which this snapshot was observed.
    pub updated_at: i64,
}

impl StateSnapshot {
    /// Map a raw flight status into its canonical snapshot, as observed at `observed_at`.
    pub fn from_detail(detail: &FlightDetail, entity_id: &str, observed_at: i64) -> Self {
        let FlightDetail {
            altitude,
            destination,
            flight_status,
            gate_arrival_times,
            gate_departure_times,
            landing_times,
            origin,
            takeoff_times,
            groundspeed,
            ..
        } = detail;

        Self {
            entity_id: entity_id.to_string(),
            status: flight_status.clone(),
            origin_gate: origin.gate.clone(),
            origin_terminal: origin.terminal.clone(),
            dest_gate: destination.gate.clone(),
            dest_terminal: destination.terminal.clone(),
            dep_scheduled: gate_departure_times.scheduled.unwrap_or_default(),
            dep_estimated: gate_departure_times.estimated.unwrap_or_default(),
            dep_actual: gate_departure_times.actual.unwrap_or_default(),
            takeoff_estimated: takeoff_times.estimated.unwrap_or_default(),
            takeoff_actual: takeoff_times.actual.unwrap_or_default(),
            landing_estimated: landing_times.estimated.unwrap_or_default(),
            landing_actual: landing_times.actual.unwrap_or_default(),
            arr_scheduled: gate_arrival_times.scheduled.unwrap_or_default(),
            arr_estimated: gate_arrival_times.estimated.unwrap_or_default(),
            arr_actual: gate_arrival_times.actual.unwrap_or_default(),
            altitude: *altitude,
            groundspeed: *groundspeed,
            updated_at: observed_at,
        }
    }

    /// The flight has left its gate but not yet reached the arrival gate.
    pub fn is_airborne(&self) -> bool {
        self.dep_actual != 0 && self.arr_actual == 0
    }

    /// The flight has landed or reached its arrival gate.
    pub fn is_complete(&self) -> bool {
        self.landing_actual != 0 || self.arr_actual != 0
    }
}
