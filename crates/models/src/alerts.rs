/// AlertKind is a notification about one transition of a tracked flight.
///
/// Milestones are one-shot and always map to the same dedup key. Change
/// alerts embed the new value in their key, so a flight whose gate changes
/// twice produces two distinct alerts.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertKind {
    DepartureGateAnnounced,
    DepartedFromGate,
    Takeoff,
    Landed,
    ArrivedAtGate,
    /// Periodic update while airborne, in the `window`'th two-hour window since departure.
    InFlightUpdate { window: i64 },
    DepartureTimeChange { previous: i64, current: i64 },
    GateChange { previous: String, current: String },
    ArrivalGateChange { previous: String, current: String },
    ArrivalTimeChange { previous: i64, current: i64 },
}

impl AlertKind {
    /// Stable name of this kind of alert, independent of its arguments.
    pub fn name(&self) -> &'static str {
        match self {
            Self::DepartureGateAnnounced => "departure_gate_announced",
            Self::DepartedFromGate => "flight_departed_from_gate",
            Self::Takeoff => "flight_takeoff",
            Self::Landed => "flight_landed",
            Self::ArrivedAtGate => "flight_arrived_at_gate",
            Self::InFlightUpdate { .. } => "in_flight_update",
            Self::DepartureTimeChange { .. } => "departure_time_change",
            Self::GateChange { .. } => "gate_change",
            Self::ArrivalGateChange { .. } => "arrival_gate_change",
            Self::ArrivalTimeChange { .. } => "arrival_time_change",
        }
    }

    /// Key under which a delivery of this alert is recorded.
    pub fn dedup_key(&self) -> String {
        match self {
            Self::InFlightUpdate { window } => format!("{}_{window}", self.name()),
            Self::DepartureTimeChange { current, .. } | Self::ArrivalTimeChange { current, .. } => {
                format!("{}_{current}", self.name())
            }
            Self::GateChange { current, .. } | Self::ArrivalGateChange { current, .. } => {
                format!("{}_{current}", self.name())
            }
            _ => self.name().to_string(),
        }
    }
}

/// AlertRecord marks that an alert with `alert_type` dedup key was delivered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct AlertRecord {
    pub entity_id: String,
    pub alert_type: String,
}
