//! Detection of alert-worthy transitions between two snapshots of a flight.
use models::{AlertKind, StateSnapshot};

/// AlertCandidate is an alert which the dispatcher should deliver, unless
/// an alert with the same key was already delivered.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AlertCandidate {
    pub kind: AlertKind,
    pub key: String,
    /// Terminal alerts end the tracking of their flight.
    pub terminal: bool,
}

/// Rule detects one kind of transition from a previous to a current snapshot.
pub struct Rule {
    pub name: &'static str,
    pub terminal: bool,
    pub detect: fn(&StateSnapshot, &StateSnapshot) -> Option<AlertKind>,
}

/// Length of the windows in which an airborne flight receives one update.
pub const IN_FLIGHT_WINDOW_SECONDS: i64 = 2 * 60 * 60;

pub static RULES: &[Rule] = &[
    Rule {
        name: "departure_gate_announced",
        terminal: false,
        detect: |prev, curr| {
            newly_known_str(&prev.origin_gate, &curr.origin_gate)
                .then_some(AlertKind::DepartureGateAnnounced)
        },
    },
    Rule {
        name: "flight_departed_from_gate",
        terminal: false,
        detect: |prev, curr| {
            newly_known(prev.dep_actual, curr.dep_actual).then_some(AlertKind::DepartedFromGate)
        },
    },
    Rule {
        name: "flight_takeoff",
        terminal: false,
        detect: |prev, curr| {
            newly_known(prev.takeoff_actual, curr.takeoff_actual).then_some(AlertKind::Takeoff)
        },
    },
    Rule {
        name: "flight_landed",
        terminal: true,
        detect: |prev, curr| {
            newly_known(prev.landing_actual, curr.landing_actual).then_some(AlertKind::Landed)
        },
    },
    Rule {
        name: "flight_arrived_at_gate",
        terminal: true,
        detect: |prev, curr| {
            newly_known(prev.arr_actual, curr.arr_actual).then_some(AlertKind::ArrivedAtGate)
        },
    },
    Rule {
        name: "in_flight_update",
        terminal: false,
        detect: in_flight_update,
    },
    Rule {
        name: "departure_time_change",
        terminal: false,
        detect: |prev, curr| {
            changed(prev.dep_estimated, curr.dep_estimated).then(|| {
                AlertKind::DepartureTimeChange {
                    previous: prev.dep_estimated,
                    current: curr.dep_estimated,
                }
            })
        },
    },
    Rule {
        name: "gate_change",
        terminal: false,
        detect: |prev, curr| {
            (!prev.origin_gate.is_empty()
                && !curr.origin_gate.is_empty()
                && prev.origin_gate != curr.origin_gate)
                .then(|| AlertKind::GateChange {
                    previous: prev.origin_gate.clone(),
                    current: curr.origin_gate.clone(),
                })
        },
    },
    Rule {
        name: "arrival_gate_change",
        terminal: false,
        detect: |prev, curr| {
            (!curr.dest_gate.is_empty() && prev.dest_gate != curr.dest_gate).then(|| {
                AlertKind::ArrivalGateChange {
                    previous: prev.dest_gate.clone(),
                    current: curr.dest_gate.clone(),
                }
            })
        },
    },
    Rule {
        name: "arrival_time_change",
        terminal: false,
        detect: |prev, curr| {
            changed(prev.arr_estimated, curr.arr_estimated).then(|| {
                AlertKind::ArrivalTimeChange {
                    previous: prev.arr_estimated,
                    current: curr.arr_estimated,
                }
            })
        },
    },
];

/// Evaluate RULES in order over the transition from `previous` to `current`.
/// Rules following the first terminal candidate are not evaluated.
/// Without a `previous` snapshot there is nothing to compare, and no candidates.
pub fn evaluate(previous: Option<&StateSnapshot>, current: &StateSnapshot) -> Vec<AlertCandidate> {
    let Some(previous) = previous else {
        return Vec::new();
    };
    let mut out = Vec::new();

    for rule in RULES {
        let Some(kind) = (rule.detect)(previous, current) else {
            continue;
        };
        out.push(AlertCandidate {
            key: kind.dedup_key(),
            kind,
            terminal: rule.terminal,
        });

        if rule.terminal {
            break;
        }
    }
    out
}

fn newly_known(prev: i64, curr: i64) -> bool {
    prev == 0 && curr != 0
}

fn newly_known_str(prev: &str, curr: &str) -> bool {
    prev.is_empty() && !curr.is_empty()
}

// An estimate which becomes unknown is not a change.
fn changed(prev: i64, curr: i64) -> bool {
    curr != 0 && prev != curr
}

fn in_flight_update(prev: &StateSnapshot, curr: &StateSnapshot) -> Option<AlertKind> {
    if !curr.is_airborne() || curr.updated_at <= prev.updated_at {
        return None;
    }
    let window = (curr.updated_at - curr.dep_actual).max(0) / IN_FLIGHT_WINDOW_SECONDS;

    (window >= 1).then_some(AlertKind::InFlightUpdate { window })
}
