//! Shared domain model of the flight tracker.
//!
//! - `TrackedEntity` rows are created by the command layer and name a flight
//!   number, the Slack channel which receives its alerts, and the user who
//!   asked for it.
//! - `StateSnapshot` is the canonical, flattened view of one poll of a flight's
//!   raw status, as published by the data source (see `flightaware`).
//! - `AlertKind` enumerates every notification the tracker may send, and
//!   knows the dedup key under which a delivered alert is recorded.
mod alerts;
mod entities;
pub mod flightaware;
mod snapshots;

pub use alerts::{AlertKind, AlertRecord};
pub use entities::{EntityFilter, TrackedEntity};
pub use snapshots::StateSnapshot;
