//! Raw flight status, as published by FlightAware's live flight pages.
//!
//! The document is scraped rather than served by a documented API, so every
//! field is optional and `null` values are frequent. All fields decode to
//! their zero value when missing or `null`.
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FlightDataWrapper {
    #[serde(default, deserialize_with = "nullable")]
    pub flights: BTreeMap<String, FlightDetail>,
}

impl FlightDataWrapper {
    /// The first flight of the document, in key order, if there is one.
    pub fn into_first_flight(self) -> Option<FlightDetail> {
        self.flights.into_values().next()
    }
}

#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightDetail {
    #[serde(default, deserialize_with = "nullable")]
    pub aircraft: AircraftDetail,
    #[serde(default, deserialize_with = "nullable")]
    pub airline: AirlineDetail,
    #[serde(default, deserialize_with = "nullable")]
    pub altitude: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub destination: AirportDetail,
    #[serde(default, deserialize_with = "nullable")]
    pub flight_status: String,
    #[serde(default, deserialize_with = "nullable")]
    pub gate_arrival_times: Times,
    #[serde(default, deserialize_with = "nullable")]
    pub gate_departure_times: Times,
    #[serde(default, deserialize_with = "nullable")]
    pub landing_times: Times,
    #[serde(default, deserialize_with = "nullable")]
    pub origin: AirportDetail,
    #[serde(default, deserialize_with = "nullable")]
    pub takeoff_times: Times,
    #[serde(default, deserialize_with = "nullable")]
    pub groundspeed: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub heading: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub timestamp: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub track: Vec<TrackPoint>,
}

#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AircraftDetail {
    #[serde(default, deserialize_with = "nullable")]
    pub friendly_type: String,
    #[serde(default, rename = "type", deserialize_with = "nullable")]
    pub type_: String,
}

#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirlineDetail {
    #[serde(default, deserialize_with = "nullable")]
    pub full_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub callsign: String,
    #[serde(default, deserialize_with = "nullable")]
    pub iata: String,
    #[serde(default, deserialize_with = "nullable")]
    pub icao: String,
    #[serde(default, deserialize_with = "nullable")]
    pub short_name: String,
}

#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirportDetail {
    /// IANA timezone of the airport, prefixed with ':' (ex ":Europe/Paris").
    #[serde(default, rename = "TZ", deserialize_with = "nullable")]
    pub tz: String,
    #[serde(default, deserialize_with = "nullable")]
    pub friendly_location: String,
    #[serde(default, deserialize_with = "nullable")]
    pub friendly_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub gate: String,
    #[serde(default, deserialize_with = "nullable")]
    pub terminal: String,
    #[serde(default, deserialize_with = "nullable")]
    pub iata: String,
    #[serde(default, deserialize_with = "nullable")]
    pub icao: String,
    /// Airport position as `[longitude, latitude]`.
    #[serde(default, rename = "coord", deserialize_with = "nullable")]
    pub coordinates: Vec<f64>,
}

/// Times of one flight milestone, as nullable unix seconds.
#[derive(Debug, Default, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Times {
    #[serde(default)]
    pub scheduled: Option<i64>,
    #[serde(default)]
    pub estimated: Option<i64>,
    #[serde(default)]
    pub actual: Option<i64>,
}

#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrackPoint {
    #[serde(default, deserialize_with = "nullable")]
    pub timestamp: i64,
    /// Position as `[longitude, latitude]`.
    #[serde(default, deserialize_with = "nullable")]
    pub coord: [f64; 2],
    #[serde(default, deserialize_with = "nullable")]
    pub alt: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub gs: f64,
    #[serde(default, rename = "type", deserialize_with = "nullable")]
    pub type_: String,
    #[serde(default, deserialize_with = "nullable")]
    pub isolated: bool,
}

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
