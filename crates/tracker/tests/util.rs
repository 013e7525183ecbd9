#![allow(dead_code)]

use chrono::{DateTime, Utc};
use models::flightaware::{AirportDetail, FlightDetail, Times};
use models::{EntityFilter, StateSnapshot, TrackedEntity};
use notifications::Message;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use tracker::maps::{Image, MapRenderer};
use tracker::slack::Notifier;
use tracker::sources::{self, DataSource};
use tracker::store::{SqliteStore, Store};
use tracker::{ClockFn, Dispatcher, Services};

pub const DEPARTURE: i64 = 1_700_000_000;

/// ScriptedSource returns its scripted results in order, and then no data.
#[derive(Default)]
pub struct ScriptedSource {
    results: Mutex<VecDeque<Result<Option<FlightDetail>, ()>>>,
    pub fetches: AtomicI64,
}

impl ScriptedSource {
    pub fn push(&self, detail: FlightDetail) {
        self.results.lock().unwrap().push_back(Ok(Some(detail)));
    }

    pub fn push_error(&self) {
        self.results.lock().unwrap().push_back(Err(()));
    }
}

#[async_trait::async_trait]
impl DataSource for ScriptedSource {
    async fn fetch(&self, _flight_number: &str) -> Result<Option<FlightDetail>, sources::Error> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        match self.results.lock().unwrap().pop_front() {
            Some(Ok(detail)) => Ok(detail),
            Some(Err(())) => Err(sources::Error::Status(
                reqwest::StatusCode::SERVICE_UNAVAILABLE,
            )),
            None => Ok(None),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Posted {
    pub channel: String,
    pub message: Message,
    pub filename: Option<String>,
}

/// RecordingNotifier records every delivery, or fails them all while `failing`.
#[derive(Default)]
pub struct RecordingNotifier {
    pub posted: Mutex<Vec<Posted>>,
    pub failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn posted(&self) -> Vec<Posted> {
        self.posted.lock().unwrap().clone()
    }

    fn record(&self, channel: &str, message: &Message, image: Option<&Image>) -> anyhow::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("slack is unavailable");
        }
        self.posted.lock().unwrap().push(Posted {
            channel: channel.to_string(),
            message: message.clone(),
            filename: image.map(|i| i.filename.clone()),
        });
        Ok(())
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn post_message(&self, channel: &str, message: &Message) -> anyhow::Result<()> {
        self.record(channel, message, None)
    }

    async fn upload_file(
        &self,
        channel: &str,
        image: &Image,
        message: &Message,
    ) -> anyhow::Result<()> {
        self.record(channel, message, Some(image))
    }
}

pub struct StaticMap;

#[async_trait::async_trait]
impl MapRenderer for StaticMap {
    async fn render(&self, _detail: &FlightDetail) -> anyhow::Result<Image> {
        Ok(Image {
            filename: "flight_map.png".to_string(),
            content_type: "image/png".to_string(),
            bytes: b"\x89PNG".to_vec(),
        })
    }
}

/// FaultyStore delegates to a SqliteStore, but fails reads of snapshots
/// while `fail_snapshot_reads`.
pub struct FaultyStore {
    inner: SqliteStore,
    pub fail_snapshot_reads: AtomicBool,
}

#[async_trait::async_trait]
impl Store for FaultyStore {
    async fn list_entities(&self, filter: EntityFilter) -> anyhow::Result<Vec<TrackedEntity>> {
        self.inner.list_entities(filter).await
    }

    async fn insert_entity(&self, entity: TrackedEntity) -> anyhow::Result<()> {
        self.inner.insert_entity(entity).await
    }

    async fn get_entity(&self, id: &str) -> anyhow::Result<Option<TrackedEntity>> {
        self.inner.get_entity(id).await
    }

    async fn delete_entity(&self, id: &str) -> anyhow::Result<bool> {
        self.inner.delete_entity(id).await
    }

    async fn fetch_snapshot(&self, entity_id: &str) -> anyhow::Result<Option<StateSnapshot>> {
        if self.fail_snapshot_reads.load(Ordering::SeqCst) {
            anyhow::bail!("database is locked");
        }
        self.inner.fetch_snapshot(entity_id).await
    }

    async fn store_snapshot(&self, snapshot: StateSnapshot) -> anyhow::Result<()> {
        self.inner.store_snapshot(snapshot).await
    }

    async fn alert_sent(&self, entity_id: &str, alert_type: &str) -> anyhow::Result<bool> {
        self.inner.alert_sent(entity_id, alert_type).await
    }

    async fn record_alert(&self, entity_id: &str, alert_type: &str) -> anyhow::Result<bool> {
        self.inner.record_alert(entity_id, alert_type).await
    }
}

/// Clock is a settable clock, in unix seconds.
#[derive(Clone)]
pub struct Clock(Arc<AtomicI64>);

impl Clock {
    pub fn new(ts: i64) -> Self {
        Self(Arc::new(AtomicI64::new(ts)))
    }

    pub fn set(&self, ts: i64) {
        self.0.store(ts, Ordering::SeqCst);
    }

    pub fn clock_fn(&self) -> ClockFn {
        let inner = self.0.clone();
        Arc::new(move || {
            DateTime::<Utc>::from_timestamp(inner.load(Ordering::SeqCst), 0).unwrap()
        })
    }
}

pub struct Harness {
    pub store: Arc<FaultyStore>,
    pub source: Arc<ScriptedSource>,
    pub notifier: Arc<RecordingNotifier>,
    pub clock: Clock,
    pub services: Services,
}

/// Build services over an in-memory store, with maps rendered by StaticMap
/// when `with_maps`, or disabled otherwise.
pub fn harness(with_maps: bool) -> Harness {
    let store = Arc::new(FaultyStore {
        inner: SqliteStore::open(":memory:").unwrap(),
        fail_snapshot_reads: AtomicBool::new(false),
    });
    let source = Arc::new(ScriptedSource::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let clock = Clock::new(DEPARTURE);

    let maps: Arc<dyn MapRenderer> = if with_maps {
        Arc::new(StaticMap)
    } else {
        Arc::new(tracker::maps::Maps::Disabled)
    };
    let dispatcher = Dispatcher::new(
        store.clone(),
        notifier.clone(),
        maps,
        notifications::Renderer::try_new().unwrap(),
    );

    let services = Services {
        store: store.clone(),
        source: source.clone(),
        dispatcher: Arc::new(dispatcher),
        clock: clock.clock_fn(),
    };

    Harness {
        store,
        source,
        notifier,
        clock,
        services,
    }
}

pub fn entity(id: &str, departure: i64) -> TrackedEntity {
    TrackedEntity {
        id: id.to_string(),
        flight_number: "AFR102".to_string(),
        channel: "C123".to_string(),
        owner: "U42".to_string(),
        departure,
    }
}

pub async fn insert(store: &dyn Store, entity: &TrackedEntity) {
    store.insert_entity(entity.clone()).await.unwrap();
}

/// A flight scheduled at DEPARTURE from gate K42, which hasn't yet left.
pub fn scheduled() -> FlightDetail {
    FlightDetail {
        flight_status: "scheduled".to_string(),
        origin: AirportDetail {
            iata: "CDG".to_string(),
            gate: "K42".to_string(),
            terminal: "2E".to_string(),
            ..Default::default()
        },
        destination: AirportDetail {
            iata: "JFK".to_string(),
            ..Default::default()
        },
        gate_departure_times: Times {
            scheduled: Some(DEPARTURE),
            estimated: Some(DEPARTURE),
            actual: None,
        },
        gate_arrival_times: Times {
            scheduled: Some(DEPARTURE + 8 * 3600),
            estimated: Some(DEPARTURE + 8 * 3600),
            actual: None,
        },
        ..Default::default()
    }
}

/// `scheduled()`, having left its gate at DEPARTURE.
pub fn departed() -> FlightDetail {
    let mut detail = scheduled();
    detail.flight_status = "departed".to_string();
    detail.gate_departure_times.actual = Some(DEPARTURE);
    detail
}

/// `departed()`, having taken off at `at`.
pub fn airborne(at: i64) -> FlightDetail {
    let mut detail = departed();
    detail.flight_status = "airborne".to_string();
    detail.takeoff_times.actual = Some(at);
    detail.altitude = 350;
    detail.groundspeed = 480;
    detail
}

/// `airborne()`, having landed at `at`.
pub fn landed(at: i64) -> FlightDetail {
    let mut detail = airborne(DEPARTURE + 300);
    detail.flight_status = "landed".to_string();
    detail.landing_times.actual = Some(at);
    detail
}
