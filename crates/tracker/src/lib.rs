use anyhow::Context;
use chrono::{DateTime, Utc};
use models::{EntityFilter, StateSnapshot, TrackedEntity};
use std::sync::Arc;

pub mod differ;
pub mod dispatcher;
pub mod maps;
pub mod monitor;
pub mod slack;
pub mod sources;
pub mod store;
pub mod supervisor;

pub use dispatcher::{Delivery, Dispatcher};
pub use monitor::Monitor;
pub use supervisor::{Horizon, Supervisor};

/// Type-erased source of the current time, which tests may control.
pub type ClockFn = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> ClockFn {
    Arc::new(Utc::now)
}

/// Services are the collaborators shared by the supervisor and every monitor.
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn store::Store>,
    pub source: Arc<dyn sources::DataSource>,
    pub dispatcher: Arc<Dispatcher>,
    pub clock: ClockFn,
}

#[derive(clap::Args, serde::Serialize, derivative::Derivative)]
#[derivative(Debug)]
pub struct ServeArgs {
    /// Slack bot token. If unset, alerts are logged instead of being sent.
    #[clap(long = "slack-token", env = "SLACK_BOT_TOKEN", hide_env_values = true)]
    #[serde(skip)]
    #[derivative(Debug = "ignore")]
    pub slack_token: Option<String>,
    /// Base URL of the Slack Web API.
    #[clap(
        long = "slack-api-url",
        env = "SLACK_API_URL",
        default_value = "https://slack.com/api/"
    )]
    pub slack_api_url: url::Url,
    #[clap(flatten)]
    #[serde(flatten)]
    pub source: SourceArgs,
    /// Interval between polls of each monitored flight.
    #[clap(
        long = "poll-interval",
        env = "TRACKER_POLL_INTERVAL",
        default_value = "2m"
    )]
    #[serde(with = "humantime_serde")]
    #[arg(value_parser = parse_interval)]
    pub poll_interval: std::time::Duration,
    /// Interval between reconciliations of monitors against tracked flights.
    #[clap(
        long = "reconcile-interval",
        env = "TRACKER_RECONCILE_INTERVAL",
        default_value = "10s"
    )]
    #[serde(with = "humantime_serde")]
    #[arg(value_parser = parse_interval)]
    pub reconcile_interval: std::time::Duration,
    /// Flights are monitored once they depart within this horizon.
    #[clap(
        long = "tracking-horizon",
        env = "TRACKER_HORIZON",
        default_value = "4h"
    )]
    #[serde(with = "humantime_serde")]
    #[arg(value_parser = humantime::parse_duration)]
    pub tracking_horizon: std::time::Duration,
    /// Monitor every tracked flight, regardless of its departure.
    #[clap(long = "track-all", env = "TRACKER_TRACK_ALL")]
    pub track_all: bool,
    /// URL of a service which renders flight maps as PNG.
    /// If unset, in-flight updates are sent without a map.
    #[clap(long = "map-renderer-url", env = "TRACKER_MAP_RENDERER_URL")]
    pub map_renderer_url: Option<url::Url>,
}

/// Arguments of the live flight source.
#[derive(Debug, Clone, clap::Args, serde::Serialize)]
pub struct SourceArgs {
    /// Base URL of live flight pages, to which the flight number is appended.
    #[clap(
        long = "source-url",
        env = "TRACKER_SOURCE_URL",
        default_value = "https://flightaware.com/live/flight/"
    )]
    pub source_url: url::Url,
    /// Timeout of requests to the flight source, Slack, and the map renderer.
    #[clap(
        long = "fetch-timeout",
        env = "TRACKER_FETCH_TIMEOUT",
        default_value = "30s"
    )]
    #[serde(with = "humantime_serde")]
    #[arg(value_parser = parse_interval)]
    pub fetch_timeout: std::time::Duration,
}

impl SourceArgs {
    pub fn build(&self) -> anyhow::Result<sources::FlightAware> {
        sources::FlightAware::new(self.source_url.clone(), self.fetch_timeout)
    }
}

// Intervals and timeouts must be non-zero.
fn parse_interval(arg: &str) -> Result<std::time::Duration, String> {
    let duration = humantime::parse_duration(arg).map_err(|err| err.to_string())?;
    if duration.is_zero() {
        return Err("must be greater than zero".to_string());
    }
    Ok(duration)
}

impl ServeArgs {
    pub fn horizon(&self) -> Horizon {
        if self.track_all {
            Horizon::All
        } else {
            Horizon::Within(self.tracking_horizon)
        }
    }
}

/// DebugJson formats a serializable value as compact JSON, for logging.
pub struct DebugJson<S: serde::Serialize>(pub S);

impl<S: serde::Serialize> std::fmt::Debug for DebugJson<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = serde_json::to_string(&self.0).map_err(|_| std::fmt::Error)?;
        f.write_str(&value)
    }
}

/// Run the supervisor against the store until `shutdown` resolves.
pub async fn serve(
    args: ServeArgs,
    store: Arc<dyn store::Store>,
    shutdown: impl std::future::Future<Output = ()>,
) -> anyhow::Result<()> {
    tracing::info!(args = ?DebugJson(&args), "started!");

    let timeout = args.source.fetch_timeout;
    let notifier = match &args.slack_token {
        Some(token) => slack::Sender::slack(args.slack_api_url.clone(), token.clone(), timeout)?,
        None => {
            tracing::warn!("no slack token was provided, alerts will not be sent");
            slack::Sender::Disabled
        }
    };
    let maps = match &args.map_renderer_url {
        Some(url) => maps::Maps::http(url.clone(), timeout)?,
        None => maps::Maps::Disabled,
    };
    let source = args.source.build()?;
    let renderer = notifications::Renderer::try_new().context("building alert renderer")?;

    let services = Services {
        store: store.clone(),
        source: Arc::new(source),
        dispatcher: Arc::new(Dispatcher::new(
            store,
            Arc::new(notifier),
            Arc::new(maps),
            renderer,
        )),
        clock: system_clock(),
    };

    Supervisor::new(services, args.poll_interval, args.horizon())
        .run(args.reconcile_interval, shutdown)
        .await;

    Ok(())
}

/// Flight numbers are an airline code followed by up to four digits,
/// and an optional suffix letter (ex "AFR102", "DLH400A").
lazy_static::lazy_static! {
    static ref FLIGHT_NUMBER_RE: regex::Regex =
        regex::Regex::new(r"^[A-Z]{2,3}\d{1,4}[A-Z]?$").unwrap();
}

fn normalize_flight_number(flight_number: &str) -> anyhow::Result<String> {
    let flight_number = flight_number.trim().to_uppercase();
    if !FLIGHT_NUMBER_RE.is_match(&flight_number) {
        anyhow::bail!("{flight_number:?} is not a valid flight number");
    }
    Ok(flight_number)
}

/// Begin tracking `flight_number` on behalf of `owner`, returning the new entity.
/// The flight must be known to the `source`.
pub async fn track(
    store: &dyn store::Store,
    source: &dyn sources::DataSource,
    flight_number: &str,
    channel: &str,
    owner: &str,
    departure: DateTime<Utc>,
) -> anyhow::Result<TrackedEntity> {
    let flight_number = normalize_flight_number(flight_number)?;

    let detail = source
        .fetch(&flight_number)
        .await
        .with_context(|| format!("fetching flight {flight_number}"))?;
    match detail {
        Some(detail) if !detail.airline.full_name.is_empty() => (),
        _ => anyhow::bail!("couldn't find any flight numbered {flight_number}"),
    }

    let existing = store
        .list_entities(EntityFilter {
            owner: Some(owner.to_string()),
            flight_number: Some(flight_number.clone()),
            channel: Some(channel.to_string()),
            ..Default::default()
        })
        .await?;
    if let Some(existing) = existing.into_iter().next() {
        anyhow::bail!(
            "flight {flight_number} is already tracked in this channel (as {})",
            existing.id
        );
    }

    let entity = TrackedEntity {
        id: uuid::Uuid::new_v4().to_string(),
        flight_number,
        channel: channel.to_string(),
        owner: owner.to_string(),
        departure: departure.timestamp(),
    };
    store.insert_entity(entity.clone()).await?;

    tracing::info!(entity_id = %entity.id, flight_number = %entity.flight_number, "tracking flight");
    Ok(entity)
}

/// FlightInfo is the current status of a flight, as reported by the `info` command.
#[derive(Debug, serde::Serialize)]
pub struct FlightInfo {
    pub flight_number: String,
    pub airline: String,
    pub origin: String,
    pub destination: String,
    pub snapshot: StateSnapshot,
}

/// Fetch the current status of `flight_number`, observed at `now`.
pub async fn info(
    source: &dyn sources::DataSource,
    flight_number: &str,
    now: DateTime<Utc>,
) -> anyhow::Result<FlightInfo> {
    let flight_number = normalize_flight_number(flight_number)?;

    let detail = source
        .fetch(&flight_number)
        .await
        .with_context(|| format!("fetching flight {flight_number}"))?;
    let Some(detail) = detail.filter(|d| !d.origin.iata.is_empty()) else {
        anyhow::bail!("no active flight numbered {flight_number}");
    };

    Ok(FlightInfo {
        snapshot: StateSnapshot::from_detail(&detail, &flight_number, now.timestamp()),
        airline: detail.airline.full_name,
        origin: detail.origin.friendly_location,
        destination: detail.destination.friendly_location,
        flight_number,
    })
}

/// Stop tracking flight `id`. Only its owner may untrack it.
pub async fn untrack(store: &dyn store::Store, id: &str, owner: &str) -> anyhow::Result<()> {
    let Some(entity) = store.get_entity(id).await? else {
        anyhow::bail!("flight {id} is not tracked");
    };
    if entity.owner != owner {
        anyhow::bail!("flight {id} is tracked by another user");
    }
    store.delete_entity(id).await?;

    tracing::info!(entity_id = %id, "untracked flight");
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;
    use models::flightaware::{AirlineDetail, AirportDetail, FlightDetail};
    use std::collections::BTreeMap;
    use store::Store;

    // Flights known to the source, by flight number.
    struct KnownFlights(BTreeMap<&'static str, FlightDetail>);

    #[async_trait::async_trait]
    impl sources::DataSource for KnownFlights {
        async fn fetch(&self, flight_number: &str) -> Result<Option<FlightDetail>, sources::Error> {
            Ok(self.0.get(flight_number).cloned())
        }
    }

    fn known_flights() -> KnownFlights {
        let afr102 = FlightDetail {
            flight_status: "scheduled".to_string(),
            airline: AirlineDetail {
                full_name: "Air France".to_string(),
                ..Default::default()
            },
            origin: AirportDetail {
                iata: "CDG".to_string(),
                friendly_location: "Paris, France".to_string(),
                gate: "K42".to_string(),
                ..Default::default()
            },
            destination: AirportDetail {
                iata: "JFK".to_string(),
                friendly_location: "New York, NY".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        // Known to the source, but without an operating airline.
        let dlh400 = FlightDetail::default();

        KnownFlights([("AFR102", afr102), ("DLH400", dlh400)].into_iter().collect())
    }

    #[tokio::test]
    async fn test_track_and_untrack() {
        let store = store::SqliteStore::open(":memory:").unwrap();
        let source = known_flights();
        let departure = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

        let entity = track(&store, &source, " afr102 ", "C123", "U42", departure)
            .await
            .unwrap();
        assert_eq!(entity.flight_number, "AFR102");
        assert_eq!(entity.departure, 1_700_000_000);
        assert_eq!(store.get_entity(&entity.id).await.unwrap(), Some(entity.clone()));

        let err = track(&store, &source, "AFR102", "C123", "U42", departure)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already tracked"), "{err}");

        let err = track(&store, &source, "not a flight", "C123", "U42", departure)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), r#""NOT A FLIGHT" is not a valid flight number"#);

        let err = untrack(&store, &entity.id, "U7").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("flight {} is tracked by another user", entity.id)
        );

        untrack(&store, &entity.id, "U42").await.unwrap();
        assert_eq!(store.get_entity(&entity.id).await.unwrap(), None);
        assert!(untrack(&store, &entity.id, "U42").await.is_err());
    }

    #[tokio::test]
    async fn test_track_requires_a_known_flight() {
        let store = store::SqliteStore::open(":memory:").unwrap();
        let source = known_flights();
        let departure = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

        for flight_number in ["BAW117", "DLH400"] {
            let err = track(&store, &source, flight_number, "C123", "U42", departure)
                .await
                .unwrap_err();
            assert_eq!(
                err.to_string(),
                format!("couldn't find any flight numbered {flight_number}")
            );
        }
        assert_eq!(
            store.list_entities(EntityFilter::default()).await.unwrap(),
            Vec::new()
        );
    }

    #[tokio::test]
    async fn test_flight_info() {
        let source = known_flights();
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

        let info = info(&source, "afr102", now).await.unwrap();
        assert_eq!(info.airline, "Air France");
        assert_eq!(info.snapshot.origin_gate, "K42");
        assert_eq!(info.snapshot.updated_at, 1_700_000_000);

        insta::assert_json_snapshot!(info, {".snapshot" => "[snapshot]"}, @r###"
        {
          "flight_number": "AFR102",
          "airline": "Air France",
          "origin": "Paris, France",
          "destination": "New York, NY",
          "snapshot": "[snapshot]"
        }
        "###);

        let err = super::info(&source, "DLH400", now).await.unwrap_err();
        assert_eq!(err.to_string(), "no active flight numbered DLH400");
    }

    #[test]
    fn test_zero_intervals_are_rejected() {
        use clap::Parser;

        #[derive(clap::Parser)]
        struct Cli {
            #[clap(flatten)]
            serve: ServeArgs,
        }

        for flag in ["--poll-interval", "--reconcile-interval", "--fetch-timeout"] {
            let err = Cli::try_parse_from(["flight-tracker", flag, "0s"])
                .err()
                .unwrap();
            assert!(err.to_string().contains("must be greater than zero"), "{err}");
        }
        assert!(Cli::try_parse_from(["flight-tracker", "--poll-interval", "1s"]).is_ok());
    }

    #[test]
    fn test_serve_args_defaults() {
        use clap::Parser;

        #[derive(clap::Parser)]
        struct Cli {
            #[clap(flatten)]
            serve: ServeArgs,
        }
        let args = Cli::parse_from(["flight-tracker", "--poll-interval", "30s"]).serve;

        assert_eq!(args.poll_interval, std::time::Duration::from_secs(30));
        assert_eq!(args.horizon(), Horizon::Within(std::time::Duration::from_secs(4 * 3600)));

        insta::assert_json_snapshot!(args, @r###"
        {
          "slack_api_url": "https://slack.com/api/",
          "source_url": "https://flightaware.com/live/flight/",
          "fetch_timeout": "30s",
          "poll_interval": "30s",
          "reconcile_interval": "10s",
          "tracking_horizon": "4h",
          "track_all": false,
          "map_renderer_url": null
        }
        "###);
    }
}
