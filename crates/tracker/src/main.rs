use anyhow::Context;
use clap::Parser;
use models::EntityFilter;
use std::sync::Arc;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};
use tracker::store::Store;

#[derive(clap::Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// Path of the SQLite database of tracked flights.
    #[clap(
        long = "database",
        env = "TRACKER_DATABASE",
        default_value = "data/userdata.db",
        global = true
    )]
    database: String,
    /// Format of logs written to stderr.
    #[clap(long = "log-format", value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,
    #[clap(subcommand)]
    mode: Mode,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy)]
enum LogFormat {
    Text,
    Json,
}

#[derive(clap::Subcommand, Debug)]
enum Mode {
    /// Monitor tracked flights and send their alerts, until interrupted.
    Serve(tracker::ServeArgs),
    /// Begin tracking a flight.
    Track(TrackArgs),
    /// Stop tracking a flight.
    Untrack(UntrackArgs),
    /// Print the current status of a flight as JSON.
    Info(InfoArgs),
    /// List tracked flights as JSON.
    List(ListArgs),
}

#[derive(clap::Args, Debug)]
struct TrackArgs {
    /// Flight number, ex "AFR102".
    flight_number: String,
    /// Slack channel which receives the flight's alerts.
    #[clap(long)]
    channel: String,
    /// Slack user who is tracking the flight.
    #[clap(long)]
    owner: String,
    /// Scheduled departure, as an RFC 3339 timestamp.
    #[clap(long)]
    departure: chrono::DateTime<chrono::Utc>,
    #[clap(flatten)]
    source: tracker::SourceArgs,
}

#[derive(clap::Args, Debug)]
struct InfoArgs {
    /// Flight number, ex "AFR102".
    flight_number: String,
    #[clap(flatten)]
    source: tracker::SourceArgs,
}

#[derive(clap::Args, Debug)]
struct UntrackArgs {
    /// Id of the tracked flight.
    id: String,
    /// Slack user who is tracking the flight.
    #[clap(long)]
    owner: String,
}

#[derive(clap::Args, Debug)]
struct ListArgs {
    /// List only flights tracked by this Slack user.
    #[clap(long)]
    owner: Option<String>,
    /// List only flights alerting this Slack channel.
    #[clap(long)]
    channel: Option<String>,
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Use reasonable defaults for printing structured logs to stderr.
    let builder = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr);
    let installed = match cli.log_format {
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    };
    installed.context("setting tracing default failed")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let result = runtime.block_on(runtime.spawn(async_main(cli)));

    runtime.shutdown_timeout(std::time::Duration::from_secs(5));
    result?
}

async fn async_main(Cli { database, mode, .. }: Cli) -> anyhow::Result<()> {
    let store = tracker::store::SqliteStore::open(&database)
        .with_context(|| format!("opening database {database}"))?;

    match mode {
        Mode::Serve(args) => {
            let shutdown = async {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => tracing::info!("caught shutdown signal, stopping..."),
                    Err(err) => tracing::error!(?err, "error subscribing to shutdown signal"),
                }
            };
            tracker::serve(args, Arc::new(store), shutdown).await
        }
        Mode::Track(TrackArgs {
            flight_number,
            channel,
            owner,
            departure,
            source,
        }) => {
            let source = source.build()?;
            let entity =
                tracker::track(&store, &source, &flight_number, &channel, &owner, departure)
                    .await?;
            println!("{}", serde_json::to_string_pretty(&entity)?);
            Ok(())
        }
        Mode::Untrack(UntrackArgs { id, owner }) => tracker::untrack(&store, &id, &owner).await,
        Mode::Info(InfoArgs {
            flight_number,
            source,
        }) => {
            let info = tracker::info(&source.build()?, &flight_number, chrono::Utc::now()).await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
            Ok(())
        }
        Mode::List(ListArgs { owner, channel }) => {
            let entities = store
                .list_entities(EntityFilter {
                    owner,
                    channel,
                    ..Default::default()
                })
                .await?;
            println!("{}", serde_json::to_string_pretty(&entities)?);
            Ok(())
        }
    }
}
