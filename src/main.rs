//! CLI entry point for the NYCT real-time trip tool.
//!
//! Provides subcommands for listing and filtering the trips of one feed,
//! printing the feed header, and watching a feed on an interval.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nyct_realtime::{
    fetch::{
        BasicClient, FeedSource, FeedSpecifier, FileFeedSource, HttpFeedSource, auth::ApiKey,
    },
    output::{append_records, print_json, print_lines},
    query::TripFilter,
    session::FeedSession,
    stats::SnapshotStats,
    stops::StopReference,
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "nyct_realtime")]
#[command(about = "Query live NYCT subway trips from the GTFS-realtime feeds", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a feed once and print its trips
    Trips {
        /// Line id (e.g. "1", "A", "SIR"), feed URL, or stored feed file
        #[arg(value_name = "FEED")]
        feed: String,

        /// GTFS stops.txt used for stop names
        #[arg(short, long)]
        stops: Option<PathBuf>,

        /// Filter criterion as KEY=VALUE; may be repeated
        #[arg(short = 'w', long = "where", value_name = "KEY=VALUE")]
        criteria: Vec<String>,

        /// Print trips as JSON instead of one line each
        #[arg(long, default_value_t = false)]
        json: bool,

        /// CSV file to append the matching trips to
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Fetch a feed once and print its header metadata
    Header {
        #[arg(value_name = "FEED")]
        feed: String,
    },
    /// Refresh a feed on an interval and log a summary of each snapshot
    Watch {
        #[arg(value_name = "FEED")]
        feed: String,

        #[arg(short, long)]
        stops: Option<PathBuf>,

        #[arg(short = 'w', long = "where", value_name = "KEY=VALUE")]
        criteria: Vec<String>,

        /// Seconds between refreshes
        #[arg(short, long, default_value_t = 30)]
        interval: u64,

        /// Number of refreshes (0 = until interrupted)
        #[arg(short = 'n', long, default_value_t = 0)]
        count: usize,

        /// CSV file to append the matching trips to after every refresh
        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/nyct_realtime.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("nyct_realtime.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Trips {
            feed,
            stops,
            criteria,
            json,
            csv,
        } => {
            let filter = parse_criteria(&criteria)?;
            let mut session = FeedSession::new(feed_source(&feed)?, load_stops(stops.as_deref())?);
            let snapshot = session.refresh().await?;
            info!(snapshot = %snapshot, "Feed loaded");

            let trips = filter.apply(&snapshot.trips);
            let mut stdout = std::io::stdout().lock();
            if json {
                print_json(&mut stdout, &trips)?;
            } else {
                print_lines(&mut stdout, trips.iter().copied())?;
            }

            if let Some(path) = csv {
                append_records(&path, &trips, snapshot.loaded_at)?;
                info!(path = %path.display(), rows = trips.len(), "Trips appended");
            }
        }
        Commands::Header { feed } => {
            let mut session = FeedSession::new(feed_source(&feed)?, StopReference::default());
            session.refresh().await?;
            let metadata = session.metadata()?;

            println!("GTFS-realtime version: {}", metadata.gtfs_realtime_version);
            println!(
                "NYCT subway version: {}",
                metadata.nyct_subway_version.as_deref().unwrap_or("unknown")
            );
            match metadata.generated_at {
                Some(at) => println!("Generated at: {}", at.to_rfc3339()),
                None => println!("Generated at: unknown"),
            }
            for period in &metadata.replacement_periods {
                match period.ends_at {
                    Some(end) => println!("Route {} replaced until {}", period.route_id, end.to_rfc3339()),
                    None => println!("Route {} replacement window open-ended", period.route_id),
                }
            }
        }
        Commands::Watch {
            feed,
            stops,
            criteria,
            interval,
            count,
            csv,
        } => {
            let filter = parse_criteria(&criteria)?;
            let session = FeedSession::new(feed_source(&feed)?, load_stops(stops.as_deref())?);
            watch(session, &filter, interval, count, csv.as_deref()).await?;
        }
    }

    Ok(())
}

fn parse_criteria(criteria: &[String]) -> Result<TripFilter> {
    criteria
        .iter()
        .try_fold(TripFilter::new(), |filter, expression| {
            filter.parse_expression(expression)
        })
        .context("Invalid --where criterion")
}

fn load_stops(path: Option<&Path>) -> Result<StopReference> {
    match path {
        Some(path) => StopReference::from_path(path)
            .with_context(|| format!("Failed to load stops from {}", path.display())),
        None => {
            warn!("No stops file given, stop names will be empty");
            Ok(StopReference::default())
        }
    }
}

/// Builds the feed source for a line id, URL or stored feed file. URLs get
/// the `MTA_API_KEY` header when the variable is set.
fn feed_source(feed: &str) -> Result<Box<dyn FeedSource>> {
    let source: Box<dyn FeedSource> = match FeedSpecifier::resolve(feed)? {
        FeedSpecifier::File(path) => Box::new(FileFeedSource::new(path)),
        FeedSpecifier::Url(url) => match std::env::var("MTA_API_KEY") {
            Ok(key) if !key.is_empty() => Box::new(HttpFeedSource::new(
                ApiKey::mta(BasicClient::new(), &key)?,
                url.as_str(),
            )),
            _ => {
                warn!("MTA_API_KEY not set, fetching without an API key");
                Box::new(HttpFeedSource::new(BasicClient::new(), url.as_str()))
            }
        },
    };
    Ok(source)
}

/// Refreshes the session every `interval` seconds. Failed refreshes are
/// logged and the previous snapshot stays in use.
#[tracing::instrument(skip(session, filter, csv), fields(source = %session.source().describe()))]
async fn watch(
    mut session: FeedSession<Box<dyn FeedSource>>,
    filter: &TripFilter,
    interval: u64,
    count: usize,
    csv: Option<&Path>,
) -> Result<()> {
    if count == 0 {
        info!(interval, "Watching until interrupted. Press Ctrl+C to stop.");
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(interval.max(1)));
    let mut round = 0;

    loop {
        if count > 0 && round >= count {
            break;
        }
        ticker.tick().await;
        round += 1;

        if let Err(e) = session.refresh().await {
            match session.snapshot() {
                Ok(stale) => {
                    error!(error = %e, round, stale_since = %stale.loaded_at, "Refresh failed, serving previous snapshot");
                }
                Err(_) => error!(error = %e, round, "Refresh failed, no snapshot yet"),
            }
            continue;
        }

        let snapshot = session.snapshot()?;
        let stats = SnapshotStats::from_snapshot(&snapshot);
        let matching = filter.apply(&snapshot.trips);
        info!(
            round,
            trips = stats.total_trips,
            matching = matching.len(),
            underway_pct = stats.underway_pct(),
            assigned_pct = stats.assigned_pct(),
            delayed = stats.delayed,
            diagnostics = stats.diagnostics,
            "Snapshot refreshed"
        );

        if let Some(path) = csv {
            if let Err(e) = append_records(path, &matching, snapshot.loaded_at) {
                error!(error = %e, path = %path.display(), "Failed to append trips");
            }
        }
    }

    info!(rounds = round, "Finished watching");
    Ok(())
}
