//! Stratus Service - periodic weather refresh daemon.
//!
//! Run with: `cargo run -p stratus-service`

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use clap::{Parser, Subcommand};
use time::Duration;
use tracing::info;

use stratus_service::{AppState, Config, Refresher, keys, notify::NotificationSink};
use stratus_store::Store;
use stratus_sync::{HttpBackend, HttpWeatherSource, Outbox};
use stratus_types::Coordinates;

/// Stratus Service - periodic weather refresh daemon.
#[derive(Parser, Debug)]
#[command(name = "stratus-service")]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database path (overrides config).
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the refresh daemon in the foreground (default behavior).
    Run,

    /// Replay pending sync queue actions once and exit.
    Flush {
        /// Flush only this queue instead of every configured one.
        queue: Option<String>,
    },

    /// Delete aged-out cache entries and exit.
    Sweep,

    /// Record the last known location used by refresh cycles.
    SetLocation {
        /// Latitude in decimal degrees.
        #[arg(allow_negative_numbers = true)]
        latitude: f64,
        /// Longitude in decimal degrees.
        #[arg(allow_negative_numbers = true)]
        longitude: f64,
    },

    /// Show cache and queue statistics.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("stratus_service=info".parse()?)
                .add_directive("stratus_sync=info".parse()?)
                .add_directive("stratus_store=info".parse()?),
        )
        .init();

    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::load_validated(path)?,
        None => Config::load_default().unwrap_or_default(),
    };

    // Override config with CLI args
    if let Some(db_path) = &args.database {
        config.storage.path = db_path.clone();
    }

    match args.command {
        Some(Command::Flush { queue }) => flush(&config, queue).await,
        Some(Command::Sweep) => sweep(&config),
        Some(Command::SetLocation {
            latitude,
            longitude,
        }) => set_location(&config, latitude, longitude),
        Some(Command::Status) => status(&config),
        Some(Command::Run) | None => run(config).await,
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    info!("Opening database at {:?}", config.storage.path);
    let store = Store::open(&config.storage.path)?;

    let source = HttpWeatherSource::new(
        config.weather.endpoint.clone(),
        StdDuration::from_secs(config.weather.timeout_secs),
    )?;
    let backend = HttpBackend::new(
        config.backend.endpoint.clone(),
        StdDuration::from_secs(config.backend.timeout_secs),
    )?;
    let outbox = Outbox::new(Box::new(backend));

    #[cfg(feature = "desktop-notifications")]
    let sink: Arc<dyn NotificationSink> = Arc::new(stratus_service::DesktopSink);
    #[cfg(not(feature = "desktop-notifications"))]
    let sink: Arc<dyn NotificationSink> = Arc::new(stratus_service::LogSink);

    let state = AppState::new(store, config);
    let refresher = Refresher::new(
        Arc::clone(&state),
        Arc::new(source),
        sink,
        Arc::new(outbox),
    );
    refresher.start();

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    state.refresher.signal_stop();

    Ok(())
}

async fn flush(config: &Config, queue: Option<String>) -> anyhow::Result<()> {
    let store = Store::open(&config.storage.path)?;
    let backend = HttpBackend::new(
        config.backend.endpoint.clone(),
        StdDuration::from_secs(config.backend.timeout_secs),
    )?;
    let outbox = Outbox::new(Box::new(backend));

    let queues: Vec<String> = match queue {
        Some(queue) => vec![queue],
        None => config.refresh.queues.clone(),
    };

    for queue in &queues {
        let report = outbox.flush(&store, queue).await?;
        println!(
            "{}: {} delivered, {} remaining",
            queue, report.delivered, report.remaining
        );
    }

    Ok(())
}

fn sweep(config: &Config) -> anyhow::Result<()> {
    let store = Store::open(&config.storage.path)?;
    let removed = store.sweep_expired_snapshots(Duration::seconds(
        config.refresh.sweep_max_age_secs as i64,
    ))?;
    println!("Removed {} expired cache entries", removed);
    Ok(())
}

fn set_location(config: &Config, latitude: f64, longitude: f64) -> anyhow::Result<()> {
    let coordinates = Coordinates::new(latitude, longitude);
    if !coordinates.is_valid() {
        anyhow::bail!("invalid coordinates: ({}, {})", latitude, longitude);
    }

    let store = Store::open(&config.storage.path)?;
    store.set_setting(keys::LAST_LOCATION, &coordinates)?;
    println!("Last location set to ({}, {})", latitude, longitude);
    Ok(())
}

fn status(config: &Config) -> anyhow::Result<()> {
    let store = Store::open(&config.storage.path)?;

    let stats = store.cache_stats()?;
    println!("Weather cache: {} entries", stats.entries);
    if let Some(newest) = stats.newest_fetched_at {
        println!(
            "  Newest fetch: {}",
            newest.format(&time::format_description::well_known::Rfc3339)?
        );
    }
    if let Some(oldest) = stats.oldest_fetched_at {
        println!(
            "  Oldest fetch: {}",
            oldest.format(&time::format_description::well_known::Rfc3339)?
        );
    }

    println!("Favorites: {}", store.count_favorites()?);

    for queue in &config.refresh.queues {
        println!("Queue '{}': {} pending", queue, store.count_queued(queue)?);
    }

    match store.get_setting::<Coordinates>(keys::LAST_LOCATION)? {
        Some(location) => println!(
            "Last location: ({}, {})",
            location.latitude, location.longitude
        ),
        None => println!("Last location: not set"),
    }

    Ok(())
}
