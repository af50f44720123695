use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use fencewatch::config::{AppConfig, config_path};
use fencewatch::cycle::CycleOrchestrator;
use fencewatch::email::EmailService;
use fencewatch::event_journal::EventJournal;
use fencewatch::event_sink::{AlertSink, JournalSink, LoggingSink, SinkChain};
use fencewatch::flight_tracker::FlightStateTracker;
use fencewatch::geofence::GeographicPoint;
use fencewatch::instance_lock::InstanceLock;
use fencewatch::log_format::UtcTargetFormat;
use fencewatch::metrics::{init_metrics, metrics_port_from_env};
use fencewatch::reports::ReportWriter;
use fencewatch::snapshot_source::OpenSkySource;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

/// Time allowed for queued alerts to go out after the loop stops
const ALERT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "fencewatch", version, about = "Geofence flight lifecycle tracker")]
struct Cli {
    /// Configuration file (defaults to FENCEWATCH_CONFIG, then ./fencewatch.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the state feed and track watched flights
    Run {
        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
    },
    /// Report whether a position lies in the protected area and the watch area
    Check {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },
    /// Print the effective configuration as TOML
    Config,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .event_format(UtcTargetFormat)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let path = config_path(cli.config.as_deref());
    let config = AppConfig::load_or_default(&path)?;

    match cli.command {
        Commands::Run { once } => handle_run(config, &path, once).await,
        Commands::Check { lat, lon } => handle_check(&config, lat, lon),
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

async fn handle_run(config: AppConfig, path: &Path, once: bool) -> Result<()> {
    let geofence = config
        .build_geofence()
        .with_context(|| format!("Invalid geofence in {:?}", path))?;
    info!(
        "Geofence ready for {} (buffer {:.3}°)",
        config.zone_label,
        geofence.buffer_degrees()
    );

    init_metrics(metrics_port_from_env())?;
    let _lock = InstanceLock::acquire(&config.data_dir, "fencewatch")?;

    let normalizer = config.normalizer();
    info!("Watching {} call-signs", normalizer.watchlist().len());

    let mut sinks = SinkChain::new()
        .with(LoggingSink)
        .with(JournalSink::new(EventJournal::new(&config.data_dir)?));

    let alert_task = match EmailService::from_env() {
        Ok(email) => {
            let (sink, handle) = AlertSink::spawn(Arc::new(email), config.zone_label.clone());
            sinks = sinks.with(sink);
            Some(handle)
        }
        Err(e) => {
            warn!("Email alerts disabled: {:#}", e);
            None
        }
    };

    let source = OpenSkySource::new(
        config.poller.url.clone(),
        Duration::from_secs(config.poller.timeout_secs),
    )?;
    let tracker = FlightStateTracker::new(Arc::new(geofence), config.tracker.clone());

    let mut orchestrator = CycleOrchestrator::new(
        source,
        normalizer,
        tracker,
        sinks,
        ReportWriter::new(&config.data_dir)?,
    )
    .with_fetch_timeout(Duration::from_secs(config.poller.timeout_secs))
    .with_interval(Duration::from_secs(config.poller.interval_secs));

    if once {
        orchestrator.run_cycle().await;
    } else {
        orchestrator.run().await;
    }

    // Dropping the orchestrator closes the alert queue
    drop(orchestrator);
    if let Some(handle) = alert_task
        && tokio::time::timeout(ALERT_DRAIN_TIMEOUT, handle).await.is_err()
    {
        warn!("Pending alerts not delivered within {:?}", ALERT_DRAIN_TIMEOUT);
    }

    info!("fencewatch stopped");
    Ok(())
}

fn handle_check(config: &AppConfig, lat: f64, lon: f64) -> Result<()> {
    let geofence = config.build_geofence().context("Invalid geofence")?;
    let point = GeographicPoint::new(lat, lon)?;
    println!("inside_core: {}", geofence.inside_core(&point));
    println!("inside_watch_area: {}", geofence.inside_watch_area(&point));
    Ok(())
}
