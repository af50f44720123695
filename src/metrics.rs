use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tracing::info;

/// Install the Prometheus exporter, serving `/metrics` on `port`
///
/// Must be called from inside the tokio runtime: the exporter spawns its listener
/// onto it. Without a port, the `metrics` macros stay no-ops.
pub fn init_metrics(port: Option<u16>) -> Result<()> {
    let Some(port) = port else {
        info!("METRICS_PORT not set, Prometheus exporter disabled");
        return Ok(());
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;
    info!("Serving metrics on http://{}/metrics", addr);

    initialize_tracker_metrics();
    tokio::spawn(process_metrics_task());
    Ok(())
}

/// Port from `METRICS_PORT`, if set and valid
pub fn metrics_port_from_env() -> Option<u16> {
    std::env::var("METRICS_PORT")
        .ok()
        .and_then(|p| p.trim().parse().ok())
}

/// Background task to update process metrics
/// Updates uptime and memory usage metrics every 5 seconds
pub async fn process_metrics_task() {
    let start_time = Instant::now();

    loop {
        metrics::gauge!("process.uptime.seconds").set(start_time.elapsed().as_secs() as f64);
        metrics::gauge!("process.is_up").set(1.0);

        #[cfg(target_os = "linux")]
        {
            if let Ok(status) = std::fs::read_to_string("/proc/self/status")
                && let Some(line) = status.lines().find(|l| l.starts_with("VmRSS:"))
                && let Some(kb_str) = line.split_whitespace().nth(1)
                && let Ok(kb) = kb_str.parse::<f64>()
            {
                metrics::gauge!("process.memory.bytes").set(kb * 1024.0);
            }
        }

        tokio::time::sleep(Duration::from_secs(5)).await;
    }
}

/// Initialize tracker metrics to zero/default values
/// This ensures metrics always appear in Prometheus queries even if no events have occurred
pub fn initialize_tracker_metrics() {
    metrics::counter!("fencewatch.cycles_total").absolute(0);
    metrics::counter!("fencewatch.fetch_failures_total").absolute(0);
    metrics::counter!("fencewatch.records_evicted_total").absolute(0);
    metrics::gauge!("fencewatch.tracked_flights").set(0.0);
    metrics::counter!("fencewatch.alerts_sent_total").absolute(0);
    metrics::counter!("fencewatch.alerts_failed_total").absolute(0);

    for kind in crate::flight_tracker::EventKind::LABELS {
        metrics::counter!("fencewatch.events_total", "kind" => *kind).absolute(0);
    }
}
