//! Polling cycle: fetch a snapshot, feed watched aircraft to the tracker, fan out
//! events, refresh reports, evict stale records

use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::callsign::CallsignNormalizer;
use crate::event_sink::{EventSink, SinkChain};
use crate::flight_tracker::{FlightStateTracker, LifecycleEvent, Observation};
use crate::geofence::GeographicPoint;
use crate::reports::{CurrentPosition, ReportWriter};
use crate::snapshot_source::{Snapshot, SnapshotSource};

/// Summary of one completed cycle
#[derive(Debug, Default)]
pub struct CycleOutcome {
    pub fetched_at: Option<DateTime<Utc>>,
    /// States in the snapshot
    pub states: usize,
    /// States whose call-sign is on the watch-list
    pub watched: usize,
    pub events: Vec<LifecycleEvent>,
    pub positions: Vec<CurrentPosition>,
    pub evicted: usize,
}

#[derive(Debug)]
pub enum CycleResult {
    Completed(CycleOutcome),
    /// Fetch failed or timed out; tracker state untouched
    Skipped,
    /// The source has no more snapshots
    Exhausted,
}

pub struct CycleOrchestrator<S: SnapshotSource> {
    source: S,
    normalizer: CallsignNormalizer,
    tracker: FlightStateTracker,
    sinks: SinkChain,
    reports: ReportWriter,
    fetch_timeout: Duration,
    interval: Duration,
}

impl<S: SnapshotSource> CycleOrchestrator<S> {
    pub fn new(
        source: S,
        normalizer: CallsignNormalizer,
        tracker: FlightStateTracker,
        sinks: SinkChain,
        reports: ReportWriter,
    ) -> Self {
        Self {
            source,
            normalizer,
            tracker,
            sinks,
            reports,
            fetch_timeout: Duration::from_secs(10),
            interval: Duration::from_secs(120),
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn tracker(&self) -> &FlightStateTracker {
        &self.tracker
    }

    /// Run exactly one cycle
    #[tracing::instrument(skip(self), name = "cycle")]
    pub async fn run_cycle(&mut self) -> CycleResult {
        let snapshot = match tokio::time::timeout(self.fetch_timeout, self.source.fetch()).await {
            Ok(Ok(Some(snapshot))) => snapshot,
            Ok(Ok(None)) => return CycleResult::Exhausted,
            Ok(Err(e)) => {
                error!("Snapshot fetch failed: {:#}", e);
                metrics::counter!("fencewatch.fetch_failures_total").increment(1);
                return CycleResult::Skipped;
            }
            Err(_) => {
                error!("Snapshot fetch timed out after {:?}", self.fetch_timeout);
                metrics::counter!("fencewatch.fetch_failures_total").increment(1);
                return CycleResult::Skipped;
            }
        };

        let outcome = self.process(snapshot);
        metrics::counter!("fencewatch.cycles_total").increment(1);
        CycleResult::Completed(outcome)
    }

    fn process(&mut self, snapshot: Snapshot) -> CycleOutcome {
        let now = snapshot.fetched_at;
        let mut outcome = CycleOutcome {
            fetched_at: Some(now),
            states: snapshot.states.len(),
            ..CycleOutcome::default()
        };

        for state in &snapshot.states {
            let Some(callsign) = self.normalizer.watched(&state.raw_callsign) else {
                continue;
            };
            let point = match GeographicPoint::new(state.latitude, state.longitude) {
                Ok(point) => point,
                Err(e) => {
                    warn!("Skipping {}: {}", callsign, e);
                    continue;
                }
            };
            outcome.watched += 1;

            let observation = Observation {
                point,
                on_ground: state.on_ground,
                baro_altitude_m: state.baro_altitude_m,
                velocity_mps: state.velocity_mps,
                timestamp: now,
            };
            outcome
                .events
                .extend(self.tracker.observe(&callsign, &observation));

            if !self.tracker.is_landed(&callsign) {
                outcome.positions.push(CurrentPosition {
                    callsign,
                    lat: point.latitude,
                    lon: point.longitude,
                });
            }
        }

        self.sinks.dispatch(&outcome.events);
        self.write_reports(&outcome.positions, now);
        outcome.evicted = self.tracker.evict_stale(now);

        info!(
            states = outcome.states,
            watched = outcome.watched,
            events = outcome.events.len(),
            tracked = self.tracker.len(),
            "Cycle complete"
        );
        outcome
    }

    fn write_reports(&self, positions: &[CurrentPosition], now: DateTime<Utc>) {
        if let Err(e) = self
            .reports
            .write_flight_table(&self.tracker.summaries(), now)
        {
            error!("Failed to write flight table: {:#}", e);
        }
        if let Err(e) = self.reports.write_current_positions(positions) {
            error!("Failed to write current positions: {:#}", e);
        }
        if let Err(e) = self.reports.write_last_update(now) {
            error!("Failed to write last update stamp: {:#}", e);
        }
    }

    /// Poll until `shutdown` resolves or the source is exhausted
    pub async fn run_until(&mut self, shutdown: impl Future<Output = ()>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!("Polling every {:?}", self.interval);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping polling loop");
                    break;
                }
                _ = ticker.tick() => {
                    match self.run_cycle().await {
                        CycleResult::Exhausted => {
                            info!("Snapshot source exhausted");
                            break;
                        }
                        CycleResult::Skipped => debug!("Cycle skipped"),
                        CycleResult::Completed(_) => {}
                    }
                }
            }
        }
    }

    /// Poll until Ctrl-C
    pub async fn run(&mut self) {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }
}
