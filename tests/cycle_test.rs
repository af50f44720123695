use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use fencewatch::event_journal::EventJournal;
use fencewatch::event_sink::{JournalSink, LoggingSink, SinkChain};
use fencewatch::reports::{CURRENT_POSITIONS_FILE, FLIGHT_TABLE_FILE, LAST_UPDATE_FILE, ReportWriter};
use fencewatch::snapshot_source::{Snapshot, SnapshotSource, StateVector, StaticSnapshotSource};
use fencewatch::{
    Callsign, CallsignNormalizer, CycleOrchestrator, CycleResult, EventKind, FlightStateTracker,
    Geofence, GeographicPoint, TrackerSettings, Watchlist,
};

fn pt(lat: f64, lon: f64) -> GeographicPoint {
    GeographicPoint::new(lat, lon).unwrap()
}

fn tracker() -> FlightStateTracker {
    let core = vec![pt(0.0, 0.0), pt(0.0, 1.0), pt(1.0, 1.0), pt(1.0, 0.0)];
    let aux = vec![pt(0.0, 5.0), pt(0.0, 6.0), pt(1.0, 6.0), pt(1.0, 5.0)];
    let geofence = Geofence::build(&core, 111.0, &aux).unwrap();
    FlightStateTracker::new(Arc::new(geofence), TrackerSettings::default())
}

fn normalizer() -> CallsignNormalizer {
    CallsignNormalizer::new(
        vec![
            ("AF".to_string(), "AFR".to_string()),
            ("LY".to_string(), "ELY".to_string()),
        ],
        Watchlist::new(["AFR966", "ELY011"]),
    )
}

fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap() + Duration::seconds(secs)
}

fn state(callsign: &str, lat: f64, lon: f64) -> StateVector {
    StateVector {
        raw_callsign: callsign.to_string(),
        latitude: lat,
        longitude: lon,
        on_ground: false,
        baro_altitude_m: Some(11_000.0),
        velocity_mps: Some(240.0),
    }
}

fn landing(callsign: &str, lat: f64, lon: f64) -> StateVector {
    StateVector {
        baro_altitude_m: Some(400.0),
        velocity_mps: Some(70.0),
        ..state(callsign, lat, lon)
    }
}

fn snapshot(secs: i64, states: Vec<StateVector>) -> Snapshot {
    Snapshot {
        fetched_at: at(secs),
        states,
    }
}

fn orchestrator<S: SnapshotSource>(source: S, data_dir: &Path) -> CycleOrchestrator<S> {
    let sinks = SinkChain::new()
        .with(LoggingSink)
        .with(JournalSink::new(EventJournal::new(data_dir).unwrap()));
    CycleOrchestrator::new(
        source,
        normalizer(),
        tracker(),
        sinks,
        ReportWriter::new(data_dir).unwrap(),
    )
    .with_interval(std::time::Duration::from_millis(5))
}

fn completed(result: CycleResult) -> fencewatch::CycleOutcome {
    match result {
        CycleResult::Completed(outcome) => outcome,
        other => panic!("expected a completed cycle, got {:?}", other),
    }
}

#[tokio::test]
async fn test_cycle_filters_normalizes_and_reports() {
    let dir = tempfile::tempdir().unwrap();
    let source = StaticSnapshotSource::new(vec![snapshot(
        0,
        vec![
            state("AF966   ", 1.5, 0.5),
            state("BAW404", 0.5, 0.5),
            state("", 0.5, 0.5),
        ],
    )]);
    let mut cycle = orchestrator(source, dir.path());

    let outcome = completed(cycle.run_cycle().await);
    assert_eq!(outcome.states, 3);
    assert_eq!(outcome.watched, 1);
    assert_eq!(outcome.events.len(), 1);
    assert_eq!(outcome.events[0].callsign.as_str(), "AFR966");
    assert_eq!(outcome.events[0].kind, EventKind::EnteredWatchArea);
    assert_eq!(cycle.tracker().len(), 1);

    let table = fs::read_to_string(dir.path().join(FLIGHT_TABLE_FILE)).unwrap();
    assert!(table.contains("AFR966,Yes,No,No,No,No"));
    let positions = fs::read_to_string(dir.path().join(CURRENT_POSITIONS_FILE)).unwrap();
    assert!(positions.contains("AFR966,1.5,0.5"));
    assert!(dir.path().join("flight_history_2025-06-01.csv").exists());
    assert_eq!(
        fs::read_to_string(dir.path().join(LAST_UPDATE_FILE)).unwrap(),
        at(0).to_rfc3339()
    );

    let journal = EventJournal::new(dir.path()).unwrap().tail(10).unwrap();
    assert_eq!(journal.len(), 1);
    assert!(journal[0].ends_with("AFR966 entered the watch area"));
}

#[tokio::test]
async fn test_landed_flight_leaves_current_positions() {
    let dir = tempfile::tempdir().unwrap();
    let source = StaticSnapshotSource::new(vec![
        snapshot(0, vec![state("AFR966", 1.5, 0.5), state("ELY011", 1.5, 0.6)]),
        snapshot(120, vec![landing("AFR966", 0.5, 0.5), state("ELY011", 1.4, 0.6)]),
    ]);
    let mut cycle = orchestrator(source, dir.path());

    completed(cycle.run_cycle().await);
    let outcome = completed(cycle.run_cycle().await);

    let kinds: Vec<EventKind> = outcome.events.iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![EventKind::EnteredCore, EventKind::Landed]);
    assert_eq!(outcome.positions.len(), 1);
    assert_eq!(outcome.positions[0].callsign.as_str(), "ELY011");
    assert!(cycle.tracker().is_landed(&Callsign::parse("AFR966").unwrap()));

    let table = fs::read_to_string(dir.path().join(FLIGHT_TABLE_FILE)).unwrap();
    assert!(table.contains("AFR966,Yes,Yes,Yes,No,No"));
}

#[tokio::test]
async fn test_stale_records_evicted_after_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let source = StaticSnapshotSource::new(vec![
        snapshot(0, vec![state("AFR966", 1.5, 0.5)]),
        snapshot(19 * 3600, vec![state("ELY011", 1.5, 0.5)]),
    ]);
    let mut cycle = orchestrator(source, dir.path());

    completed(cycle.run_cycle().await);
    let outcome = completed(cycle.run_cycle().await);
    assert_eq!(outcome.evicted, 1);
    assert_eq!(cycle.tracker().len(), 1);
    assert!(
        cycle
            .tracker()
            .flags(&Callsign::parse("AFR966").unwrap())
            .is_none()
    );
}

struct FlakySource {
    calls: usize,
}

#[async_trait]
impl SnapshotSource for FlakySource {
    async fn fetch(&mut self) -> Result<Option<Snapshot>> {
        self.calls += 1;
        match self.calls {
            1 => anyhow::bail!("connection reset"),
            2 => Ok(Some(snapshot(120, vec![state("AFR966", 1.5, 0.5)]))),
            _ => Ok(None),
        }
    }
}

#[tokio::test]
async fn test_failed_fetch_skips_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let mut cycle = orchestrator(FlakySource { calls: 0 }, dir.path());

    assert!(matches!(cycle.run_cycle().await, CycleResult::Skipped));
    assert!(cycle.tracker().is_empty());
    assert!(!dir.path().join(LAST_UPDATE_FILE).exists());

    completed(cycle.run_cycle().await);
    assert_eq!(cycle.tracker().len(), 1);
    assert!(matches!(cycle.run_cycle().await, CycleResult::Exhausted));
}

struct SlowSource;

#[async_trait]
impl SnapshotSource for SlowSource {
    async fn fetch(&mut self) -> Result<Option<Snapshot>> {
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        Ok(Some(snapshot(0, vec![])))
    }
}

#[tokio::test]
async fn test_fetch_timeout_skips_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let mut cycle = orchestrator(SlowSource, dir.path())
        .with_fetch_timeout(std::time::Duration::from_millis(20));
    assert!(matches!(cycle.run_cycle().await, CycleResult::Skipped));
}

#[tokio::test]
async fn test_polling_loop_runs_until_source_exhausted() {
    let dir = tempfile::tempdir().unwrap();
    let source = StaticSnapshotSource::new(vec![
        snapshot(0, vec![state("ELY011", 1.20, 0.50)]),
        snapshot(120, vec![state("ELY011", 1.30, 0.5176)]),
        snapshot(240, vec![state("ELY011", 1.20, 0.50)]),
    ]);
    let mut cycle = orchestrator(source, dir.path());

    cycle.run_until(std::future::pending()).await;

    let flags = cycle
        .tracker()
        .flags(&Callsign::parse("ELY011").unwrap())
        .unwrap();
    assert!(flags.entered_watch_area);
    assert!(flags.turn_alert_sent);

    let journal = EventJournal::new(dir.path()).unwrap().tail(10).unwrap();
    assert!(journal.iter().any(|l| l.contains("REVERSAL detected for ELY011")));
}

#[tokio::test]
async fn test_polling_loop_stops_on_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let source = StaticSnapshotSource::new(
        (0..1000).map(|i| snapshot(i * 120, vec![state("AFR966", 1.5, 0.5)])),
    );
    let mut cycle = orchestrator(source, dir.path());

    cycle
        .run_until(tokio::time::sleep(std::time::Duration::from_millis(30)))
        .await;
    assert_eq!(cycle.tracker().len(), 1);
}
