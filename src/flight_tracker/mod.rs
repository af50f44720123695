mod events;
mod flight_record;
mod history;
mod turn_detector;

pub use events::{EventKind, LifecycleEvent};
pub use flight_record::{FlightFlags, FlightPhase, FlightRecord};
pub use history::{DEFAULT_HISTORY_DEPTH, PositionHistory, PositionSample};
pub use turn_detector::{
    DEFAULT_REVERSAL_LOOKBACK_SECS, DEFAULT_REVERSAL_THRESHOLD_DEG, TurnCheck, TurnDetector,
};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, trace};

use crate::callsign::Callsign;
use crate::geofence::{Geofence, GeographicPoint};

/// Tunables of the flight state tracker
///
/// Kinematic thresholds are expressed in the units the snapshot source delivers:
/// metres for barometric altitude and metres per second for velocity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerSettings {
    pub history_depth: usize,
    pub reversal_lookback_secs: i64,
    pub reversal_threshold_deg: f64,
    pub reversal_rate_limit_secs: i64,
    pub landing_max_velocity_mps: f64,
    pub landing_max_altitude_m: f64,
    pub departure_min_altitude_m: f64,
    pub departure_min_velocity_mps: f64,
    /// Records not observed for this long are evicted
    pub state_retention_hours: i64,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            history_depth: DEFAULT_HISTORY_DEPTH,
            reversal_lookback_secs: DEFAULT_REVERSAL_LOOKBACK_SECS,
            reversal_threshold_deg: DEFAULT_REVERSAL_THRESHOLD_DEG,
            reversal_rate_limit_secs: 600,
            landing_max_velocity_mps: 100.0,
            landing_max_altitude_m: 1500.0,
            departure_min_altitude_m: 1500.0,
            departure_min_velocity_mps: 150.0,
            state_retention_hours: 18,
        }
    }
}

/// One snapshot of a single aircraft, as fed to the tracker
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub point: GeographicPoint,
    pub on_ground: bool,
    pub baro_altitude_m: Option<f64>,
    pub velocity_mps: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl Observation {
    fn indicates_landing(&self, settings: &TrackerSettings) -> bool {
        matches!(
            (self.velocity_mps, self.baro_altitude_m),
            (Some(v), Some(alt)) if v < settings.landing_max_velocity_mps
                && alt < settings.landing_max_altitude_m
        )
    }

    fn indicates_climb_out(&self, settings: &TrackerSettings) -> bool {
        matches!(
            (self.velocity_mps, self.baro_altitude_m),
            (Some(v), Some(alt)) if alt > settings.departure_min_altitude_m
                && v > settings.departure_min_velocity_mps
        )
    }
}

/// Row of the flight table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightSummary {
    pub callsign: Callsign,
    pub flags: FlightFlags,
    pub last_seen: DateTime<Utc>,
}

/// Per call-sign lifecycle automaton
///
/// Owns the full call-sign -> record map. DashMap gives per-key locking, so
/// distinct call-signs may be observed concurrently; one call-sign must not be
/// observed twice at once (the cycle orchestrator guarantees this).
pub struct FlightStateTracker {
    geofence: Arc<Geofence>,
    settings: TrackerSettings,
    turn_detector: TurnDetector,
    records: DashMap<Callsign, FlightRecord>,
}

impl FlightStateTracker {
    pub fn new(geofence: Arc<Geofence>, settings: TrackerSettings) -> Self {
        let turn_detector = TurnDetector::new(
            settings.reversal_lookback_secs,
            settings.reversal_threshold_deg,
        );
        Self {
            geofence,
            settings,
            turn_detector,
            records: DashMap::new(),
        }
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    pub fn geofence(&self) -> &Geofence {
        &self.geofence
    }

    /// Feed one observation and return the lifecycle events it triggered, in rule order
    pub fn observe(&self, callsign: &Callsign, obs: &Observation) -> Vec<LifecycleEvent> {
        let inside = self.geofence.inside_core(&obs.point);
        let near = self.geofence.inside_watch_area(&obs.point);

        let mut record = self
            .records
            .entry(callsign.clone())
            .or_insert_with(|| FlightRecord::new(self.settings.history_depth, obs.timestamp));

        // Landed is absorbing: no history append, no flag change
        if record.is_landed() {
            trace!("{} already landed, ignoring observation", callsign);
            return Vec::new();
        }

        record.history.push(PositionSample {
            point: obs.point,
            observed_at: obs.timestamp,
        });
        record.last_seen = obs.timestamp;

        let mut events = Vec::new();
        let mut emit = |kind: EventKind| {
            events.push(LifecycleEvent {
                callsign: callsign.clone(),
                kind,
                position: obs.point,
                at: obs.timestamp,
            })
        };

        // Appeared on the ground inside the core before ever entering the watch area
        if obs.on_ground && inside && record.mark_appeared_on_ground() {
            emit(EventKind::AppearedOnGround);
        }

        // Entered the watch area (blocked for ground-origin flights)
        if near && record.mark_entered_watch_area() {
            emit(EventKind::EnteredWatchArea);
        }

        if inside && record.mark_entered_core() {
            emit(EventKind::EnteredCore);
        }

        if inside && obs.indicates_landing(&self.settings) && record.mark_landed() {
            emit(EventKind::Landed);
            debug!("{} landed, record is now frozen", callsign);
            return events;
        }

        if !inside && obs.indicates_climb_out(&self.settings) && record.mark_departed() {
            emit(EventKind::Departed);
        }

        if record.entered_watch_area()
            && !record.flags().turn_alert_sent
            && self.turn_check_eligible(record.last_turn_check, obs.timestamp)
        {
            let check = self.turn_detector.assess(&record.history, obs.timestamp);
            trace!("{} turn check: {:?}", callsign, check);
            if let TurnCheck::Reversal { delta_deg } = check
                && record.mark_turn_alert_sent()
            {
                record.last_turn_check = Some(obs.timestamp);
                emit(EventKind::ReversalDetected { delta_deg });
            }
        }

        if !near && record.mark_exited_watch_area() {
            emit(EventKind::ExitedWatchArea);
        }

        events
    }

    /// `last_turn_check` is only stamped together with `turn_alert_sent`, which already
    /// stops further checks, so within `observe` this always sees `None`
    fn turn_check_eligible(&self, last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match last {
            None => true,
            Some(last) => {
                now.signed_duration_since(last)
                    > Duration::seconds(self.settings.reversal_rate_limit_secs)
            }
        }
    }

    pub fn flags(&self, callsign: &Callsign) -> Option<FlightFlags> {
        self.records.get(callsign).map(|r| r.flags())
    }

    pub fn history_len(&self, callsign: &Callsign) -> Option<usize> {
        self.records.get(callsign).map(|r| r.history.len())
    }

    pub fn last_turn_check(&self, callsign: &Callsign) -> Option<DateTime<Utc>> {
        self.records.get(callsign).and_then(|r| r.last_turn_check)
    }

    pub fn is_landed(&self, callsign: &Callsign) -> bool {
        self.records
            .get(callsign)
            .map(|r| r.is_landed())
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop a record; the next observation re-creates it from scratch
    pub fn reset(&self, callsign: &Callsign) -> bool {
        self.records.remove(callsign).is_some()
    }

    /// Remove records whose last observation is older than the retention window
    pub fn evict_stale(&self, now: DateTime<Utc>) -> usize {
        let retention = Duration::hours(self.settings.state_retention_hours);

        let mut removed_count = 0;
        self.records.retain(|callsign, record| {
            let elapsed = now.signed_duration_since(record.last_seen);
            if elapsed > retention {
                debug!(
                    "Evicting stale record for {} (last seen {} hours ago)",
                    callsign,
                    elapsed.num_hours()
                );
                removed_count += 1;
                false
            } else {
                true
            }
        });

        if removed_count > 0 {
            info!("Evicted {} stale flight records", removed_count);
            metrics::counter!("fencewatch.records_evicted_total").increment(removed_count as u64);
        }
        metrics::gauge!("fencewatch.tracked_flights").set(self.records.len() as f64);

        removed_count
    }

    /// Snapshot of every record's flags, sorted by call-sign
    pub fn summaries(&self) -> Vec<FlightSummary> {
        let mut rows: Vec<FlightSummary> = self
            .records
            .iter()
            .map(|entry| FlightSummary {
                callsign: entry.key().clone(),
                flags: entry.value().flags(),
                last_seen: entry.value().last_seen,
            })
            .collect();
        rows.sort_by(|a, b| a.callsign.cmp(&b.callsign));
        rows
    }
}
