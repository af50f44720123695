//! Snapshot source abstraction
//!
//! A snapshot is one poll of a wide-area state feed: every aircraft the feed knows
//! about, decoded into `StateVector`s. This enables:
//! - Production: polling the OpenSky `states/all` endpoint
//! - Testing: feeding pre-built snapshots from memory
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, trace};

/// Default OpenSky endpoint returning every tracked aircraft
pub const OPENSKY_STATES_URL: &str = "https://opensky-network.org/api/states/all";

/// One aircraft in a snapshot, before call-sign normalisation
#[derive(Debug, Clone, PartialEq)]
pub struct StateVector {
    pub raw_callsign: String,
    pub latitude: f64,
    pub longitude: f64,
    pub on_ground: bool,
    /// Barometric altitude in metres
    pub baro_altitude_m: Option<f64>,
    /// Ground velocity in metres per second
    pub velocity_mps: Option<f64>,
}

/// One poll of the feed
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub fetched_at: DateTime<Utc>,
    pub states: Vec<StateVector>,
}

/// Trait for sources of aircraft-state snapshots
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch the next snapshot
    ///
    /// Returns:
    /// - `Ok(Some(snapshot))` - Snapshot available
    /// - `Ok(None)` - Source exhausted (only finite test sources)
    /// - `Err(e)` - Fetch or decode failure; the caller skips the cycle
    async fn fetch(&mut self) -> Result<Option<Snapshot>>;
}

/// Decode the OpenSky `states/all` payload
///
/// Each state is a positional array: `[1]` call-sign, `[5]` longitude,
/// `[6]` latitude, `[7]` barometric altitude (m), `[8]` on-ground flag,
/// `[9]` velocity (m/s). Rows without a position are dropped.
pub fn parse_opensky_states(payload: &Value, fetched_at: DateTime<Utc>) -> Snapshot {
    let rows = payload
        .get("states")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let states: Vec<StateVector> = rows
        .iter()
        .filter_map(|row| {
            let row = row.as_array()?;
            let field = |i: usize| row.get(i).filter(|v| !v.is_null());

            let latitude = field(6).and_then(Value::as_f64)?;
            let longitude = field(5).and_then(Value::as_f64)?;
            let raw_callsign = field(1)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim()
                .to_string();

            Some(StateVector {
                raw_callsign,
                latitude,
                longitude,
                on_ground: field(8).and_then(Value::as_bool).unwrap_or(false),
                baro_altitude_m: field(7).and_then(Value::as_f64),
                velocity_mps: field(9).and_then(Value::as_f64),
            })
        })
        .collect();

    trace!(
        "Decoded {} positioned states out of {} rows",
        states.len(),
        rows.len()
    );

    Snapshot { fetched_at, states }
}

/// OpenSky REST poller
pub struct OpenSkySource {
    client: reqwest::Client,
    url: String,
}

impl OpenSkySource {
    /// Create a poller; `timeout` bounds each request
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("fencewatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl SnapshotSource for OpenSkySource {
    async fn fetch(&mut self) -> Result<Option<Snapshot>> {
        let fetched_at = Utc::now();
        let payload: Value = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", self.url))?
            .error_for_status()
            .context("State feed returned an error status")?
            .json()
            .await
            .context("Failed to decode state feed JSON")?;

        let snapshot = parse_opensky_states(&payload, fetched_at);
        debug!("Fetched {} states from {}", snapshot.states.len(), self.url);
        Ok(Some(snapshot))
    }
}

/// In-memory source that yields queued snapshots, then reports exhaustion
#[derive(Debug, Default)]
pub struct StaticSnapshotSource {
    queued: VecDeque<Snapshot>,
}

impl StaticSnapshotSource {
    pub fn new(snapshots: impl IntoIterator<Item = Snapshot>) -> Self {
        Self {
            queued: snapshots.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.queued.len()
    }
}

#[async_trait]
impl SnapshotSource for StaticSnapshotSource {
    async fn fetch(&mut self) -> Result<Option<Snapshot>> {
        Ok(self.queued.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_opensky_states() {
        let payload = json!({
            "time": 1717243200,
            "states": [
                ["738065", "ELY011  ", "Israel", 1717243190, 1717243199, 34.88, 32.01, 1219.2, false, 92.5, 270.0, -5.2, null, 1300.0, "1234", false, 0],
                ["4b1805", "SWR253  ", "Switzerland", 1717243190, 1717243199, null, null, null, true, 0.0, 0.0, null, null, null, null, false, 0],
                ["3c6444", null, "Germany", 1717243190, 1717243199, 35.2, 33.1, null, true, null, 12.0, null, null, null, null, false, 0]
            ]
        });

        let snapshot = parse_opensky_states(&payload, Utc::now());
        assert_eq!(snapshot.states.len(), 2);

        let ely = &snapshot.states[0];
        assert_eq!(ely.raw_callsign, "ELY011");
        assert_eq!(ely.latitude, 32.01);
        assert_eq!(ely.longitude, 34.88);
        assert_eq!(ely.baro_altitude_m, Some(1219.2));
        assert_eq!(ely.velocity_mps, Some(92.5));
        assert!(!ely.on_ground);

        let anonymous = &snapshot.states[1];
        assert_eq!(anonymous.raw_callsign, "");
        assert!(anonymous.on_ground);
        assert_eq!(anonymous.baro_altitude_m, None);
        assert_eq!(anonymous.velocity_mps, None);
    }

    #[test]
    fn test_parse_empty_payload() {
        let snapshot = parse_opensky_states(&json!({ "time": 0, "states": null }), Utc::now());
        assert!(snapshot.states.is_empty());
    }

    #[tokio::test]
    async fn test_static_source_drains() {
        let snap = Snapshot {
            fetched_at: Utc::now(),
            states: vec![],
        };
        let mut source = StaticSnapshotSource::new(vec![snap.clone(), snap]);
        assert_eq!(source.remaining(), 2);
        assert!(source.fetch().await.unwrap().is_some());
        assert!(source.fetch().await.unwrap().is_some());
        assert!(source.fetch().await.unwrap().is_none());
    }
}
