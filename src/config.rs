use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::callsign::{CallsignNormalizer, Watchlist};
use crate::flight_tracker::TrackerSettings;
use crate::geofence::{Geofence, GeofenceError, GeographicPoint};
use crate::snapshot_source::OPENSKY_STATES_URL;
use crate::zones;

fn to_pairs(ring: &[(f64, f64)]) -> Vec<[f64; 2]> {
    ring.iter().map(|&(lat, lon)| [lat, lon]).collect()
}

/// Polygon rings as `[lat, lon]` pairs and the buffer distance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeofenceConfig {
    pub buffer_km: f64,
    pub protected_area: Vec<[f64; 2]>,
    pub auxiliary_area: Vec<[f64; 2]>,
}

impl Default for GeofenceConfig {
    fn default() -> Self {
        Self {
            buffer_km: zones::DEFAULT_BUFFER_KM,
            protected_area: to_pairs(zones::FIR_ISRAEL_LEBANON),
            auxiliary_area: to_pairs(zones::WESTERN_EXTENSION),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    pub url: String,
    pub interval_secs: u64,
    pub timeout_secs: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            url: OPENSKY_STATES_URL.to_string(),
            interval_secs: 120,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchlistConfig {
    pub callsigns: Vec<String>,
    /// `[iata, icao]` pairs, tried in order
    pub prefix_map: Vec<(String, String)>,
}

impl Default for WatchlistConfig {
    fn default() -> Self {
        Self {
            callsigns: zones::DEFAULT_WATCHLIST
                .iter()
                .map(|s| s.to_string())
                .collect(),
            prefix_map: zones::DEFAULT_PREFIX_MAP
                .iter()
                .map(|(iata, icao)| (iata.to_string(), icao.to_string()))
                .collect(),
        }
    }
}

/// Top-level configuration file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub zone_label: String,
    pub geofence: GeofenceConfig,
    pub tracker: TrackerSettings,
    pub poller: PollerConfig,
    pub watchlist: WatchlistConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            zone_label: zones::DEFAULT_ZONE_LABEL.to_string(),
            geofence: GeofenceConfig::default(),
            tracker: TrackerSettings::default(),
            poller: PollerConfig::default(),
            watchlist: WatchlistConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let config: AppConfig =
            toml::from_str(&contents).with_context(|| format!("Failed to parse {:?}", path))?;
        Ok(config)
    }

    /// Load config from `path`, or the built-in defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Config file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }
        let config = Self::load(path)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save config to a TOML file (atomic: write to .tmp then rename)
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = self.to_toml()?;
        let tmp_path = path.with_extension("toml.tmp");
        std::fs::write(&tmp_path, &contents)
            .with_context(|| format!("Failed to write {:?}", tmp_path))?;
        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("Failed to rename {:?} to {:?}", tmp_path, path))?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config to TOML")
    }

    /// Build the geofence; invalid geometry is reported as-is so callers can abort
    pub fn build_geofence(&self) -> Result<Geofence, GeofenceError> {
        let ring = |pairs: &[[f64; 2]]| -> Result<Vec<GeographicPoint>, GeofenceError> {
            pairs
                .iter()
                .map(|&[lat, lon]| GeographicPoint::new(lat, lon))
                .collect()
        };
        Geofence::build(
            &ring(&self.geofence.protected_area)?,
            self.geofence.buffer_km,
            &ring(&self.geofence.auxiliary_area)?,
        )
    }

    pub fn normalizer(&self) -> CallsignNormalizer {
        CallsignNormalizer::new(
            self.watchlist.prefix_map.clone(),
            Watchlist::new(&self.watchlist.callsigns),
        )
    }
}

/// Resolve the config file path.
///
/// Priority:
/// 1. `--config` command-line flag
/// 2. `FENCEWATCH_CONFIG` env var
/// 3. `/etc/fencewatch/config.toml` (production/staging)
/// 4. `./fencewatch.toml` (development)
pub fn config_path(cli_override: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_override {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var("FENCEWATCH_CONFIG") {
        return PathBuf::from(path);
    }

    match std::env::var("FENCEWATCH_ENV").as_deref() {
        Ok("production") | Ok("staging") => PathBuf::from("/etc/fencewatch/config.toml"),
        _ => PathBuf::from("./fencewatch.toml"),
    }
}
