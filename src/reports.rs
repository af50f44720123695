//! Files refreshed after every cycle for downstream consumers (dashboards, archives)

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::callsign::Callsign;
use crate::flight_tracker::FlightSummary;

pub const FLIGHT_TABLE_FILE: &str = "flights_detected.csv";
pub const CURRENT_POSITIONS_FILE: &str = "current_positions.csv";
pub const LAST_UPDATE_FILE: &str = "last_update.txt";

const FLIGHT_TABLE_HEADERS: [&str; 6] = [
    "Flight",
    "Entered buffer",
    "Entered core",
    "Landed",
    "Reversal",
    "Departed",
];

/// Position of a watched aircraft seen in the current cycle
#[derive(Debug, Clone, Serialize)]
pub struct CurrentPosition {
    pub callsign: Callsign,
    pub lat: f64,
    pub lon: f64,
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

/// Write `contents` to `path` through a temporary file and a rename
fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, contents).with_context(|| format!("Failed to write {:?}", tmp_path))?;
    fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to rename {:?} to {:?}", tmp_path, path))?;
    Ok(())
}

pub struct ReportWriter {
    data_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;
        Ok(Self {
            data_dir: data_dir.to_path_buf(),
        })
    }

    pub fn archive_path(&self, day: chrono::NaiveDate) -> PathBuf {
        self.data_dir
            .join(format!("flight_history_{}.csv", day.format("%Y-%m-%d")))
    }

    fn render_flight_table(rows: &[FlightSummary]) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(FLIGHT_TABLE_HEADERS)?;
        for row in rows {
            let f = &row.flags;
            writer.write_record([
                row.callsign.as_str(),
                yes_no(f.entered_watch_area),
                yes_no(f.entered_core),
                yes_no(f.landed),
                yes_no(f.turn_alert_sent),
                yes_no(f.departed),
            ])?;
        }
        writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush flight table: {}", e))
    }

    /// Rewrite the flight table, and create today's archive copy if it does not exist yet
    pub fn write_flight_table(&self, rows: &[FlightSummary], now: DateTime<Utc>) -> Result<()> {
        let contents = Self::render_flight_table(rows)?;
        write_atomic(&self.data_dir.join(FLIGHT_TABLE_FILE), &contents)?;

        let archive = self.archive_path(now.date_naive());
        if !archive.exists() {
            write_atomic(&archive, &contents)?;
            info!("Archived flight table to {:?}", archive);
        }
        debug!("Flight table written with {} rows", rows.len());
        Ok(())
    }

    /// Overwrite the current positions file; an empty cycle leaves the previous file in place
    pub fn write_current_positions(&self, positions: &[CurrentPosition]) -> Result<()> {
        if positions.is_empty() {
            return Ok(());
        }
        let mut writer = csv::Writer::from_writer(Vec::new());
        for position in positions {
            writer.serialize(position)?;
        }
        let contents = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush positions: {}", e))?;
        write_atomic(&self.data_dir.join(CURRENT_POSITIONS_FILE), &contents)
    }

    pub fn write_last_update(&self, at: DateTime<Utc>) -> Result<()> {
        write_atomic(&self.data_dir.join(LAST_UPDATE_FILE), at.to_rfc3339().as_bytes())
    }
}
