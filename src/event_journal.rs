//! Human-readable event journal
//!
//! One line per lifecycle event, `<rfc3339> - <message>`. The journal only covers the
//! current UTC day: the first append on a new day truncates it. The day of the last
//! reset is kept in a small marker file next to the journal so restarts keep the
//! same behaviour.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const JOURNAL_FILE: &str = "event_log.txt";
pub const RESET_MARKER_FILE: &str = "event_log_reset.txt";

pub struct EventJournal {
    journal_path: PathBuf,
    marker_path: PathBuf,
}

impl EventJournal {
    pub fn new(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;
        Ok(Self {
            journal_path: data_dir.join(JOURNAL_FILE),
            marker_path: data_dir.join(RESET_MARKER_FILE),
        })
    }

    pub fn path(&self) -> &Path {
        &self.journal_path
    }

    fn last_reset(&self) -> Option<NaiveDate> {
        fs::read_to_string(&self.marker_path)
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }

    /// Truncate the journal when `today` differs from the recorded reset day
    fn rotate_if_new_day(&self, today: NaiveDate) -> Result<()> {
        if self.last_reset() == Some(today) {
            return Ok(());
        }
        fs::write(&self.journal_path, "")
            .with_context(|| format!("Failed to truncate {:?}", self.journal_path))?;
        fs::write(&self.marker_path, today.to_string())
            .with_context(|| format!("Failed to write {:?}", self.marker_path))?;
        info!("Event journal reset for {}", today);
        Ok(())
    }

    /// Append one line stamped with `at`
    pub fn append(&self, at: DateTime<Utc>, message: &str) -> Result<()> {
        self.rotate_if_new_day(at.date_naive())?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.journal_path)
            .with_context(|| format!("Failed to open {:?}", self.journal_path))?;
        writeln!(file, "{} - {}", at.to_rfc3339(), message)
            .with_context(|| format!("Failed to append to {:?}", self.journal_path))?;
        debug!("Journaled: {}", message);
        Ok(())
    }

    /// Most recent `n` lines, newest last
    pub fn tail(&self, n: usize) -> Result<Vec<String>> {
        let contents = match fs::read_to_string(&self.journal_path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).context("Failed to read event journal"),
        };
        let lines: Vec<String> = contents.lines().map(str::to_string).collect();
        let skip = lines.len().saturating_sub(n);
        Ok(lines.into_iter().skip(skip).collect())
    }
}
