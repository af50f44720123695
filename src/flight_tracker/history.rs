use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::geofence::GeographicPoint;

/// Number of samples kept per flight unless configured otherwise
pub const DEFAULT_HISTORY_DEPTH: usize = 5;

/// One observed position of a flight
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub point: GeographicPoint,
    pub observed_at: DateTime<Utc>,
}

/// Bounded position history, oldest first
///
/// The cap is a hard sample count, independent of sample age.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionHistory {
    samples: VecDeque<PositionSample>,
    depth: usize,
}

impl PositionHistory {
    pub fn new(depth: usize) -> Self {
        let depth = depth.max(1);
        Self {
            samples: VecDeque::with_capacity(depth),
            depth,
        }
    }

    /// Append a sample, dropping the oldest ones beyond the cap
    pub fn push(&mut self, sample: PositionSample) {
        while self.samples.len() >= self.depth {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn last(&self) -> Option<&PositionSample> {
        self.samples.back()
    }

    /// Samples no older than `max_age_secs` relative to `now`, oldest first
    pub fn within(&self, now: DateTime<Utc>, max_age_secs: i64) -> Vec<&PositionSample> {
        let max_age = Duration::seconds(max_age_secs);
        self.samples
            .iter()
            .filter(|s| now.signed_duration_since(s.observed_at) <= max_age)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PositionSample> {
        self.samples.iter()
    }
}

impl Default for PositionHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_DEPTH)
    }
}
