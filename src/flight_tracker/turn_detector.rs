//! Course reversal ("about-turn") detection over a short position history
//!
//! The detector looks at the last three samples within the lookback window and
//! compares the bearing of the two legs they form. The folded angular difference
//! is always within [0, 180], so the threshold must be strictly below 180 to be
//! reachable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::history::PositionHistory;
use crate::bearing::{angular_difference, initial_bearing};

/// Default angular difference (degrees) above which two legs count as a reversal
pub const DEFAULT_REVERSAL_THRESHOLD_DEG: f64 = 150.0;

/// Default lookback window for samples considered by the detector
pub const DEFAULT_REVERSAL_LOOKBACK_SECS: i64 = 600;

/// Minimum number of recent samples needed to form two legs
const MIN_SAMPLES: usize = 3;

/// Outcome of a reversal check
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TurnCheck {
    /// Fewer than three samples inside the lookback window
    Insufficient,
    /// One of the legs has identical endpoints, so no bearing is available
    NoBearing,
    /// Legs computed, difference at or below the threshold
    Steady { delta_deg: f64 },
    /// Legs point in near-opposite directions
    Reversal { delta_deg: f64 },
}

impl TurnCheck {
    pub fn is_reversal(&self) -> bool {
        matches!(self, TurnCheck::Reversal { .. })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TurnDetector {
    lookback_secs: i64,
    threshold_deg: f64,
}

impl TurnDetector {
    pub fn new(lookback_secs: i64, threshold_deg: f64) -> Self {
        Self {
            lookback_secs,
            threshold_deg,
        }
    }

    pub fn threshold_deg(&self) -> f64 {
        self.threshold_deg
    }

    /// Decide whether the history shows a reversal as of `now`
    pub fn assess(&self, history: &PositionHistory, now: DateTime<Utc>) -> TurnCheck {
        let recent = history.within(now, self.lookback_secs);
        if recent.len() < MIN_SAMPLES {
            return TurnCheck::Insufficient;
        }

        let n = recent.len();
        let (a, b, c) = (recent[n - 3], recent[n - 2], recent[n - 1]);

        let (b1, b2) = match (
            initial_bearing(&a.point, &b.point),
            initial_bearing(&b.point, &c.point),
        ) {
            (Ok(b1), Ok(b2)) => (b1, b2),
            _ => return TurnCheck::NoBearing,
        };

        let delta_deg = angular_difference(b2, b1);
        if delta_deg > self.threshold_deg {
            TurnCheck::Reversal { delta_deg }
        } else {
            TurnCheck::Steady { delta_deg }
        }
    }
}

impl Default for TurnDetector {
    fn default() -> Self {
        Self::new(DEFAULT_REVERSAL_LOOKBACK_SECS, DEFAULT_REVERSAL_THRESHOLD_DEG)
    }
}
