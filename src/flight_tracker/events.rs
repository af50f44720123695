use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::callsign::Callsign;
use crate::geofence::GeographicPoint;

/// Kind of lifecycle transition emitted by the tracker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    /// First seen on the ground inside the protected area
    AppearedOnGround,
    /// First seen inside the watch area while airborne (or outside the core)
    EnteredWatchArea,
    /// Entered the protected area after entering the watch area
    EnteredCore,
    /// Landed inside the protected area
    Landed,
    /// Climbed out of the protected area after appearing on the ground
    Departed,
    /// Course reversal with the measured angular difference between legs
    ReversalDetected { delta_deg: f64 },
    /// Left the watch area after entering it
    ExitedWatchArea,
}

impl EventKind {
    /// Every value `as_str` can return
    pub const LABELS: &'static [&'static str] = &[
        "appeared_on_ground",
        "entered_watch_area",
        "entered_core",
        "landed",
        "departed",
        "reversal_detected",
        "exited_watch_area",
    ];

    /// Stable short name used for metrics labels
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::AppearedOnGround => "appeared_on_ground",
            EventKind::EnteredWatchArea => "entered_watch_area",
            EventKind::EnteredCore => "entered_core",
            EventKind::Landed => "landed",
            EventKind::Departed => "departed",
            EventKind::ReversalDetected { .. } => "reversal_detected",
            EventKind::ExitedWatchArea => "exited_watch_area",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub callsign: Callsign,
    pub kind: EventKind,
    pub position: GeographicPoint,
    pub at: DateTime<Utc>,
}

impl LifecycleEvent {
    pub fn is_reversal(&self) -> bool {
        matches!(self.kind, EventKind::ReversalDetected { .. })
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            EventKind::AppearedOnGround => {
                write!(f, "{} appeared on the ground inside the protected area", self.callsign)
            }
            EventKind::EnteredWatchArea => write!(f, "{} entered the watch area", self.callsign),
            EventKind::EnteredCore => {
                write!(f, "{} entered the protected area", self.callsign)
            }
            EventKind::Landed => write!(f, "{} landed inside the protected area", self.callsign),
            EventKind::Departed => {
                write!(f, "{} departed from the protected area", self.callsign)
            }
            EventKind::ReversalDetected { delta_deg } => write!(
                f,
                "REVERSAL detected for {} (heading change {:.0}°)",
                self.callsign, delta_deg
            ),
            EventKind::ExitedWatchArea => write!(f, "{} left the watch area", self.callsign),
        }
    }
}
