use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::history::PositionHistory;

/// How a tracked flight first showed up, carrying the flags reachable from that origin
///
/// Ground-origin and airborne-origin flights share no flags beyond the first event,
/// so the two branches are separate variants. Every boolean only goes false -> true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlightPhase {
    /// Observed, but neither first event has fired yet
    Unseen,
    /// Appeared on the ground inside the protected area
    GroundOrigin { departed: bool },
    /// Entered the watch area
    Airborne {
        entered_core: bool,
        landed: bool,
        exited_watch_area: bool,
        turn_alert_sent: bool,
    },
}

/// Flat view of every one-shot flag of a record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightFlags {
    pub entered_watch_area: bool,
    pub entered_core: bool,
    pub exited_watch_area: bool,
    pub landed: bool,
    pub departed: bool,
    pub appeared_on_ground_in_core: bool,
    pub turn_alert_sent: bool,
}

impl FlightFlags {
    /// True when every flag set in `earlier` is still set in `self`
    pub fn dominates(&self, earlier: &FlightFlags) -> bool {
        let pairs = [
            (earlier.entered_watch_area, self.entered_watch_area),
            (earlier.entered_core, self.entered_core),
            (earlier.exited_watch_area, self.exited_watch_area),
            (earlier.landed, self.landed),
            (earlier.departed, self.departed),
            (earlier.appeared_on_ground_in_core, self.appeared_on_ground_in_core),
            (earlier.turn_alert_sent, self.turn_alert_sent),
        ];
        pairs.iter().all(|(before, after)| !before || *after)
    }
}

impl FlightPhase {
    pub fn flags(&self) -> FlightFlags {
        match *self {
            FlightPhase::Unseen => FlightFlags::default(),
            FlightPhase::GroundOrigin { departed } => FlightFlags {
                appeared_on_ground_in_core: true,
                departed,
                ..FlightFlags::default()
            },
            FlightPhase::Airborne {
                entered_core,
                landed,
                exited_watch_area,
                turn_alert_sent,
            } => FlightFlags {
                entered_watch_area: true,
                entered_core,
                landed,
                exited_watch_area,
                turn_alert_sent,
                ..FlightFlags::default()
            },
        }
    }
}

/// Per call-sign tracking state, created lazily on first observation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightRecord {
    pub history: PositionHistory,
    pub phase: FlightPhase,
    /// Time of the last positive reversal check
    pub last_turn_check: Option<DateTime<Utc>>,
    /// Observation time of the most recent sample (for eviction)
    pub last_seen: DateTime<Utc>,
}

impl FlightRecord {
    pub fn new(history_depth: usize, first_seen: DateTime<Utc>) -> Self {
        Self {
            history: PositionHistory::new(history_depth),
            phase: FlightPhase::Unseen,
            last_turn_check: None,
            last_seen: first_seen,
        }
    }

    pub fn flags(&self) -> FlightFlags {
        self.phase.flags()
    }

    /// Landed is absorbing: nothing changes for the record afterwards
    pub fn is_landed(&self) -> bool {
        matches!(self.phase, FlightPhase::Airborne { landed: true, .. })
    }

    pub fn entered_watch_area(&self) -> bool {
        matches!(self.phase, FlightPhase::Airborne { .. })
    }

    pub fn appeared_on_ground(&self) -> bool {
        matches!(self.phase, FlightPhase::GroundOrigin { .. })
    }

    /// Record the ground-origin first event; returns true on the transition
    pub(crate) fn mark_appeared_on_ground(&mut self) -> bool {
        if self.phase == FlightPhase::Unseen {
            self.phase = FlightPhase::GroundOrigin { departed: false };
            return true;
        }
        false
    }

    /// Record the airborne first event; returns true on the transition
    pub(crate) fn mark_entered_watch_area(&mut self) -> bool {
        if self.phase == FlightPhase::Unseen {
            self.phase = FlightPhase::Airborne {
                entered_core: false,
                landed: false,
                exited_watch_area: false,
                turn_alert_sent: false,
            };
            return true;
        }
        false
    }

    pub(crate) fn mark_entered_core(&mut self) -> bool {
        match &mut self.phase {
            FlightPhase::Airborne { entered_core, .. } if !*entered_core => {
                *entered_core = true;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn mark_landed(&mut self) -> bool {
        match &mut self.phase {
            FlightPhase::Airborne {
                entered_core: true,
                landed,
                ..
            } if !*landed => {
                *landed = true;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn mark_departed(&mut self) -> bool {
        match &mut self.phase {
            FlightPhase::GroundOrigin { departed } if !*departed => {
                *departed = true;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn mark_turn_alert_sent(&mut self) -> bool {
        match &mut self.phase {
            FlightPhase::Airborne {
                turn_alert_sent, ..
            } if !*turn_alert_sent => {
                *turn_alert_sent = true;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn mark_exited_watch_area(&mut self) -> bool {
        match &mut self.phase {
            FlightPhase::Airborne {
                exited_watch_area,
                landed: false,
                ..
            } if !*exited_watch_area => {
                *exited_watch_area = true;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> FlightRecord {
        FlightRecord::new(5, Utc::now())
    }

    #[test]
    fn test_first_events_are_exclusive() {
        let mut ground = record();
        assert!(ground.mark_appeared_on_ground());
        assert!(!ground.mark_entered_watch_area());
        assert!(ground.appeared_on_ground());
        assert!(!ground.entered_watch_area());

        let mut airborne = record();
        assert!(airborne.mark_entered_watch_area());
        assert!(!airborne.mark_appeared_on_ground());
        assert!(!airborne.flags().appeared_on_ground_in_core);
    }

    #[test]
    fn test_transitions_fire_once() {
        let mut r = record();
        assert!(r.mark_entered_watch_area());
        assert!(!r.mark_entered_watch_area());
        assert!(r.mark_entered_core());
        assert!(!r.mark_entered_core());
        assert!(r.mark_turn_alert_sent());
        assert!(!r.mark_turn_alert_sent());
        assert!(r.mark_landed());
        assert!(!r.mark_landed());
        assert!(r.is_landed());
    }

    #[test]
    fn test_landing_requires_core_entry() {
        let mut r = record();
        r.mark_entered_watch_area();
        assert!(!r.mark_landed());
    }

    #[test]
    fn test_no_exit_after_landing() {
        let mut r = record();
        r.mark_entered_watch_area();
        r.mark_entered_core();
        r.mark_landed();
        assert!(!r.mark_exited_watch_area());
    }

    #[test]
    fn test_departure_only_from_ground_origin() {
        let mut airborne = record();
        airborne.mark_entered_watch_area();
        assert!(!airborne.mark_departed());

        let mut ground = record();
        ground.mark_appeared_on_ground();
        assert!(ground.mark_departed());
        assert!(ground.flags().departed);
        assert!(!ground.mark_turn_alert_sent());
    }

    #[test]
    fn test_flags_dominate() {
        let mut r = record();
        let before = r.flags();
        r.mark_entered_watch_area();
        let after = r.flags();
        assert!(after.dominates(&before));
        assert!(!before.dominates(&after));
    }
}
