//! fencewatch - geofence membership and flight lifecycle tracking
//!
//! Polls a wide-area aircraft state feed, follows a watch-list of flights through a
//! protected area and its surrounding watch area, and reports lifecycle events
//! (entry, landing, departure, exit) and course reversals.

pub mod bearing;
pub mod callsign;
pub mod config;
pub mod cycle;
pub mod email;
pub mod event_journal;
pub mod event_sink;
pub mod flight_tracker;
pub mod geofence;
pub mod instance_lock;
pub mod log_format;
pub mod metrics;
pub mod reports;
pub mod snapshot_source;
pub mod zones;

pub use callsign::{Callsign, CallsignNormalizer, Watchlist};
pub use config::AppConfig;
pub use cycle::{CycleOrchestrator, CycleOutcome, CycleResult};
pub use flight_tracker::{
    EventKind, FlightFlags, FlightStateTracker, LifecycleEvent, Observation, TrackerSettings,
};
pub use geofence::{Geofence, GeofenceError, GeographicPoint};
