//! # Cardio Tracker
//!
//! Live cardio activity tracking for the mobile app.
//!
//! This library provides:
//! - Validation and jitter suppression for raw GPS samples
//! - Distance, speed and pace from accepted samples (haversine)
//! - A pause/resume-aware session state machine with step counting
//! - MET-based calorie estimates
//! - Finalized, immutable activity records ready for persistence
//!
//! ## Features
//!
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use cardio_tracker::{ActivityType, CardioTracker, LocationPoint, TrackerConfig};
//!
//! let tracker = CardioTracker::new(TrackerConfig::default());
//! let session = tracker.start(ActivityType::Running).unwrap();
//!
//! // Feed samples as the platform location service delivers them
//! session.ingest_location(LocationPoint::new(51.5074, -0.1278, 1_700_000_000_000));
//! session.ingest_location(LocationPoint::new(51.5080, -0.1278, 1_700_000_010_000));
//!
//! let activity = session.stop().unwrap();
//! println!("{:.0}m in {:.0}s", activity.distance(), activity.duration());
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{Result, TrackerError};

// Time source for lifecycle transitions
pub mod clock;
pub use clock::{Clock, ManualClock, SystemClock};

// Tracker configuration
pub mod config;
pub use config::{StartOptions, TrackerConfig};

// Location sample filter (pure accept/reject rules)
pub mod filter;
pub use filter::{accept, FilterConfig, FilterDecision, RejectReason};

// Distance, speed and pace calculations
pub mod metrics;
pub use metrics::{haversine_distance, route_distance, Segment};

// Session state machine
pub mod session;
pub use session::{
    ActiveCardioActivity, CompletedSession, Session, SessionProgress, SessionState,
};

// Calorie estimation (MET tables)
pub mod calories;
pub use calories::{CalorieEstimate, CalorieEstimator};

// Per-kilometre splits and elevation
pub mod splits;
pub use splits::{compute_splits, elevation_gain, Split};

// Finalized activity records
pub mod finalizer;
pub use finalizer::{finalize, CardioActivity};

// Thread-safe tracker with owned session handles
pub mod tracker;
pub use tracker::{ActivitySink, CardioTracker, SessionEvent, SessionHandle, SessionSubscription};

// FFI bindings for mobile platforms (iOS/Android)
#[cfg(feature = "ffi")]
pub mod ffi;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
pub(crate) fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("CardioTrackerRust"),
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
pub(crate) fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A recorded location sample.
///
/// `timestamp` is Unix epoch time in milliseconds, as delivered by the
/// platform location service.
///
/// # Example
/// ```
/// use cardio_tracker::LocationPoint;
/// let point = LocationPoint::new(51.5074, -0.1278, 1_700_000_000_000)
///     .with_altitude(35.0);
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[serde(rename_all = "camelCase")]
pub struct LocationPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    /// Altitude in meters (optional)
    pub altitude: Option<f64>,
    /// Device-reported speed in m/s (optional)
    pub speed: Option<f64>,
}

impl LocationPoint {
    /// Create a new location sample without altitude or speed.
    pub fn new(latitude: f64, longitude: f64, timestamp: i64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp,
            altitude: None,
            speed: None,
        }
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Kind of cardio session being tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Running,
    Walking,
    Hiking,
    Cycling,
    Treadmill,
    Elliptical,
}

impl ActivityType {
    /// Fastest speed (m/s) a sample pair may imply before it is treated as a
    /// GPS jump.
    pub fn max_plausible_speed(&self) -> f64 {
        match self {
            ActivityType::Walking | ActivityType::Hiking => 6.0,
            ActivityType::Running | ActivityType::Treadmill | ActivityType::Elliptical => 12.5,
            ActivityType::Cycling => 30.0,
        }
    }

    /// Indoor sessions rely on the step counter rather than GPS.
    pub fn is_indoor(&self) -> bool {
        matches!(self, ActivityType::Treadmill | ActivityType::Elliptical)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Running => "running",
            ActivityType::Walking => "walking",
            ActivityType::Hiking => "hiking",
            ActivityType::Cycling => "cycling",
            ActivityType::Treadmill => "treadmill",
            ActivityType::Elliptical => "elliptical",
        }
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================
