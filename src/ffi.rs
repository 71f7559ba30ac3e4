//! FFI bindings for mobile platforms (iOS/Android).
//!
//! The app's JS/native layer cannot hold a [`SessionHandle`], so this module
//! keeps the one live handle in a process-wide slot and exposes thin
//! functions over it. All exports are prefixed with `tracker_`.

use std::sync::Mutex;

use log::{info, warn};
use once_cell::sync::{Lazy, OnceCell};

use crate::session::{ActiveCardioActivity, SampleOutcome, SessionState};
use crate::{
    init_logging, ActivityType, CardioTracker, LocationPoint, SessionHandle, StartOptions,
    TrackerConfig,
};

// ============================================================================
// Global State
// ============================================================================

static TRACKER: OnceCell<CardioTracker> = OnceCell::new();

static ACTIVE: Lazy<Mutex<Option<SessionHandle>>> = Lazy::new(|| Mutex::new(None));

fn tracker() -> &'static CardioTracker {
    TRACKER.get_or_init(|| CardioTracker::new(TrackerConfig::default()))
}

fn with_active<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&SessionHandle) -> R,
{
    let active = ACTIVE.lock().unwrap_or_else(|e| e.into_inner());
    active.as_ref().map(f)
}

fn take_active() -> Option<SessionHandle> {
    ACTIVE.lock().unwrap_or_else(|e| e.into_inner()).take()
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Initialize the tracker (call once at app startup).
///
/// `config_json` may be empty to use defaults. Returns false if the JSON is
/// invalid or the tracker was already initialized.
#[uniffi::export]
pub fn tracker_init(config_json: String) -> bool {
    init_logging();
    let config = if config_json.trim().is_empty() {
        TrackerConfig::default()
    } else {
        match TrackerConfig::from_json(&config_json) {
            Ok(config) => config,
            Err(e) => {
                warn!("[CardioTracker] Ignoring config: {}", e);
                return false;
            }
        }
    };
    let initialized = TRACKER.set(CardioTracker::new(config)).is_ok();
    info!("[CardioTracker] Initialized (fresh: {})", initialized);
    initialized
}

/// Start a session. Returns false if one is already live.
#[uniffi::export]
pub fn tracker_start(
    activity_type: ActivityType,
    body_weight_kg: Option<f64>,
    initial_steps: Option<u64>,
) -> bool {
    let options = StartOptions {
        body_weight_kg,
        initial_steps,
    };
    match tracker().start_with(activity_type, options) {
        Ok(handle) => {
            *ACTIVE.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
            true
        }
        Err(e) => {
            warn!("[CardioTracker] start failed: {}", e);
            false
        }
    }
}

#[uniffi::export]
pub fn tracker_pause() -> bool {
    with_active(|h| h.pause().is_ok()).unwrap_or(false)
}

#[uniffi::export]
pub fn tracker_resume() -> bool {
    with_active(|h| h.resume().is_ok()).unwrap_or(false)
}

/// Stop the session and return the finished record as JSON.
/// Returns an empty string if no session was live.
#[uniffi::export]
pub fn tracker_stop() -> String {
    let Some(handle) = take_active() else {
        return String::new();
    };
    match handle.stop() {
        Ok(record) => record.to_json(),
        Err(e) => {
            warn!("[CardioTracker] stop failed: {}", e);
            String::new()
        }
    }
}

#[uniffi::export]
pub fn tracker_discard() -> bool {
    take_active().is_some_and(|h| h.discard().is_ok())
}

// ============================================================================
// Samples
// ============================================================================

/// Feed one location sample. Returns true if it entered the route.
#[uniffi::export]
pub fn tracker_ingest_location(point: LocationPoint) -> bool {
    with_active(|h| matches!(h.ingest_location(point), SampleOutcome::Accepted { .. }))
        .unwrap_or(false)
}

/// Feed a batch of samples delivered together by the platform.
/// Returns the number accepted.
#[uniffi::export]
pub fn tracker_ingest_locations(points: Vec<LocationPoint>) -> u32 {
    with_active(|h| {
        points
            .into_iter()
            .filter(|p| matches!(h.ingest_location(*p), SampleOutcome::Accepted { .. }))
            .count() as u32
    })
    .unwrap_or(0)
}

#[uniffi::export]
pub fn tracker_ingest_step_count(raw: u64) {
    with_active(|h| h.ingest_step_count(raw));
}

// ============================================================================
// Queries
// ============================================================================

#[uniffi::export]
pub fn tracker_state() -> SessionState {
    with_active(|h| h.state()).unwrap_or(SessionState::Idle)
}

#[uniffi::export]
pub fn tracker_snapshot() -> Option<ActiveCardioActivity> {
    tracker().snapshot()
}

/// Live session as JSON, or empty string when idle.
#[uniffi::export]
pub fn tracker_snapshot_json() -> String {
    tracker()
        .snapshot()
        .and_then(|s| serde_json::to_string(&s).ok())
        .unwrap_or_default()
}

/// Tracking time so far in milliseconds (0 when idle).
#[uniffi::export]
pub fn tracker_elapsed_ms() -> i64 {
    with_active(|h| h.tracking_duration_ms())
        .flatten()
        .unwrap_or(0)
}

/// Pace so far in seconds per kilometre, or None before any distance.
#[uniffi::export]
pub fn tracker_current_pace() -> Option<f64> {
    with_active(|h| h.current_pace_secs_per_km()).flatten()
}
