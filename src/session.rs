//! # Session State Machine
//!
//! Owns the lifecycle of one cardio session and the live
//! [`ActiveCardioActivity`] it mutates.
//!
//! ```text
//!            start            pause
//!   Idle ───────────► Tracking ◄────► Paused
//!                        │     resume    │
//!                        └──────┬────────┘
//!                     stop      │      discard
//!                 Completed ◄───┴───► Discarded
//! ```
//!
//! Only `Tracking` accepts samples. Samples fed in any other state are
//! dropped, not buffered, so paused time never reaches the route or the
//! distance. Durations are computed from wall-clock timestamps, which makes
//! app suspension an ordinary gap between samples.
//!
//! `Session` has no interior locking; [`crate::CardioTracker`] serializes
//! access to it.

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};
use crate::filter::{self, FilterConfig, FilterDecision, RejectReason};
use crate::metrics::{self, Segment};
use crate::{ActivityType, LocationPoint};

// ============================================================================
// Types
// ============================================================================

/// Lifecycle state of a session. `Completed` and `Discarded` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Tracking,
    Paused,
    Completed,
    Discarded,
}

impl SessionState {
    /// Tracking or paused.
    pub fn is_live(&self) -> bool {
        matches!(self, SessionState::Tracking | SessionState::Paused)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Tracking => "tracking",
            SessionState::Paused => "paused",
            SessionState::Completed => "completed",
            SessionState::Discarded => "discarded",
        };
        f.write_str(name)
    }
}

/// Per-session sample counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[serde(rename_all = "camelCase")]
pub struct SampleStats {
    pub accepted: u32,
    pub rejected: u32,
    /// Delivered while paused
    pub dropped: u32,
}

/// A completed pause, in Unix ms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[serde(rename_all = "camelCase")]
pub struct PauseInterval {
    pub started_at: i64,
    pub ended_at: i64,
}

impl PauseInterval {
    /// Milliseconds of this pause that fall inside `[from, to]`.
    pub fn overlap_ms(&self, from: i64, to: i64) -> i64 {
        (self.ended_at.min(to) - self.started_at.max(from)).max(0)
    }
}

/// The live, mutable session.
///
/// Consumers only ever see clones of this (see [`crate::CardioTracker::snapshot`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[serde(rename_all = "camelCase")]
pub struct ActiveCardioActivity {
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    /// Unix timestamp (ms) of `start`
    pub started_at: i64,
    /// Unix timestamp (ms) of the pending `pause`; set iff paused
    pub paused_at: Option<i64>,
    /// Sum of completed pause intervals in ms
    pub total_paused_duration_ms: i64,
    /// Completed pauses, oldest first
    pub pauses: Vec<PauseInterval>,
    /// Meters, sum of haversine distances along `route`
    pub distance: f64,
    pub route: Vec<LocationPoint>,
    pub is_tracking: bool,
    /// Steps taken this session
    pub steps: Option<u64>,
    /// Raw counter value steps are measured from
    pub initial_steps: Option<u64>,
    /// Speed of the most recent segment in m/s
    pub current_speed: Option<f64>,
    /// Fastest segment speed in m/s
    pub max_speed: Option<f64>,
    pub samples: SampleStats,
}

impl ActiveCardioActivity {
    fn new(activity_type: ActivityType, started_at: i64, initial_steps: Option<u64>) -> Self {
        Self {
            activity_type,
            started_at,
            paused_at: None,
            total_paused_duration_ms: 0,
            pauses: Vec::new(),
            distance: 0.0,
            route: Vec::new(),
            is_tracking: true,
            steps: initial_steps.map(|_| 0),
            initial_steps,
            current_speed: None,
            max_speed: None,
            samples: SampleStats::default(),
        }
    }

    /// Paused time up to `now`, including a pause still in progress.
    pub fn paused_duration_ms(&self, now: i64) -> i64 {
        let in_flight = self
            .paused_at
            .map(|paused_at| (now - paused_at).max(0))
            .unwrap_or(0);
        self.total_paused_duration_ms + in_flight
    }

    /// Tracking time up to `now` in ms, paused intervals excluded.
    pub fn tracking_duration_ms(&self, now: i64) -> i64 {
        ((now - self.started_at) - self.paused_duration_ms(now)).max(0)
    }

    /// Pace so far in seconds per kilometre.
    pub fn current_pace_secs_per_km(&self, now: i64) -> Option<f64> {
        metrics::pace_secs_per_km(self.tracking_duration_ms(now) as f64 / 1000.0, self.distance)
    }

    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            activity_type: self.activity_type,
            started_at: self.started_at,
            is_tracking: self.is_tracking,
            total_paused_duration_ms: self.total_paused_duration_ms,
            distance: self.distance,
            route_len: self.route.len(),
            current_speed: self.current_speed,
            max_speed: self.max_speed,
            steps: self.steps,
            samples: self.samples,
        }
    }

    // Ends the pending pause, if any, at `now`.
    fn close_pause(&mut self, now: i64) {
        if let Some(paused_at) = self.paused_at.take() {
            let ended_at = now.max(paused_at);
            self.total_paused_duration_ms += ended_at - paused_at;
            self.pauses.push(PauseInterval {
                started_at: paused_at,
                ended_at,
            });
        }
    }
}

/// Route-free summary of the live session, small enough to send on every
/// accepted sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProgress {
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub started_at: i64,
    pub is_tracking: bool,
    pub total_paused_duration_ms: i64,
    /// Meters
    pub distance: f64,
    pub route_len: usize,
    pub current_speed: Option<f64>,
    pub max_speed: Option<f64>,
    pub steps: Option<u64>,
    pub samples: SampleStats,
}

/// What happened to an ingested location sample.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleOutcome {
    /// Appended to the route. `segment` is `None` for the first point.
    Accepted { segment: Option<Segment> },
    /// Kept out of the route by the filter
    Rejected(RejectReason),
    /// Session is not tracking; sample ignored
    Dropped(SessionState),
}

/// What happened to a raw step counter reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Counted { steps: u64 },
    /// Baseline moved to the reading (first reading or counter regression);
    /// `steps` carries what was counted before.
    Rebaselined { steps: u64 },
    Dropped(SessionState),
}

/// A stopped session, ready for [`crate::finalize`].
///
/// Only [`Session::stop_at`] can produce one.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedSession {
    pub(crate) activity: ActiveCardioActivity,
    pub(crate) completed_at: i64,
    pub(crate) tracking_duration_ms: i64,
    pub(crate) body_weight_kg: Option<f64>,
}

impl CompletedSession {
    pub fn activity(&self) -> &ActiveCardioActivity {
        &self.activity
    }

    pub fn completed_at(&self) -> i64 {
        self.completed_at
    }

    /// `(completed_at - started_at) - paused time`, in ms.
    pub fn tracking_duration_ms(&self) -> i64 {
        self.tracking_duration_ms
    }

    pub fn body_weight_kg(&self) -> Option<f64> {
        self.body_weight_kg
    }
}

// ============================================================================
// Session
// ============================================================================

/// Single-session state machine.
#[derive(Debug, Clone)]
pub struct Session {
    state: SessionState,
    activity: Option<ActiveCardioActivity>,
    filter: FilterConfig,
    body_weight_kg: Option<f64>,
    // Steps counted before the latest re-baseline
    step_carry: u64,
    last_raw_steps: Option<u64>,
}

impl Session {
    /// Create an idle session.
    pub fn new(filter: FilterConfig) -> Self {
        Self {
            state: SessionState::Idle,
            activity: None,
            filter,
            body_weight_kg: None,
            step_carry: 0,
            last_raw_steps: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The live activity, present while tracking or paused.
    pub fn activity(&self) -> Option<&ActiveCardioActivity> {
        self.activity.as_ref()
    }

    pub fn set_body_weight(&mut self, body_weight_kg: Option<f64>) {
        self.body_weight_kg = body_weight_kg;
    }

    fn invalid(&self, action: &'static str) -> TrackerError {
        TrackerError::InvalidTransition {
            from: self.state,
            action,
        }
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// `Idle → Tracking`.
    pub fn start_at(
        &mut self,
        activity_type: ActivityType,
        now: i64,
        initial_steps: Option<u64>,
    ) -> Result<()> {
        if self.state != SessionState::Idle {
            return Err(self.invalid("start"));
        }
        self.activity = Some(ActiveCardioActivity::new(activity_type, now, initial_steps));
        self.last_raw_steps = initial_steps;
        self.step_carry = 0;
        self.state = SessionState::Tracking;
        Ok(())
    }

    /// `Tracking → Paused`.
    pub fn pause_at(&mut self, now: i64) -> Result<()> {
        if self.state != SessionState::Tracking {
            return Err(self.invalid("pause"));
        }
        let activity = self.activity.as_mut().ok_or(TrackerError::InvalidTransition {
            from: SessionState::Idle,
            action: "pause",
        })?;
        activity.is_tracking = false;
        activity.paused_at = Some(now);
        activity.current_speed = None;
        self.state = SessionState::Paused;
        Ok(())
    }

    /// `Paused → Tracking`. The pause interval joins the paused total.
    pub fn resume_at(&mut self, now: i64) -> Result<()> {
        if self.state != SessionState::Paused {
            return Err(self.invalid("resume"));
        }
        let activity = self.activity.as_mut().ok_or(TrackerError::InvalidTransition {
            from: SessionState::Idle,
            action: "resume",
        })?;
        activity.close_pause(now);
        activity.is_tracking = true;
        self.state = SessionState::Tracking;
        Ok(())
    }

    /// `Tracking | Paused → Completed`.
    ///
    /// A pause still in progress is folded into the paused total before the
    /// tracking duration is frozen.
    pub fn stop_at(&mut self, now: i64) -> Result<CompletedSession> {
        if !self.state.is_live() {
            return Err(self.invalid("stop"));
        }
        let mut activity = self.activity.take().ok_or(TrackerError::InvalidTransition {
            from: SessionState::Idle,
            action: "stop",
        })?;

        activity.close_pause(now);
        activity.is_tracking = false;
        activity.current_speed = None;

        let tracking_duration_ms = activity.tracking_duration_ms(now);
        self.state = SessionState::Completed;

        Ok(CompletedSession {
            activity,
            completed_at: now,
            tracking_duration_ms,
            body_weight_kg: self.body_weight_kg,
        })
    }

    /// `Tracking | Paused → Discarded`. Releases the route buffer.
    pub fn discard(&mut self) -> Result<()> {
        if !self.state.is_live() {
            return Err(self.invalid("discard"));
        }
        self.activity = None;
        self.state = SessionState::Discarded;
        Ok(())
    }

    // ========================================================================
    // Sample Ingestion
    // ========================================================================

    /// Feed a location sample. Only `Tracking` sessions accept samples.
    pub fn ingest_location(&mut self, point: LocationPoint) -> SampleOutcome {
        let state = self.state;
        let activity = match (state, self.activity.as_mut()) {
            (SessionState::Tracking, Some(activity)) => activity,
            (_, activity) => {
                if let Some(activity) = activity {
                    activity.samples.dropped += 1;
                }
                trace!("[CardioTracker] Dropped sample while {}", state);
                return SampleOutcome::Dropped(state);
            }
        };

        let decision = filter::accept(
            &point,
            activity.route.last(),
            activity.activity_type,
            &self.filter,
        );
        if let FilterDecision::Rejected(reason) = decision {
            activity.samples.rejected += 1;
            debug!("[CardioTracker] Rejected sample at {}: {}", point.timestamp, reason);
            return SampleOutcome::Rejected(reason);
        }

        let segment = activity.route.last().map(|last| metrics::segment(last, &point));
        match segment {
            Some(seg) => {
                activity.distance += seg.distance;
                activity.current_speed = Some(seg.speed);
                activity.max_speed = Some(activity.max_speed.map_or(seg.speed, |m| m.max(seg.speed)));
            }
            None => {
                activity.current_speed = point.speed.filter(|s| s.is_finite() && *s >= 0.0);
            }
        }
        activity.route.push(point);
        activity.samples.accepted += 1;

        SampleOutcome::Accepted { segment }
    }

    /// Feed a raw (device-wide, cumulative) step counter reading.
    pub fn ingest_step_count(&mut self, raw: u64) -> StepOutcome {
        let state = self.state;
        let activity = match (state, self.activity.as_mut()) {
            (SessionState::Tracking, Some(activity)) => activity,
            _ => return StepOutcome::Dropped(state),
        };

        let counted = activity.steps.unwrap_or(0);
        let regressed = self.last_raw_steps.is_some_and(|last| raw < last);
        if regressed {
            warn!(
                "[CardioTracker] Step counter went backwards ({:?} -> {}), re-baselining",
                self.last_raw_steps, raw
            );
        }

        let outcome = match activity.initial_steps {
            Some(initial) if !regressed => {
                let steps = self.step_carry + raw.saturating_sub(initial);
                activity.steps = Some(steps);
                StepOutcome::Counted { steps }
            }
            _ => {
                self.step_carry = counted;
                activity.initial_steps = Some(raw);
                activity.steps = Some(counted);
                StepOutcome::Rebaselined { steps: counted }
            }
        };

        self.last_raw_steps = Some(raw);
        outcome
    }
}

// ============================================================================
// Tests
// ============================================================================
