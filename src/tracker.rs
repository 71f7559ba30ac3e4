//! # Cardio Tracker
//!
//! Thread-safe front door to the session state machine.
//!
//! ## Architecture
//!
//! The tracker owns a single session slot. `start` fills it and returns a
//! [`SessionHandle`]; only that handle can mutate the session. Every
//! transition and every ingested sample goes through one mutex, so a pause
//! racing a sample (or a resume racing a stop) is applied in some order,
//! never interleaved.
//!
//! Consumers never touch the session directly. They either poll
//! [`CardioTracker::snapshot`] (a clone) or [`CardioTracker::subscribe`] to a
//! channel of [`SessionEvent`]s, so the UI can come and go without the
//! tracker knowing about it. Finished records also go to the optional
//! [`ActivitySink`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, info, warn};

use crate::calories::CalorieEstimator;
use crate::clock::{Clock, SystemClock};
use crate::config::{StartOptions, TrackerConfig};
use crate::error::{Result, TrackerError};
use crate::filter::RejectReason;
use crate::finalizer::{finalize, CardioActivity};
use crate::session::{
    ActiveCardioActivity, SampleOutcome, Session, SessionProgress, SessionState, StepOutcome,
};
use crate::{ActivityType, LocationPoint};

// ============================================================================
// Collaborator Interfaces
// ============================================================================

/// Receives finished activities (history/persistence collaborator).
pub trait ActivitySink: Send + Sync {
    /// Called once per stopped session, after the record is final.
    fn on_activity_completed(&self, activity: &CardioActivity);
}

/// Tracker events, delivered to every subscriber in order.
///
/// Live-session events carry a [`SessionProgress`] rather than the route, so
/// a subscriber that stops reading holds a constant amount per event. Use
/// [`CardioTracker::snapshot`] for the full route.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Started(SessionProgress),
    /// An accepted sample or step reading changed the session
    Updated(SessionProgress),
    SampleRejected(RejectReason),
    Paused(SessionProgress),
    Resumed(SessionProgress),
    Completed(CardioActivity),
    Discarded,
}

/// Receiving end of [`CardioTracker::subscribe`].
pub struct SessionSubscription {
    receiver: mpsc::Receiver<SessionEvent>,
}

impl SessionSubscription {
    /// Next event, if one is waiting (non-blocking).
    pub fn try_recv(&self) -> Option<SessionEvent> {
        self.receiver.try_recv().ok()
    }

    /// Wait up to `timeout` for the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<SessionEvent> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// All events currently waiting.
    pub fn drain(&self) -> Vec<SessionEvent> {
        self.receiver.try_iter().collect()
    }
}

// ============================================================================
// Tracker
// ============================================================================

struct Slot {
    session_id: u64,
    session: Session,
}

struct TrackerInner {
    config: TrackerConfig,
    estimator: CalorieEstimator,
    clock: Arc<dyn Clock>,
    sink: Mutex<Option<Arc<dyn ActivitySink>>>,
    slot: Mutex<Option<Slot>>,
    subscribers: Mutex<Vec<mpsc::Sender<SessionEvent>>>,
    next_session_id: AtomicU64,
}

// A panicking subscriber or sink must not take the tracker down with it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl TrackerInner {
    fn emit(&self, event: SessionEvent) {
        let mut subscribers = lock(&self.subscribers);
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

/// Owns the one-at-a-time session slot. Cheap to clone.
#[derive(Clone)]
pub struct CardioTracker {
    inner: Arc<TrackerInner>,
}

impl CardioTracker {
    /// Create a tracker using the system clock.
    pub fn new(config: TrackerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a tracker with a custom time source.
    pub fn with_clock(config: TrackerConfig, clock: Arc<dyn Clock>) -> Self {
        let estimator = CalorieEstimator::new(config.default_body_weight_kg);
        Self {
            inner: Arc::new(TrackerInner {
                config,
                estimator,
                clock,
                sink: Mutex::new(None),
                slot: Mutex::new(None),
                subscribers: Mutex::new(Vec::new()),
                next_session_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.inner.config
    }

    /// Set the collaborator that receives finished activities.
    pub fn set_sink(&self, sink: Arc<dyn ActivitySink>) {
        *lock(&self.inner.sink) = Some(sink);
    }

    /// Start a session with the tracker's defaults.
    pub fn start(&self, activity_type: ActivityType) -> Result<SessionHandle> {
        self.start_with(activity_type, StartOptions::default())
    }

    /// Start a session.
    ///
    /// Fails with [`TrackerError::SessionAlreadyActive`] while another
    /// session is tracking or paused.
    pub fn start_with(
        &self,
        activity_type: ActivityType,
        options: StartOptions,
    ) -> Result<SessionHandle> {
        let mut slot = lock(&self.inner.slot);
        if let Some(active) = slot.as_ref() {
            let started_at = active
                .session
                .activity()
                .map(|a| a.started_at)
                .unwrap_or_default();
            return Err(TrackerError::SessionAlreadyActive { started_at });
        }

        let now = self.inner.clock.now_ms();
        let mut session = Session::new(self.inner.config.filter.clone());
        session.set_body_weight(options.body_weight_kg.or(self.inner.config.body_weight_kg));
        session.start_at(activity_type, now, options.initial_steps)?;

        let session_id = self.inner.next_session_id.fetch_add(1, Ordering::SeqCst);
        if let Some(activity) = session.activity() {
            self.inner.emit(SessionEvent::Started(activity.progress()));
        }
        *slot = Some(Slot {
            session_id,
            session,
        });

        info!(
            "[CardioTracker] Started {} session #{} at {}",
            activity_type, session_id, now
        );

        Ok(SessionHandle {
            inner: Arc::clone(&self.inner),
            session_id,
            closed_as: Mutex::new(None),
        })
    }

    /// Read-only copy of the live session, if any.
    pub fn snapshot(&self) -> Option<ActiveCardioActivity> {
        lock(&self.inner.slot)
            .as_ref()
            .and_then(|slot| slot.session.activity().cloned())
    }

    /// True while a session is tracking or paused.
    pub fn has_active_session(&self) -> bool {
        lock(&self.inner.slot).is_some()
    }

    /// Receive session events from now on.
    pub fn subscribe(&self) -> SessionSubscription {
        let (tx, rx) = mpsc::channel();
        lock(&self.inner.subscribers).push(tx);
        SessionSubscription { receiver: rx }
    }
}

// ============================================================================
// Session Handle
// ============================================================================

/// Exclusive control over one running session.
///
/// Dropping a handle whose session is still live discards the session, so an
/// abandoned handle never blocks the next `start`.
pub struct SessionHandle {
    inner: Arc<TrackerInner>,
    session_id: u64,
    closed_as: Mutex<Option<SessionState>>,
}

impl SessionHandle {
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    // Runs `f` on this handle's session while holding the slot lock.
    fn with_session<R>(
        &self,
        action: &'static str,
        f: impl FnOnce(&mut Option<Slot>) -> Result<R>,
    ) -> Result<R> {
        let mut slot = lock(&self.inner.slot);
        let owned = slot
            .as_ref()
            .is_some_and(|active| active.session_id == self.session_id);
        if !owned {
            return Err(self.closed_error(action));
        }
        f(&mut *slot)
    }

    // The slot only empties through `stop`/`discard`, which record the state.
    fn closed_state(&self) -> SessionState {
        lock(&self.closed_as).unwrap_or(SessionState::Discarded)
    }

    fn closed_error(&self, action: &'static str) -> TrackerError {
        TrackerError::InvalidTransition {
            from: self.closed_state(),
            action,
        }
    }

    fn close(&self, state: SessionState) {
        *lock(&self.closed_as) = Some(state);
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        let slot = lock(&self.inner.slot);
        match slot.as_ref() {
            Some(active) if active.session_id == self.session_id => active.session.state(),
            _ => self.closed_state(),
        }
    }

    // Reads this handle's live activity under the slot lock, without cloning.
    fn read_activity<R>(&self, f: impl FnOnce(&ActiveCardioActivity) -> R) -> Option<R> {
        let slot = lock(&self.inner.slot);
        slot.as_ref()
            .filter(|active| active.session_id == self.session_id)
            .and_then(|active| active.session.activity())
            .map(f)
    }

    /// Read-only copy of this session while it is live.
    pub fn snapshot(&self) -> Option<ActiveCardioActivity> {
        self.read_activity(ActiveCardioActivity::clone)
    }

    /// Route-free summary of this session while it is live.
    pub fn progress(&self) -> Option<SessionProgress> {
        self.read_activity(ActiveCardioActivity::progress)
    }

    /// Tracking time so far in ms, paused time excluded.
    pub fn tracking_duration_ms(&self) -> Option<i64> {
        let now = self.inner.clock.now_ms();
        self.read_activity(|a| a.tracking_duration_ms(now))
    }

    /// Pace so far in seconds per kilometre; `None` before any distance.
    pub fn current_pace_secs_per_km(&self) -> Option<f64> {
        let now = self.inner.clock.now_ms();
        self.read_activity(|a| a.current_pace_secs_per_km(now)).flatten()
    }

    /// Feed a location sample from the platform location service.
    ///
    /// Samples are dropped unless the session is tracking, and kept out of
    /// the route if the filter rejects them.
    pub fn ingest_location(&self, point: LocationPoint) -> SampleOutcome {
        let result = self.with_session("ingest", |slot| {
            let Some(active) = slot.as_mut() else {
                return Ok(SampleOutcome::Dropped(SessionState::Idle));
            };
            let outcome = active.session.ingest_location(point);
            match &outcome {
                SampleOutcome::Accepted { .. } if self.inner.config.emit_sample_updates => {
                    if let Some(activity) = active.session.activity() {
                        self.inner.emit(SessionEvent::Updated(activity.progress()));
                    }
                }
                SampleOutcome::Rejected(reason) => {
                    self.inner.emit(SessionEvent::SampleRejected(reason.clone()));
                }
                _ => {}
            }
            Ok(outcome)
        });
        result.unwrap_or_else(|_| SampleOutcome::Dropped(self.state()))
    }

    /// Feed a raw, device-wide step counter reading.
    pub fn ingest_step_count(&self, raw: u64) -> StepOutcome {
        let result = self.with_session("ingest", |slot| {
            let Some(active) = slot.as_mut() else {
                return Ok(StepOutcome::Dropped(SessionState::Idle));
            };
            let outcome = active.session.ingest_step_count(raw);
            if !matches!(outcome, StepOutcome::Dropped(_)) && self.inner.config.emit_sample_updates
            {
                if let Some(activity) = active.session.activity() {
                    self.inner.emit(SessionEvent::Updated(activity.progress()));
                }
            }
            Ok(outcome)
        });
        result.unwrap_or_else(|_| StepOutcome::Dropped(self.state()))
    }

    /// `Tracking → Paused`.
    pub fn pause(&self) -> Result<()> {
        self.with_session("pause", |slot| {
            let Some(active) = slot.as_mut() else {
                return Err(self.closed_error("pause"));
            };
            active.session.pause_at(self.inner.clock.now_ms())?;
            if let Some(activity) = active.session.activity() {
                debug!("[CardioTracker] Paused session #{}", self.session_id);
                self.inner.emit(SessionEvent::Paused(activity.progress()));
            }
            Ok(())
        })
    }

    /// `Paused → Tracking`.
    pub fn resume(&self) -> Result<()> {
        self.with_session("resume", |slot| {
            let Some(active) = slot.as_mut() else {
                return Err(self.closed_error("resume"));
            };
            active.session.resume_at(self.inner.clock.now_ms())?;
            if let Some(activity) = active.session.activity() {
                debug!(
                    "[CardioTracker] Resumed session #{} ({}ms paused so far)",
                    self.session_id, activity.total_paused_duration_ms
                );
                self.inner.emit(SessionEvent::Resumed(activity.progress()));
            }
            Ok(())
        })
    }

    /// `Tracking | Paused → Completed`. Returns the finalized record, which
    /// is also passed to the tracker's [`ActivitySink`].
    pub fn stop(&self) -> Result<CardioActivity> {
        let record = self.with_session("stop", |slot| {
            let Some(active) = slot.as_mut() else {
                return Err(self.closed_error("stop"));
            };
            let completed = active.session.stop_at(self.inner.clock.now_ms())?;
            let record = finalize(completed, &self.inner.estimator);
            *slot = None;
            self.close(SessionState::Completed);

            info!(
                "[CardioTracker] Completed session #{}: {:.0}m in {:.0}s ({} points)",
                self.session_id,
                record.distance(),
                record.duration(),
                record.route().len()
            );
            self.inner.emit(SessionEvent::Completed(record.clone()));
            Ok(record)
        })?;

        let sink = lock(&self.inner.sink).clone();
        if let Some(sink) = sink {
            sink.on_activity_completed(&record);
        }
        Ok(record)
    }

    /// `Tracking | Paused → Discarded`. Releases the route buffer and frees
    /// the tracker for the next `start`.
    pub fn discard(&self) -> Result<()> {
        self.with_session("discard", |slot| {
            let Some(active) = slot.as_mut() else {
                return Err(self.closed_error("discard"));
            };
            active.session.discard()?;
            *slot = None;
            self.close(SessionState::Discarded);
            info!("[CardioTracker] Discarded session #{}", self.session_id);
            self.inner.emit(SessionEvent::Discarded);
            Ok(())
        })
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if lock(&self.closed_as).is_some() {
            return;
        }
        let owns_slot = lock(&self.inner.slot)
            .as_ref()
            .is_some_and(|active| active.session_id == self.session_id);
        if owns_slot {
            warn!(
                "[CardioTracker] Session #{} handle dropped while live, discarding",
                self.session_id
            );
            self.discard().ok();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
