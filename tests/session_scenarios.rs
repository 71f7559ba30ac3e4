//! End-to-end session scenarios driven through the public tracker API
//! with a manual clock.

use std::sync::Arc;

use cardio_tracker::{
    route_distance, ActivityType, CardioTracker, LocationPoint, ManualClock, SessionEvent,
    SessionState, StartOptions, TrackerConfig, TrackerError,
};

const T0: i64 = 1_700_000_000_000;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn setup() -> (CardioTracker, Arc<ManualClock>) {
    init_logging();
    let clock = Arc::new(ManualClock::new(T0));
    let tracker = CardioTracker::with_clock(TrackerConfig::default(), clock.clone());
    (tracker, clock)
}

fn at(lat: f64, lng: f64, secs: i64) -> LocationPoint {
    LocationPoint::new(lat, lng, T0 + secs * 1000)
}

#[test]
fn running_111m_in_60s() {
    let (tracker, clock) = setup();
    let session = tracker.start(ActivityType::Running).unwrap();

    session.ingest_location(at(0.0, 0.0, 0));
    session.ingest_location(at(0.0, 0.001, 60));
    clock.advance_secs(60);

    let activity = session.stop().unwrap();
    assert!((activity.distance() - 111.19).abs() < 0.1);
    assert_eq!(activity.duration(), 60.0);
    assert!((activity.average_speed().unwrap() - 1.85).abs() < 0.01);
}

#[test]
fn pause_resume_then_stop_without_movement() {
    let (tracker, clock) = setup();
    let session = tracker.start(ActivityType::Running).unwrap();

    session.ingest_location(at(0.0, 0.0, 0));
    session.ingest_location(at(0.0, 0.001, 60));

    clock.set(T0 + 60_000);
    session.pause().unwrap();
    // Samples during the pause never reach the route
    session.ingest_location(at(0.0, 0.0015, 75));

    clock.set(T0 + 90_000);
    session.resume().unwrap();

    clock.set(T0 + 150_000);
    let activity = session.stop().unwrap();

    assert_eq!(activity.duration(), 120.0);
    assert_eq!(activity.paused_duration(), Some(30.0));
    assert_eq!(activity.route().len(), 2);
    assert!((activity.distance() - 111.19).abs() < 0.1);
}

#[test]
fn pause_while_idle_is_invalid_transition() {
    let (tracker, _clock) = setup();
    let session = tracker.start(ActivityType::Walking).unwrap();
    session.discard().unwrap();

    let err = session.pause().unwrap_err();
    assert!(err.is_invalid_transition());
    assert_eq!(session.state(), SessionState::Discarded);
    assert!(!tracker.has_active_session());
}

#[test]
fn resume_without_pause_leaves_state_unchanged() {
    let (tracker, _clock) = setup();
    let session = tracker.start(ActivityType::Walking).unwrap();

    let err = session.resume().unwrap_err();
    assert_eq!(
        err,
        TrackerError::InvalidTransition {
            from: SessionState::Tracking,
            action: "resume"
        }
    );
    assert_eq!(session.state(), SessionState::Tracking);
    session.discard().unwrap();
}

#[test]
fn distance_matches_route_for_noisy_trace() {
    let (tracker, clock) = setup();
    let session = tracker.start(ActivityType::Running).unwrap();

    // Steady run north with a duplicate, a jump and some stationary jitter
    let mut samples = Vec::new();
    for i in 0..60 {
        samples.push(at(i as f64 * 0.00003, 0.0, i * 2));
    }
    samples.insert(10, at(0.5, 0.5, 19)); // GPS jump
    samples.insert(20, samples[19]); // duplicate
    // Half a metre, half a second after the last fix
    samples.push(LocationPoint::new(59.0 * 0.00003 + 0.000005, 0.0, T0 + 118_500));

    let mut last_distance = 0.0;
    for sample in samples {
        session.ingest_location(sample);
        let snapshot = session.snapshot().unwrap();
        assert!(snapshot.distance >= last_distance);
        last_distance = snapshot.distance;
    }

    let snapshot = session.snapshot().unwrap();
    assert!((snapshot.distance - route_distance(&snapshot.route)).abs() < 1e-6);
    assert!(snapshot
        .route
        .windows(2)
        .all(|w| w[0].timestamp < w[1].timestamp));
    assert_eq!(snapshot.route.len(), 60);
    assert_eq!(snapshot.samples.rejected, 3);

    clock.advance_secs(120);
    let activity = session.stop().unwrap();
    assert_eq!(activity.route(), snapshot.route.as_slice());
}

#[test]
fn suspended_app_is_just_a_gap() {
    let (tracker, clock) = setup();
    let session = tracker.start(ActivityType::Walking).unwrap();

    session.ingest_location(at(0.0, 0.0, 0));
    // Process suspended for ten minutes mid-tracking, then resumes delivering
    session.ingest_location(at(0.0, 0.005, 600));
    clock.advance_secs(660);

    let activity = session.stop().unwrap();
    assert_eq!(activity.duration(), 660.0);
    assert_eq!(activity.paused_duration(), None);
    assert_eq!(activity.route().len(), 2);
}

#[test]
fn step_counter_regression_never_goes_negative() {
    let (tracker, clock) = setup();
    let session = tracker.start(ActivityType::Treadmill).unwrap();

    for raw in [40_000, 40_100, 40_250, 12, 80, 200] {
        session.ingest_step_count(raw);
        let steps = session.snapshot().unwrap().steps.unwrap();
        assert!(steps <= 40_250 - 40_000 + 200);
    }
    assert_eq!(session.snapshot().unwrap().steps, Some(250 + 188));

    clock.advance_secs(1800);
    let activity = session.stop().unwrap();
    assert_eq!(activity.steps(), Some(438));
    assert!(activity.calories_approximate());
}

#[test]
fn sparse_step_readings_survive_a_pause() {
    let (tracker, clock) = setup();
    let options = StartOptions {
        initial_steps: Some(0),
        ..StartOptions::default()
    };
    let session = tracker.start_with(ActivityType::Treadmill, options).unwrap();

    session.ingest_step_count(100);
    session.pause().unwrap();
    clock.advance_secs(30);
    session.resume().unwrap();
    clock.advance_secs(30);
    session.ingest_step_count(150);

    assert_eq!(session.snapshot().unwrap().steps, Some(150));
    let activity = session.stop().unwrap();
    assert_eq!(activity.steps(), Some(150));
}

#[test]
fn subscriber_sees_completed_record() {
    let (tracker, clock) = setup();
    let events = tracker.subscribe();
    let session = tracker.start(ActivityType::Cycling).unwrap();
    session.ingest_location(at(0.0, 0.0, 0));
    session.ingest_location(at(0.0, 0.002, 30));
    clock.advance_secs(30);
    let activity = session.stop().unwrap();

    let completed = events.drain().into_iter().find_map(|e| match e {
        SessionEvent::Completed(record) => Some(record),
        _ => None,
    });
    assert_eq!(completed.as_ref().map(|r| r.id()), Some(activity.id()));
}
