//! Activity finalization.
//!
//! Turns a [`CompletedSession`] into the immutable [`CardioActivity`] record
//! handed to the persistence/history collaborator. Averages are computed here
//! from totals, once.

use serde::Serialize;
use uuid::Uuid;

use crate::calories::CalorieEstimator;
use crate::metrics::{average_speed, pace_secs_per_km};
use crate::session::CompletedSession;
use crate::splits::{compute_splits, elevation_gain, Split, KILOMETER_SPLIT};
use crate::{ActivityType, LocationPoint};

/// A finished cardio activity.
///
/// Fields are read-only; the record cannot change after [`finalize`] returns,
/// and [`finalize`] is the only way to build one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardioActivity {
    id: String,
    #[serde(rename = "type")]
    activity_type: ActivityType,
    started_at: i64,
    completed_at: i64,
    duration: f64,
    distance: f64,
    average_pace: Option<f64>,
    average_speed: Option<f64>,
    max_speed: Option<f64>,
    calories: Option<f64>,
    calories_approximate: bool,
    route: Vec<LocationPoint>,
    paused_duration: Option<f64>,
    steps: Option<u64>,
    elevation_gain: Option<f64>,
    splits: Vec<Split>,
}

impl CardioActivity {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn activity_type(&self) -> ActivityType {
        self.activity_type
    }

    /// Unix timestamp (ms)
    pub fn started_at(&self) -> i64 {
        self.started_at
    }

    /// Unix timestamp (ms)
    pub fn completed_at(&self) -> i64 {
        self.completed_at
    }

    /// Tracking time in seconds, paused time excluded
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Meters
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Seconds per kilometre; absent when no distance was covered
    pub fn average_pace(&self) -> Option<f64> {
        self.average_pace
    }

    /// m/s; absent when duration is zero
    pub fn average_speed(&self) -> Option<f64> {
        self.average_speed
    }

    /// m/s, fastest accepted segment
    pub fn max_speed(&self) -> Option<f64> {
        self.max_speed
    }

    /// Kilocalories
    pub fn calories(&self) -> Option<f64> {
        self.calories
    }

    /// True when the calorie estimate used a default body weight
    pub fn calories_approximate(&self) -> bool {
        self.calories_approximate
    }

    pub fn route(&self) -> &[LocationPoint] {
        &self.route
    }

    /// Seconds spent paused; absent when the session was never paused
    pub fn paused_duration(&self) -> Option<f64> {
        self.paused_duration
    }

    pub fn steps(&self) -> Option<u64> {
        self.steps
    }

    /// Meters climbed, when the route carries altitude
    pub fn elevation_gain(&self) -> Option<f64> {
        self.elevation_gain
    }

    /// Kilometre splits
    pub fn splits(&self) -> &[Split] {
        &self.splits
    }

    /// Serialize for the persistence collaborator.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Build the immutable record for a stopped session.
pub fn finalize(completed: CompletedSession, estimator: &CalorieEstimator) -> CardioActivity {
    let CompletedSession {
        activity,
        completed_at,
        tracking_duration_ms,
        body_weight_kg,
    } = completed;

    let duration = tracking_duration_ms as f64 / 1000.0;
    let distance = activity.distance;

    let calories = if duration > 0.0 {
        Some(estimator.estimate(activity.activity_type, duration, distance, body_weight_kg))
    } else {
        None
    };

    let paused_duration = if activity.total_paused_duration_ms > 0 {
        Some(activity.total_paused_duration_ms as f64 / 1000.0)
    } else {
        None
    };

    let splits = compute_splits(&activity.route, &activity.pauses, KILOMETER_SPLIT);
    let elevation_gain = elevation_gain(&activity.route);

    CardioActivity {
        id: Uuid::new_v4().to_string(),
        activity_type: activity.activity_type,
        started_at: activity.started_at,
        completed_at,
        duration,
        distance,
        average_pace: pace_secs_per_km(duration, distance),
        average_speed: average_speed(distance, duration),
        max_speed: activity.max_speed,
        calories: calories.map(|c| c.calories),
        calories_approximate: calories.is_some_and(|c| c.approximate),
        route: activity.route,
        paused_duration,
        steps: activity.steps,
        elevation_gain,
        splits,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterConfig;
    use crate::session::Session;

    const T0: i64 = 1_700_000_000_000;

    fn completed(
        activity_type: ActivityType,
        points: &[(f64, i64)],
        stop_secs: i64,
        weight: Option<f64>,
    ) -> CompletedSession {
        let mut session = Session::new(FilterConfig::default());
        session.set_body_weight(weight);
        session.start_at(activity_type, T0, None).unwrap();
        for &(lng, secs) in points {
            session.ingest_location(LocationPoint::new(0.0, lng, T0 + secs * 1000));
        }
        session.stop_at(T0 + stop_secs * 1000).unwrap()
    }

    #[test]
    fn test_finalize_running_scenario() {
        let done = completed(ActivityType::Running, &[(0.0, 0), (0.001, 60)], 60, Some(70.0));
        let activity = finalize(done, &CalorieEstimator::default());

        assert!((activity.distance() - 111.19).abs() < 0.1);
        assert_eq!(activity.duration(), 60.0);
        assert!((activity.average_speed().unwrap() - 1.853).abs() < 0.01);
        // 60s for 0.111km
        assert!((activity.average_pace().unwrap() - 539.6).abs() < 0.5);
        assert_eq!(activity.route().len(), 2);
        assert_eq!(activity.paused_duration(), None);
        assert!(!activity.calories_approximate());
        // 6.66 km/h is the slowest running bucket (MET 6.0): 6 * 70 / 60
        assert!((activity.calories().unwrap() - 7.0).abs() < 1e-9);
        assert_eq!(activity.started_at(), T0);
        assert_eq!(activity.completed_at(), T0 + 60_000);
        assert_eq!(activity.splits().len(), 1);
    }

    #[test]
    fn test_zero_distance_has_no_pace() {
        let done = completed(ActivityType::Elliptical, &[], 600, None);
        let activity = finalize(done, &CalorieEstimator::default());

        assert_eq!(activity.distance(), 0.0);
        assert_eq!(activity.average_pace(), None);
        assert_eq!(activity.average_speed(), Some(0.0));
        assert!(activity.calories_approximate());
        assert!(activity.calories().unwrap() > 0.0);
        assert!(activity.splits().is_empty());
    }

    #[test]
    fn test_zero_duration_has_no_speed() {
        let done = completed(ActivityType::Running, &[], 0, Some(70.0));
        let activity = finalize(done, &CalorieEstimator::default());

        assert_eq!(activity.duration(), 0.0);
        assert_eq!(activity.average_speed(), None);
        assert_eq!(activity.average_pace(), None);
        assert_eq!(activity.calories(), None);
    }

    #[test]
    fn test_records_get_unique_ids() {
        let a = finalize(
            completed(ActivityType::Walking, &[], 10, None),
            &CalorieEstimator::default(),
        );
        let b = finalize(
            completed(ActivityType::Walking, &[], 10, None),
            &CalorieEstimator::default(),
        );
        assert_ne!(a.id(), b.id());
        assert!(Uuid::parse_str(a.id()).is_ok());
    }

    #[test]
    fn test_json_export() {
        let done = completed(ActivityType::Cycling, &[(0.0, 0), (0.002, 30)], 30, Some(75.0));
        let activity = finalize(done, &CalorieEstimator::default());
        let json = activity.to_json();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "cycling");
        assert_eq!(value["id"], activity.id());
        assert_eq!(value["route"].as_array().map(Vec::len), Some(2));
        assert_eq!(value["route"][1]["timestamp"], T0 + 30_000);
        assert!((value["distance"].as_f64().unwrap() - activity.distance()).abs() < 1e-6);
        assert!(value["averageSpeed"].is_number());
        assert!(value["pausedDuration"].is_null());
    }
}
