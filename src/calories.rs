//! MET-based calorie estimation.
//!
//! `calories = MET * body_weight_kg * hours`
//!
//! Running, walking and cycling use speed-bucketed MET values (2011
//! Compendium of Physical Activities), so distance only matters through the
//! average speed it implies. Without a body weight the estimate falls back to
//! a population-average weight and is flagged as approximate.

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_BODY_WEIGHT_KG;
use crate::ActivityType;

/// (minimum speed in km/h, MET) in ascending speed order.
const RUNNING_METS: &[(f64, f64)] = &[
    (0.0, 6.0),
    (8.0, 8.3),
    (8.4, 9.0),
    (9.7, 9.8),
    (10.8, 10.5),
    (11.3, 11.0),
    (12.1, 11.5),
    (12.9, 11.8),
    (13.8, 12.3),
    (14.5, 12.8),
    (16.1, 14.5),
    (17.7, 16.0),
    (19.3, 19.0),
    (20.9, 19.8),
    (22.5, 23.0),
];

const WALKING_METS: &[(f64, f64)] = &[
    (0.0, 2.0),
    (3.2, 2.8),
    (4.0, 3.0),
    (4.8, 3.5),
    (5.6, 4.3),
    (6.4, 5.0),
    (7.2, 7.0),
    (8.0, 8.3),
];

const CYCLING_METS: &[(f64, f64)] = &[
    (0.0, 4.0),
    (16.1, 6.8),
    (19.3, 8.0),
    (22.5, 10.0),
    (25.7, 12.0),
    (30.6, 15.8),
];

/// Result of a calorie estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct CalorieEstimate {
    /// Kilocalories
    pub calories: f64,
    /// True when the user's weight was unknown and a default was used
    pub approximate: bool,
}

/// Estimates energy expenditure for finished sessions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalorieEstimator {
    default_body_weight_kg: f64,
}

impl Default for CalorieEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_BODY_WEIGHT_KG)
    }
}

impl CalorieEstimator {
    pub fn new(default_body_weight_kg: f64) -> Self {
        Self {
            default_body_weight_kg,
        }
    }

    /// Estimate calories burned.
    ///
    /// # Example
    /// ```
    /// use cardio_tracker::{ActivityType, CalorieEstimator};
    ///
    /// let estimator = CalorieEstimator::default();
    /// // 10km in 50 minutes (12 km/h, MET 11.0) at 70kg
    /// let estimate = estimator.estimate(ActivityType::Running, 3000.0, 10_000.0, Some(70.0));
    /// assert!((estimate.calories - 641.67).abs() < 0.01);
    /// assert!(!estimate.approximate);
    /// ```
    pub fn estimate(
        &self,
        activity_type: ActivityType,
        duration_secs: f64,
        distance_m: f64,
        body_weight_kg: Option<f64>,
    ) -> CalorieEstimate {
        let (weight, approximate) = match body_weight_kg.filter(|w| w.is_finite() && *w > 0.0) {
            Some(weight) => (weight, false),
            None => (self.default_body_weight_kg, true),
        };

        if duration_secs.is_nan() || duration_secs <= 0.0 {
            return CalorieEstimate {
                calories: 0.0,
                approximate,
            };
        }

        let speed_kmh = if distance_m > 0.0 {
            Some(distance_m / duration_secs * 3.6)
        } else {
            None
        };

        let met = met_for(activity_type, speed_kmh);
        CalorieEstimate {
            calories: met * weight * (duration_secs / 3600.0),
            approximate,
        }
    }
}

/// MET value for an activity at an average speed (km/h), if known.
pub fn met_for(activity_type: ActivityType, speed_kmh: Option<f64>) -> f64 {
    match (activity_type, speed_kmh) {
        (ActivityType::Running | ActivityType::Treadmill, Some(speed)) => {
            lookup(RUNNING_METS, speed)
        }
        (ActivityType::Walking, Some(speed)) => lookup(WALKING_METS, speed),
        (ActivityType::Cycling, Some(speed)) => lookup(CYCLING_METS, speed),
        (ActivityType::Running, None) => 9.8,
        (ActivityType::Treadmill, None) => 9.0,
        (ActivityType::Walking, None) => 3.5,
        (ActivityType::Cycling, None) => 7.5,
        (ActivityType::Hiking, _) => 6.0,
        (ActivityType::Elliptical, _) => 5.0,
    }
}

fn lookup(table: &[(f64, f64)], speed_kmh: f64) -> f64 {
    table
        .iter()
        .take_while(|(min_speed, _)| speed_kmh >= *min_speed)
        .last()
        .or(table.first())
        .map(|(_, met)| *met)
        .unwrap_or(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_met_scales_with_speed() {
        let slow = met_for(ActivityType::Running, Some(7.0));
        let tempo = met_for(ActivityType::Running, Some(12.0));
        let fast = met_for(ActivityType::Running, Some(18.0));
        assert_eq!(slow, 6.0);
        assert_eq!(tempo, 11.0);
        assert_eq!(fast, 16.0);
    }

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(met_for(ActivityType::Walking, Some(4.8)), 3.5);
        assert_eq!(met_for(ActivityType::Walking, Some(4.79)), 3.0);
        assert_eq!(met_for(ActivityType::Cycling, Some(40.0)), 15.8);
    }

    #[test]
    fn test_fixed_met_types_ignore_distance() {
        assert_eq!(met_for(ActivityType::Hiking, Some(3.0)), 6.0);
        assert_eq!(met_for(ActivityType::Hiking, None), 6.0);
        assert_eq!(met_for(ActivityType::Elliptical, None), 5.0);
        assert_eq!(met_for(ActivityType::Treadmill, None), 9.0);
    }

    #[test]
    fn test_known_weight_is_exact() {
        let estimator = CalorieEstimator::default();
        // Hiking 2h at 80kg: 6.0 * 80 * 2
        let estimate = estimator.estimate(ActivityType::Hiking, 7200.0, 8000.0, Some(80.0));
        assert!((estimate.calories - 960.0).abs() < 1e-9);
        assert!(!estimate.approximate);
    }

    #[test]
    fn test_missing_weight_is_approximate() {
        let estimator = CalorieEstimator::new(70.0);
        let estimate = estimator.estimate(ActivityType::Elliptical, 3600.0, 0.0, None);
        assert!((estimate.calories - 350.0).abs() < 1e-9);
        assert!(estimate.approximate);

        let bogus = estimator.estimate(ActivityType::Elliptical, 3600.0, 0.0, Some(0.0));
        assert!(bogus.approximate);
    }

    #[test]
    fn test_zero_duration() {
        let estimate =
            CalorieEstimator::default().estimate(ActivityType::Running, 0.0, 500.0, Some(70.0));
        assert_eq!(estimate.calories, 0.0);
    }
}
