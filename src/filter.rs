//! Location sample filter.
//!
//! Decides whether a raw location sample may enter the route. The rules are
//! applied in order and the first failing rule names the rejection:
//!
//! 1. Coordinates must be finite and in range
//! 2. Timestamps must strictly increase (duplicates are rejected)
//! 3. The implied speed from the last accepted sample must be plausible for
//!    the activity type (guards against GPS jumps)
//! 4. Tiny moves inside the minimum sampling interval are jitter
//!
//! The filter is pure; counting and logging happen in the session.

use serde::{Deserialize, Serialize};

use crate::metrics::haversine_distance;
use crate::{ActivityType, LocationPoint};

/// Thresholds for the sample filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[serde(default)]
pub struct FilterConfig {
    /// Moves shorter than this are jitter unless enough time has passed.
    /// Default: 3.0 meters
    pub min_movement_meters: f64,

    /// Minimum time between samples for a short move to count.
    /// Default: 1000 ms
    pub min_interval_ms: i64,

    /// Multiplier applied to the activity type's speed ceiling.
    /// Default: 1.0
    pub speed_ceiling_factor: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_movement_meters: 3.0,
            min_interval_ms: 1000,
            speed_ceiling_factor: 1.0,
        }
    }
}

/// Why a sample was kept out of the route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    /// Latitude/longitude not finite or out of range
    InvalidCoordinates,
    /// Timestamp not after the last accepted sample
    NonMonotonic { last_timestamp: i64, timestamp: i64 },
    /// Implied speed above the activity's plausibility ceiling
    ImplausibleSpeed { implied_speed: f64, max_speed: f64 },
    /// Stationary jitter
    Jitter { distance: f64, elapsed_ms: i64 },
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::InvalidCoordinates => write!(f, "invalid coordinates"),
            RejectReason::NonMonotonic {
                last_timestamp,
                timestamp,
            } => write!(f, "timestamp {} not after {}", timestamp, last_timestamp),
            RejectReason::ImplausibleSpeed {
                implied_speed,
                max_speed,
            } => write!(
                f,
                "implied speed {:.1}m/s exceeds {:.1}m/s",
                implied_speed, max_speed
            ),
            RejectReason::Jitter {
                distance,
                elapsed_ms,
            } => write!(f, "jitter ({:.1}m in {}ms)", distance, elapsed_ms),
        }
    }
}

/// Outcome of filtering one sample.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterDecision {
    Accepted,
    Rejected(RejectReason),
}

impl FilterDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, FilterDecision::Accepted)
    }
}

/// Decide whether `candidate` may follow `last_accepted` in the route.
///
/// # Example
/// ```
/// use cardio_tracker::{accept, ActivityType, FilterConfig, LocationPoint};
///
/// let last = LocationPoint::new(0.0, 0.0, 0);
/// // ~1.1km in 10 seconds while walking is a GPS jump
/// let jump = LocationPoint::new(0.0, 0.01, 10_000);
/// let decision = accept(&jump, Some(&last), ActivityType::Walking, &FilterConfig::default());
/// assert!(!decision.is_accepted());
/// ```
pub fn accept(
    candidate: &LocationPoint,
    last_accepted: Option<&LocationPoint>,
    activity_type: ActivityType,
    config: &FilterConfig,
) -> FilterDecision {
    if !candidate.is_valid() {
        return FilterDecision::Rejected(RejectReason::InvalidCoordinates);
    }

    let Some(last) = last_accepted else {
        return FilterDecision::Accepted;
    };

    if candidate.timestamp <= last.timestamp {
        return FilterDecision::Rejected(RejectReason::NonMonotonic {
            last_timestamp: last.timestamp,
            timestamp: candidate.timestamp,
        });
    }

    let elapsed_ms = candidate.timestamp - last.timestamp;
    let distance = haversine_distance(last, candidate);

    let implied_speed = distance / (elapsed_ms as f64 / 1000.0);
    let max_speed = activity_type.max_plausible_speed() * config.speed_ceiling_factor;
    if implied_speed > max_speed {
        return FilterDecision::Rejected(RejectReason::ImplausibleSpeed {
            implied_speed,
            max_speed,
        });
    }

    if distance < config.min_movement_meters && elapsed_ms < config.min_interval_ms {
        return FilterDecision::Rejected(RejectReason::Jitter {
            distance,
            elapsed_ms,
        });
    }

    FilterDecision::Accepted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(candidate: LocationPoint, last: Option<LocationPoint>) -> FilterDecision {
        accept(
            &candidate,
            last.as_ref(),
            ActivityType::Running,
            &FilterConfig::default(),
        )
    }

    #[test]
    fn test_first_sample_accepted() {
        assert_eq!(
            run(LocationPoint::new(51.5, -0.12, 1_000), None),
            FilterDecision::Accepted
        );
    }

    #[test]
    fn test_invalid_coordinates_rejected() {
        assert_eq!(
            run(LocationPoint::new(f64::NAN, 0.0, 1_000), None),
            FilterDecision::Rejected(RejectReason::InvalidCoordinates)
        );
    }

    #[test]
    fn test_duplicate_and_backwards_timestamps_rejected() {
        let last = LocationPoint::new(0.0, 0.0, 10_000);
        let dup = LocationPoint::new(0.0, 0.0005, 10_000);
        let older = LocationPoint::new(0.0, 0.0005, 9_000);

        assert!(matches!(
            run(dup, Some(last)),
            FilterDecision::Rejected(RejectReason::NonMonotonic { .. })
        ));
        assert!(matches!(
            run(older, Some(last)),
            FilterDecision::Rejected(RejectReason::NonMonotonic { .. })
        ));
    }

    #[test]
    fn test_gps_jump_rejected() {
        let last = LocationPoint::new(0.0, 0.0, 0);
        // ~111m in 1 second
        let jump = LocationPoint::new(0.0, 0.001, 1_000);
        match run(jump, Some(last)) {
            FilterDecision::Rejected(RejectReason::ImplausibleSpeed {
                implied_speed,
                max_speed,
            }) => {
                assert!(implied_speed > 100.0);
                assert_eq!(max_speed, 12.5);
            }
            other => panic!("expected implausible speed, got {:?}", other),
        }
    }

    #[test]
    fn test_speed_ceiling_depends_on_activity() {
        let last = LocationPoint::new(0.0, 0.0, 0);
        // ~111m in 10 seconds = 11.1 m/s
        let fast = LocationPoint::new(0.0, 0.001, 10_000);
        let config = FilterConfig::default();

        assert!(!accept(&fast, Some(&last), ActivityType::Walking, &config).is_accepted());
        assert!(accept(&fast, Some(&last), ActivityType::Cycling, &config).is_accepted());
    }

    #[test]
    fn test_jitter_rejected_only_when_fast_and_short() {
        let last = LocationPoint::new(0.0, 0.0, 0);
        // ~1.1m
        let tiny_quick = LocationPoint::new(0.0, 0.00001, 500);
        let tiny_slow = LocationPoint::new(0.0, 0.00001, 1_500);
        let far_quick = LocationPoint::new(0.0, 0.00005, 500);

        assert!(matches!(
            run(tiny_quick, Some(last)),
            FilterDecision::Rejected(RejectReason::Jitter { .. })
        ));
        assert!(run(tiny_slow, Some(last)).is_accepted());
        assert!(run(far_quick, Some(last)).is_accepted());
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: FilterConfig = serde_json::from_str(r#"{"min_movement_meters": 5.0}"#).unwrap();
        assert_eq!(config.min_movement_meters, 5.0);
        assert_eq!(config.min_interval_ms, 1000);
    }
}
