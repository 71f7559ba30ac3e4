//! Distance, speed and pace calculations.
//!
//! All functions here are pure. Session averages are derived from totals
//! (total distance over tracking time), never by averaging instantaneous
//! speeds, which would overweight samples taken close together.

use serde::{Deserialize, Serialize};

use crate::LocationPoint;

/// Spherical Earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance between two points in meters.
///
/// # Example
/// ```
/// use cardio_tracker::{haversine_distance, LocationPoint};
///
/// let a = LocationPoint::new(0.0, 0.0, 0);
/// let b = LocationPoint::new(0.0, 0.001, 60_000);
/// let d = haversine_distance(&a, &b);
/// assert!((d - 111.19).abs() < 0.1);
/// ```
pub fn haversine_distance(p1: &LocationPoint, p2: &LocationPoint) -> f64 {
    let d_lat = (p2.latitude - p1.latitude).to_radians();
    let d_lon = (p2.longitude - p1.longitude).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + p1.latitude.to_radians().cos()
            * p2.latitude.to_radians().cos()
            * (d_lon / 2.0).sin().powi(2);

    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_METERS * c
}

/// One step between two consecutive accepted samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Distance in meters
    pub distance: f64,
    /// Elapsed time in seconds
    pub elapsed_secs: f64,
    /// Instantaneous speed in m/s (0 when no time elapsed)
    pub speed: f64,
}

/// Compute the segment between two samples.
pub fn segment(prev: &LocationPoint, next: &LocationPoint) -> Segment {
    let distance = haversine_distance(prev, next);
    let elapsed_secs = (next.timestamp - prev.timestamp) as f64 / 1000.0;
    let speed = if elapsed_secs > 0.0 {
        distance / elapsed_secs
    } else {
        0.0
    };

    Segment {
        distance,
        elapsed_secs,
        speed,
    }
}

/// Total distance along a route in meters.
pub fn route_distance(points: &[LocationPoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    points
        .windows(2)
        .map(|pair| haversine_distance(&pair[0], &pair[1]))
        .sum()
}

/// Average speed in m/s. Absent when no tracking time has elapsed.
pub fn average_speed(distance_m: f64, duration_secs: f64) -> Option<f64> {
    if duration_secs > 0.0 {
        Some(distance_m / duration_secs)
    } else {
        None
    }
}

/// Pace in seconds per kilometre. Absent when no distance was covered.
pub fn pace_secs_per_km(duration_secs: f64, distance_m: f64) -> Option<f64> {
    if distance_m > 0.0 {
        Some(duration_secs / (distance_m / 1000.0))
    } else {
        None
    }
}

/// Format a pace as `m:ss` (per kilometre).
pub fn format_pace(secs_per_km: f64) -> String {
    if !secs_per_km.is_finite() || secs_per_km < 0.0 {
        return "--:--".to_string();
    }
    let total = secs_per_km.round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
