//! Per-distance splits and elevation gain for finished routes.
//!
//! Split times use moving time: any part of a pause that falls between two
//! route samples is subtracted from that segment before it is apportioned.
//! A split boundary inside a segment is placed by linear interpolation.

use serde::{Deserialize, Serialize};

use crate::metrics::{haversine_distance, pace_secs_per_km};
use crate::session::PauseInterval;
use crate::LocationPoint;

/// Standard split length in meters.
pub const KILOMETER_SPLIT: f64 = 1000.0;

/// Altitude change (m) that must accumulate before it counts as climbing.
/// Filters out barometer/GPS altitude noise.
const ELEVATION_NOISE_THRESHOLD: f64 = 2.0;

// Shorter trailing remainders are not reported as a split
const MIN_PARTIAL_SPLIT_METERS: f64 = 1.0;

/// One split of a finished route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[serde(rename_all = "camelCase")]
pub struct Split {
    /// 1-based split number
    pub index: u32,
    /// Meters covered (the split length, or less for the final partial split)
    pub distance: f64,
    /// Moving time in seconds
    pub duration: f64,
    /// Seconds per kilometre
    pub pace: Option<f64>,
    /// True for a trailing split shorter than the split length
    pub partial: bool,
}

/// Split a route into fixed-distance chunks.
pub fn compute_splits(
    route: &[LocationPoint],
    pauses: &[PauseInterval],
    split_distance: f64,
) -> Vec<Split> {
    let mut splits = Vec::new();
    if route.len() < 2 || split_distance <= 0.0 {
        return splits;
    }

    let mut acc_distance = 0.0;
    let mut acc_secs = 0.0;

    for pair in route.windows(2) {
        let (from, to) = (&pair[0], &pair[1]);
        let paused_ms: i64 = pauses
            .iter()
            .map(|p| p.overlap_ms(from.timestamp, to.timestamp))
            .sum();
        let mut seg_distance = haversine_distance(from, to);
        let mut seg_secs = ((to.timestamp - from.timestamp - paused_ms).max(0)) as f64 / 1000.0;

        while seg_distance > 0.0 && acc_distance + seg_distance >= split_distance {
            let needed = split_distance - acc_distance;
            let part_secs = seg_secs * (needed / seg_distance);
            acc_secs += part_secs;

            splits.push(Split {
                index: splits.len() as u32 + 1,
                distance: split_distance,
                duration: acc_secs,
                pace: pace_secs_per_km(acc_secs, split_distance),
                partial: false,
            });

            seg_distance -= needed;
            seg_secs -= part_secs;
            acc_distance = 0.0;
            acc_secs = 0.0;
        }

        acc_distance += seg_distance;
        acc_secs += seg_secs;
    }

    if acc_distance >= MIN_PARTIAL_SPLIT_METERS {
        splits.push(Split {
            index: splits.len() as u32 + 1,
            distance: acc_distance,
            duration: acc_secs,
            pace: pace_secs_per_km(acc_secs, acc_distance),
            partial: true,
        });
    }

    splits
}

/// Total climbing in meters, with hysteresis against altitude noise.
///
/// Returns `None` when fewer than two samples carry an altitude.
pub fn elevation_gain(route: &[LocationPoint]) -> Option<f64> {
    let mut altitudes = route
        .iter()
        .filter_map(|p| p.altitude)
        .filter(|a| a.is_finite());

    let mut reference = altitudes.next()?;
    let mut gain = 0.0;
    let mut samples = 1;

    for altitude in altitudes {
        samples += 1;
        let delta = altitude - reference;
        if delta >= ELEVATION_NOISE_THRESHOLD {
            gain += delta;
            reference = altitude;
        } else if delta <= -ELEVATION_NOISE_THRESHOLD {
            reference = altitude;
        }
    }

    if samples < 2 {
        return None;
    }
    Some(gain)
}
