//! Resampling runs onto a reference run's distance axis.
//!
//! Two runs of the same route are only comparable point-for-point once they
//! share a distance axis. Normalization walks the *reference* checkpoints and,
//! for each one, looks up where the tracked run was at that route distance.
//! The output has exactly one checkpoint per reference checkpoint, carrying
//! the reference's route distance and the tracked run's time and location.
//!
//! All functions here are pure and safe to call from any thread.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::{Checkpoint, PaceError, Result};

/// Checkpoint of `checkpoints` at exactly `route_distance`.
///
/// `checkpoints` must be ordered with non-decreasing route distance. When
/// several share the requested distance (a plateau while deviated), the first
/// is returned, i.e. the earliest arrival. Between two checkpoints the sample
/// is interpolated. Distances outside the covered range fail with
/// [`PaceError::RangeNotCovered`].
pub fn checkpoint_at_route_distance(
    checkpoints: &[Checkpoint],
    route_distance: f64,
) -> Result<Checkpoint> {
    let (first, last) = match (checkpoints.first(), checkpoints.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => {
            return Err(PaceError::RangeNotCovered {
                target: route_distance,
                covered_from: 0.0,
                covered_to: 0.0,
            })
        }
    };

    // Written as a negated range check so NaN is rejected too
    if !(route_distance >= first.route_distance && route_distance <= last.route_distance) {
        return Err(PaceError::RangeNotCovered {
            target: route_distance,
            covered_from: first.route_distance,
            covered_to: last.route_distance,
        });
    }

    let index = checkpoints.partition_point(|c| c.route_distance < route_distance);
    let upper = &checkpoints[index];
    if upper.route_distance == route_distance {
        return Ok(*upper);
    }
    // index > 0 here: the first checkpoint is <= route_distance and not equal
    let lower = &checkpoints[index - 1];
    Ok(Checkpoint::interpolate(route_distance, lower, upper))
}

/// Normalize `tracked` onto the axis of `reference`.
///
/// Fails if the tracked run does not cover every reference route distance
/// (e.g. it stopped short of the end of the route).
pub fn normalize(reference: &[Checkpoint], tracked: &[Checkpoint]) -> Result<Vec<Checkpoint>> {
    reference
        .iter()
        .map(|point| checkpoint_at_route_distance(tracked, point.route_distance))
        .collect()
}

/// Normalize many tracked runs against one reference.
///
/// Results are returned in input order.
#[cfg(feature = "parallel")]
pub fn normalize_batch(
    reference: &[Checkpoint],
    tracked_runs: &[Vec<Checkpoint>],
) -> Vec<Result<Vec<Checkpoint>>> {
    tracked_runs
        .par_iter()
        .map(|tracked| normalize(reference, tracked))
        .collect()
}

/// Normalize many tracked runs against one reference.
///
/// Results are returned in input order.
#[cfg(not(feature = "parallel"))]
pub fn normalize_batch(
    reference: &[Checkpoint],
    tracked_runs: &[Vec<Checkpoint>],
) -> Vec<Result<Vec<Checkpoint>>> {
    tracked_runs
        .iter()
        .map(|tracked| normalize(reference, tracked))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GpsPoint;

    const METERS_PER_DEGREE: f64 = 6_371_008.8 * std::f64::consts::PI / 180.0;

    fn origin() -> GpsPoint {
        GpsPoint::new(1.3521, 103.8198)
    }

    fn north_of(base: &GpsPoint, meters: f64) -> GpsPoint {
        GpsPoint::new(base.latitude + meters / METERS_PER_DEGREE, base.longitude)
    }

    /// Straight reference run: a checkpoint every 20m, 20s apart.
    fn reference() -> Vec<Checkpoint> {
        (0..6)
            .map(|i| {
                let d = i as f64 * 20.0;
                Checkpoint::new(north_of(&origin(), d), i as f64 * 20.0, d, d)
            })
            .collect()
    }

    /// Same path at half the speed, sampled every 30m.
    fn tracked() -> Vec<Checkpoint> {
        (0..5)
            .map(|i| {
                let d = i as f64 * 30.0;
                Checkpoint::new(north_of(&origin(), d), d * 2.0, d, d.min(100.0))
            })
            .collect()
    }

    #[test]
    fn test_normalize_matches_reference_axis() {
        let reference = reference();
        let normalized = normalize(&reference, &tracked()).unwrap();

        assert_eq!(normalized.len(), reference.len());
        for (n, r) in normalized.iter().zip(&reference) {
            assert_eq!(n.route_distance, r.route_distance);
        }
        // 40m is between the 30m (60s) and 60m (120s) tracked samples
        assert!((normalized[2].time - 80.0).abs() < 1e-9);
        let location = normalized[2].location.unwrap();
        let expected = north_of(&origin(), 40.0);
        assert!(crate::geo_utils::haversine_distance(&location, &expected) < 0.01);
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let reference = reference();
        let tracked = tracked();
        assert_eq!(
            normalize(&reference, &tracked).unwrap(),
            normalize(&reference, &tracked).unwrap()
        );
    }

    #[test]
    fn test_range_not_covered() {
        let reference = reference();
        let short: Vec<Checkpoint> = tracked().into_iter().take(3).collect();

        let err = normalize(&reference, &short).unwrap_err();
        assert_eq!(
            err,
            PaceError::RangeNotCovered {
                target: 80.0,
                covered_from: 0.0,
                covered_to: 60.0,
            }
        );
        assert!(checkpoint_at_route_distance(&[], 0.0).is_err());
        assert!(checkpoint_at_route_distance(&short, f64::NAN).is_err());
    }

    #[test]
    fn test_plateau_takes_first_arrival() {
        let o = origin();
        let checkpoints = vec![
            Checkpoint::new(o, 0.0, 0.0, 0.0),
            Checkpoint::new(north_of(&o, 20.0), 10.0, 20.0, 20.0),
            Checkpoint::new(north_of(&o, 40.0), 25.0, 45.0, 20.0),
            Checkpoint::new(north_of(&o, 60.0), 40.0, 70.0, 40.0),
        ];
        let point = checkpoint_at_route_distance(&checkpoints, 20.0).unwrap();
        assert_eq!(point.time, 10.0);

        let point = checkpoint_at_route_distance(&checkpoints, 30.0).unwrap();
        assert!((point.time - 32.5).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_batch_keeps_order() {
        let reference = reference();
        let runs = vec![tracked(), tracked().into_iter().take(2).collect(), reference.clone()];
        let results = normalize_batch(&reference, &runs);
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap(), &reference);
    }
}
