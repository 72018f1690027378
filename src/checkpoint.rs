//! Checkpoints: point-in-time samples of a run.

use serde::{Deserialize, Serialize};

use crate::geo_utils;
use crate::GpsPoint;

/// An immutable sample of a run.
///
/// `actual_distance` is what the runner physically covered. `route_distance`
/// is progress along the reference route's own axis: for a route's creator
/// run the two are equal, for a followed run the route distance plateaus
/// while the runner is off the route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Checkpoint {
    /// Position of the sample. Absent only for synthetic samples.
    pub location: Option<GpsPoint>,
    /// Seconds since the start of the run
    pub time: f64,
    /// Cumulative meters travelled
    pub actual_distance: f64,
    /// Cumulative meters along the reference route
    pub route_distance: f64,
}

impl Checkpoint {
    pub fn new(location: GpsPoint, time: f64, actual_distance: f64, route_distance: f64) -> Self {
        Self {
            location: Some(location),
            time,
            actual_distance,
            route_distance,
        }
    }

    /// The zero checkpoint every run starts with.
    pub fn start(location: GpsPoint) -> Self {
        Self::new(location, 0.0, 0.0, 0.0)
    }

    /// Sample between `left` and `right` at `route_distance`.
    ///
    /// Time and actual distance are interpolated linearly on the route
    /// distance. The location is placed on the segment between the two
    /// locations at the same fraction; it is absent if either side has no
    /// location. A `route_distance` outside the pair extrapolates, and a pair
    /// sharing one route distance yields `left`'s values.
    pub fn interpolate(route_distance: f64, left: &Checkpoint, right: &Checkpoint) -> Checkpoint {
        let span = right.route_distance - left.route_distance;
        if span == 0.0 {
            return Checkpoint {
                route_distance,
                ..*left
            };
        }
        let fraction = (route_distance - left.route_distance) / span;

        let location = match (left.location, right.location) {
            (Some(from), Some(to)) => {
                let segment = geo_utils::haversine_distance(&from, &to);
                geo_utils::interpolate(segment * fraction, &from, &to).or(Some(from))
            }
            _ => None,
        };

        Checkpoint {
            location,
            time: left.time + (right.time - left.time) * fraction,
            actual_distance: left.actual_distance
                + (right.actual_distance - left.actual_distance) * fraction,
            route_distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const METERS_PER_DEGREE: f64 = 6_371_008.8 * std::f64::consts::PI / 180.0;

    fn north_of(base: &GpsPoint, meters: f64) -> GpsPoint {
        GpsPoint::new(base.latitude + meters / METERS_PER_DEGREE, base.longitude)
    }

    #[test]
    fn test_start_checkpoint() {
        let origin = GpsPoint::new(1.3521, 103.8198);
        let start = Checkpoint::start(origin);
        assert_eq!(start.location, Some(origin));
        assert_eq!(start.time, 0.0);
        assert_eq!(start.actual_distance, 0.0);
        assert_eq!(start.route_distance, 0.0);
    }

    #[test]
    fn test_interpolate_halfway() {
        let origin = GpsPoint::new(1.3521, 103.8198);
        let left = Checkpoint::new(origin, 10.0, 20.0, 20.0);
        let right = Checkpoint::new(north_of(&origin, 20.0), 20.0, 40.0, 40.0);

        let mid = Checkpoint::interpolate(30.0, &left, &right);
        assert_eq!(mid.route_distance, 30.0);
        assert!((mid.time - 15.0).abs() < 1e-9);
        assert!((mid.actual_distance - 30.0).abs() < 1e-9);

        let location = mid.location.unwrap();
        let from_left = geo_utils::haversine_distance(&origin, &location);
        assert!((from_left - 10.0).abs() < 0.01);
    }

    #[test]
    fn test_interpolate_without_location() {
        let origin = GpsPoint::new(1.3521, 103.8198);
        let left = Checkpoint::new(origin, 0.0, 0.0, 0.0);
        let right = Checkpoint {
            location: None,
            time: 10.0,
            actual_distance: 20.0,
            route_distance: 20.0,
        };
        let mid = Checkpoint::interpolate(10.0, &left, &right);
        assert!(mid.location.is_none());
        assert!((mid.time - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_interpolate_flat_pair() {
        let origin = GpsPoint::new(1.3521, 103.8198);
        let left = Checkpoint::new(origin, 5.0, 30.0, 20.0);
        let right = Checkpoint::new(north_of(&origin, 10.0), 9.0, 40.0, 20.0);
        let point = Checkpoint::interpolate(20.0, &left, &right);
        assert_eq!(point, left);
    }
}
