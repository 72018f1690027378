//! Geographic utilities shared by the tracker and the normalizer.
//!
//! Distances are great-circle (haversine) distances in meters. Interpolation
//! is linear in latitude/longitude, which is accurate enough for the short
//! (tens of meters) segments between checkpoints.

use geo::{Distance, Haversine, Point};

use crate::GpsPoint;

/// Calculate haversine distance between two GPS points in meters.
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

/// True iff the two points are at most `threshold_meters` apart.
pub fn is_near(p1: &GpsPoint, p2: &GpsPoint, threshold_meters: f64) -> bool {
    haversine_distance(p1, p2) <= threshold_meters
}

/// True iff the two points count as the same place.
pub fn is_same_location(p1: &GpsPoint, p2: &GpsPoint, same_location_threshold: f64) -> bool {
    is_near(p1, p2, same_location_threshold)
}

/// Point `distance` meters from `from` along the segment towards `to`.
///
/// Returns `None` for a zero-length segment, where the fraction is undefined.
/// Distances beyond the segment length extrapolate along the same line.
pub fn interpolate(distance: f64, from: &GpsPoint, to: &GpsPoint) -> Option<GpsPoint> {
    let segment = haversine_distance(from, to);
    if segment == 0.0 {
        return None;
    }
    let fraction = distance / segment;
    Some(GpsPoint::new(
        from.latitude + (to.latitude - from.latitude) * fraction,
        from.longitude + (to.longitude - from.longitude) * fraction,
    ))
}

/// Total length of a polyline in meters.
pub fn polyline_length(points: &[GpsPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}
