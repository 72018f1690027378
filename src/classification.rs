//! Same-route overlap test.
//!
//! A finished follow run counts as a run *of* the reference route when the
//! reference checkpoints it passed make up a large enough share of all the
//! distinct route points of both runs:
//!
//! ```text
//! covered / |route distances(reference) ∪ route distances(normalized)| >= threshold
//! ```
//!
//! Both sides live on the reference's checkpoint grid, so small GPS noise
//! does not change the outcome.

use serde::{Deserialize, Serialize};

use crate::Checkpoint;

/// The numbers behind a follow/new-route decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct OverlapResult {
    /// Reference checkpoints passed during the run
    pub covered: u32,
    /// Distinct route distances across reference and normalized run
    pub union: u32,
    /// covered / union, 0 when the union is empty
    pub ratio: f64,
    /// Whether the ratio reaches the configured threshold
    pub is_follow: bool,
}

/// Number of distinct route distances across both checkpoint lists.
///
/// Distances are compared with exact equality.
pub fn union_route_distance_count(pace_points: &[Checkpoint], normalized: &[Checkpoint]) -> usize {
    let mut distances: Vec<f64> = pace_points
        .iter()
        .chain(normalized)
        .map(|c| c.route_distance)
        .collect();
    distances.sort_by(|a, b| a.total_cmp(b));
    distances.dedup();
    distances.len()
}

/// `covered / union >= threshold`; an empty union never classifies.
pub fn classify_overlap(covered: usize, union: usize, threshold: f64) -> bool {
    union > 0 && covered as f64 / union as f64 >= threshold
}

/// Full overlap breakdown for a run that covered `covered` reference points.
pub fn overlap(
    covered: usize,
    pace_points: &[Checkpoint],
    normalized: &[Checkpoint],
    threshold: f64,
) -> OverlapResult {
    let union = union_route_distance_count(pace_points, normalized);
    let ratio = if union == 0 {
        0.0
    } else {
        covered as f64 / union as f64
    };
    OverlapResult {
        covered: covered as u32,
        union: union as u32,
        ratio,
        is_follow: classify_overlap(covered, union, threshold),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GpsPoint;

    fn at(route_distance: f64) -> Checkpoint {
        Checkpoint::new(GpsPoint::new(0.0, 0.0), route_distance, route_distance, route_distance)
    }

    #[test]
    fn test_threshold_boundary() {
        assert!(classify_overlap(8, 10, 0.8));
        assert!(classify_overlap(800, 1000, 0.8));
        assert!(!classify_overlap(799, 1000, 0.8));
        assert!(!classify_overlap(7, 10, 0.8));
        assert!(!classify_overlap(0, 0, 0.8));
    }

    #[test]
    fn test_union_dedups_exact_distances() {
        let pace: Vec<Checkpoint> = [0.0, 20.0, 40.0, 60.0].iter().map(|d| at(*d)).collect();
        let normalized: Vec<Checkpoint> = [0.0, 20.0, 40.0, 60.0].iter().map(|d| at(*d)).collect();
        assert_eq!(union_route_distance_count(&pace, &normalized), 4);

        let shifted: Vec<Checkpoint> = [0.0, 20.0000001, 40.0].iter().map(|d| at(*d)).collect();
        assert_eq!(union_route_distance_count(&pace, &shifted), 5);
    }

    #[test]
    fn test_overlap_breakdown() {
        let pace: Vec<Checkpoint> = (0..6).map(|i| at(i as f64 * 20.0)).collect();
        let result = overlap(5, &pace, &pace, 0.8);
        assert_eq!(result.covered, 5);
        assert_eq!(result.union, 6);
        assert!((result.ratio - 5.0 / 6.0).abs() < 1e-12);
        assert!(result.is_follow);

        let result = overlap(4, &pace, &pace, 0.8);
        assert!(!result.is_follow);

        let empty = overlap(0, &[], &[], 0.8);
        assert_eq!(empty.ratio, 0.0);
        assert!(!empty.is_follow);
    }
}
