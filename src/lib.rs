//! # Pace Matcher
//!
//! Live run tracking against a previously recorded reference route.
//!
//! This library provides:
//! - Forward-only tracking of a runner along a reference route's distance axis
//! - Deviation detection and live pacing against the reference runner
//! - Normalization of a finished run onto the reference route's axis
//! - Classification of a finished run as a follow of the route, or a new route
//!
//! ## Features
//!
//! - **`parallel`** - Enable parallel batch normalization with rayon
//! - **`persistence`** - Enable SQLite storage for finished runs and routes
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use pace_matcher::{GpsPoint, OngoingRun, Runner};
//!
//! let start = GpsPoint::new(51.5074, -0.1278);
//! let mut run = OngoingRun::new(Some(Runner::new("runner-1", "Alex")), start, None);
//!
//! run.add_new_location(GpsPoint::new(51.5076, -0.1278), 10.0);
//! run.add_new_location(GpsPoint::new(51.5078, -0.1278), 20.0);
//!
//! let route = run.to_new_route();
//! assert_eq!(route.creator_run.checkpoints.len(), 3);
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OptionExt, PaceError, Result};

// Geographic utilities (distance, interpolation, proximity)
pub mod geo_utils;

// Checkpoint value type
pub mod checkpoint;
pub use checkpoint::Checkpoint;

// Runs, routes and runner identities
pub mod run;
pub use run::{Route, Run, Runner};

// Resampling runs onto a reference run's distance axis
pub mod normalize;
pub use normalize::{checkpoint_at_route_distance, normalize, normalize_batch};

// Same-route overlap test
pub mod classification;
pub use classification::{classify_overlap, OverlapResult};

// Live tracker for a run in progress
pub mod ongoing;
pub use ongoing::{OngoingRun, PacingStats, RunMode};

// SQLite storage for finished runs and routes
#[cfg(feature = "persistence")]
pub mod persistence;
#[cfg(feature = "persistence")]
pub use persistence::RunStore;

// FFI bindings for mobile platforms (iOS/Android)
#[cfg(feature = "ffi")]
pub mod ffi;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
pub(crate) fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("PaceMatcherRust"),
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
pub(crate) fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// Accuracy, speed and course from the location source are not carried:
/// only the position matters for distance computations.
///
/// # Example
/// ```
/// use pace_matcher::GpsPoint;
/// let point = GpsPoint::new(51.5074, -0.1278); // London
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Bounding box for a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from GPS points.
    pub fn from_points(points: &[GpsPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for p in points {
            min_lat = min_lat.min(p.latitude);
            max_lat = max_lat.max(p.latitude);
            min_lng = min_lng.min(p.longitude);
            max_lng = max_lng.max(p.longitude);
        }

        Some(Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        })
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }

    /// Check whether a point lies inside the bounds (edges included).
    pub fn contains(&self, point: &GpsPoint) -> bool {
        point.latitude >= self.min_lat
            && point.latitude <= self.max_lat
            && point.longitude >= self.min_lng
            && point.longitude <= self.max_lng
    }
}

/// Thresholds for tracking and classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct PaceConfig {
    /// Two points closer than this are the same place.
    /// Default: 5.0 meters
    pub same_location_threshold: f64,

    /// A fix within this distance of a reference checkpoint passes it.
    /// Also the nominal spacing between recorded checkpoints.
    /// Default: 20.0 meters
    pub checkpoint_distance_interval: f64,

    /// Fraction of route points a run must cover to count as a follow.
    /// Default: 0.8
    pub same_route_overlap_threshold: f64,
}

impl Default for PaceConfig {
    fn default() -> Self {
        Self {
            same_location_threshold: 5.0,
            checkpoint_distance_interval: 20.0,
            same_route_overlap_threshold: 0.8,
        }
    }
}

impl PaceConfig {
    /// Reject thresholds the tracker cannot work with.
    pub fn validate(&self) -> Result<()> {
        let positive = |name: &str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(PaceError::Config {
                    message: format!("{} must be a positive number, got {}", name, value),
                })
            }
        };
        positive("same_location_threshold", self.same_location_threshold)?;
        positive(
            "checkpoint_distance_interval",
            self.checkpoint_distance_interval,
        )?;
        positive(
            "same_route_overlap_threshold",
            self.same_route_overlap_threshold,
        )?;
        if self.same_route_overlap_threshold > 1.0 {
            return Err(PaceError::Config {
                message: format!(
                    "same_route_overlap_threshold must be at most 1.0, got {}",
                    self.same_route_overlap_threshold
                ),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gps_point_validation() {
        assert!(GpsPoint::new(51.5074, -0.1278).is_valid());
        assert!(!GpsPoint::new(91.0, 0.0).is_valid());
        assert!(!GpsPoint::new(0.0, 181.0).is_valid());
        assert!(!GpsPoint::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_bounds_from_points() {
        let points = vec![
            GpsPoint::new(51.50, -0.13),
            GpsPoint::new(51.51, -0.12),
            GpsPoint::new(51.505, -0.125),
        ];
        let bounds = Bounds::from_points(&points).unwrap();
        assert_eq!(bounds.min_lat, 51.50);
        assert_eq!(bounds.max_lat, 51.51);
        assert_eq!(bounds.min_lng, -0.13);
        assert_eq!(bounds.max_lng, -0.12);
        assert!(bounds.contains(&bounds.center()));
        assert!(Bounds::from_points(&[]).is_none());
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = PaceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.checkpoint_distance_interval, 20.0);
        assert_eq!(config.same_route_overlap_threshold, 0.8);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = PaceConfig {
            checkpoint_distance_interval: 0.0,
            ..PaceConfig::default()
        };
        assert!(matches!(config.validate(), Err(PaceError::Config { .. })));

        let config = PaceConfig {
            same_route_overlap_threshold: 1.5,
            ..PaceConfig::default()
        };
        assert!(matches!(config.validate(), Err(PaceError::Config { .. })));
    }
}
