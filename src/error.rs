//! Unified error handling for the pace-matcher library.
//!
//! Every fallible operation in the crate returns [`Result`]. Nothing here
//! panics on bad input: GPS noise (zero-distance fixes) is absorbed silently
//! by the tracker, and every other failure is handed back to the caller,
//! who decides what the UI does next.

use thiserror::Error;

/// Unified error type for pace-matcher operations.
#[derive(Debug, Clone, PartialEq, Error)]
#[cfg_attr(feature = "ffi", derive(uniffi::Error))]
#[cfg_attr(feature = "ffi", uniffi(flat_error))]
pub enum PaceError {
    /// A route distance lies outside the distance range of the checkpoints
    /// being resampled. The normalizer never extrapolates.
    #[error("route distance {target:.1}m is outside the covered range {covered_from:.1}m..={covered_to:.1}m")]
    RangeNotCovered {
        target: f64,
        covered_from: f64,
        covered_to: f64,
    },

    /// A follow-only operation was called on a run that follows nothing.
    #[error("run is not following a reference run")]
    NotFollowing,

    /// Pacing was requested while the runner is off the reference route.
    #[error("runner has deviated from the reference route")]
    Deviated,

    /// No reference interval contains the runner's current route distance.
    #[error("no pacing interval available at route distance {route_distance:.1}m")]
    PacingUnavailable { route_distance: f64 },

    /// The tracked run does not overlap the reference enough to count as a follow.
    #[error("run covers {covered} of {union} route points, not enough to count as a follow")]
    NotClassifiedAsFollow { covered: usize, union: usize },

    /// A comparable run needs a runner identity.
    #[error("run has no runner")]
    MissingRunner,

    /// A checkpoint needed for a geometric computation has no location.
    #[error("checkpoint at {route_distance:.1}m has no location")]
    MissingLocation { route_distance: f64 },

    /// A run was attached to a route whose distance axis it does not share.
    #[error("run has {found} checkpoints on a different axis, route expects {expected}")]
    NotOnRouteAxis { expected: usize, found: usize },

    /// Configuration error
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Persistence/storage error
    #[error("persistence error: {message}")]
    Persistence { message: String },
}

/// Result type alias for pace-matcher operations.
pub type Result<T> = std::result::Result<T, PaceError>;

/// Extension trait for converting Option to PaceError.
pub trait OptionExt<T> {
    /// Convert Option to Result with a missing location error.
    fn ok_or_missing_location(self, route_distance: f64) -> Result<T>;

    /// Convert Option to Result with a not-following error.
    fn ok_or_not_following(self) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_missing_location(self, route_distance: f64) -> Result<T> {
        self.ok_or(PaceError::MissingLocation { route_distance })
    }

    fn ok_or_not_following(self) -> Result<T> {
        self.ok_or(PaceError::NotFollowing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PaceError::RangeNotCovered {
            target: 120.0,
            covered_from: 0.0,
            covered_to: 80.0,
        };
        let message = err.to_string();
        assert!(message.contains("120.0m"));
        assert!(message.contains("80.0m"));

        let err = PaceError::NotClassifiedAsFollow {
            covered: 3,
            union: 6,
        };
        assert!(err.to_string().contains("3 of 6"));
    }

    #[test]
    fn test_option_ext() {
        let none: Option<i32> = None;
        assert_eq!(
            none.ok_or_missing_location(40.0),
            Err(PaceError::MissingLocation {
                route_distance: 40.0
            })
        );
        assert_eq!(none.ok_or_not_following(), Err(PaceError::NotFollowing));
        assert_eq!(Some(1).ok_or_not_following(), Ok(1));
    }
}
