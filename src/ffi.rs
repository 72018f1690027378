//! FFI bindings for mobile platforms (iOS/Android).
//!
//! The live tracker is exposed as a [`RunSession`] object owned by the app
//! for the duration of one run. The location callback feeds fixes in; the UI
//! polls deviation, distance, time and pacing; when the runner stops, the app
//! tries [`RunSession::to_run`] and falls back to [`RunSession::to_new_route`].

use std::sync::{Arc, Mutex};

use log::{debug, info};

use crate::{
    init_logging, Bounds, Checkpoint, GpsPoint, OngoingRun, OverlapResult, PaceConfig, PaceError,
    PacingStats, Route, Run, Runner,
};

/// A run in progress, shared with the mobile app.
#[derive(uniffi::Object)]
pub struct RunSession {
    run: Mutex<OngoingRun>,
}

impl RunSession {
    fn with_run<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut OngoingRun) -> R,
    {
        let mut run = self.run.lock().unwrap();
        f(&mut run)
    }
}

#[uniffi::export]
impl RunSession {
    /// Start a run. Pass `pace_run` to follow an existing route's run.
    #[uniffi::constructor]
    pub fn new(runner: Option<Runner>, starting_location: GpsPoint, pace_run: Option<Run>) -> Arc<Self> {
        init_logging();
        info!(
            "[PaceMatcherRust] Starting {} run",
            if pace_run.is_some() { "follow" } else { "new" }
        );
        let run = OngoingRun::new(runner, starting_location, pace_run.map(Arc::new));
        Arc::new(Self {
            run: Mutex::new(run),
        })
    }

    /// Start a run with custom thresholds.
    #[uniffi::constructor]
    pub fn with_config(
        runner: Option<Runner>,
        starting_location: GpsPoint,
        pace_run: Option<Run>,
        config: PaceConfig,
    ) -> Result<Arc<Self>, PaceError> {
        init_logging();
        let run = OngoingRun::with_config(runner, starting_location, pace_run.map(Arc::new), config)?;
        Ok(Arc::new(Self {
            run: Mutex::new(run),
        }))
    }

    /// Feed one location fix, `time` seconds into the run.
    pub fn add_location(&self, latitude: f64, longitude: f64, time: f64) {
        self.with_run(|run| {
            run.add_new_location(GpsPoint::new(latitude, longitude), time);
            debug!(
                "[PaceMatcherRust] Fix at t={:.0}s: {:.0}m, deviated={}",
                time,
                run.distance_so_far(),
                run.is_deviated()
            );
        })
    }

    pub fn is_follow_run(&self) -> bool {
        self.with_run(|run| run.is_follow_run())
    }

    pub fn is_deviated(&self) -> bool {
        self.with_run(|run| run.is_deviated())
    }

    pub fn distance_so_far(&self) -> f64 {
        self.with_run(|run| run.distance_so_far())
    }

    pub fn time_so_far(&self) -> f64 {
        self.with_run(|run| run.time_so_far())
    }

    /// Live pacing, or `None` while unavailable (new run, deviated, last point).
    pub fn pacing_stats(&self) -> Option<PacingStats> {
        self.with_run(|run| run.pacing_stats().ok())
    }

    pub fn checkpoints(&self) -> Vec<Checkpoint> {
        self.with_run(|run| run.checkpoints().to_vec())
    }

    /// Checkpoints as a JSON array, for drawing the live track.
    pub fn checkpoints_json(&self) -> String {
        self.with_run(|run| serde_json::to_string(run.checkpoints()).unwrap_or_else(|_| "[]".to_string()))
    }

    pub fn overlap(&self) -> Result<OverlapResult, PaceError> {
        self.with_run(|run| run.overlap())
    }

    pub fn classified_as_follow(&self) -> bool {
        self.with_run(|run| run.classified_as_follow())
    }

    /// Finish as a run of the followed route.
    pub fn to_run(&self, route_id: String) -> Result<Run, PaceError> {
        self.with_run(|run| run.to_run(&route_id))
    }

    /// Finish as a brand-new route.
    pub fn to_new_route(&self) -> Route {
        self.with_run(|run| run.to_new_route())
    }
}

/// Default tracking thresholds.
#[uniffi::export]
pub fn default_pace_config() -> PaceConfig {
    PaceConfig::default()
}

/// Normalize a tracked checkpoint list onto a reference run's axis.
#[uniffi::export]
pub fn ffi_normalize(reference: Run, tracked: Vec<Checkpoint>) -> Result<Vec<Checkpoint>, PaceError> {
    init_logging();
    reference.normalize(&tracked)
}

/// Same-route test on precomputed counts.
#[uniffi::export]
pub fn ffi_classify_overlap(covered: u32, union: u32, threshold: f64) -> bool {
    crate::classify_overlap(covered as usize, union as usize, threshold)
}

/// Route as JSON, for caching on the app side.
#[uniffi::export]
pub fn ffi_route_to_json(route: Route) -> String {
    serde_json::to_string(&route).unwrap_or_else(|_| "{}".to_string())
}

/// Where a run was at a given route distance.
#[uniffi::export]
pub fn ffi_checkpoint_at(run: Run, route_distance: f64) -> Option<Checkpoint> {
    run.checkpoint_at(route_distance)
}

/// Map extent of a run.
#[uniffi::export]
pub fn ffi_run_bounds(run: Run) -> Option<Bounds> {
    run.bounds()
}
