//! # Ongoing Run
//!
//! Live state of a run in progress. Location fixes are fed in one at a time;
//! each one is turned into a [`Checkpoint`] whose route distance says how far
//! along the reference route the runner has got.
//!
//! ## Modes
//!
//! - **New run**: no reference. Route distance equals actual distance.
//! - **Follow**: a reference run is being followed. Each fix is matched
//!   against the reference checkpoints not yet passed; a match moves route
//!   progress forward to the furthest matched checkpoint, no match marks the
//!   runner as deviated and freezes route progress.
//!
//! Route progress never moves backwards. Deviation is decided per fix, with
//! no smoothing.
//!
//! ## Finishing
//!
//! A follow run that passed enough of the reference becomes a [`Run`] on the
//! reference route's axis ([`OngoingRun::to_run`]). Anything else becomes the
//! creator run of a new [`Route`] ([`OngoingRun::to_new_route`]).
//!
//! The tracker does no I/O and is not thread-safe by itself: fixes must be
//! delivered one after another.

use std::sync::Arc;

use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};

use crate::classification::{self, OverlapResult};
use crate::error::OptionExt;
use crate::geo_utils;
use crate::{Checkpoint, GpsPoint, PaceConfig, PaceError, Result, Route, Run, Runner};

/// Live feedback against the reference runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct PacingStats {
    /// The runner who recorded the reference run
    pub pacer: Runner,
    /// Seconds behind the reference (positive) or ahead of it (negative)
    pub time_difference: f64,
}

/// Progress against a followed reference run.
#[derive(Debug, Clone)]
pub struct FollowState {
    pace_run: Arc<Run>,
    /// Indices into the reference checkpoints, in the order they were passed
    covered: Vec<usize>,
    is_deviated: bool,
}

impl FollowState {
    fn new(pace_run: Arc<Run>) -> Self {
        let mut state = Self {
            pace_run,
            covered: Vec::new(),
            is_deviated: false,
        };
        // The runner starts on the first reference point
        if !state.pace_run.checkpoints.is_empty() {
            state.mark_covered(0);
        }
        state
    }

    pub fn pace_run(&self) -> &Arc<Run> {
        &self.pace_run
    }

    pub fn is_deviated(&self) -> bool {
        self.is_deviated
    }

    pub fn covered_count(&self) -> usize {
        self.covered.len()
    }

    fn mark_covered(&mut self, index: usize) {
        if !self.covered.contains(&index) {
            debug!("[OngoingRun] Passed pace point {}", index);
            self.covered.push(index);
        }
    }

    /// Match a fix against the reference points not yet passed and return
    /// the route distance to record for it.
    fn advance(&mut self, location: &GpsPoint, last_route_distance: f64, threshold: f64) -> f64 {
        let pace_run = Arc::clone(&self.pace_run);
        let pace_points = &pace_run.checkpoints;
        let first_unpassed = pace_points.partition_point(|c| c.route_distance < last_route_distance);

        let mut furthest: Option<f64> = None;
        for (index, point) in pace_points.iter().enumerate().skip(first_unpassed) {
            let Some(point_location) = point.location else {
                continue;
            };
            if geo_utils::is_near(location, &point_location, threshold) {
                self.mark_covered(index);
                furthest = Some(furthest.map_or(point.route_distance, |f: f64| {
                    f.max(point.route_distance)
                }));
            }
        }

        match furthest {
            Some(route_distance) => {
                if self.is_deviated {
                    debug!("[OngoingRun] Back on route at {:.0}m", route_distance);
                }
                self.is_deviated = false;
                route_distance
            }
            None => {
                if !self.is_deviated {
                    debug!("[OngoingRun] Deviated from route at {:.0}m", last_route_distance);
                }
                self.is_deviated = true;
                last_route_distance
            }
        }
    }
}

/// Whether an ongoing run is recording a new route or following one.
#[derive(Debug, Clone)]
pub enum RunMode {
    New,
    Follow(FollowState),
}

/// A run in progress.
#[derive(Debug, Clone)]
pub struct OngoingRun {
    runner: Option<Runner>,
    checkpoints: Vec<Checkpoint>,
    mode: RunMode,
    config: PaceConfig,
}

impl OngoingRun {
    /// Start a run at `starting_location` with the default configuration.
    ///
    /// Passing a `pace_run` starts a follow run against it.
    pub fn new(runner: Option<Runner>, starting_location: GpsPoint, pace_run: Option<Arc<Run>>) -> Self {
        let mode = match pace_run {
            Some(pace_run) => RunMode::Follow(FollowState::new(pace_run)),
            None => RunMode::New,
        };
        Self {
            runner,
            checkpoints: vec![Checkpoint::start(starting_location)],
            mode,
            config: PaceConfig::default(),
        }
    }

    /// Start a run with custom thresholds.
    pub fn with_config(
        runner: Option<Runner>,
        starting_location: GpsPoint,
        pace_run: Option<Arc<Run>>,
        config: PaceConfig,
    ) -> Result<Self> {
        config.validate()?;
        let mut run = Self::new(runner, starting_location, pace_run);
        run.config = config;
        Ok(run)
    }

    /// Add a location fix recorded `time` seconds into the run.
    ///
    /// Fixes at zero distance from the previous checkpoint are dropped.
    /// `time` must not go backwards between calls.
    pub fn add_new_location(&mut self, location: GpsPoint, time: f64) {
        let Some(last) = self.checkpoints.last().copied() else {
            return;
        };
        let Some(last_location) = last.location else {
            return;
        };

        let distance_apart = geo_utils::haversine_distance(&location, &last_location);
        // Also rejects NaN from invalid coordinates
        if !(distance_apart > 0.0) {
            trace!("[OngoingRun] Dropped fix at t={:.1}s: no movement", time);
            return;
        }
        let actual_distance = last.actual_distance + distance_apart;

        let route_distance = match &mut self.mode {
            RunMode::New => actual_distance,
            RunMode::Follow(state) => state.advance(
                &location,
                last.route_distance,
                self.config.checkpoint_distance_interval,
            ),
        };

        self.checkpoints.push(Checkpoint::new(
            location,
            time,
            actual_distance,
            route_distance,
        ));
    }

    /// Time behind (positive) or ahead of (negative) the reference runner.
    ///
    /// Only available while following and on route, and only when the last
    /// reference point passed has a successor to interpolate against.
    pub fn pacing_stats(&self) -> Result<PacingStats> {
        let state = self.follow_state().ok_or_not_following()?;
        if state.is_deviated {
            return Err(PaceError::Deviated);
        }
        let last = self.checkpoints.last().ok_or(PaceError::PacingUnavailable {
            route_distance: 0.0,
        })?;
        let current_location = last.location.ok_or_missing_location(last.route_distance)?;

        let unavailable = PaceError::PacingUnavailable {
            route_distance: last.route_distance,
        };
        let pace_points = &state.pace_run.checkpoints;
        let index = pace_points
            .iter()
            .position(|c| c.route_distance == last.route_distance)
            .ok_or_else(|| unavailable.clone())?;
        let (past, future) = match (pace_points.get(index), pace_points.get(index + 1)) {
            (Some(past), Some(future)) => (past, future),
            _ => return Err(unavailable),
        };

        let past_location = past.location.ok_or_missing_location(past.route_distance)?;
        let current_distance =
            past.route_distance + geo_utils::haversine_distance(&current_location, &past_location);
        let reference_time = Checkpoint::interpolate(current_distance, past, future).time;

        Ok(PacingStats {
            pacer: state.pace_run.runner.clone(),
            time_difference: last.time - reference_time,
        })
    }

    /// Overlap between this run and the reference it follows.
    ///
    /// Fails if the run is not a follow run, or if it does not cover the
    /// whole reference axis and so cannot be normalized.
    pub fn overlap(&self) -> Result<OverlapResult> {
        let state = self.follow_state().ok_or_not_following()?;
        let normalized = state.pace_run.normalize(&self.checkpoints)?;
        Ok(self.overlap_with(state, &normalized))
    }

    /// Whether this run passed enough of the reference to count as a run of it.
    pub fn classified_as_follow(&self) -> bool {
        match self.overlap() {
            Ok(result) => result.is_follow,
            Err(err) => {
                warn!("[OngoingRun] Not classified as follow: {}", err);
                false
            }
        }
    }

    /// Finish as a run of the followed route, normalized onto its axis.
    ///
    /// Fails if the run is not a follow run, does not cover the reference,
    /// does not overlap it enough, or has no runner. Callers fall back to
    /// [`OngoingRun::to_new_route`].
    pub fn to_run(&self, route_id: &str) -> Result<Run> {
        let state = self.follow_state().ok_or_not_following()?;
        let normalized = state.pace_run.normalize(&self.checkpoints)?;
        let overlap = self.overlap_with(state, &normalized);
        if !overlap.is_follow {
            return Err(PaceError::NotClassifiedAsFollow {
                covered: overlap.covered as usize,
                union: overlap.union as usize,
            });
        }
        let runner = self.runner.clone().ok_or(PaceError::MissingRunner)?;

        info!(
            "[OngoingRun] Finished as run of route {} ({}/{} points, {:.0}s)",
            route_id,
            overlap.covered,
            overlap.union,
            normalized.last().map_or(0.0, |c| c.time)
        );
        Ok(Run::new(runner, normalized).with_route_id(route_id))
    }

    /// Finish as the creator run of a brand-new route.
    ///
    /// The raw checkpoints are kept as recorded. Runs without a runner are
    /// credited to [`Runner::anonymous`].
    pub fn to_new_route(&self) -> Route {
        let creator = self.runner.clone().unwrap_or_else(Runner::anonymous);
        info!(
            "[OngoingRun] Finished as new route ({} checkpoints, {:.0}m)",
            self.checkpoints.len(),
            self.distance_so_far()
        );
        Route::new(creator, self.checkpoints.clone())
    }

    pub fn runner(&self) -> Option<&Runner> {
        self.runner.as_ref()
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    pub fn mode(&self) -> &RunMode {
        &self.mode
    }

    pub fn config(&self) -> &PaceConfig {
        &self.config
    }

    pub fn is_follow_run(&self) -> bool {
        matches!(self.mode, RunMode::Follow(_))
    }

    /// The followed reference run, if any.
    pub fn pace_run(&self) -> Option<&Arc<Run>> {
        self.follow_state().map(|state| &state.pace_run)
    }

    /// Whether the most recent fix was off the reference route.
    /// Always false for a new run.
    pub fn is_deviated(&self) -> bool {
        self.follow_state().is_some_and(|state| state.is_deviated)
    }

    /// Reference checkpoints passed so far, in the order they were passed.
    pub fn covered_pace_points(&self) -> Vec<Checkpoint> {
        match self.follow_state() {
            Some(state) => state
                .covered
                .iter()
                .filter_map(|&i| state.pace_run.checkpoints.get(i).copied())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Meters actually travelled so far.
    pub fn distance_so_far(&self) -> f64 {
        self.checkpoints.last().map_or(0.0, |c| c.actual_distance)
    }

    /// Seconds elapsed at the last checkpoint.
    pub fn time_so_far(&self) -> f64 {
        self.checkpoints.last().map_or(0.0, |c| c.time)
    }

    fn follow_state(&self) -> Option<&FollowState> {
        match &self.mode {
            RunMode::Follow(state) => Some(state),
            RunMode::New => None,
        }
    }

    fn overlap_with(&self, state: &FollowState, normalized: &[Checkpoint]) -> OverlapResult {
        classification::overlap(
            state.covered.len(),
            &state.pace_run.checkpoints,
            normalized,
            self.config.same_route_overlap_threshold,
        )
    }
}
