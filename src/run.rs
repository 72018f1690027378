//! Finished runs, the routes they belong to, and runner identities.

use serde::{Deserialize, Serialize};

use crate::geo_utils;
use crate::normalize::{checkpoint_at_route_distance, normalize};
use crate::{Bounds, Checkpoint, GpsPoint, PaceConfig, PaceError, Result};

/// Identifier used for runs recorded without a signed-in runner.
pub const ANONYMOUS_RUNNER_ID: &str = "anonymous";

/// Identity of a runner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Runner {
    pub id: String,
    pub name: String,
}

impl Runner {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Placeholder runner for routes recorded while signed out.
    pub fn anonymous() -> Self {
        Self::new(ANONYMOUS_RUNNER_ID, "Anonymous")
    }

    pub fn is_anonymous(&self) -> bool {
        self.id == ANONYMOUS_RUNNER_ID
    }
}

/// A finished run: an ordered, immutable list of checkpoints.
///
/// A run attached to a route has been normalized onto that route's axis, so
/// its checkpoints line up one-to-one with the route's creator run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Run {
    /// Storage id, assigned once the run is persisted
    pub id: Option<String>,
    pub runner: Runner,
    /// Route this run was matched against, if any
    pub route_id: Option<String>,
    /// Elapsed seconds at the last checkpoint
    pub time_spent: f64,
    pub checkpoints: Vec<Checkpoint>,
}

impl Run {
    pub fn new(runner: Runner, checkpoints: Vec<Checkpoint>) -> Self {
        let time_spent = checkpoints.last().map_or(0.0, |c| c.time);
        Self {
            id: None,
            runner,
            route_id: None,
            time_spent,
            checkpoints,
        }
    }

    /// Tag this run with the route it was matched against.
    pub fn with_route_id(mut self, route_id: impl Into<String>) -> Self {
        self.route_id = Some(route_id.into());
        self
    }

    pub fn starting_location(&self) -> Option<GpsPoint> {
        self.checkpoints.first().and_then(|c| c.location)
    }

    /// Distance along the route at the last checkpoint.
    pub fn total_distance(&self) -> f64 {
        self.checkpoints.last().map_or(0.0, |c| c.route_distance)
    }

    pub fn locations(&self) -> Vec<GpsPoint> {
        self.checkpoints.iter().filter_map(|c| c.location).collect()
    }

    /// Latitude/longitude extent of the run, `None` without locations.
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(&self.locations())
    }

    /// Whether the run finishes where it started.
    pub fn is_loop(&self, config: &PaceConfig) -> bool {
        let start = self.checkpoints.first().and_then(|c| c.location);
        let end = self.checkpoints.last().and_then(|c| c.location);
        match (start, end) {
            (Some(start), Some(end)) if self.checkpoints.len() > 1 => {
                geo_utils::is_same_location(&start, &end, config.same_location_threshold)
            }
            _ => false,
        }
    }

    /// Where this run was at `route_distance`, interpolated between checkpoints.
    ///
    /// Used to line two runs up at the same point of a route.
    pub fn checkpoint_at(&self, route_distance: f64) -> Option<Checkpoint> {
        checkpoint_at_route_distance(&self.checkpoints, route_distance).ok()
    }

    /// Normalize tracked checkpoints onto this run's distance axis.
    pub fn normalize(&self, tracked: &[Checkpoint]) -> Result<Vec<Checkpoint>> {
        normalize(&self.checkpoints, tracked)
    }

    /// True if both runs sample exactly the same route distances.
    pub fn shares_axis_with(&self, other: &Run) -> bool {
        self.checkpoints.len() == other.checkpoints.len()
            && self
                .checkpoints
                .iter()
                .zip(&other.checkpoints)
                .all(|(a, b)| a.route_distance == b.route_distance)
    }
}

/// A route: the creator run that defines its geometry and par pace, plus
/// every run matched against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Route {
    /// Storage id, assigned once the route is persisted
    pub id: Option<String>,
    pub name: String,
    pub creator: Runner,
    pub creator_run: Run,
    /// Comparison runs, all on the creator run's axis
    pub runs: Vec<Run>,
}

impl Route {
    /// Wrap raw checkpoints as the creator run of a new route.
    pub fn new(creator: Runner, checkpoints: Vec<Checkpoint>) -> Self {
        let creator_run = Run::new(creator.clone(), checkpoints);
        Self {
            id: None,
            name: String::new(),
            creator,
            creator_run,
            runs: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Length of the route, as defined by the creator run.
    pub fn total_distance(&self) -> f64 {
        self.creator_run.total_distance()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.creator_run.bounds()
    }

    /// Attach a comparison run. It must already sit on this route's axis.
    pub fn add_run(&mut self, mut run: Run) -> Result<()> {
        if !self.creator_run.shares_axis_with(&run) {
            return Err(PaceError::NotOnRouteAxis {
                expected: self.creator_run.checkpoints.len(),
                found: run.checkpoints.len(),
            });
        }
        if run.route_id.is_none() {
            run.route_id = self.id.clone();
        }
        self.runs.push(run);
        Ok(())
    }

    /// Fastest run on this route, the creator run included.
    pub fn best_run(&self) -> &Run {
        self.runs
            .iter()
            .fold(&self.creator_run, |best, run| {
                if run.time_spent < best.time_spent {
                    run
                } else {
                    best
                }
            })
    }
}
