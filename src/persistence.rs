//! # Run Store
//!
//! SQLite storage for finished routes and runs.
//!
//! The tracker never writes here itself: once an [`crate::OngoingRun`] is
//! finished, the caller hands the resulting [`Route`] or [`Run`] to the
//! store. Checkpoint lists are stored as MessagePack blobs; everything that
//! is queried on sits in its own column.
//!
//! Ids are SQLite row ids, exposed as strings on the model types.

use log::info;
use rusqlite::{params, Connection, OptionalExtension, Params};

use crate::{Checkpoint, PaceError, Result, Route, Run, Runner};

impl From<rusqlite::Error> for PaceError {
    fn from(err: rusqlite::Error) -> Self {
        PaceError::Persistence {
            message: err.to_string(),
        }
    }
}

impl From<rmp_serde::encode::Error> for PaceError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        PaceError::Persistence {
            message: format!("failed to encode checkpoints: {}", err),
        }
    }
}

impl From<rmp_serde::decode::Error> for PaceError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        PaceError::Persistence {
            message: format!("failed to decode checkpoints: {}", err),
        }
    }
}

const RUN_COLUMNS: &str = "id, route_id, runner_id, runner_name, time_spent, checkpoints";

/// A run as stored, before its checkpoints are decoded.
struct RunRow {
    id: i64,
    route_id: Option<i64>,
    runner_id: String,
    runner_name: String,
    time_spent: f64,
    checkpoints: Vec<u8>,
}

impl RunRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            route_id: row.get(1)?,
            runner_id: row.get(2)?,
            runner_name: row.get(3)?,
            time_spent: row.get(4)?,
            checkpoints: row.get(5)?,
        })
    }

    fn into_run(self) -> Result<Run> {
        let checkpoints: Vec<Checkpoint> = rmp_serde::from_slice(&self.checkpoints)?;
        Ok(Run {
            id: Some(self.id.to_string()),
            runner: Runner::new(self.runner_id, self.runner_name),
            route_id: self.route_id.map(|id| id.to_string()),
            time_spent: self.time_spent,
            checkpoints,
        })
    }
}

fn parse_id(id: &str) -> Result<i64> {
    id.parse().map_err(|_| PaceError::Persistence {
        message: format!("invalid id '{}'", id),
    })
}

/// SQLite-backed store for routes and runs.
pub struct RunStore {
    db: Connection,
}

impl RunStore {
    /// Open (or create) a store at the given database path.
    pub fn new(db_path: &str) -> Result<Self> {
        let db = Connection::open(db_path)?;
        Self::init_schema(&db)?;
        Ok(Self { db })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        Self::new(":memory:")
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            -- Routes, defined by their creator run
            CREATE TABLE IF NOT EXISTS routes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                creator_id TEXT NOT NULL,
                creator_name TEXT NOT NULL,
                creator_run_id INTEGER,
                created_at INTEGER DEFAULT (strftime('%s', 'now'))
            );

            -- Runs; creator runs and comparison runs alike
            CREATE TABLE IF NOT EXISTS runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                route_id INTEGER REFERENCES routes(id) ON DELETE CASCADE,
                runner_id TEXT NOT NULL,
                runner_name TEXT NOT NULL,
                time_spent REAL NOT NULL,
                total_distance REAL NOT NULL,
                checkpoint_count INTEGER NOT NULL,
                checkpoints BLOB NOT NULL,
                created_at INTEGER DEFAULT (strftime('%s', 'now'))
            );

            CREATE INDEX IF NOT EXISTS idx_runs_route ON runs(route_id);
            CREATE INDEX IF NOT EXISTS idx_runs_runner ON runs(runner_id);

            PRAGMA foreign_keys = ON;
        "#,
        )?;
        Ok(())
    }

    fn insert_run(conn: &Connection, run: &Run, route_id: Option<i64>) -> Result<i64> {
        let blob = rmp_serde::to_vec(&run.checkpoints)?;
        conn.execute(
            "INSERT INTO runs (route_id, runner_id, runner_name, time_spent, total_distance, checkpoint_count, checkpoints)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                route_id,
                run.runner.id,
                run.runner.name,
                run.time_spent,
                run.total_distance(),
                run.checkpoints.len() as i64,
                blob
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Save a new route with its creator run (and any runs already attached).
    ///
    /// Assigns ids to the route and its runs and returns the route id.
    pub fn save_new_route(&mut self, route: &mut Route) -> Result<String> {
        let tx = self.db.transaction()?;
        tx.execute(
            "INSERT INTO routes (name, creator_id, creator_name) VALUES (?, ?, ?)",
            params![route.name, route.creator.id, route.creator.name],
        )?;
        let route_id = tx.last_insert_rowid();

        let creator_run_id = Self::insert_run(&tx, &route.creator_run, Some(route_id))?;
        tx.execute(
            "UPDATE routes SET creator_run_id = ? WHERE id = ?",
            params![creator_run_id, route_id],
        )?;
        let mut run_ids = Vec::with_capacity(route.runs.len());
        for run in &route.runs {
            run_ids.push(Self::insert_run(&tx, run, Some(route_id))?);
        }
        tx.commit()?;

        let route_key = route_id.to_string();
        route.id = Some(route_key.clone());
        route.creator_run.id = Some(creator_run_id.to_string());
        route.creator_run.route_id = Some(route_key.clone());
        for (run, id) in route.runs.iter_mut().zip(run_ids) {
            run.id = Some(id.to_string());
            run.route_id = Some(route_key.clone());
        }

        info!(
            "[RunStore] Saved route {} ({} checkpoints, {} runs)",
            route_key,
            route.creator_run.checkpoints.len(),
            route.runs.len()
        );
        Ok(route_key)
    }

    /// Save a run matched against an existing route.
    ///
    /// The run must already be normalized onto the route's axis.
    pub fn save_new_run(&mut self, run: &mut Run, route_id: &str) -> Result<String> {
        let route_key = parse_id(route_id)?;
        let creator_run = self
            .creator_run(route_key)?
            .ok_or_else(|| PaceError::Persistence {
                message: format!("route '{}' not found", route_id),
            })?;
        if !creator_run.shares_axis_with(run) {
            return Err(PaceError::NotOnRouteAxis {
                expected: creator_run.checkpoints.len(),
                found: run.checkpoints.len(),
            });
        }

        let id = Self::insert_run(&self.db, run, Some(route_key))?;
        run.id = Some(id.to_string());
        run.route_id = Some(route_id.to_string());

        info!("[RunStore] Saved run {} on route {}", id, route_id);
        Ok(id.to_string())
    }

    /// Load a route with its creator run and comparison runs.
    pub fn get_route(&self, route_id: &str) -> Result<Option<Route>> {
        let key = parse_id(route_id)?;
        let header = self
            .db
            .query_row(
                "SELECT name, creator_id, creator_name, creator_run_id FROM routes WHERE id = ?",
                params![key],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<i64>>(3)?,
                    ))
                },
            )
            .optional()?;
        let Some((name, creator_id, creator_name, creator_run_id)) = header else {
            return Ok(None);
        };

        let creator_run = self.creator_run(key)?.ok_or_else(|| PaceError::Persistence {
            message: format!("route '{}' has no creator run", route_id),
        })?;
        let runs = self.query_runs(
            &format!(
                "SELECT {} FROM runs WHERE route_id = ? AND id IS NOT ? ORDER BY id",
                RUN_COLUMNS
            ),
            params![key, creator_run_id],
        )?;

        Ok(Some(Route {
            id: Some(route_id.to_string()),
            name,
            creator: Runner::new(creator_id, creator_name),
            creator_run,
            runs,
        }))
    }

    /// Comparison runs of a route, oldest first. Excludes the creator run.
    pub fn runs_for_route(&self, route_id: &str) -> Result<Vec<Run>> {
        let key = parse_id(route_id)?;
        self.query_runs(
            &format!(
                "SELECT {} FROM runs WHERE route_id = ?1
                 AND id IS NOT (SELECT creator_run_id FROM routes WHERE id = ?1)
                 ORDER BY id",
                RUN_COLUMNS
            ),
            params![key],
        )
    }

    /// Every run by a runner, creator runs included, oldest first.
    pub fn runs_for_runner(&self, runner_id: &str) -> Result<Vec<Run>> {
        self.query_runs(
            &format!(
                "SELECT {} FROM runs WHERE runner_id = ? ORDER BY id",
                RUN_COLUMNS
            ),
            params![runner_id],
        )
    }

    pub fn route_count(&self) -> Result<u32> {
        let count: i64 = self
            .db
            .query_row("SELECT COUNT(*) FROM routes", [], |row| row.get(0))?;
        Ok(count as u32)
    }

    fn creator_run(&self, route_key: i64) -> Result<Option<Run>> {
        let row = self
            .db
            .query_row(
                &format!(
                    "SELECT {} FROM runs WHERE id = (SELECT creator_run_id FROM routes WHERE id = ?)",
                    RUN_COLUMNS
                ),
                params![route_key],
                RunRow::from_row,
            )
            .optional()?;
        row.map(RunRow::into_run).transpose()
    }

    fn query_runs<P: Params>(&self, sql: &str, params: P) -> Result<Vec<Run>> {
        let mut stmt = self.db.prepare(sql)?;
        let rows = stmt
            .query_map(params, RunRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(RunRow::into_run).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GpsPoint;

    fn checkpoints(seconds_per_point: f64) -> Vec<Checkpoint> {
        (0..5)
            .map(|i| {
                let d = i as f64 * 20.0;
                Checkpoint::new(
                    GpsPoint::new(1.3521 + i as f64 * 0.0002, 103.8198),
                    i as f64 * seconds_per_point,
                    d,
                    d,
                )
            })
            .collect()
    }

    #[test]
    fn test_create_store() {
        let store = RunStore::in_memory().unwrap();
        assert_eq!(store.route_count().unwrap(), 0);
    }

    #[test]
    fn test_save_and_load_route() {
        let mut store = RunStore::in_memory().unwrap();
        let mut route = Route::new(Runner::new("u1", "Alex"), checkpoints(10.0)).with_name("Canal");
        let id = store.save_new_route(&mut route).unwrap();

        assert_eq!(route.id.as_deref(), Some(id.as_str()));
        let loaded = store.get_route(&id).unwrap().unwrap();
        assert_eq!(loaded.name, "Canal");
        assert_eq!(loaded.creator, route.creator);
        assert_eq!(loaded.creator_run.checkpoints, route.creator_run.checkpoints);
        assert!(loaded.runs.is_empty());
        assert!(store.get_route("999").unwrap().is_none());
    }

    #[test]
    fn test_save_run_on_route() {
        let mut store = RunStore::in_memory().unwrap();
        let mut route = Route::new(Runner::new("u1", "Alex"), checkpoints(10.0));
        let route_id = store.save_new_route(&mut route).unwrap();

        let mut run = Run::new(Runner::new("u2", "Sam"), checkpoints(12.0));
        store.save_new_run(&mut run, &route_id).unwrap();
        assert_eq!(run.route_id.as_deref(), Some(route_id.as_str()));

        let runs = store.runs_for_route(&route_id).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0], run);

        let loaded = store.get_route(&route_id).unwrap().unwrap();
        assert_eq!(loaded.runs, vec![run]);
        assert_eq!(store.runs_for_runner("u1").unwrap().len(), 1);
    }

    #[test]
    fn test_reject_run_off_axis() {
        let mut store = RunStore::in_memory().unwrap();
        let mut route = Route::new(Runner::new("u1", "Alex"), checkpoints(10.0));
        let route_id = store.save_new_route(&mut route).unwrap();

        let mut run = Run::new(Runner::new("u2", "Sam"), checkpoints(12.0)[..3].to_vec());
        assert!(matches!(
            store.save_new_run(&mut run, &route_id),
            Err(PaceError::NotOnRouteAxis { .. })
        ));
        assert!(matches!(
            store.save_new_run(&mut run, "not-an-id"),
            Err(PaceError::Persistence { .. })
        ));
    }
}
