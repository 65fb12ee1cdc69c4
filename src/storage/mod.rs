//! Storage subsystem — SQLite-backed reference data, measurements, and stats.
//!
//! # Architecture
//!
//! A single [`Database`] owns an r2d2 connection pool and the three
//! data-access stores built on it:
//!
//! - [`TrialRegistry`] — read-only trial catalog.
//! - [`PatientDirectory`] — existence-only patient lookups.
//! - [`MeasurementStore`] — append-only measurement writes plus the
//!   aggregate statistics query.
//!
//! All rusqlite calls are blocking; the async methods on [`Database`]
//! dispatch them through `spawn_blocking` so conversation tasks never stall
//! the runtime.  Every operation acquires a pooled connection scoped to that
//! one call — released on success, validation failure, and error alike.
//!
//! # Degradation policy
//!
//! Read paths never propagate storage failures to callers: listing degrades
//! to an empty catalog, lookups to "not found", and patient checks fail
//! closed to `false`.  Each degraded read leaves a `warn!` record so an
//! operator can distinguish "no such row" from "lookup failed".  The write
//! path is the opposite: [`SaveError`] is surfaced so the conversation layer
//! can abort the session.

pub mod measurements;
pub mod patients;
pub mod schema;
pub mod stats;
pub mod trials;

pub use measurements::MeasurementStore;
pub use patients::PatientDirectory;
pub use stats::DrugStatistics;
pub use trials::{Trial, TrialRegistry};

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use tracing::{info, warn};

use crate::error::{AppError, SaveError};

/// Pooled SQLite handle shared by all stores.
pub(crate) type SqlitePool = Arc<Pool<SqliteConnectionManager>>;

/// Maximum pooled connections.  Writes are single-row appends and reads are
/// independent aggregates, so a small pool is plenty.
const POOL_MAX_SIZE: u32 = 8;

pub struct Database {
    pub trials: TrialRegistry,
    pub patients: PatientDirectory,
    pub measurements: MeasurementStore,
}

impl Database {
    /// Open (creating if needed) the database at `db_path`, apply pragmas,
    /// and initialise the schema.
    pub fn open(db_path: &Path) -> Result<Self, AppError> {
        info!(path = %db_path.display(), "opening database");

        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let manager = SqliteConnectionManager::file(db_path);
        let pool = Pool::builder()
            .max_size(POOL_MAX_SIZE)
            .build(manager)
            .map_err(|e| AppError::Storage(format!("create connection pool: {e}")))?;
        let pool: SqlitePool = Arc::new(pool);

        {
            let conn = pool
                .get()
                .map_err(|e| AppError::Storage(format!("acquire connection: {e}")))?;
            schema::apply_pragmas(&conn)?;
            schema::init_schema(&conn)?;
        }

        Ok(Self {
            trials: TrialRegistry::new(pool.clone()),
            patients: PatientDirectory::new(pool.clone()),
            measurements: MeasurementStore::new(pool),
        })
    }

    // ── Async wrappers ────────────────────────────────────────────────
    //
    // One spawn_blocking hop per operation; join failures follow the same
    // degradation policy as storage failures on that path.

    /// All trials ordered by `trial_id` ascending; empty on storage failure.
    pub async fn list_trials(&self) -> Vec<Trial> {
        let registry = self.trials.clone();
        match tokio::task::spawn_blocking(move || registry.list()).await {
            Ok(trials) => trials,
            Err(e) => {
                warn!("list_trials join: {e}");
                Vec::new()
            }
        }
    }

    /// Look up one trial; `None` covers both "no such trial" and failure.
    pub async fn find_trial(&self, trial_id: i64) -> Option<Trial> {
        let registry = self.trials.clone();
        match tokio::task::spawn_blocking(move || registry.find(trial_id)).await {
            Ok(trial) => trial,
            Err(e) => {
                warn!("find_trial join: {e}");
                None
            }
        }
    }

    /// Existence check; fails closed to `false`.
    pub async fn patient_exists(&self, patient_id: i64) -> bool {
        let directory = self.patients.clone();
        match tokio::task::spawn_blocking(move || directory.exists(patient_id)).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!("patient_exists join: {e}");
                false
            }
        }
    }

    /// Append one measurement row after re-validating preconditions.
    pub async fn save_measurement(
        &self,
        patient_id: i64,
        trial_id: i64,
        drug: &str,
        score: i64,
        date: NaiveDate,
    ) -> Result<(), SaveError> {
        let store = self.measurements.clone();
        let drug = drug.to_string();
        tokio::task::spawn_blocking(move || store.save(patient_id, trial_id, &drug, score, date))
            .await
            .map_err(|e| SaveError::Storage(format!("save join: {e}")))?
    }

    /// Aggregate statistics for a trial/drug pairing; `None` when there are
    /// no matching rows or the read failed.
    pub async fn drug_statistics(&self, trial_id: i64, drug: &str) -> Option<DrugStatistics> {
        let store = self.measurements.clone();
        let drug = drug.to_string();
        match tokio::task::spawn_blocking(move || store.statistics(trial_id, &drug)).await {
            Ok(stats) => stats,
            Err(e) => {
                warn!("drug_statistics join: {e}");
                None
            }
        }
    }
}
