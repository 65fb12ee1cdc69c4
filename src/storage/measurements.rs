//! Measurement Store — append-only writes plus the aggregate stats query.

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::error::SaveError;
use super::stats::DrugStatistics;
use super::SqlitePool;

#[derive(Clone)]
pub struct MeasurementStore {
    pool: SqlitePool,
}

impl MeasurementStore {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append exactly one measurement row.
    ///
    /// Preconditions are re-validated here even though the conversation
    /// layer already checked them — the write boundary does not trust its
    /// callers.  All checks and the insert run on one pooled connection;
    /// any error means no partial write occurred.
    pub fn save(
        &self,
        patient_id: i64,
        trial_id: i64,
        drug: &str,
        score: i64,
        date: NaiveDate,
    ) -> Result<(), SaveError> {
        if !(0..=100).contains(&score) {
            return Err(SaveError::InvalidScore(score));
        }

        let conn = self
            .pool
            .get()
            .map_err(|e| SaveError::Storage(format!("acquire connection: {e}")))?;

        let patient_ok: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM patients WHERE patient_id = ?1)",
                [patient_id],
                |row| row.get(0),
            )
            .map_err(|e| SaveError::Storage(format!("verify patient: {e}")))?;
        if !patient_ok {
            return Err(SaveError::UnknownPatient(patient_id));
        }

        let trial_ok: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM trials WHERE trial_id = ?1)",
                [trial_id],
                |row| row.get(0),
            )
            .map_err(|e| SaveError::Storage(format!("verify trial: {e}")))?;
        if !trial_ok {
            return Err(SaveError::UnknownTrial(trial_id));
        }

        conn.execute(
            "INSERT INTO measurements
                 (patient_id, trial_id, measurement_date, drug, condition_score)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![patient_id, trial_id, date.to_string(), drug, score],
        )
        .map_err(|e| SaveError::Storage(format!("insert measurement: {e}")))?;

        info!(patient_id, trial_id, drug, score, "measurement saved");
        Ok(())
    }

    /// Mean and count over all measurements for (trial_id, drug).
    ///
    /// `None` when there are no matching rows *or* the read failed — a
    /// degraded read logs and presents as "no baseline yet" downstream.
    pub fn statistics(&self, trial_id: i64, drug: &str) -> Option<DrugStatistics> {
        let conn = match self.pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                warn!(trial_id, drug, "statistics unavailable: {e}");
                return None;
            }
        };

        let row = conn.query_row(
            "SELECT AVG(condition_score), COUNT(*)
             FROM measurements
             WHERE trial_id = ?1 AND drug = ?2",
            rusqlite::params![trial_id, drug],
            |row| Ok((row.get::<_, Option<f64>>(0)?, row.get::<_, i64>(1)?)),
        );

        match row {
            Ok((avg, count)) => DrugStatistics::from_aggregate(avg, count),
            Err(e) => {
                warn!(trial_id, drug, "statistics query failed: {e}");
                None
            }
        }
    }
}
