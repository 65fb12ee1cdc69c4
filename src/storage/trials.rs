//! Trial Registry — read-only access to the trial catalog.

use tracing::warn;

use crate::error::AppError;
use super::SqlitePool;

/// One clinical trial and its registered drug.  Immutable reference data;
/// the catalog is maintained outside the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trial {
    pub trial_id: i64,
    pub name: String,
    pub drug_name: String,
}

impl Trial {
    /// The menu label shown to the user, e.g. `"1. Trial A (DrugX)"`.
    /// The leading numeric token is what trial selection parses back out.
    pub fn menu_label(&self) -> String {
        format!("{}. {} ({})", self.trial_id, self.name, self.drug_name)
    }
}

#[derive(Clone)]
pub struct TrialRegistry {
    pool: SqlitePool,
}

impl TrialRegistry {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All trials ordered by `trial_id` ascending.
    ///
    /// Degrades to an empty catalog on storage failure — the conversation
    /// layer treats that as "no trials available", never as a fatal abort.
    pub fn list(&self) -> Vec<Trial> {
        match self.try_list() {
            Ok(trials) => trials,
            Err(e) => {
                warn!("trial listing unavailable: {e}");
                Vec::new()
            }
        }
    }

    /// One trial by id; `None` covers both "no such trial" and failure.
    pub fn find(&self, trial_id: i64) -> Option<Trial> {
        match self.try_find(trial_id) {
            Ok(trial) => trial,
            Err(e) => {
                warn!(trial_id, "trial lookup unavailable: {e}");
                None
            }
        }
    }

    fn try_list(&self) -> Result<Vec<Trial>, AppError> {
        let conn = self
            .pool
            .get()
            .map_err(|e| AppError::Storage(format!("acquire connection: {e}")))?;
        let mut stmt = conn
            .prepare("SELECT trial_id, trial_name, med FROM trials ORDER BY trial_id")
            .map_err(|e| AppError::Storage(format!("prepare trial listing: {e}")))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Trial {
                    trial_id: row.get(0)?,
                    name: row.get(1)?,
                    drug_name: row.get(2)?,
                })
            })
            .map_err(|e| AppError::Storage(format!("query trials: {e}")))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::Storage(format!("read trial row: {e}")))
    }

    fn try_find(&self, trial_id: i64) -> Result<Option<Trial>, AppError> {
        let conn = self
            .pool
            .get()
            .map_err(|e| AppError::Storage(format!("acquire connection: {e}")))?;
        conn.query_row(
            "SELECT trial_id, trial_name, med FROM trials WHERE trial_id = ?1",
            [trial_id],
            |row| {
                Ok(Trial {
                    trial_id: row.get(0)?,
                    name: row.get(1)?,
                    drug_name: row.get(2)?,
                })
            },
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(AppError::Storage(format!("query trial {trial_id}: {other}"))),
        })
    }
}
