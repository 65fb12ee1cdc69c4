//! Schema DDL and connection pragmas shared by all stores.

use rusqlite::Connection;

use crate::error::AppError;

/// Schema version stored in `PRAGMA user_version`.
/// Increment when the DDL changes; add a migration path in [`init_schema`].
pub(crate) const SCHEMA_VERSION: i64 = 1;

/// Apply recommended pragmas to a freshly-acquired connection.
///
/// - `journal_mode = WAL` — concurrent readers alongside a writer.
/// - `foreign_keys = ON` — measurements reference patients and trials.
/// - `busy_timeout = 5000` — wait up to 5 s before returning `SQLITE_BUSY`.
pub(crate) fn apply_pragmas(conn: &Connection) -> Result<(), AppError> {
    conn.pragma_update(None, "journal_mode", "WAL")
        .map_err(|e| AppError::Storage(format!("set journal_mode WAL: {e}")))?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(|e| AppError::Storage(format!("set foreign_keys ON: {e}")))?;
    conn.pragma_update(None, "busy_timeout", 5000)
        .map_err(|e| AppError::Storage(format!("set busy_timeout: {e}")))?;
    Ok(())
}

/// Execute the v1 schema DDL.
///
/// Three tables:
/// - `patients` — registered patient ids, reference data.
/// - `trials` — trial catalog (`med` is the trial's registered drug).
/// - `measurements` — append-only wellbeing submissions.
///
/// Sets `PRAGMA user_version = 1` so re-opens can skip the DDL.
pub(crate) fn init_schema(conn: &Connection) -> Result<(), AppError> {
    let version: i64 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| AppError::Storage(format!("read user_version: {e}")))?;
    if version >= SCHEMA_VERSION {
        return Ok(());
    }

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS patients (
            patient_id INTEGER PRIMARY KEY
        );

        CREATE TABLE IF NOT EXISTS trials (
            trial_id INTEGER PRIMARY KEY,
            trial_name TEXT NOT NULL,
            med TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS measurements (
            patient_id INTEGER NOT NULL REFERENCES patients(patient_id),
            trial_id INTEGER NOT NULL REFERENCES trials(trial_id),
            measurement_date TEXT NOT NULL,
            drug TEXT NOT NULL,
            condition_score INTEGER NOT NULL
                CHECK (condition_score BETWEEN 0 AND 100)
        );

        CREATE INDEX IF NOT EXISTS idx_measurements_trial_drug
            ON measurements (trial_id, drug);

        PRAGMA user_version = 1;
        ",
    )
    .map_err(|e| AppError::Storage(format!("initialize schema: {e}")))
}
