//! Patient Validator — existence-only lookups against the patient roster.

use tracing::warn;

use crate::error::AppError;
use super::SqlitePool;

#[derive(Clone)]
pub struct PatientDirectory {
    pool: SqlitePool,
}

impl PatientDirectory {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Whether `patient_id` is registered.
    ///
    /// Fails closed: a storage error reports `false` — an unverified patient
    /// is never admitted — but is logged so operators can tell "really
    /// nonexistent" from "lookup failed".
    pub fn exists(&self, patient_id: i64) -> bool {
        match self.try_exists(patient_id) {
            Ok(exists) => exists,
            Err(e) => {
                warn!(patient_id, "patient lookup unavailable, failing closed: {e}");
                false
            }
        }
    }

    fn try_exists(&self, patient_id: i64) -> Result<bool, AppError> {
        let conn = self
            .pool
            .get()
            .map_err(|e| AppError::Storage(format!("acquire connection: {e}")))?;
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM patients WHERE patient_id = ?1)",
            [patient_id],
            |row| row.get(0),
        )
        .map_err(|e| AppError::Storage(format!("query patient {patient_id}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use tempfile::TempDir;

    #[test]
    fn existing_and_unknown_patients() {
        let dir = TempDir::new().unwrap();
        let db = Database::open(&dir.path().join("test.db")).unwrap();

        let conn = db.patients.pool.get().unwrap();
        conn.execute("INSERT INTO patients (patient_id) VALUES (42)", []).unwrap();
        drop(conn);

        assert!(db.patients.exists(42));
        assert!(!db.patients.exists(999));
    }
}
