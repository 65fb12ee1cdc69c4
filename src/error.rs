//! Application-wide error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("comms error: {0}")]
    Comms(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure modes of the measurement write path.
///
/// Every variant means nothing was written: the insert re-validates its
/// preconditions first and is a single atomic statement.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("patient {0} is not registered")]
    UnknownPatient(i64),

    #[error("trial {0} does not exist")]
    UnknownTrial(i64),

    #[error("score {0} is outside 0–100")]
    InvalidScore(i64),

    #[error("storage failure: {0}")]
    Storage(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn config_error_display() {
        let e = AppError::Config("missing field".into());
        assert!(!e.to_string().is_empty());
        assert!(e.to_string().contains("missing field"));
    }

    #[test]
    fn storage_error_display() {
        let e = AppError::Storage("db locked".into());
        assert!(e.to_string().contains("db locked"));
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let e: AppError = io_err.into();
        assert!(e.to_string().contains("io error"));
        // satisfies std::error::Error trait
        let _: &dyn Error = &e;
    }

    #[test]
    fn save_error_carries_context() {
        assert!(SaveError::UnknownPatient(42).to_string().contains("42"));
        assert!(SaveError::UnknownTrial(7).to_string().contains("7"));
        assert!(SaveError::InvalidScore(101).to_string().contains("101"));
        assert!(SaveError::Storage("disk full".into()).to_string().contains("disk full"));
    }
}
