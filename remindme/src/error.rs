//! Error types for RemindMe
//!
//! All errors use thiserror for structured error handling.
//! Skipped alert scheduling is an outcome, not an error, and lives in
//! `notifications::scheduler`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Reminder not found: {0}")]
    ReminderNotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    #[error("Alert error: {0}")]
    Alert(String),

    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Whether the failure came from the persistence layer and is worth
    /// retrying on the next reconciliation pass.
    pub fn is_persistence(&self) -> bool {
        matches!(self, AppError::Database(_) | AppError::Io(_))
    }
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::ReminderNotFound("abc".to_string());
        assert_eq!(err.to_string(), "Reminder not found: abc");

        let err = AppError::Validation("title is empty".to_string());
        assert_eq!(err.to_string(), "Validation error: title is empty");
    }

    #[test]
    fn test_persistence_classification() {
        assert!(AppError::Database(sqlx::Error::PoolClosed).is_persistence());
        assert!(!AppError::Validation("x".to_string()).is_persistence());
        assert!(!AppError::Alert("x".to_string()).is_persistence());
    }

    #[test]
    fn test_error_serialization() {
        let err = AppError::Alert("scheduler stopped".to_string());
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, "\"Alert error: scheduler stopped\"");
    }
}
