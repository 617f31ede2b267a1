use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Failures surfaced by the ledgers, registry and chunk store.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    #[error("Corruption detected in file {file_id}: {reason}")]
    CorruptionDetected { file_id: String, reason: String },

    #[error("Collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),

    #[error("Data quality violation: {0}")]
    DataQualityViolation(String),

    #[error("Database error: {0}")]
    Database(DbErr),

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl From<DbErr> for LedgerError {
    fn from(err: DbErr) -> Self {
        if is_foreign_key_violation(&err) {
            LedgerError::ForeignKeyViolation(err.to_string())
        } else {
            LedgerError::Database(err)
        }
    }
}

pub fn is_foreign_key_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_)))
        || err.to_string().contains("FOREIGN KEY constraint failed")
}

pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
        || err.to_string().contains("UNIQUE constraint failed")
}

impl LedgerError {
    pub fn not_found(what: &str, id: &str) -> Self {
        LedgerError::NotFound(format!("{} '{}' not found", what, id))
    }

    pub fn corruption(file_id: &str, reason: impl Into<String>) -> Self {
        LedgerError::CorruptionDetected {
            file_id: file_id.to_string(),
            reason: reason.into(),
        }
    }
}
