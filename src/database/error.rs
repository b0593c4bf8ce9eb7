//! Database error types, mapped from sqlx in one place.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("duplicate {entity}: {id}")]
    Duplicate { entity: String, id: String },

    #[error("database timeout: {message}")]
    Timeout { message: String },

    #[error("database connection failed: {message}")]
    Connection { message: String },

    #[error("database error: {message}")]
    Unknown { message: String },
}

impl DatabaseError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DatabaseError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DatabaseError::Duplicate {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Classifies a sqlx error. `entity` and `id` give `NotFound` and
    /// `Duplicate` something useful to report.
    pub fn from_sqlx(err: sqlx::Error, entity: &str, id: &str) -> Self {
        match &err {
            sqlx::Error::RowNotFound => DatabaseError::not_found(entity, id),
            sqlx::Error::PoolTimedOut => DatabaseError::Timeout {
                message: "connection pool acquire timed out".to_string(),
            },
            sqlx::Error::Io(e) => DatabaseError::Connection {
                message: e.to_string(),
            },
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DatabaseError::duplicate(entity, id)
            }
            _ => DatabaseError::Unknown {
                message: err.to_string(),
            },
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DatabaseError::Timeout { .. } | DatabaseError::Connection { .. }
        )
    }
}
