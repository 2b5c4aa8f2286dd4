//! Error types for query execution.

use sqlweave_core::BuildError;

/// Errors raised while running statements.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// The query could not be compiled.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Error reported by the driver or the server.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Error reported by a non-sqlx adapter, with its SQLSTATE when known.
    #[error("Adapter error: {message}")]
    Adapter {
        /// SQLSTATE code.
        code: Option<String>,
        /// Error message.
        message: String,
    },

    /// A query expecting exactly one row returned none.
    #[error("Record not found: {sql}")]
    NotFound {
        /// Text of the offending query.
        sql: String,
    },

    /// The transaction was already committed or rolled back.
    #[error("Transaction already finished")]
    TransactionFinished,
}

impl DbError {
    /// Creates an adapter error carrying a SQLSTATE code.
    #[must_use]
    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Adapter {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    /// Returns the SQLSTATE reported by the server, if any.
    #[must_use]
    pub fn code(&self) -> Option<String> {
        match self {
            Self::Database(sqlx::Error::Database(err)) => err.code().map(std::borrow::Cow::into_owned),
            Self::Adapter { code, .. } => code.clone(),
            _ => None,
        }
    }
}

/// Result type for query execution.
pub type Result<T> = std::result::Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_of_adapter_error() {
        let err = DbError::with_code("42P01", "relation does not exist");
        assert_eq!(err.code().as_deref(), Some("42P01"));
        assert_eq!(err.to_string(), "Adapter error: relation does not exist");
    }

    #[test]
    fn test_build_error_has_no_code() {
        let err = DbError::from(BuildError::EmptyInsert);
        assert_eq!(err.code(), None);
        assert_eq!(err.to_string(), "insert requires at least one record");
    }
}
