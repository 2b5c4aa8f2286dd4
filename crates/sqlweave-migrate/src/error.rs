//! Error types for the migration driver.

use std::path::PathBuf;

use sqlweave_core::BuildError;
use sqlweave_db::DbError;

/// SQLSTATE reported when a relation does not exist.
pub const UNDEFINED_TABLE: &str = "42P01";

/// Errors that can occur while running migrations.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// A migration step could not be compiled; nothing was sent to the
    /// database for it.
    #[error("Invalid migration: {0}")]
    Build(#[from] BuildError),

    /// Error reported while running a statement.
    #[error(transparent)]
    Db(#[from] DbError),

    /// The migrated-versions table does not exist yet.
    #[error("Migrations table '{0}' does not exist")]
    NoMigrationsTable(String),

    /// IO error (reading the config file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the config file.
    #[error("Failed to parse config file '{path}': {source}")]
    Config {
        /// Path to the config file.
        path: PathBuf,
        /// Parse error.
        #[source]
        source: serde_json::Error,
    },
}

impl MigrateError {
    /// Maps an undefined-table error on `table` to [`MigrateError::NoMigrationsTable`].
    pub(crate) fn from_versions_lookup(err: DbError, table: &str) -> Self {
        if err.code().as_deref() == Some(UNDEFINED_TABLE) {
            Self::NoMigrationsTable(String::from(table))
        } else {
            Self::Db(err)
        }
    }
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_table_is_distinct() {
        let err = MigrateError::from_versions_lookup(
            DbError::with_code(UNDEFINED_TABLE, "relation does not exist"),
            "schemaMigrations",
        );
        assert!(matches!(err, MigrateError::NoMigrationsTable(ref t) if t == "schemaMigrations"));
    }

    #[test]
    fn test_other_errors_pass_through() {
        let err = MigrateError::from_versions_lookup(
            DbError::with_code("42501", "permission denied"),
            "schemaMigrations",
        );
        let MigrateError::Db(inner) = err else {
            panic!("expected a database error");
        };
        assert_eq!(inner.code().as_deref(), Some("42501"));
    }
}
