//! Migration settings.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};

/// Default name of the migrated-versions table.
pub const DEFAULT_MIGRATIONS_TABLE: &str = "schemaMigrations";

/// Settings shared by every migration of a run.
///
/// Loaded from JSON with camelCase keys; missing keys take their defaults.
///
/// ```
/// use sqlweave_migrate::MigrationConfig;
///
/// let config: MigrationConfig = serde_json::from_str(r#"{"snakeCase": true}"#).unwrap();
/// assert_eq!(config.migrations_table, "schemaMigrations");
/// assert!(config.snake_case);
/// assert!(config.log);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MigrationConfig {
    /// Table holding one row per applied version.
    pub migrations_table: String,
    /// Converts camelCase column keys to snake_case column names.
    pub snake_case: bool,
    /// Logs every migration statement.
    pub log: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            migrations_table: String::from(DEFAULT_MIGRATIONS_TABLE),
            snake_case: false,
            log: true,
        }
    }
}

impl MigrationConfig {
    /// Reads a JSON config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|source| MigrateError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Uses `table` for version bookkeeping.
    #[must_use]
    pub fn migrations_table(mut self, table: impl Into<String>) -> Self {
        self.migrations_table = table.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = MigrationConfig::default();
        assert_eq!(config.migrations_table, DEFAULT_MIGRATIONS_TABLE);
        assert!(!config.snake_case);
        assert!(config.log);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"migrationsTable": "versions", "log": false}}"#).unwrap();

        let config = MigrationConfig::from_file(file.path()).unwrap();
        assert_eq!(config.migrations_table, "versions");
        assert!(!config.log);
    }

    #[test]
    fn test_invalid_file_names_the_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = MigrationConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, MigrateError::Config { ref path, .. } if path == file.path()));
    }
}
