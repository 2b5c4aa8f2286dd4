//! Migrated-versions bookkeeping.
//!
//! The versions table has a single `version` column with one row per
//! applied migration. Bookkeeping statements bypass the query log.

use indexmap::IndexSet;
use sqlweave_core::quote::quote_name;
use sqlweave_core::value::quote_literal;
use sqlweave_core::Sql;
use sqlweave_db::Adapter;
use tracing::debug;

use crate::config::MigrationConfig;
use crate::error::{MigrateError, Result};

/// Creates the versions table if it does not exist yet.
pub async fn create_migrations_table(adapter: &dyn Adapter, config: &MigrationConfig) -> Result<()> {
    let sql = Sql::text(format!(
        "CREATE TABLE IF NOT EXISTS {} (version text NOT NULL)",
        quote_name(&config.migrations_table)
    ));
    adapter.query(&sql).await?;
    debug!(table = %config.migrations_table, "Migrations table ready");
    Ok(())
}

/// Records `version` as applied.
pub async fn save_migrated_version(
    adapter: &dyn Adapter,
    version: &str,
    config: &MigrationConfig,
) -> Result<()> {
    let sql = Sql::text(format!(
        "INSERT INTO {} VALUES ({})",
        quote_name(&config.migrations_table),
        quote_literal(version)
    ));
    adapter.arrays(&sql).await?;
    Ok(())
}

/// Forgets `version` after it was rolled back.
pub async fn remove_migrated_version(
    adapter: &dyn Adapter,
    version: &str,
    config: &MigrationConfig,
) -> Result<()> {
    let sql = Sql::text(format!(
        "DELETE FROM {} WHERE version = {}",
        quote_name(&config.migrations_table),
        quote_literal(version)
    ));
    adapter.arrays(&sql).await?;
    Ok(())
}

/// Applied versions in table order.
///
/// A missing versions table is reported as
/// [`MigrateError::NoMigrationsTable`] so callers can tell a fresh database
/// from a failing one.
pub async fn get_migrated_versions_map(
    adapter: &dyn Adapter,
    config: &MigrationConfig,
) -> Result<IndexSet<String>> {
    let sql = Sql::text(format!(
        "SELECT * FROM {}",
        quote_name(&config.migrations_table)
    ));
    let result = adapter
        .arrays(&sql)
        .await
        .map_err(|err| MigrateError::from_versions_lookup(err, &config.migrations_table))?;

    Ok(result
        .rows
        .into_iter()
        .filter_map(|row| row.into_iter().next())
        .filter_map(|value| value.as_str().map(String::from))
        .collect())
}
