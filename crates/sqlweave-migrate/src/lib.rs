//! Reversible Postgres migrations.
//!
//! `sqlweave-migrate` runs schema changes described with
//! [`sqlweave_core::migrations`] against a database, where:
//! - Every operation has a twin that undoes it, so rolling back reruns the
//!   same migration with the direction flipped
//! - Statements run in order through an [`Adapter`](sqlweave_db::Adapter),
//!   normally one open transaction owned by the caller
//! - Applied versions are tracked in a single-column table
//!
//! # Example
//!
//! ```rust,ignore
//! use sqlweave_core::migrations::types::{identity, text, timestamps};
//! use sqlweave_core::migrations::CreateTableOptions;
//! use sqlweave_migrate::prelude::*;
//!
//! let tx = PgAdapter::new(pool).begin().await?;
//! let mut db = Migration::new(&tx, true, MigrationConfig::default());
//!
//! db.create_table("user", CreateTableOptions::default(), |_| {
//!     let mut columns = vec![
//!         (String::from("id"), identity().primary_key()),
//!         (String::from("name"), text().not_null()),
//!     ];
//!     columns.extend(timestamps());
//!     columns
//! })
//! .await?;
//!
//! save_migrated_version(db.silent(), "20240101000000", db.config()).await?;
//! tx.commit().await?;
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Create the versions table
//! sqlweave-migrate init
//!
//! # List applied versions
//! sqlweave-migrate status
//! ```

pub mod config;
pub mod error;
pub mod migration;
pub mod versions;

pub use config::MigrationConfig;
pub use error::{MigrateError, Result};
pub use migration::{EnumOptions, Migration};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::{MigrationConfig, DEFAULT_MIGRATIONS_TABLE};
    pub use crate::error::{MigrateError, Result};
    pub use crate::migration::{EnumOptions, Migration};
    pub use crate::versions::{
        create_migrations_table, get_migrated_versions_map, remove_migrated_version,
        save_migrated_version,
    };
    pub use sqlweave_db::{Adapter, PgAdapter, PgTransactionAdapter, QueryLog, TracingLog};
}
