//! Configuration errors raised while compiling queries and schema changes.
//!
//! Every variant here is detected before any statement reaches a database.

use thiserror::Error;

/// Errors raised while turning a query or a table change into SQL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// The statement kind needs a table but the query has none.
    #[error("table is missing for {0}")]
    MissingTable(&'static str),

    /// A raw fragment references a placeholder it has no value for.
    #[error("raw SQL placeholder ${index} has no value (fragment has {available})")]
    RawPlaceholder {
        /// The 1-based placeholder index found in the fragment.
        index: usize,
        /// Number of values supplied with the fragment.
        available: usize,
    },

    /// UPDATE or DELETE without any condition and without `all_rows()`.
    #[error("{0} without conditions requires all_rows()")]
    UnconditionedMutation(&'static str),

    /// `find` was used on a table without a declared primary key.
    #[error("table '{0}' has no primary key to find by")]
    NoPrimaryKeyForFind(String),

    /// A sub-query used as a source or join target has no name to alias it by.
    #[error("sub-query used as {0} needs an alias")]
    MissingAlias(&'static str),

    /// A column passed to `add`/`drop` without a key has no name.
    #[error("column in {0}() must have a name")]
    UnnamedColumn(&'static str),

    /// A table was declared without a primary key.
    #[error("table '{0}' has no primary key")]
    NoPrimaryKey(String),

    /// Insert without any record.
    #[error("insert requires at least one record")]
    EmptyInsert,

    /// Update without any assigned column.
    #[error("update requires at least one column to set")]
    EmptyUpdate,
}

/// Result type alias for query and DDL compilation.
pub type Result<T> = std::result::Result<T, BuildError>;
