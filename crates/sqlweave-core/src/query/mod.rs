//! The immutable, chainable query state.
//!
//! A [`Query`] is a plain value holding every accumulated clause. Each
//! builder comes in two forms: `x(&self, ..) -> Self` clones the receiver
//! and delegates to `x_mut(&mut self, ..) -> &mut Self`, which edits in
//! place. A clone owns its clause lists, so editing a derived query never
//! changes its ancestor or siblings.
//!
//! # Example
//!
//! ```rust
//! use sqlweave_core::query::{col, Compare, Query};
//!
//! let users = Query::table("user");
//! let sql = users.select(["id", "name"]).filter([col("id").gt(0)]).to_sql().unwrap();
//!
//! assert_eq!(
//!     sql.text,
//!     r#"SELECT "user"."id", "user"."name" FROM "user" WHERE "user"."id" > $1"#
//! );
//! ```

use std::collections::BTreeMap;

use crate::error::Result;
use crate::quote::split_schema;
use crate::raw::Sql;

mod expr;
mod filter;
mod group;
mod hooks;
mod join;
mod lock;
mod mutation;
mod order;
mod predicate;
mod result;
mod select;
mod source;

pub use expr::{
    array_agg, asc, avg, bool_and, bool_or, col, count, count_all, dense_rank, desc, json_agg,
    max, min, rank, row_number, string_agg, sum, val, ColumnRef, Compare, Direction, Expr,
    FnCall, IntoExpr, IntoOperand, Nulls, Op, OrderItem, Over, WindowSpec,
};
pub use hooks::{ColumnParser, HookPoint, QueryHook};
pub use join::{JoinItem, JoinKind, JoinTarget};
pub use lock::{LockClause, LockStrength, LockWait};
pub use mutation::{
    ConflictAction, ConflictTarget, InsertData, InsertSource, IntoValueExpr, OnConflict,
    OnConflictBuilder, Record, SetValue, TruncateOptions, UpdateSet,
};
pub use predicate::{and, exists, not, or, Operand, WhereItem};
pub use select::SelectItem;
pub use source::{Source, UnionItem, UnionKind, WithItem, WithOptions};

/// Generates the cloning form of a builder from its `_mut` form.
macro_rules! chain {
    ($(#[$meta:meta])* $name:ident => $mut_name:ident($($arg:ident: $ty:ty),* $(,)?)) => {
        $(#[$meta])*
        #[must_use]
        pub fn $name(&self, $($arg: $ty),*) -> Self {
            let mut query = self.clone();
            query.$mut_name($($arg),*);
            query
        }
    };
}
pub(crate) use chain;

/// The statement a query compiles to.
#[derive(Debug, Clone, Default)]
pub enum QueryKind {
    /// `SELECT`.
    #[default]
    Select,
    /// `INSERT`.
    Insert(InsertData),
    /// `UPDATE`.
    Update(Vec<UpdateSet>),
    /// `DELETE`.
    Delete,
    /// `TRUNCATE`.
    Truncate(TruncateOptions),
    /// Column metadata from `information_schema.columns`, optionally for one column.
    ColumnInfo(Option<String>),
}

/// The result shape the executor produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnType {
    /// All rows as objects.
    #[default]
    All,
    /// Exactly one row; zero rows is a not-found error.
    One,
    /// At most one row.
    OneOptional,
    /// All rows as arrays of values.
    Rows,
    /// The first column of every row.
    Pluck,
    /// The first column of the first row; zero rows is a not-found error.
    Value,
    /// The first column of the first row, if any.
    ValueOptional,
    /// Nothing but the affected row count.
    Void,
}

impl ReturnType {
    /// Returns true for shapes that read a single row.
    #[must_use]
    pub const fn is_single_row(self) -> bool {
        matches!(self, Self::One | Self::OneOptional)
    }
}

/// Every accumulated clause of a query.
///
/// A field that is empty or `None` means the clause is not used.
#[derive(Debug, Clone, Default)]
pub struct QueryData {
    /// Statement kind.
    pub kind: QueryKind,
    /// Schema of the table.
    pub schema: Option<String>,
    /// Table alias (`AS`).
    pub alias: Option<String>,
    /// Source replacing the table in `FROM`.
    pub from: Option<Source>,
    /// Common table expressions.
    pub with: Vec<WithItem>,
    /// `DISTINCT`, with `ON` expressions when non-empty.
    pub distinct: Option<Vec<Expr>>,
    /// Projection list.
    pub select: Vec<SelectItem>,
    /// Joins in call order.
    pub joins: Vec<JoinItem>,
    /// AND-ed conditions.
    pub and: Vec<WhereItem>,
    /// OR-ed AND-groups.
    pub or: Vec<Vec<WhereItem>>,
    /// `GROUP BY` expressions.
    pub group: Vec<Expr>,
    /// AND-ed `HAVING` conditions.
    pub having: Vec<WhereItem>,
    /// OR-ed `HAVING` groups.
    pub having_or: Vec<Vec<WhereItem>>,
    /// Named windows.
    pub windows: Vec<(String, WindowSpec)>,
    /// `UNION`/`INTERSECT`/`EXCEPT` members.
    pub unions: Vec<UnionItem>,
    /// `ORDER BY` terms.
    pub order: Vec<OrderItem>,
    /// `LIMIT`.
    pub limit: Option<u64>,
    /// `OFFSET`.
    pub offset: Option<u64>,
    /// Result shape.
    pub return_type: ReturnType,
    /// Row locking.
    pub lock: Option<LockClause>,
    /// `RETURNING` columns.
    pub returning: Vec<String>,
    /// Allows UPDATE and DELETE without conditions.
    pub all_rows: bool,
    /// Decoders keyed by output column.
    pub parsers: BTreeMap<String, ColumnParser>,
    /// Decoders of joined queries keyed by join alias, then column.
    pub joined_parsers: BTreeMap<String, BTreeMap<String, ColumnParser>>,
    /// Callbacks fired by the executor.
    pub hooks: Vec<(HookPoint, QueryHook)>,
}

/// A query against an optional table.
#[derive(Debug, Clone, Default)]
pub struct Query {
    table: Option<String>,
    primary_keys: Vec<String>,
    data: QueryData,
}

impl Query {
    /// Creates a query without a table, e.g. for `SELECT 1`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query on `name`; `schema.table` sets the schema too.
    #[must_use]
    pub fn table(name: &str) -> Self {
        let (schema, table) = split_schema(name);
        let mut query = Self {
            table: Some(String::from(table)),
            ..Self::default()
        };
        query.data.schema = schema.map(String::from);
        query
    }

    /// Declares the primary key columns used by `find`.
    #[must_use]
    pub fn primary_key<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.primary_keys = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the table name.
    #[must_use]
    pub fn table_name(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// Returns the declared primary key columns.
    #[must_use]
    pub fn primary_keys(&self) -> &[String] {
        &self.primary_keys
    }

    /// Returns the accumulated clauses.
    #[must_use]
    pub const fn data(&self) -> &QueryData {
        &self.data
    }

    /// Returns the accumulated clauses for direct editing.
    pub fn data_mut(&mut self) -> &mut QueryData {
        &mut self.data
    }

    /// Returns the alias the query's columns are qualified with.
    #[must_use]
    pub fn alias_or_table(&self) -> Option<&str> {
        self.data.alias.as_deref().or(self.table.as_deref())
    }

    /// Compiles the query into SQL text and parameters.
    pub fn to_sql(&self) -> Result<Sql> {
        crate::sql::to_sql(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_with_schema() {
        let query = Query::table("app.user");
        assert_eq!(query.table_name(), Some("user"));
        assert_eq!(query.data().schema.as_deref(), Some("app"));
    }

    #[test]
    fn test_immutable_form_leaves_receiver_untouched() {
        let base = Query::table("user").select(["id"]);
        let derived = base.select(["name"]).limit(5);

        assert_eq!(base.data().select.len(), 1);
        assert_eq!(base.data().limit, None);
        assert_eq!(derived.data().select.len(), 2);
        assert_eq!(derived.data().limit, Some(5));
    }

    #[test]
    fn test_mutable_form_chains_in_place() {
        let mut query = Query::table("user");
        query.select_mut(["id"]).select_mut(["name"]).limit_mut(1);
        assert_eq!(query.data().select.len(), 2);
        assert_eq!(query.data().limit, Some(1));
    }

    #[test]
    fn test_primary_keys_survive_cloning() {
        let base = Query::table("user").primary_key(["id"]);
        let derived = base.limit(1);
        assert_eq!(derived.primary_keys(), ["id".to_string()]);
    }
}
