//! INSERT, UPDATE, DELETE, TRUNCATE and column-info builders.

use super::expr::Expr;
use super::{chain, Query, QueryKind, ReturnType};
use crate::raw::RawSql;
use crate::value::{SqlValue, ToSqlValue};

/// Conversion into a value expression for INSERT and UPDATE.
///
/// Plain values become parameters; raw SQL and sub-queries are spliced.
pub trait IntoValueExpr {
    /// Converts into an expression.
    fn into_value_expr(self) -> Expr;
}

impl<T: ToSqlValue> IntoValueExpr for T {
    fn into_value_expr(self) -> Expr {
        Expr::Value(self.to_sql_value())
    }
}

impl IntoValueExpr for Expr {
    fn into_value_expr(self) -> Expr {
        self
    }
}

impl IntoValueExpr for RawSql {
    fn into_value_expr(self) -> Expr {
        Expr::Raw(self)
    }
}

impl IntoValueExpr for Query {
    fn into_value_expr(self) -> Expr {
        Expr::SubQuery(Box::new(self))
    }
}

/// Column values of one inserted or updated row, in insertion order.
///
/// ```rust
/// use sqlweave_core::query::Record;
///
/// let record = Record::new().set("name", "Ann").set("age", 30);
/// assert_eq!(record.columns().count(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Record {
    /// `(column, value)` pairs.
    pub values: Vec<(String, Expr)>,
}

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a column; a repeated column keeps the last value.
    #[must_use]
    pub fn set(mut self, column: &str, value: impl IntoValueExpr) -> Self {
        let value = value.into_value_expr();
        match self.values.iter_mut().find(|(name, _)| name == column) {
            Some(slot) => slot.1 = value,
            None => self.values.push((String::from(column), value)),
        }
        self
    }

    /// Returns the column names.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(name, _)| name.as_str())
    }

    /// Returns the value of `column`.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Expr> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Returns true when no column is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Rows an INSERT writes.
#[derive(Debug, Clone)]
pub enum InsertSource {
    /// `VALUES (..), (..)`.
    Values(Vec<Record>),
    /// `INSERT .. SELECT`.
    Query {
        /// Target columns.
        columns: Vec<String>,
        /// Source select.
        query: Box<Query>,
    },
}

/// `ON CONFLICT` target.
#[derive(Debug, Clone)]
pub enum ConflictTarget {
    /// `(col, ..)`
    Columns(Vec<String>),
    /// `ON CONSTRAINT name`
    Constraint(String),
    /// Raw target.
    Raw(RawSql),
}

/// `ON CONFLICT` action.
#[derive(Debug, Clone)]
pub enum ConflictAction {
    /// `DO NOTHING`
    Nothing,
    /// `DO UPDATE SET c = excluded.c` for the listed columns; empty means
    /// every inserted column.
    Merge(Vec<String>),
    /// `DO UPDATE SET` with explicit values.
    Set(Vec<UpdateSet>),
}

/// `ON CONFLICT` clause.
#[derive(Debug, Clone)]
pub struct OnConflict {
    /// Conflict target; `None` matches any constraint.
    pub target: Option<ConflictTarget>,
    /// Action.
    pub action: ConflictAction,
}

/// INSERT body.
#[derive(Debug, Clone)]
pub struct InsertData {
    /// Inserted rows.
    pub source: InsertSource,
    /// Conflict handling.
    pub on_conflict: Option<OnConflict>,
}

/// Value assigned by an UPDATE.
#[derive(Debug, Clone)]
pub enum SetValue {
    /// `c = value`
    Set(Expr),
    /// `c = c + value`
    Increment(SqlValue),
    /// `c = c - value`
    Decrement(SqlValue),
}

/// One `SET` assignment.
#[derive(Debug, Clone)]
pub struct UpdateSet {
    /// Column.
    pub column: String,
    /// Assigned value.
    pub value: SetValue,
}

/// TRUNCATE options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TruncateOptions {
    /// `RESTART IDENTITY`
    pub restart_identity: bool,
    /// `CASCADE`
    pub cascade: bool,
}

impl TruncateOptions {
    /// Plain `TRUNCATE`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `RESTART IDENTITY`.
    #[must_use]
    pub const fn restart_identity(mut self) -> Self {
        self.restart_identity = true;
        self
    }

    /// Adds `CASCADE`.
    #[must_use]
    pub const fn cascade(mut self) -> Self {
        self.cascade = true;
        self
    }
}

/// Completes an `ON CONFLICT` clause started by [`Query::on_conflict`].
#[derive(Debug, Clone)]
#[must_use]
pub struct OnConflictBuilder {
    query: Query,
    target: Option<ConflictTarget>,
}

impl OnConflictBuilder {
    /// `DO NOTHING`.
    pub fn ignore(self) -> Query {
        self.finish(ConflictAction::Nothing)
    }

    /// `DO UPDATE SET` each column to its excluded value; no columns means
    /// every inserted column.
    pub fn merge<S: Into<String>>(self, columns: impl IntoIterator<Item = S>) -> Query {
        self.finish(ConflictAction::Merge(
            columns.into_iter().map(Into::into).collect(),
        ))
    }

    /// `DO UPDATE SET` with explicit values.
    pub fn set(self, record: Record) -> Query {
        self.finish(ConflictAction::Set(assignments(record)))
    }

    fn finish(mut self, action: ConflictAction) -> Query {
        if let QueryKind::Insert(data) = &mut self.query.data.kind {
            data.on_conflict = Some(OnConflict {
                target: self.target,
                action,
            });
        }
        self.query
    }
}

fn assignments(record: Record) -> Vec<UpdateSet> {
    record
        .values
        .into_iter()
        .map(|(column, value)| UpdateSet {
            column,
            value: SetValue::Set(value),
        })
        .collect()
}

impl Query {
    fn mutation_mut(&mut self, kind: QueryKind) -> &mut Self {
        self.data.kind = kind;
        if self.data.returning.is_empty() && self.data.return_type == ReturnType::All {
            self.data.return_type = ReturnType::Void;
        }
        self
    }

    chain! {
        /// Inserts one row.
        insert => insert_mut(record: Record)
    }

    /// Inserts one row in place.
    pub fn insert_mut(&mut self, record: Record) -> &mut Self {
        self.insert_many_mut([record])
    }

    chain! {
        /// Inserts several rows. Columns missing from a row get `DEFAULT`.
        insert_many => insert_many_mut(records: impl IntoIterator<Item = Record>)
    }

    /// Inserts several rows in place.
    pub fn insert_many_mut(&mut self, records: impl IntoIterator<Item = Record>) -> &mut Self {
        self.mutation_mut(QueryKind::Insert(InsertData {
            source: InsertSource::Values(records.into_iter().collect()),
            on_conflict: None,
        }))
    }

    chain! {
        /// `INSERT INTO t (columns) <query>`.
        insert_from => insert_from_mut(columns: impl IntoIterator<Item = impl Into<String>>, query: Query)
    }

    /// `INSERT .. SELECT` in place.
    pub fn insert_from_mut(
        &mut self,
        columns: impl IntoIterator<Item = impl Into<String>>,
        query: Query,
    ) -> &mut Self {
        self.mutation_mut(QueryKind::Insert(InsertData {
            source: InsertSource::Query {
                columns: columns.into_iter().map(Into::into).collect(),
                query: Box::new(query),
            },
            on_conflict: None,
        }))
    }

    /// Starts `ON CONFLICT (columns)` for the insert set up before it.
    /// No columns means any conflict.
    pub fn on_conflict<S: Into<String>>(&self, columns: impl IntoIterator<Item = S>) -> OnConflictBuilder {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        OnConflictBuilder {
            query: self.clone(),
            target: if columns.is_empty() {
                None
            } else {
                Some(ConflictTarget::Columns(columns))
            },
        }
    }

    /// Starts `ON CONFLICT ON CONSTRAINT name`.
    pub fn on_conflict_constraint(&self, name: &str) -> OnConflictBuilder {
        OnConflictBuilder {
            query: self.clone(),
            target: Some(ConflictTarget::Constraint(String::from(name))),
        }
    }

    chain! {
        /// Assigns columns; repeated calls accumulate.
        update => update_mut(record: Record)
    }

    /// Assigns columns in place.
    pub fn update_mut(&mut self, record: Record) -> &mut Self {
        self.push_sets(assignments(record))
    }

    chain! {
        /// `column = column + by`.
        increment => increment_mut(column: &str, by: impl ToSqlValue)
    }

    /// `column = column + by` in place.
    pub fn increment_mut(&mut self, column: &str, by: impl ToSqlValue) -> &mut Self {
        self.push_sets(vec![UpdateSet {
            column: String::from(column),
            value: SetValue::Increment(by.to_sql_value()),
        }])
    }

    chain! {
        /// `column = column - by`.
        decrement => decrement_mut(column: &str, by: impl ToSqlValue)
    }

    /// `column = column - by` in place.
    pub fn decrement_mut(&mut self, column: &str, by: impl ToSqlValue) -> &mut Self {
        self.push_sets(vec![UpdateSet {
            column: String::from(column),
            value: SetValue::Decrement(by.to_sql_value()),
        }])
    }

    fn push_sets(&mut self, sets: Vec<UpdateSet>) -> &mut Self {
        if let QueryKind::Update(existing) = &mut self.data.kind {
            existing.extend(sets);
            return self;
        }
        self.mutation_mut(QueryKind::Update(sets))
    }

    chain! {
        /// Turns the query into a DELETE; joins become `USING`.
        delete => delete_mut()
    }

    /// Turns the query into a DELETE in place.
    pub fn delete_mut(&mut self) -> &mut Self {
        self.mutation_mut(QueryKind::Delete)
    }

    chain! {
        /// Turns the query into a TRUNCATE.
        truncate => truncate_mut(options: TruncateOptions)
    }

    /// Turns the query into a TRUNCATE in place.
    pub fn truncate_mut(&mut self, options: TruncateOptions) -> &mut Self {
        self.mutation_mut(QueryKind::Truncate(options))
    }

    chain! {
        /// Reads column metadata of the table, or of one column.
        column_info => column_info_mut(column: Option<&str>)
    }

    /// Reads column metadata in place.
    pub fn column_info_mut(&mut self, column: Option<&str>) -> &mut Self {
        self.data.kind = QueryKind::ColumnInfo(column.map(String::from));
        self.data.return_type = if column.is_some() {
            ReturnType::One
        } else {
            ReturnType::All
        };
        self
    }

    chain! {
        /// Adds `RETURNING` columns.
        returning => returning_mut(columns: impl IntoIterator<Item = impl Into<String>>)
    }

    /// Adds `RETURNING` columns in place.
    pub fn returning_mut(&mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.data.returning.extend(columns.into_iter().map(Into::into));
        if self.data.return_type == ReturnType::Void {
            self.data.return_type = ReturnType::All;
        }
        self
    }

    /// `RETURNING *`.
    #[must_use]
    pub fn returning_all(&self) -> Self {
        self.returning(["*"])
    }

    /// Allows UPDATE and DELETE without conditions.
    #[must_use]
    pub fn all_rows(&self) -> Self {
        let mut query = self.clone();
        query.data.all_rows = true;
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_set_replaces_repeated_column() {
        let record = Record::new().set("a", 1).set("b", 2).set("a", 3);
        assert_eq!(record.columns().collect::<Vec<_>>(), ["a", "b"]);
        assert!(matches!(
            record.get("a"),
            Some(Expr::Value(SqlValue::Int(3)))
        ));
    }

    #[test]
    fn test_mutations_default_to_row_count() {
        let query = Query::table("user").delete();
        assert_eq!(query.data().return_type, ReturnType::Void);
        let query = query.returning(["id"]);
        assert_eq!(query.data().return_type, ReturnType::All);
    }

    #[test]
    fn test_update_accumulates_assignments() {
        let query = Query::table("user")
            .update(Record::new().set("name", "x"))
            .increment("visits", 1);
        let QueryKind::Update(sets) = &query.data().kind else {
            panic!("expected update");
        };
        assert_eq!(sets.len(), 2);
    }

    #[test]
    fn test_on_conflict_attaches_to_insert() {
        let query = Query::table("user")
            .insert(Record::new().set("email", "a@b.c"))
            .on_conflict(["email"])
            .ignore();
        let QueryKind::Insert(data) = &query.data().kind else {
            panic!("expected insert");
        };
        assert!(matches!(
            data.on_conflict.as_ref().map(|c| &c.action),
            Some(ConflictAction::Nothing)
        ));
    }
}
