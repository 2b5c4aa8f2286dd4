//! Predicate items for WHERE, HAVING, JOIN ON and FILTER clauses.

use super::expr::{Expr, Op};
use super::Query;
use crate::raw::RawSql;
use crate::value::SqlValue;

/// One boolean condition.
///
/// Every item compiles to exactly one boolean SQL expression; composite
/// items are parenthesized when nested.
#[derive(Debug, Clone)]
pub enum WhereItem {
    /// `left op right`.
    Compare {
        /// Left-hand expression.
        left: Expr,
        /// Operator.
        op: Op,
        /// Right-hand side.
        right: Operand,
    },
    /// All items must hold.
    And(Vec<WhereItem>),
    /// At least one group must hold; each group is an AND-group.
    Or(Vec<Vec<WhereItem>>),
    /// None of the items may hold together: `NOT (a AND b)`.
    Not(Vec<WhereItem>),
    /// Raw boolean SQL with local parameters.
    Raw(RawSql),
    /// `EXISTS (sub-query)`.
    Exists(Box<Query>),
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone)]
pub enum Operand {
    /// A bound value.
    Value(SqlValue),
    /// A list of bound values for `IN`.
    List(Vec<SqlValue>),
    /// Another column.
    Column(String),
    /// Raw SQL.
    Raw(RawSql),
    /// A sub-query.
    SubQuery(Box<Query>),
    /// `low AND high` for `BETWEEN`.
    Range(SqlValue, SqlValue),
}

impl WhereItem {
    /// Creates a comparison item.
    #[must_use]
    pub const fn compare(left: Expr, op: Op, right: Operand) -> Self {
        Self::Compare { left, op, right }
    }
}

/// Groups items with AND.
#[must_use]
pub fn and(items: impl IntoIterator<Item = WhereItem>) -> WhereItem {
    WhereItem::And(items.into_iter().collect())
}

/// Joins items with OR; each item is its own group.
#[must_use]
pub fn or(items: impl IntoIterator<Item = WhereItem>) -> WhereItem {
    WhereItem::Or(items.into_iter().map(|item| vec![item]).collect())
}

/// Negates the AND of `items`.
#[must_use]
pub fn not(items: impl IntoIterator<Item = WhereItem>) -> WhereItem {
    WhereItem::Not(items.into_iter().collect())
}

/// `EXISTS (query)`.
#[must_use]
pub fn exists(query: Query) -> WhereItem {
    WhereItem::Exists(Box::new(query))
}

impl From<RawSql> for WhereItem {
    fn from(raw: RawSql) -> Self {
        Self::Raw(raw)
    }
}
