//! Projection list builders.

use super::expr::{Expr, IntoExpr};
use super::{chain, Query};
use crate::raw::RawSql;

/// One entry of the projection list.
#[derive(Debug, Clone)]
pub enum SelectItem {
    /// `name`, `alias.name`, `*` or `alias.*`.
    Column(String),
    /// An expression under an output name. Sub-queries are aggregated into
    /// JSON according to their result shape.
    Aliased {
        /// Selected expression.
        expr: Expr,
        /// Output column name.
        alias: String,
    },
    /// Raw SQL emitted as written.
    Raw(RawSql),
}

impl From<&str> for SelectItem {
    fn from(column: &str) -> Self {
        Self::Column(String::from(column))
    }
}

impl From<String> for SelectItem {
    fn from(column: String) -> Self {
        Self::Column(column)
    }
}

impl From<RawSql> for SelectItem {
    fn from(raw: RawSql) -> Self {
        Self::Raw(raw)
    }
}

impl Query {
    chain! {
        /// Appends columns to the projection list.
        select => select_mut(columns: impl IntoIterator<Item = impl Into<SelectItem>>)
    }

    /// Appends columns to the projection list in place.
    pub fn select_mut(
        &mut self,
        columns: impl IntoIterator<Item = impl Into<SelectItem>>,
    ) -> &mut Self {
        self.data.select.extend(columns.into_iter().map(Into::into));
        self
    }

    chain! {
        /// Selects `expr` under the output name `alias`.
        select_as => select_as_mut(alias: &str, expr: impl IntoExpr)
    }

    /// Selects `expr` under the output name `alias` in place.
    pub fn select_as_mut(&mut self, alias: &str, expr: impl IntoExpr) -> &mut Self {
        self.data.select.push(SelectItem::Aliased {
            expr: expr.into_expr(),
            alias: String::from(alias),
        });
        self
    }

    /// Drops the projection list, falling back to `*`.
    #[must_use]
    pub fn clear_select(&self) -> Self {
        let mut query = self.clone();
        query.data.select.clear();
        query
    }
}
