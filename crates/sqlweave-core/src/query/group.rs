//! DISTINCT, GROUP BY, HAVING and WINDOW builders.

use super::expr::{IntoExpr, WindowSpec};
use super::predicate::WhereItem;
use super::{chain, Query};

impl Query {
    chain! {
        /// `SELECT DISTINCT`, or `DISTINCT ON (..)` when columns are given.
        distinct => distinct_mut(columns: impl IntoIterator<Item = impl IntoExpr>)
    }

    /// Sets `DISTINCT` in place; repeated calls extend the `ON` list.
    pub fn distinct_mut(&mut self, columns: impl IntoIterator<Item = impl IntoExpr>) -> &mut Self {
        self.data
            .distinct
            .get_or_insert_with(Vec::new)
            .extend(columns.into_iter().map(IntoExpr::into_expr));
        self
    }

    chain! {
        /// Appends `GROUP BY` expressions.
        group => group_mut(columns: impl IntoIterator<Item = impl IntoExpr>)
    }

    /// Appends `GROUP BY` expressions in place.
    pub fn group_mut(&mut self, columns: impl IntoIterator<Item = impl IntoExpr>) -> &mut Self {
        self.data
            .group
            .extend(columns.into_iter().map(IntoExpr::into_expr));
        self
    }

    chain! {
        /// Adds `HAVING` conditions that must all hold.
        having => having_mut(items: impl IntoIterator<Item = WhereItem>)
    }

    /// Adds `HAVING` conditions in place.
    pub fn having_mut(&mut self, items: impl IntoIterator<Item = WhereItem>) -> &mut Self {
        self.data.having.extend(items);
        self
    }

    chain! {
        /// Adds `HAVING` alternatives, one group per item. An `and` item is one group.
        or_having => or_having_mut(items: impl IntoIterator<Item = WhereItem>)
    }

    /// Adds `HAVING` alternatives in place.
    pub fn or_having_mut(&mut self, items: impl IntoIterator<Item = WhereItem>) -> &mut Self {
        self.data
            .having_or
            .extend(items.into_iter().map(|item| match item {
                WhereItem::And(group) => group,
                item => vec![item],
            }));
        self
    }

    chain! {
        /// Declares a named window for `OVER "name"`.
        window => window_mut(name: &str, spec: WindowSpec)
    }

    /// Declares a named window in place.
    pub fn window_mut(&mut self, name: &str, spec: WindowSpec) -> &mut Self {
        self.data.windows.push((String::from(name), spec));
        self
    }
}
