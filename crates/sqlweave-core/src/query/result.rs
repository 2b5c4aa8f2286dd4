//! Result-shape selectors.
//!
//! These only record the shape on the query state; the executor in
//! `sqlweave-db` decodes rows accordingly.

use super::expr::{col, count_all, Compare, IntoExpr};
use super::predicate::WhereItem;
use super::select::SelectItem;
use super::{Query, ReturnType};
use crate::error::{BuildError, Result};
use crate::raw::raw;
use crate::value::ToSqlValue;

impl Query {
    fn returning_shape(&self, return_type: ReturnType) -> Self {
        let mut query = self.clone();
        query.data.return_type = return_type;
        query
    }

    fn select_only(&self, item: SelectItem, return_type: ReturnType) -> Self {
        let mut query = self.returning_shape(return_type);
        query.data.select = vec![item];
        query
    }

    /// All rows as objects.
    #[must_use]
    pub fn all(&self) -> Self {
        self.returning_shape(ReturnType::All)
    }

    /// Exactly one row; none is a not-found error. Compiles with `LIMIT 1`.
    #[must_use]
    pub fn take(&self) -> Self {
        self.returning_shape(ReturnType::One)
    }

    /// At most one row. Compiles with `LIMIT 1`.
    #[must_use]
    pub fn take_optional(&self) -> Self {
        self.returning_shape(ReturnType::OneOptional)
    }

    /// All rows as arrays of values.
    #[must_use]
    pub fn rows(&self) -> Self {
        self.returning_shape(ReturnType::Rows)
    }

    /// The values of one column.
    #[must_use]
    pub fn pluck(&self, expr: impl IntoExpr) -> Self {
        self.select_only(value_item(expr), ReturnType::Pluck)
    }

    /// One value; no row is a not-found error.
    #[must_use]
    pub fn get(&self, expr: impl IntoExpr) -> Self {
        self.select_only(value_item(expr), ReturnType::Value)
    }

    /// One value, if any.
    #[must_use]
    pub fn get_optional(&self, expr: impl IntoExpr) -> Self {
        self.select_only(value_item(expr), ReturnType::ValueOptional)
    }

    /// Only the affected row count.
    #[must_use]
    pub fn exec(&self) -> Self {
        self.returning_shape(ReturnType::Void)
    }

    /// The row whose primary key equals `value`.
    pub fn find(&self, value: impl ToSqlValue) -> Result<Self> {
        Ok(self.find_filter(value)?.take())
    }

    /// The row whose primary key equals `value`, if any.
    pub fn find_optional(&self, value: impl ToSqlValue) -> Result<Self> {
        Ok(self.find_filter(value)?.take_optional())
    }

    fn find_filter(&self, value: impl ToSqlValue) -> Result<Self> {
        let key = self.primary_keys().first().ok_or_else(|| {
            BuildError::NoPrimaryKeyForFind(String::from(self.table_name().unwrap_or_default()))
        })?;
        Ok(self.filter([col(key).eq(value.to_sql_value())]))
    }

    /// The single row matching `items`.
    #[must_use]
    pub fn find_by(&self, items: impl IntoIterator<Item = WhereItem>) -> Self {
        self.filter(items).take()
    }

    /// The single row matching `items`, if any.
    #[must_use]
    pub fn find_by_optional(&self, items: impl IntoIterator<Item = WhereItem>) -> Self {
        self.filter(items).take_optional()
    }

    /// `SELECT true .. LIMIT 1`; the executor reads it as a boolean.
    #[must_use]
    pub fn exists(&self) -> Self {
        let mut query = self.select_only(SelectItem::Raw(raw("true")), ReturnType::ValueOptional);
        query.data.limit = Some(1);
        query
    }

    /// `SELECT count(*)`.
    #[must_use]
    pub fn count_rows(&self) -> Self {
        self.select_only(
            SelectItem::Aliased {
                expr: count_all().into_expr(),
                alias: String::from("count"),
            },
            ReturnType::Value,
        )
    }
}

fn value_item(expr: impl IntoExpr) -> SelectItem {
    match expr.into_expr() {
        super::Expr::Column(name) => SelectItem::Column(name),
        expr => SelectItem::Aliased {
            expr,
            alias: String::from("value"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_without_primary_key_fails() {
        let err = Query::table("log").find(1).unwrap_err();
        assert_eq!(err, BuildError::NoPrimaryKeyForFind(String::from("log")));
    }

    #[test]
    fn test_find_filters_and_takes_one() {
        let query = Query::table("user").primary_key(["id"]).find(7).unwrap();
        assert_eq!(query.data().return_type, ReturnType::One);
        assert_eq!(query.data().and.len(), 1);
    }

    #[test]
    fn test_pluck_replaces_selection() {
        let query = Query::table("user").select(["id", "name"]).pluck("name");
        assert_eq!(query.data().select.len(), 1);
        assert_eq!(query.data().return_type, ReturnType::Pluck);
    }
}
