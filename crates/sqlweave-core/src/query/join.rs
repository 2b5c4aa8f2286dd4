//! JOIN builders.

use super::predicate::WhereItem;
use super::{chain, Query};

/// Join flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// `JOIN`
    Inner,
    /// `LEFT JOIN`
    Left,
    /// `RIGHT JOIN`
    Right,
    /// `FULL JOIN`
    Full,
}

impl JoinKind {
    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Inner => "JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
            Self::Full => "FULL JOIN",
        }
    }
}

/// What a join reads from.
#[derive(Debug, Clone)]
pub enum JoinTarget {
    /// A table, optionally `schema.table`.
    Table(String),
    /// A sub-query; compiled in place and aliased.
    Query(Box<Query>),
}

/// One join.
#[derive(Debug, Clone)]
pub struct JoinItem {
    /// Flavor.
    pub kind: JoinKind,
    /// Joined source.
    pub target: JoinTarget,
    /// Alias for the joined source.
    pub alias: Option<String>,
    /// `LATERAL` join.
    pub lateral: bool,
    /// `ON` conditions, AND-ed. Empty means `ON true`.
    pub on: Vec<WhereItem>,
}

impl JoinItem {
    /// Returns the name the joined source is referenced by.
    #[must_use]
    pub fn reference_name(&self) -> Option<&str> {
        self.alias.as_deref().or(match &self.target {
            JoinTarget::Table(table) => Some(table.as_str()),
            JoinTarget::Query(query) => query.alias_or_table(),
        })
    }
}

impl Query {
    chain! {
        /// Adds a join in call order.
        join_with => join_with_mut(item: JoinItem)
    }

    /// Adds a join in place.
    ///
    /// Parsers registered on a joined sub-query are kept under the join's
    /// reference name so selections of `alias.col` decode the same way.
    pub fn join_with_mut(&mut self, item: JoinItem) -> &mut Self {
        if let (JoinTarget::Query(query), Some(name)) = (&item.target, item.reference_name()) {
            if !query.data.parsers.is_empty() {
                self.data
                    .joined_parsers
                    .insert(String::from(name), query.data.parsers.clone());
            }
        }
        self.data.joins.push(item);
        self
    }

    chain! {
        /// `JOIN table ON ..`.
        join => join_mut(table: &str, on: impl IntoIterator<Item = WhereItem>)
    }

    /// `JOIN table ON ..` in place.
    pub fn join_mut(&mut self, table: &str, on: impl IntoIterator<Item = WhereItem>) -> &mut Self {
        self.join_with_mut(table_join(JoinKind::Inner, table, on))
    }

    chain! {
        /// `LEFT JOIN table ON ..`.
        left_join => left_join_mut(table: &str, on: impl IntoIterator<Item = WhereItem>)
    }

    /// `LEFT JOIN table ON ..` in place.
    pub fn left_join_mut(
        &mut self,
        table: &str,
        on: impl IntoIterator<Item = WhereItem>,
    ) -> &mut Self {
        self.join_with_mut(table_join(JoinKind::Left, table, on))
    }

    chain! {
        /// `RIGHT JOIN table ON ..`.
        right_join => right_join_mut(table: &str, on: impl IntoIterator<Item = WhereItem>)
    }

    /// `RIGHT JOIN table ON ..` in place.
    pub fn right_join_mut(
        &mut self,
        table: &str,
        on: impl IntoIterator<Item = WhereItem>,
    ) -> &mut Self {
        self.join_with_mut(table_join(JoinKind::Right, table, on))
    }

    chain! {
        /// `FULL JOIN table ON ..`.
        full_join => full_join_mut(table: &str, on: impl IntoIterator<Item = WhereItem>)
    }

    /// `FULL JOIN table ON ..` in place.
    pub fn full_join_mut(
        &mut self,
        table: &str,
        on: impl IntoIterator<Item = WhereItem>,
    ) -> &mut Self {
        self.join_with_mut(table_join(JoinKind::Full, table, on))
    }

    chain! {
        /// Joins a sub-query under `alias`.
        join_query => join_query_mut(
            kind: JoinKind,
            query: Query,
            alias: &str,
            on: impl IntoIterator<Item = WhereItem>,
        )
    }

    /// Joins a sub-query under `alias` in place.
    pub fn join_query_mut(
        &mut self,
        kind: JoinKind,
        query: Query,
        alias: &str,
        on: impl IntoIterator<Item = WhereItem>,
    ) -> &mut Self {
        self.join_with_mut(JoinItem {
            kind,
            target: JoinTarget::Query(Box::new(query)),
            alias: Some(String::from(alias)),
            lateral: false,
            on: on.into_iter().collect(),
        })
    }
}

fn table_join(kind: JoinKind, table: &str, on: impl IntoIterator<Item = WhereItem>) -> JoinItem {
    let (table, alias) = match table.split_once(" as ") {
        Some((table, alias)) => (table.trim(), Some(String::from(alias.trim()))),
        None => (table, None),
    };
    JoinItem {
        kind,
        target: JoinTarget::Table(String::from(table)),
        alias,
        lateral: false,
        on: on.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{col, Compare, ColumnParser};

    #[test]
    fn test_table_join_parses_alias() {
        let query = Query::table("user").join("profile as p", [col("p.user_id").eq(col("user.id"))]);
        let join = &query.data().joins[0];
        assert_eq!(join.alias.as_deref(), Some("p"));
        assert_eq!(join.reference_name(), Some("p"));
    }

    #[test]
    fn test_join_query_keeps_parsers_under_alias() {
        let profile = Query::table("profile").parse("bio", ColumnParser::new(|v| v));
        let query = Query::table("user").join_query(JoinKind::Left, profile, "p", []);
        assert!(query.data().joined_parsers["p"].contains_key("bio"));
    }
}
