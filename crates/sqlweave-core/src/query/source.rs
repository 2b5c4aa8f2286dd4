//! FROM sources, CTEs and set operations.

use super::{chain, Query};
use crate::raw::RawSql;

/// A relation the query reads from.
#[derive(Debug, Clone)]
pub enum Source {
    /// A table or CTE name.
    Table(String),
    /// A sub-query.
    Query(Box<Query>),
    /// Raw SQL.
    Raw(RawSql),
}

impl From<Query> for Source {
    fn from(query: Query) -> Self {
        Self::Query(Box::new(query))
    }
}

impl From<RawSql> for Source {
    fn from(raw: RawSql) -> Self {
        Self::Raw(raw)
    }
}

impl From<&str> for Source {
    fn from(table: &str) -> Self {
        Self::Table(String::from(table))
    }
}

/// Options of one common table expression.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WithOptions {
    /// Makes the whole `WITH` clause `WITH RECURSIVE`.
    pub recursive: bool,
    /// `MATERIALIZED` or `NOT MATERIALIZED`.
    pub materialized: Option<bool>,
    /// Explicit column names.
    pub columns: Vec<String>,
}

/// One `name AS (..)` entry of the `WITH` clause.
#[derive(Debug, Clone)]
pub struct WithItem {
    /// CTE name.
    pub name: String,
    /// Options.
    pub options: WithOptions,
    /// CTE body.
    pub body: Source,
}

/// Set operation joining two selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnionKind {
    /// `UNION`
    Union,
    /// `UNION ALL`
    UnionAll,
    /// `INTERSECT`
    Intersect,
    /// `INTERSECT ALL`
    IntersectAll,
    /// `EXCEPT`
    Except,
    /// `EXCEPT ALL`
    ExceptAll,
}

impl UnionKind {
    /// Returns the SQL keywords.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Union => "UNION",
            Self::UnionAll => "UNION ALL",
            Self::Intersect => "INTERSECT",
            Self::IntersectAll => "INTERSECT ALL",
            Self::Except => "EXCEPT",
            Self::ExceptAll => "EXCEPT ALL",
        }
    }
}

/// One member of a set operation.
#[derive(Debug, Clone)]
pub struct UnionItem {
    /// Operation.
    pub kind: UnionKind,
    /// Other select.
    pub arg: Source,
    /// Parenthesize the member.
    pub wrap: bool,
}

impl Query {
    chain! {
        /// Adds a CTE.
        with => with_mut(name: &str, body: impl Into<Source>, options: WithOptions)
    }

    /// Adds a CTE in place.
    pub fn with_mut(&mut self, name: &str, body: impl Into<Source>, options: WithOptions) -> &mut Self {
        self.data.with.push(WithItem {
            name: String::from(name),
            options,
            body: body.into(),
        });
        self
    }

    chain! {
        /// Reads from `source` instead of the table.
        from => from_mut(source: impl Into<Source>)
    }

    /// Reads from `source` in place.
    ///
    /// A sub-query source lends its own name as the alias when none is set.
    pub fn from_mut(&mut self, source: impl Into<Source>) -> &mut Self {
        let source = source.into();
        if self.data.alias.is_none() {
            if let Source::Query(query) = &source {
                self.data.alias = query.alias_or_table().map(String::from);
            }
        }
        self.data.from = Some(source);
        self
    }

    chain! {
        /// Sets the table alias.
        as_alias => as_alias_mut(alias: &str)
    }

    /// Sets the table alias in place.
    pub fn as_alias_mut(&mut self, alias: &str) -> &mut Self {
        self.data.alias = Some(String::from(alias));
        self
    }

    chain! {
        /// Sets the table schema.
        with_schema => with_schema_mut(schema: &str)
    }

    /// Sets the table schema in place.
    pub fn with_schema_mut(&mut self, schema: &str) -> &mut Self {
        self.data.schema = Some(String::from(schema));
        self
    }

    /// Uses this query as the source of `outer`, aliased as `alias`.
    #[must_use]
    pub fn wrap(&self, outer: &Self, alias: &str) -> Self {
        let mut wrapped = outer.clone();
        wrapped.from_mut(self.clone()).as_alias_mut(alias);
        wrapped
    }

    chain! {
        /// Adds a set-operation member.
        set_operation => set_operation_mut(kind: UnionKind, arg: impl Into<Source>, wrap: bool)
    }

    /// Adds a set-operation member in place.
    pub fn set_operation_mut(&mut self, kind: UnionKind, arg: impl Into<Source>, wrap: bool) -> &mut Self {
        self.data.unions.push(UnionItem {
            kind,
            arg: arg.into(),
            wrap,
        });
        self
    }

    /// `UNION other`.
    #[must_use]
    pub fn union(&self, other: impl Into<Source>) -> Self {
        self.set_operation(UnionKind::Union, other, false)
    }

    /// `UNION ALL other`.
    #[must_use]
    pub fn union_all(&self, other: impl Into<Source>) -> Self {
        self.set_operation(UnionKind::UnionAll, other, false)
    }

    /// `INTERSECT other`.
    #[must_use]
    pub fn intersect(&self, other: impl Into<Source>) -> Self {
        self.set_operation(UnionKind::Intersect, other, false)
    }

    /// `INTERSECT ALL other`.
    #[must_use]
    pub fn intersect_all(&self, other: impl Into<Source>) -> Self {
        self.set_operation(UnionKind::IntersectAll, other, false)
    }

    /// `EXCEPT other`.
    #[must_use]
    pub fn except(&self, other: impl Into<Source>) -> Self {
        self.set_operation(UnionKind::Except, other, false)
    }

    /// `EXCEPT ALL other`.
    #[must_use]
    pub fn except_all(&self, other: impl Into<Source>) -> Self {
        self.set_operation(UnionKind::ExceptAll, other, false)
    }
}
