//! Table-level primary keys, indexes and constraints.

use super::column::{DropMode, ForeignKeyOptions, IndexOptions};
use crate::raw::RawSql;

/// One column of an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexColumn {
    /// Column name, or an expression when `expression` is set.
    pub column: String,
    /// `column` holds an SQL expression rather than a name.
    pub expression: bool,
    /// Collation.
    pub collate: Option<String>,
    /// Operator class.
    pub opclass: Option<String>,
    /// Ordering such as `DESC`.
    pub order: Option<String>,
}

impl IndexColumn {
    /// A plain column.
    #[must_use]
    pub fn name(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            expression: false,
            collate: None,
            opclass: None,
            order: None,
        }
    }

    /// An index expression, rendered in parentheses.
    #[must_use]
    pub fn expression(expr: impl Into<String>) -> Self {
        Self {
            expression: true,
            ..Self::name(expr)
        }
    }

    /// Sets the ordering.
    #[must_use]
    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }
}

impl From<&str> for IndexColumn {
    fn from(column: &str) -> Self {
        Self::name(column)
    }
}

impl From<String> for IndexColumn {
    fn from(column: String) -> Self {
        Self::name(column)
    }
}

/// A multi-column index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableIndex {
    /// Indexed columns.
    pub columns: Vec<IndexColumn>,
    /// Options.
    pub options: IndexOptions,
}

/// `FOREIGN KEY (..) REFERENCES table (..)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct References {
    /// Local columns.
    pub columns: Vec<String>,
    /// Referenced table.
    pub table: String,
    /// Referenced columns.
    pub foreign_columns: Vec<String>,
    /// Options.
    pub options: ForeignKeyOptions,
}

/// A named table constraint: a foreign key, a check, or both.
#[derive(Debug, Clone, PartialEq)]
pub struct TableConstraint {
    /// Constraint name; derived when absent.
    pub name: Option<String>,
    /// Foreign key part.
    pub references: Option<References>,
    /// Check part.
    pub check: Option<RawSql>,
    /// Mode used when the constraint is dropped.
    pub drop_mode: Option<DropMode>,
}

/// Primary key columns with an optional constraint name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrimaryKey {
    /// Key columns.
    pub columns: Vec<String>,
    /// Constraint name; `<table>_pkey` when absent.
    pub name: Option<String>,
}

/// Table-level items added or dropped by one table change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableData {
    /// Primary key.
    pub primary_key: Option<PrimaryKey>,
    /// Indexes.
    pub indexes: Vec<TableIndex>,
    /// Constraints.
    pub constraints: Vec<TableConstraint>,
}

impl TableData {
    /// Adds one item.
    pub fn push(&mut self, item: TableItem) {
        match item {
            TableItem::PrimaryKey(key) => self.primary_key = Some(key),
            TableItem::Index(index) => self.indexes.push(index),
            TableItem::Constraint(constraint) => self.constraints.push(constraint),
        }
    }

    /// Returns true when no item is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.primary_key.is_none() && self.indexes.is_empty() && self.constraints.is_empty()
    }
}

/// An item for the table-level add/drop bags.
#[derive(Debug, Clone, PartialEq)]
pub enum TableItem {
    /// Composite primary key.
    PrimaryKey(PrimaryKey),
    /// Index.
    Index(TableIndex),
    /// Foreign key or check constraint.
    Constraint(TableConstraint),
}

fn names<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Vec<String> {
    columns.into_iter().map(Into::into).collect()
}

/// `PRIMARY KEY (columns)`.
#[must_use]
pub fn primary_key<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> TableItem {
    TableItem::PrimaryKey(PrimaryKey {
        columns: names(columns),
        name: None,
    })
}

/// `CONSTRAINT name PRIMARY KEY (columns)`.
#[must_use]
pub fn primary_key_named<S: Into<String>>(
    columns: impl IntoIterator<Item = S>,
    name: impl Into<String>,
) -> TableItem {
    TableItem::PrimaryKey(PrimaryKey {
        columns: names(columns),
        name: Some(name.into()),
    })
}

/// An index on `columns`.
#[must_use]
pub fn index<C: Into<IndexColumn>>(columns: impl IntoIterator<Item = C>) -> TableItem {
    index_with(columns, IndexOptions::default())
}

/// A unique index on `columns`.
#[must_use]
pub fn unique_index<C: Into<IndexColumn>>(columns: impl IntoIterator<Item = C>) -> TableItem {
    index_with(columns, IndexOptions::default().unique())
}

/// An index on `columns` with options.
#[must_use]
pub fn index_with<C: Into<IndexColumn>>(
    columns: impl IntoIterator<Item = C>,
    options: IndexOptions,
) -> TableItem {
    TableItem::Index(TableIndex {
        columns: columns.into_iter().map(Into::into).collect(),
        options,
    })
}

/// `FOREIGN KEY (columns) REFERENCES table (foreign_columns)`.
#[must_use]
pub fn foreign_key<S: Into<String>, F: Into<String>>(
    columns: impl IntoIterator<Item = S>,
    table: impl Into<String>,
    foreign_columns: impl IntoIterator<Item = F>,
) -> TableItem {
    foreign_key_with(columns, table, foreign_columns, ForeignKeyOptions::default())
}

/// A foreign key with options.
#[must_use]
pub fn foreign_key_with<S: Into<String>, F: Into<String>>(
    columns: impl IntoIterator<Item = S>,
    table: impl Into<String>,
    foreign_columns: impl IntoIterator<Item = F>,
    options: ForeignKeyOptions,
) -> TableItem {
    let name = options.name.clone();
    let drop_mode = options.drop_mode;
    TableItem::Constraint(TableConstraint {
        name,
        references: Some(References {
            columns: names(columns),
            table: table.into(),
            foreign_columns: names(foreign_columns),
            options,
        }),
        check: None,
        drop_mode,
    })
}

/// A table-level `CHECK (expr)`.
#[must_use]
pub fn check(expr: impl Into<RawSql>) -> TableItem {
    TableItem::Constraint(TableConstraint {
        name: None,
        references: None,
        check: Some(expr.into()),
        drop_mode: None,
    })
}

/// Any constraint, for a named check or a combined foreign key and check.
#[must_use]
pub const fn constraint(constraint: TableConstraint) -> TableItem {
    TableItem::Constraint(constraint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::raw;

    #[test]
    fn test_table_data_push() {
        let mut data = TableData::default();
        assert!(data.is_empty());

        data.push(primary_key(["a", "b"]));
        data.push(unique_index(["email"]));
        data.push(check(raw("a > 0")));

        assert_eq!(data.primary_key.as_ref().unwrap().columns, ["a", "b"]);
        assert!(data.indexes[0].options.unique);
        assert_eq!(data.constraints.len(), 1);
        assert!(!data.is_empty());
    }

    #[test]
    fn test_foreign_key_item_carries_name() {
        let item = foreign_key_with(
            ["user_id"],
            "user",
            ["id"],
            ForeignKeyOptions::new().name("post_author"),
        );
        let TableItem::Constraint(constraint) = item else {
            panic!("expected a constraint");
        };
        assert_eq!(constraint.name.as_deref(), Some("post_author"));
        assert_eq!(constraint.references.unwrap().foreign_columns, ["id"]);
    }
}
