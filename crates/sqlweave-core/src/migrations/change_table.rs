//! Collecting a table change from a declarative callback.
//!
//! The callback receives a fresh [`TableChanger`] and returns the column
//! changes keyed by column key. Adds and drops are also recorded on the
//! changer itself, so ones that were created but not returned under a key
//! (for example columns added inside a helper) still take effect, keyed by
//! their explicit column name.
//!
//! ```rust
//! use sqlweave_core::migrations::{change_table, ChangeTableOptions};
//! use sqlweave_core::migrations::types::text;
//!
//! let ast = change_table("user", ChangeTableOptions::default(), true, |t| {
//!     [("name", t.add(text()))]
//! })
//! .unwrap();
//! assert!(ast.shape.contains_key("name"));
//! ```

use indexmap::IndexMap;

use super::ast::{ChangeItem, ChangeTable, ChangeUsing, ColumnChange, CommentChange, ShapeItem};
use super::column::{ColumnType, DefaultValue, DropMode};
use super::table::{TableData, TableItem};
use crate::error::{BuildError, Result};
use crate::quote::split_schema;

/// A change returned from the callback under a column key.
#[derive(Debug, Clone)]
pub enum ShapeEntry {
    /// An add or drop recorded on the changer.
    Recorded(usize),
    /// A change that needs no bookkeeping.
    Item(ChangeItem),
}

impl From<ColumnType> for ShapeEntry {
    fn from(column: ColumnType) -> Self {
        Self::Item(ChangeItem::Add {
            column,
            drop_mode: None,
        })
    }
}

impl From<ChangeItem> for ShapeEntry {
    fn from(item: ChangeItem) -> Self {
        Self::Item(item)
    }
}

/// Options of a table change.
#[derive(Debug, Clone, Default)]
pub struct ChangeTableOptions {
    /// Table comment change.
    pub comment: Option<CommentChange>,
}

/// Call-scoped accumulator handed to the change callback.
#[derive(Debug, Default)]
pub struct TableChanger {
    recorded: Vec<ChangeItem>,
    add: TableData,
    drop: TableData,
}

impl TableChanger {
    /// A fresh accumulator.
    #[must_use]
    pub fn new() -> Self {
        <Self as Default>::default()
    }

    fn record(&mut self, item: ChangeItem) -> ShapeEntry {
        self.recorded.push(item);
        ShapeEntry::Recorded(self.recorded.len() - 1)
    }

    /// Adds a column.
    pub fn add(&mut self, column: ColumnType) -> ShapeEntry {
        self.record(ChangeItem::Add {
            column,
            drop_mode: None,
        })
    }

    /// Adds a column, dropping it with `mode` when reverted.
    pub fn add_with_drop_mode(&mut self, column: ColumnType, mode: DropMode) -> ShapeEntry {
        self.record(ChangeItem::Add {
            column,
            drop_mode: Some(mode),
        })
    }

    /// Drops a column; the definition is used to restore it.
    pub fn drop(&mut self, column: ColumnType) -> ShapeEntry {
        self.record(ChangeItem::Drop {
            column,
            drop_mode: None,
        })
    }

    /// Drops a column with `mode`.
    pub fn drop_with_drop_mode(&mut self, column: ColumnType, mode: DropMode) -> ShapeEntry {
        self.record(ChangeItem::Drop {
            column,
            drop_mode: Some(mode),
        })
    }

    /// Adds several keyed columns, such as [`timestamps`](super::types::timestamps).
    pub fn add_many(
        &mut self,
        columns: impl IntoIterator<Item = (String, ColumnType)>,
    ) -> Vec<(String, ShapeEntry)> {
        columns
            .into_iter()
            .map(|(key, column)| (key, self.add(column)))
            .collect()
    }

    /// Drops several keyed columns.
    pub fn drop_many(
        &mut self,
        columns: impl IntoIterator<Item = (String, ColumnType)>,
    ) -> Vec<(String, ShapeEntry)> {
        columns
            .into_iter()
            .map(|(key, column)| (key, self.drop(column)))
            .collect()
    }

    /// Changes a column from one description to another.
    pub fn change(
        &mut self,
        from: impl Into<ColumnChange>,
        to: impl Into<ColumnChange>,
    ) -> ShapeEntry {
        self.change_using(from, to, ChangeUsing::default())
    }

    /// Changes a column with explicit `USING` casts for each direction.
    pub fn change_using(
        &mut self,
        from: impl Into<ColumnChange>,
        to: impl Into<ColumnChange>,
        using: ChangeUsing,
    ) -> ShapeEntry {
        self.record(ChangeItem::Change {
            name: None,
            from: Box::new(from.into()),
            to: Box::new(to.into()),
            using,
        })
    }

    /// Sets a default, dropping it when reverted.
    pub fn default(&mut self, value: impl Into<DefaultValue>) -> ShapeEntry {
        self.change(ColumnChange::new(), ColumnChange::new().default(value))
    }

    /// Drops `NOT NULL`.
    pub fn nullable(&mut self) -> ShapeEntry {
        self.change(
            ColumnChange::new().nullable(false),
            ColumnChange::new().nullable(true),
        )
    }

    /// Sets `NOT NULL`.
    pub fn non_nullable(&mut self) -> ShapeEntry {
        self.change(
            ColumnChange::new().nullable(true),
            ColumnChange::new().nullable(false),
        )
    }

    /// Replaces the column comment.
    pub fn comment(&mut self, from: Option<&str>, to: Option<&str>) -> ShapeEntry {
        let side = |comment: Option<&str>| ColumnChange {
            comment: comment.map(String::from),
            ..<ColumnChange as Default>::default()
        };
        self.change(side(from), side(to))
    }

    /// Renames the key's column to `name`.
    pub fn rename(&mut self, name: impl Into<String>) -> ShapeEntry {
        self.record(ChangeItem::Rename {
            name: name.into(),
            reverse: false,
        })
    }

    /// Adds a table-level primary key, index or constraint.
    pub fn add_item(&mut self, item: TableItem) {
        self.add.push(item);
    }

    /// Drops a table-level primary key, index or constraint.
    pub fn drop_item(&mut self, item: TableItem) {
        self.drop.push(item);
    }
}

/// Runs `build` against a fresh accumulator and normalizes the result.
///
/// When `up` is false the returned change is the inverse of the described
/// one.
pub fn change_table<F, I, K>(
    table: &str,
    options: ChangeTableOptions,
    up: bool,
    build: F,
) -> Result<ChangeTable>
where
    F: FnOnce(&mut TableChanger) -> I,
    I: IntoIterator<Item = (K, ShapeEntry)>,
    K: Into<String>,
{
    let mut changer = TableChanger::new();
    let entries: Vec<(String, ShapeEntry)> = build(&mut changer)
        .into_iter()
        .map(|(key, entry)| (key.into(), entry))
        .collect();

    let TableChanger {
        recorded,
        add,
        drop,
    } = changer;
    let mut recorded: Vec<Option<ChangeItem>> = recorded.into_iter().map(Some).collect();

    let mut shape = IndexMap::new();
    for (key, entry) in entries {
        let item = match entry {
            ShapeEntry::Item(item) => Some(item),
            ShapeEntry::Recorded(index) => recorded.get_mut(index).and_then(Option::take),
        };
        if let Some(item) = item {
            push_item(&mut shape, key, item);
        }
    }

    for item in recorded.into_iter().flatten() {
        let key = match &item {
            ChangeItem::Add { column, .. } => column
                .name
                .clone()
                .ok_or(BuildError::UnnamedColumn("add"))?,
            ChangeItem::Drop { column, .. } => column
                .name
                .clone()
                .ok_or(BuildError::UnnamedColumn("drop"))?,
            ChangeItem::Change { .. } | ChangeItem::Rename { .. } => continue,
        };
        push_item(&mut shape, key, item);
    }

    let (schema, name) = split_schema(table);
    let ast = ChangeTable {
        schema: schema.map(String::from),
        name: String::from(name),
        comment: options.comment,
        shape,
        add,
        drop,
    };
    Ok(if up { ast } else { ast.invert() })
}

fn push_item(shape: &mut IndexMap<String, ShapeItem>, key: String, item: ChangeItem) {
    match shape.get_mut(&key) {
        Some(existing) => existing.push(item),
        None => {
            shape.insert(key, ShapeItem::One(item));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::table::primary_key;
    use crate::migrations::types::{integer, text, timestamps};

    #[test]
    fn test_keyed_entries_keep_order() {
        let ast = change_table("app.user", ChangeTableOptions::default(), true, |t| {
            [("b", t.add(text())), ("a", t.drop(integer()))]
        })
        .unwrap();

        assert_eq!(ast.schema.as_deref(), Some("app"));
        assert_eq!(ast.name, "user");
        let keys: Vec<&str> = ast.shape.keys().map(String::as_str).collect();
        assert_eq!(keys, ["b", "a"]);
    }

    #[test]
    fn test_unreturned_add_and_drop_are_kept_by_name() {
        let ast = change_table("user", ChangeTableOptions::default(), true, |t| {
            t.add(text().name("name"));
            t.drop(text().name("name"));
            Vec::<(String, ShapeEntry)>::new()
        })
        .unwrap();

        let ShapeItem::Many(items) = &ast.shape["name"] else {
            panic!("expected two changes");
        };
        assert!(matches!(items[0], ChangeItem::Add { .. }));
        assert!(matches!(items[1], ChangeItem::Drop { .. }));
    }

    #[test]
    fn test_unreturned_column_without_name_is_an_error() {
        let err = change_table("user", ChangeTableOptions::default(), true, |t| {
            t.add(text());
            Vec::<(String, ShapeEntry)>::new()
        })
        .unwrap_err();
        assert_eq!(err, BuildError::UnnamedColumn("add"));
    }

    #[test]
    fn test_down_is_the_inverse() {
        let build = |t: &mut TableChanger| {
            t.add_item(primary_key(["a", "b"]));
            [("age", t.add(integer()))]
        };
        let up = change_table("user", ChangeTableOptions::default(), true, build).unwrap();
        let down = change_table("user", ChangeTableOptions::default(), false, build).unwrap();

        assert_eq!(down, up.clone().invert());
        assert!(down.add.is_empty());
        assert!(down.drop.primary_key.is_some());
    }

    #[test]
    fn test_add_many_timestamps() {
        let ast = change_table("user", ChangeTableOptions::default(), true, |t| {
            t.add_many(timestamps())
        })
        .unwrap();
        assert!(ast.shape.contains_key("created_at"));
        assert!(ast.shape.contains_key("updated_at"));
    }
}
