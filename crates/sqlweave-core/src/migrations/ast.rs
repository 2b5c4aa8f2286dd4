//! Normalized descriptions of migration operations.
//!
//! Every operation a migration runs is first turned into one of these
//! values, then compiled to DDL, and finally kept in the migration log.

use indexmap::IndexMap;

use super::column::{ColumnType, DefaultValue, DropMode, ForeignKey, Identity, IndexOptions};
use super::table::TableData;
use crate::raw::RawSql;

/// Whether an operation creates or drops its object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// `CREATE`.
    Create,
    /// `DROP`.
    Drop,
}

impl Action {
    /// `Create` when migrating up, `Drop` when migrating down.
    #[must_use]
    pub const fn from_direction(up: bool) -> Self {
        if up {
            Self::Create
        } else {
            Self::Drop
        }
    }
}

/// A partial column description for one side of a change.
///
/// Only the attributes that are set take part in the comparison; an unset
/// attribute on both sides produces no statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnChange {
    /// The full column, when the side was given as a column type.
    pub column: Option<ColumnType>,
    /// SQL type.
    pub data_type: Option<String>,
    /// Collation.
    pub collate: Option<String>,
    /// Compression method.
    pub compression: Option<String>,
    /// Default value.
    pub default: Option<DefaultValue>,
    /// Nullability.
    pub nullable: Option<bool>,
    /// Identity generation.
    pub identity: Option<Identity>,
    /// Check constraint.
    pub check: Option<RawSql>,
    /// Comment.
    pub comment: Option<String>,
    /// Primary key flag.
    pub primary_key: bool,
    /// Foreign keys, compared pairwise by position.
    pub foreign_keys: Vec<ForeignKey>,
    /// Indexes, compared pairwise by position.
    pub indexes: Vec<IndexOptions>,
}

impl ColumnChange {
    /// An empty change side.
    #[must_use]
    pub fn new() -> Self {
        <Self as Default>::default()
    }

    /// Sets the type.
    #[must_use]
    pub fn data_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = Some(data_type.into());
        self
    }

    /// Sets the default.
    #[must_use]
    pub fn default(mut self, value: impl Into<DefaultValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Sets nullability.
    #[must_use]
    pub const fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    /// Sets the comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Sets the check.
    #[must_use]
    pub fn check(mut self, expr: impl Into<RawSql>) -> Self {
        self.check = Some(expr.into());
        self
    }

    /// Name of the underlying column, when one was given explicitly.
    #[must_use]
    pub fn column_name(&self) -> Option<&str> {
        self.column.as_ref().and_then(|c| c.name.as_deref())
    }

    /// The underlying column is an enum.
    #[must_use]
    pub fn is_enum(&self) -> bool {
        self.column.as_ref().is_some_and(ColumnType::is_enum)
    }
}

impl From<ColumnType> for ColumnChange {
    fn from(column: ColumnType) -> Self {
        Self {
            data_type: Some(column.data_type.clone()),
            collate: column.collate.clone(),
            compression: column.compression.clone(),
            default: column.default.clone(),
            nullable: Some(column.nullable),
            identity: column.identity.clone(),
            check: column.check.clone(),
            comment: column.comment.clone(),
            primary_key: column.primary_key,
            foreign_keys: column.foreign_keys.clone(),
            indexes: column.indexes.clone(),
            column: Some(column),
        }
    }
}

/// `USING` casts for a type change, one per direction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeUsing {
    /// Cast applied when migrating up.
    pub using_up: Option<RawSql>,
    /// Cast applied when migrating down.
    pub using_down: Option<RawSql>,
}

impl ChangeUsing {
    /// Casts for both directions.
    #[must_use]
    pub fn new(using_up: impl Into<RawSql>, using_down: impl Into<RawSql>) -> Self {
        Self {
            using_up: Some(using_up.into()),
            using_down: Some(using_down.into()),
        }
    }
}

/// What happens to one column key.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeItem {
    /// `ADD COLUMN`.
    Add {
        /// Column definition.
        column: ColumnType,
        /// Drop mode for the inverse.
        drop_mode: Option<DropMode>,
    },
    /// `DROP COLUMN`.
    Drop {
        /// Column definition, used to restore it.
        column: ColumnType,
        /// Drop mode.
        drop_mode: Option<DropMode>,
    },
    /// Attribute changes of an existing column.
    Change {
        /// Explicit column name overriding the key.
        name: Option<String>,
        /// Current attributes.
        from: Box<ColumnChange>,
        /// Desired attributes.
        to: Box<ColumnChange>,
        /// Type casts.
        using: ChangeUsing,
    },
    /// Renames the key's column to `name`, or `name` back to the key when
    /// `reverse` is set.
    Rename {
        /// The other name.
        name: String,
        /// Runs from `name` to the key.
        reverse: bool,
    },
}

impl ChangeItem {
    /// The same change in the opposite direction.
    #[must_use]
    pub fn invert(self) -> Self {
        match self {
            Self::Add { column, drop_mode } => Self::Drop { column, drop_mode },
            Self::Drop { column, drop_mode } => Self::Add { column, drop_mode },
            Self::Change {
                name,
                from,
                to,
                using,
            } => Self::Change {
                name,
                from: to,
                to: from,
                using: ChangeUsing {
                    using_up: using.using_down,
                    using_down: using.using_up,
                },
            },
            Self::Rename { name, reverse } => Self::Rename {
                name,
                reverse: !reverse,
            },
        }
    }

    fn columns_mut(&mut self) -> Vec<&mut ColumnType> {
        match self {
            Self::Add { column, .. } | Self::Drop { column, .. } => vec![column],
            Self::Change { from, to, .. } => from
                .column
                .iter_mut()
                .chain(to.column.iter_mut())
                .collect(),
            Self::Rename { .. } => Vec::new(),
        }
    }
}

/// One or more changes under a column key.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeItem {
    /// A single change.
    One(ChangeItem),
    /// Several add/drop changes, applied in order.
    Many(Vec<ChangeItem>),
}

impl ShapeItem {
    /// The changes in application order.
    #[must_use]
    pub fn items(&self) -> &[ChangeItem] {
        match self {
            Self::One(item) => std::slice::from_ref(item),
            Self::Many(items) => items,
        }
    }

    fn items_mut(&mut self) -> &mut [ChangeItem] {
        match self {
            Self::One(item) => std::slice::from_mut(item),
            Self::Many(items) => items,
        }
    }

    pub(crate) fn push(&mut self, item: ChangeItem) {
        let items = match std::mem::replace(self, Self::Many(Vec::new())) {
            Self::One(first) => vec![first, item],
            Self::Many(mut items) => {
                items.push(item);
                items
            }
        };
        *self = Self::Many(items);
    }
}

/// A table comment change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentChange {
    /// Comment before the change.
    pub from: Option<String>,
    /// Comment after the change; `None` removes it.
    pub to: Option<String>,
}

impl CommentChange {
    /// Sets a comment on a table that had none.
    #[must_use]
    pub fn set(comment: impl Into<String>) -> Self {
        Self {
            from: None,
            to: Some(comment.into()),
        }
    }

    /// Replaces `from` with `to`.
    #[must_use]
    pub fn new(from: Option<String>, to: Option<String>) -> Self {
        Self { from, to }
    }
}

/// The normalized form of one `change_table` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeTable {
    /// Schema.
    pub schema: Option<String>,
    /// Table name.
    pub name: String,
    /// Table comment change.
    pub comment: Option<CommentChange>,
    /// Changes keyed by column key, in declaration order.
    pub shape: IndexMap<String, ShapeItem>,
    /// Table-level items to add.
    pub add: TableData,
    /// Table-level items to drop.
    pub drop: TableData,
}

impl ChangeTable {
    /// An empty change of `schema.name`.
    #[must_use]
    pub fn new(schema: Option<String>, name: impl Into<String>) -> Self {
        Self {
            schema,
            name: name.into(),
            comment: None,
            shape: IndexMap::new(),
            add: TableData::default(),
            drop: TableData::default(),
        }
    }

    /// The exact inverse: additions become drops and every change runs
    /// backwards, in reverse order within a key.
    ///
    /// Keys stay in place, so inverting twice gives back the original value.
    #[must_use]
    pub fn invert(self) -> Self {
        let shape = self
            .shape
            .into_iter()
            .map(|(key, item)| {
                let item = match item {
                    ShapeItem::One(item) => ShapeItem::One(item.invert()),
                    ShapeItem::Many(items) => {
                        ShapeItem::Many(items.into_iter().rev().map(ChangeItem::invert).collect())
                    }
                };
                (key, item)
            })
            .collect();

        Self {
            schema: self.schema,
            name: self.name,
            comment: self.comment.map(|c| CommentChange {
                from: c.to,
                to: c.from,
            }),
            shape,
            add: self.drop,
            drop: self.add,
        }
    }

    /// Every change with its key, in compilation order.
    pub fn items(&self) -> impl Iterator<Item = (&str, &ChangeItem)> {
        self.shape
            .iter()
            .flat_map(|(key, item)| item.items().iter().map(move |i| (key.as_str(), i)))
    }

    /// Records the values of enum `name` on every column using it.
    pub fn populate_enum(&mut self, name: &str, values: &[String]) {
        for item in self.shape.values_mut() {
            for change in item.items_mut() {
                for column in change.columns_mut() {
                    if column.enum_name.as_deref() == Some(name) {
                        column.enum_values = values.to_vec();
                    }
                }
            }
        }
    }
}

/// What to do when a created table has no primary key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NoPrimaryKey {
    /// Reject the table.
    #[default]
    Error,
    /// Log a warning and continue.
    Warn,
    /// Accept silently.
    Ignore,
}

/// The normalized form of `create_table` and `drop_table`.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    /// Create or drop.
    pub action: Action,
    /// Schema.
    pub schema: Option<String>,
    /// Table name.
    pub name: String,
    /// Columns keyed by column key.
    pub shape: IndexMap<String, ColumnType>,
    /// Table-level items.
    pub data: TableData,
    /// Table comment.
    pub comment: Option<String>,
    /// Primary key policy.
    pub no_primary_key: NoPrimaryKey,
    /// Drop mode for `DROP TABLE`.
    pub drop_mode: Option<DropMode>,
}

impl CreateTable {
    /// Records the values of enum `name` on every column using it.
    pub fn populate_enum(&mut self, name: &str, values: &[String]) {
        for column in self.shape.values_mut() {
            if column.enum_name.as_deref() == Some(name) {
                column.enum_values = values.to_vec();
            }
        }
    }
}

/// `ALTER TABLE .. RENAME TO ..`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameTable {
    /// Old schema.
    pub from_schema: Option<String>,
    /// Old name.
    pub from: String,
    /// New schema.
    pub to_schema: Option<String>,
    /// New name.
    pub to: String,
}

/// `CREATE SCHEMA` / `DROP SCHEMA`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaAst {
    /// Create or drop.
    pub action: Action,
    /// Schema name.
    pub name: String,
}

/// `CREATE EXTENSION` / `DROP EXTENSION`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionOptions {
    /// Schema to install into.
    pub schema: Option<String>,
    /// Version to install.
    pub version: Option<String>,
    /// `CASCADE`.
    pub cascade: bool,
    /// `IF NOT EXISTS` when creating.
    pub create_if_not_exists: bool,
    /// `IF EXISTS` when dropping.
    pub drop_if_exists: bool,
}

/// Extension operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionAst {
    /// Create or drop.
    pub action: Action,
    /// Extension name.
    pub name: String,
    /// Options.
    pub options: ExtensionOptions,
}

/// `CREATE TYPE .. AS ENUM` / `DROP TYPE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumAst {
    /// Create or drop.
    pub action: Action,
    /// Schema.
    pub schema: Option<String>,
    /// Type name.
    pub name: String,
    /// Values in order.
    pub values: Vec<String>,
    /// `IF EXISTS` when dropping.
    pub drop_if_exists: bool,
    /// `CASCADE` when dropping.
    pub cascade: bool,
}

/// Domain definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomainOptions {
    /// Collation.
    pub collation: Option<String>,
    /// Default expression.
    pub default: Option<RawSql>,
    /// `NOT NULL`.
    pub not_null: bool,
    /// Check expression.
    pub check: Option<RawSql>,
    /// `CASCADE` when dropping.
    pub cascade: bool,
}

/// `CREATE DOMAIN` / `DROP DOMAIN`.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainAst {
    /// Create or drop.
    pub action: Action,
    /// Schema.
    pub schema: Option<String>,
    /// Domain name.
    pub name: String,
    /// Underlying type.
    pub base_type: ColumnType,
    /// Options.
    pub options: DomainOptions,
}

/// A logged migration operation.
#[derive(Debug, Clone, PartialEq)]
pub enum MigrationAst {
    /// Table creation or removal.
    Table(CreateTable),
    /// Table alteration.
    ChangeTable(ChangeTable),
    /// Table rename.
    RenameTable(RenameTable),
    /// Schema.
    Schema(SchemaAst),
    /// Extension.
    Extension(ExtensionAst),
    /// Enum type.
    Enum(EnumAst),
    /// Domain.
    Domain(DomainAst),
}

impl MigrationAst {
    /// Records the values of enum `name` on every column using it.
    pub fn populate_enum(&mut self, name: &str, values: &[String]) {
        match self {
            Self::Table(table) => table.populate_enum(name, values),
            Self::ChangeTable(change) => change.populate_enum(name, values),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::types::{enum_type, integer, text};
    use crate::raw::raw;

    fn sample() -> ChangeTable {
        let mut ast = ChangeTable::new(None, "user");
        ast.comment = Some(CommentChange::set("people"));
        ast.shape.insert(
            String::from("age"),
            ShapeItem::One(ChangeItem::Change {
                name: None,
                from: Box::new(text().into()),
                to: Box::new(integer().into()),
                using: ChangeUsing::new(raw("age::integer"), raw("age::text")),
            }),
        );
        ast.shape.insert(
            String::from("nick"),
            ShapeItem::Many(vec![
                ChangeItem::Add {
                    column: text(),
                    drop_mode: None,
                },
                ChangeItem::Drop {
                    column: text(),
                    drop_mode: Some(DropMode::Cascade),
                },
            ]),
        );
        ast.shape.insert(
            String::from("login"),
            ShapeItem::One(ChangeItem::Rename {
                name: String::from("username"),
                reverse: false,
            }),
        );
        ast
    }

    #[test]
    fn test_invert_twice_is_identity() {
        let ast = sample();
        assert_eq!(ast.clone().invert().invert(), ast);
    }

    #[test]
    fn test_invert_keeps_rename_next_to_a_change_of_the_new_name() {
        let mut ast = ChangeTable::new(None, "user");
        ast.shape.insert(
            String::from("login"),
            ShapeItem::One(ChangeItem::Rename {
                name: String::from("username"),
                reverse: false,
            }),
        );
        ast.shape.insert(
            String::from("username"),
            ShapeItem::One(ChangeItem::Change {
                name: None,
                from: Box::new(ColumnChange::new().nullable(true)),
                to: Box::new(ColumnChange::new().nullable(false)),
                using: ChangeUsing::default(),
            }),
        );

        let inverted = ast.clone().invert();

        let keys: Vec<&str> = inverted.shape.keys().map(String::as_str).collect();
        assert_eq!(keys, ["login", "username"]);
        assert_eq!(inverted.invert(), ast);
    }

    #[test]
    fn test_invert_flips_renames_inside_many() {
        let mut ast = ChangeTable::new(None, "user");
        ast.shape.insert(
            String::from("nick"),
            ShapeItem::Many(vec![
                ChangeItem::Rename {
                    name: String::from("alias"),
                    reverse: false,
                },
                ChangeItem::Add {
                    column: text(),
                    drop_mode: None,
                },
            ]),
        );

        let inverted = ast.clone().invert();

        let ShapeItem::Many(items) = &inverted.shape["nick"] else {
            panic!("expected two changes");
        };
        assert!(matches!(items[0], ChangeItem::Drop { .. }));
        assert!(matches!(items[1], ChangeItem::Rename { reverse: true, .. }));
        assert_eq!(inverted.invert(), ast);
    }

    #[test]
    fn test_invert_swaps_sides() {
        let inverted = sample().invert();

        assert_eq!(inverted.comment.as_ref().unwrap().to, None);

        let ShapeItem::One(ChangeItem::Change { from, using, .. }) = &inverted.shape["age"] else {
            panic!("expected a change");
        };
        assert_eq!(from.data_type.as_deref(), Some("integer"));
        assert_eq!(using.using_up, Some(raw("age::text")));

        let ShapeItem::Many(items) = &inverted.shape["nick"] else {
            panic!("expected two changes");
        };
        assert!(matches!(items[0], ChangeItem::Add { drop_mode: Some(DropMode::Cascade), .. }));
        assert!(matches!(items[1], ChangeItem::Drop { drop_mode: None, .. }));

        assert_eq!(
            inverted.shape["login"],
            ShapeItem::One(ChangeItem::Rename {
                name: String::from("username"),
                reverse: true,
            })
        );
    }

    #[test]
    fn test_populate_enum() {
        let mut ast = ChangeTable::new(None, "user");
        ast.shape.insert(
            String::from("mood"),
            ShapeItem::One(ChangeItem::Add {
                column: enum_type("mood", Vec::<String>::new()),
                drop_mode: None,
            }),
        );

        ast.populate_enum("mood", &[String::from("sad"), String::from("happy")]);

        let ShapeItem::One(ChangeItem::Add { column, .. }) = &ast.shape["mood"] else {
            panic!("expected an add");
        };
        assert_eq!(column.enum_values, ["sad", "happy"]);
    }
}
