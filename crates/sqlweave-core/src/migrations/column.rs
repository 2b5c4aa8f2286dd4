//! Column definitions used by table migrations.
//!
//! A [`ColumnType`] carries everything the DDL compiler needs for one
//! column. It is built fluently from the factories in
//! [`types`](super::types).

use crate::error::Result;
use crate::raw::RawSql;
use crate::value::{quote_literal, SqlValue};

/// `CASCADE` or `RESTRICT` on a DROP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropMode {
    /// `CASCADE`
    Cascade,
    /// `RESTRICT`
    Restrict,
}

impl DropMode {
    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::Restrict => "RESTRICT",
        }
    }
}

/// Foreign key referential action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForeignKeyAction {
    /// No action.
    NoAction,
    /// Restrict deletion/update.
    Restrict,
    /// Cascade the operation.
    Cascade,
    /// Set to NULL.
    SetNull,
    /// Set to default value.
    SetDefault,
}

impl ForeignKeyAction {
    /// Returns the SQL representation of the action.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}

/// `MATCH` mode of a foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForeignKeyMatch {
    /// `MATCH FULL`
    Full,
    /// `MATCH PARTIAL`
    Partial,
    /// `MATCH SIMPLE`
    Simple,
}

impl ForeignKeyMatch {
    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Full => "FULL",
            Self::Partial => "PARTIAL",
            Self::Simple => "SIMPLE",
        }
    }
}

/// Options shared by column-level and table-level foreign keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForeignKeyOptions {
    /// Constraint name; derived from the table and columns when absent.
    pub name: Option<String>,
    /// `MATCH` mode.
    pub match_mode: Option<ForeignKeyMatch>,
    /// `ON UPDATE` action.
    pub on_update: Option<ForeignKeyAction>,
    /// `ON DELETE` action.
    pub on_delete: Option<ForeignKeyAction>,
    /// Mode used when the constraint is dropped.
    pub drop_mode: Option<DropMode>,
}

impl ForeignKeyOptions {
    /// Options with every field unset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the constraint name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the `MATCH` mode.
    #[must_use]
    pub const fn match_mode(mut self, mode: ForeignKeyMatch) -> Self {
        self.match_mode = Some(mode);
        self
    }

    /// Sets `ON UPDATE`.
    #[must_use]
    pub const fn on_update(mut self, action: ForeignKeyAction) -> Self {
        self.on_update = Some(action);
        self
    }

    /// Sets `ON DELETE`.
    #[must_use]
    pub const fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    /// Sets the drop mode.
    #[must_use]
    pub const fn drop_mode(mut self, mode: DropMode) -> Self {
        self.drop_mode = Some(mode);
        self
    }
}

/// A column-level reference to another table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    /// Referenced table, optionally `schema.table`.
    pub table: String,
    /// Referenced columns.
    pub columns: Vec<String>,
    /// Options.
    pub options: ForeignKeyOptions,
}

/// Default value for a column.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    /// NULL default.
    Null,
    /// Boolean default.
    Boolean(bool),
    /// Integer default.
    Integer(i64),
    /// Float default.
    Float(f64),
    /// String default.
    String(String),
    /// Raw SQL expression (e.g. `now()`).
    Expression(RawSql),
}

impl DefaultValue {
    /// Returns the SQL representation of the default value.
    pub fn to_sql(&self) -> Result<String> {
        Ok(match self {
            Self::Null => String::from("NULL"),
            Self::Boolean(b) => {
                if *b {
                    String::from("true")
                } else {
                    String::from("false")
                }
            }
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => SqlValue::Float(*f).to_sql_inline(),
            Self::String(s) => quote_literal(s),
            Self::Expression(raw) => raw.render_inline()?,
        })
    }
}

impl From<bool> for DefaultValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for DefaultValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for DefaultValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for DefaultValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for DefaultValue {
    fn from(value: &str) -> Self {
        Self::String(String::from(value))
    }
}

impl From<String> for DefaultValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<RawSql> for DefaultValue {
    fn from(raw: RawSql) -> Self {
        Self::Expression(raw)
    }
}

/// `GENERATED .. AS IDENTITY` options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    /// `ALWAYS` instead of `BY DEFAULT`.
    pub always: bool,
    /// `START WITH`.
    pub start: Option<i64>,
    /// `INCREMENT BY`.
    pub increment: Option<i64>,
    /// `MINVALUE`.
    pub min: Option<i64>,
    /// `MAXVALUE`.
    pub max: Option<i64>,
    /// `CACHE`.
    pub cache: Option<i64>,
    /// `CYCLE`.
    pub cycle: bool,
}

impl Identity {
    /// `GENERATED BY DEFAULT AS IDENTITY`.
    #[must_use]
    pub fn by_default() -> Self {
        Self::default()
    }

    /// `GENERATED ALWAYS AS IDENTITY`.
    #[must_use]
    pub fn always() -> Self {
        Self {
            always: true,
            ..Self::default()
        }
    }

    /// Sets `START WITH`.
    #[must_use]
    pub const fn start(mut self, start: i64) -> Self {
        self.start = Some(start);
        self
    }

    /// Sets `INCREMENT BY`.
    #[must_use]
    pub const fn increment(mut self, increment: i64) -> Self {
        self.increment = Some(increment);
        self
    }

    /// Renders the identity clause.
    #[must_use]
    pub fn to_sql(&self) -> String {
        let mut options = Vec::new();
        if let Some(start) = self.start {
            options.push(format!("START WITH {start}"));
        }
        if let Some(increment) = self.increment {
            options.push(format!("INCREMENT BY {increment}"));
        }
        if let Some(min) = self.min {
            options.push(format!("MINVALUE {min}"));
        }
        if let Some(max) = self.max {
            options.push(format!("MAXVALUE {max}"));
        }
        if let Some(cache) = self.cache {
            options.push(format!("CACHE {cache}"));
        }
        if self.cycle {
            options.push(String::from("CYCLE"));
        }

        let kind = if self.always { "ALWAYS" } else { "BY DEFAULT" };
        if options.is_empty() {
            format!("GENERATED {kind} AS IDENTITY")
        } else {
            format!("GENERATED {kind} AS IDENTITY ({})", options.join(" "))
        }
    }
}

/// Options of an index, shared by column-level and table-level indexes.
///
/// Two indexes are the same only when every option matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexOptions {
    /// Index name; derived from the table and columns when absent.
    pub name: Option<String>,
    /// `UNIQUE`.
    pub unique: bool,
    /// `USING` method.
    pub using: Option<String>,
    /// `INCLUDE` columns.
    pub include: Vec<String>,
    /// `NULLS NOT DISTINCT`.
    pub nulls_not_distinct: bool,
    /// `WITH (..)` storage parameters.
    pub with: Option<String>,
    /// `TABLESPACE`.
    pub tablespace: Option<String>,
    /// Partial index predicate.
    pub filter: Option<String>,
    /// Column collation, for column-level indexes.
    pub collate: Option<String>,
    /// Column operator class, for column-level indexes.
    pub opclass: Option<String>,
    /// Column ordering such as `DESC NULLS LAST`, for column-level indexes.
    pub order: Option<String>,
    /// Mode used when the index is dropped.
    pub drop_mode: Option<DropMode>,
}

impl IndexOptions {
    /// Options with every field unset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the index name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Makes the index unique.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the index method.
    #[must_use]
    pub fn using(mut self, method: impl Into<String>) -> Self {
        self.using = Some(method.into());
        self
    }

    /// Adds `INCLUDE` columns.
    #[must_use]
    pub fn include<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.include.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Sets the partial index predicate.
    #[must_use]
    pub fn filter(mut self, predicate: impl Into<String>) -> Self {
        self.filter = Some(predicate.into());
        self
    }

    /// Sets the column ordering.
    #[must_use]
    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    /// Sets the drop mode.
    #[must_use]
    pub const fn drop_mode(mut self, mode: DropMode) -> Self {
        self.drop_mode = Some(mode);
        self
    }
}

/// A complete column description for migrations.
///
/// Columns are nullable unless marked with [`ColumnType::not_null`] or
/// [`ColumnType::primary_key`].
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnType {
    /// SQL type as written in DDL.
    pub data_type: String,
    /// User-defined type; quoted when rendered.
    pub custom: bool,
    /// Enum type name for enum columns.
    pub enum_name: Option<String>,
    /// Enum values, when known.
    pub enum_values: Vec<String>,
    /// Explicit column name; the shape key is used otherwise.
    pub name: Option<String>,
    /// Whether the column is nullable.
    pub nullable: bool,
    /// Default value.
    pub default: Option<DefaultValue>,
    /// Whether this is (part of) the primary key.
    pub primary_key: bool,
    /// Identity generation.
    pub identity: Option<Identity>,
    /// Collation.
    pub collate: Option<String>,
    /// Compression method.
    pub compression: Option<String>,
    /// Check constraint expression.
    pub check: Option<RawSql>,
    /// Column comment.
    pub comment: Option<String>,
    /// Foreign key references.
    pub foreign_keys: Vec<ForeignKey>,
    /// Single-column indexes.
    pub indexes: Vec<IndexOptions>,
}

impl ColumnType {
    /// Creates a column of the given SQL type.
    #[must_use]
    pub fn new(data_type: impl Into<String>) -> Self {
        Self {
            data_type: data_type.into(),
            custom: false,
            enum_name: None,
            enum_values: Vec::new(),
            name: None,
            nullable: true,
            default: None,
            primary_key: false,
            identity: None,
            collate: None,
            compression: None,
            check: None,
            comment: None,
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Sets the column name explicitly.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Marks the column as NOT NULL.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Marks the column as nullable (default).
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Marks the column as part of the primary key.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false; // Primary keys are implicitly NOT NULL
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default(mut self, value: impl Into<DefaultValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Makes the column an identity column.
    #[must_use]
    pub fn identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self.nullable = false;
        self
    }

    /// Sets the collation.
    #[must_use]
    pub fn collate(mut self, collation: impl Into<String>) -> Self {
        self.collate = Some(collation.into());
        self
    }

    /// Sets the compression method.
    #[must_use]
    pub fn compression(mut self, method: impl Into<String>) -> Self {
        self.compression = Some(method.into());
        self
    }

    /// Adds a CHECK constraint.
    #[must_use]
    pub fn check(mut self, expr: impl Into<RawSql>) -> Self {
        self.check = Some(expr.into());
        self
    }

    /// Sets the column comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// References `table(column)`.
    #[must_use]
    pub fn foreign_key(self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.foreign_key_with(table, column, ForeignKeyOptions::default())
    }

    /// References `table(column)` with options.
    #[must_use]
    pub fn foreign_key_with(
        mut self,
        table: impl Into<String>,
        column: impl Into<String>,
        options: ForeignKeyOptions,
    ) -> Self {
        self.foreign_keys.push(ForeignKey {
            table: table.into(),
            columns: vec![column.into()],
            options,
        });
        self
    }

    /// Adds a single-column index.
    #[must_use]
    pub fn index(self) -> Self {
        self.index_with(IndexOptions::default())
    }

    /// Adds a unique single-column index.
    #[must_use]
    pub fn unique(self) -> Self {
        self.index_with(IndexOptions::default().unique())
    }

    /// Adds a single-column index with options.
    #[must_use]
    pub fn index_with(mut self, options: IndexOptions) -> Self {
        self.indexes.push(options);
        self
    }

    /// Returns true for enum columns.
    #[must_use]
    pub const fn is_enum(&self) -> bool {
        self.enum_name.is_some()
    }
}
