//! Reversible schema changes compiled to DDL.
//!
//! A migration step is described declaratively, normalized into an AST
//! (see [`ast`]) for the requested direction, and compiled into an ordered
//! list of [`DdlStatement`]s. Running a step down is the same as running
//! the inverted AST up.
//!
//! # Example
//!
//! ```rust
//! use sqlweave_core::migrations::types::{integer, text};
//! use sqlweave_core::migrations::{change_table, change_table_statements, ChangeTableOptions};
//!
//! let build = |t: &mut sqlweave_core::migrations::TableChanger| {
//!     [("age", t.change(text(), integer()))]
//! };
//!
//! let up = change_table("user", ChangeTableOptions::default(), true, build).unwrap();
//! let statements = change_table_statements(&up, false).unwrap();
//! assert_eq!(
//!     statements[0].sql.text,
//!     "ALTER TABLE \"user\"\n  ALTER COLUMN \"age\" TYPE integer"
//! );
//!
//! let down = change_table("user", ChangeTableOptions::default(), false, build).unwrap();
//! let statements = change_table_statements(&down, false).unwrap();
//! assert_eq!(
//!     statements[0].sql.text,
//!     "ALTER TABLE \"user\"\n  ALTER COLUMN \"age\" TYPE text"
//! );
//! ```

pub mod ast;
mod change_table;
pub mod column;
mod create_table;
mod ddl;
mod differ;
mod statements;
pub mod table;
pub mod types;

pub use ast::{
    Action, ChangeItem, ChangeTable, ChangeUsing, ColumnChange, CommentChange, CreateTable,
    DomainAst, DomainOptions, EnumAst, ExtensionAst, ExtensionOptions, MigrationAst,
    NoPrimaryKey, RenameTable, SchemaAst, ShapeItem,
};
pub use change_table::{change_table, ChangeTableOptions, ShapeEntry, TableChanger};
pub use column::{
    ColumnType, DefaultValue, DropMode, ForeignKey, ForeignKeyAction, ForeignKeyMatch,
    ForeignKeyOptions, Identity, IndexOptions,
};
pub use create_table::{create_table, create_table_statements, CreateTableOptions};
pub use ddl::{DdlStatement, PostAction};
pub use differ::change_table_statements;
pub use statements::{
    column_exists_sql, constraint_exists_sql, domain_statement, enum_statement,
    extension_statement, rename_table_statements, schema_statement, table_exists_sql,
};
pub use table::{
    IndexColumn, PrimaryKey, References, TableConstraint, TableData, TableIndex, TableItem,
};
