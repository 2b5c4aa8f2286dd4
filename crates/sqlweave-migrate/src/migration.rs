//! The migration interface handed to each migration.
//!
//! A [`Migration`] runs in one direction. Every `drop_*` operation is its
//! `add_*`/`create_*` twin run the other way, so a migration written with
//! `create_table` rolls back by running the same code with `up` false.
//!
//! Each operation is compiled to DDL first; a configuration error aborts it
//! before any statement reaches the database. The statements then run one
//! after another through the logged adapter, and the operation's AST is
//! appended to [`Migration::migrated_asts`] once all of them succeeded.

use sqlweave_core::migrations::table::{self, TableItem};
use sqlweave_core::migrations::{
    self, Action, ChangeTableOptions, ColumnType, CreateTableOptions, DdlStatement, DomainAst,
    DomainOptions, EnumAst, ExtensionAst, ExtensionOptions, ForeignKeyOptions, IndexColumn,
    IndexOptions, MigrationAst, NoPrimaryKey, PostAction, RenameTable, SchemaAst, ShapeEntry,
    TableChanger, TableConstraint, TableData,
};
use sqlweave_core::quote::split_schema;
use sqlweave_core::{RawSql, Sql};
use sqlweave_db::{Adapter, ArraysResult, LoggedAdapter, QueryLog, QueryResult, TracingLog};
use tracing::{debug, warn};

use crate::config::MigrationConfig;
use crate::error::Result;

static TRACING_LOG: TracingLog = TracingLog;

/// Options of `create_enum` and `drop_enum`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnumOptions {
    /// `IF EXISTS` when dropping.
    pub drop_if_exists: bool,
    /// `CASCADE` when dropping.
    pub cascade: bool,
}

/// Schema operations of one migration, run in one direction.
pub struct Migration<'a> {
    adapter: LoggedAdapter<'a>,
    up: bool,
    config: MigrationConfig,
    migrated_asts: Vec<MigrationAst>,
}

impl<'a> Migration<'a> {
    /// A migration running on `adapter`, usually a transaction.
    ///
    /// Statements are logged through `tracing` when `config.log` is set.
    #[must_use]
    pub fn new(adapter: &'a dyn Adapter, up: bool, config: MigrationConfig) -> Self {
        let log: Option<&'a dyn QueryLog> = if config.log {
            Some(&TRACING_LOG)
        } else {
            None
        };
        Self {
            adapter: LoggedAdapter::new(adapter, log),
            up,
            config,
            migrated_asts: Vec::new(),
        }
    }

    /// Reports statements to `log` instead.
    #[must_use]
    pub fn with_log(mut self, log: &'a dyn QueryLog) -> Self {
        self.adapter = LoggedAdapter::new(self.adapter.silent(), Some(log));
        self
    }

    /// True when migrating up.
    #[must_use]
    pub const fn up(&self) -> bool {
        self.up
    }

    /// Settings of this run.
    #[must_use]
    pub const fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Operations applied so far, in order.
    #[must_use]
    pub fn migrated_asts(&self) -> &[MigrationAst] {
        &self.migrated_asts
    }

    /// Consumes the migration, returning the applied operations.
    #[must_use]
    pub fn into_migrated_asts(self) -> Vec<MigrationAst> {
        self.migrated_asts
    }

    /// The logged adapter.
    #[must_use]
    pub const fn adapter(&self) -> &LoggedAdapter<'a> {
        &self.adapter
    }

    /// The adapter without logging, for bookkeeping statements.
    #[must_use]
    pub const fn silent(&self) -> &'a dyn Adapter {
        self.adapter.silent()
    }

    // =========================================================================
    // Tables
    // =========================================================================

    /// Creates a table; dropped when migrating down.
    ///
    /// `build` returns the columns keyed by column key and may push
    /// table-level items to the given [`TableData`].
    pub async fn create_table<F, I, K>(
        &mut self,
        table: &str,
        options: CreateTableOptions,
        build: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut TableData) -> I,
        I: IntoIterator<Item = (K, ColumnType)>,
        K: Into<String>,
    {
        self.create_table_in(self.up, table, options, build).await
    }

    /// Drops a table; recreated from the same description when migrating
    /// down.
    pub async fn drop_table<F, I, K>(
        &mut self,
        table: &str,
        options: CreateTableOptions,
        build: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut TableData) -> I,
        I: IntoIterator<Item = (K, ColumnType)>,
        K: Into<String>,
    {
        self.create_table_in(!self.up, table, options, build).await
    }

    async fn create_table_in<F, I, K>(
        &mut self,
        up: bool,
        table: &str,
        options: CreateTableOptions,
        build: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut TableData) -> I,
        I: IntoIterator<Item = (K, ColumnType)>,
        K: Into<String>,
    {
        let ast = migrations::create_table(table, options, up, build);
        if ast.action == Action::Create
            && ast.no_primary_key == NoPrimaryKey::Warn
            && ast.primary_key_columns(self.config.snake_case).is_empty()
        {
            warn!(table = %ast.name, "Table is created without a primary key");
        }
        let statements = migrations::create_table_statements(&ast, self.config.snake_case)?;
        self.run(statements, MigrationAst::Table(ast)).await
    }

    /// Changes a table from the keyed changes returned by `build`.
    pub async fn change_table<F, I, K>(
        &mut self,
        table: &str,
        options: ChangeTableOptions,
        build: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut TableChanger) -> I,
        I: IntoIterator<Item = (K, ShapeEntry)>,
        K: Into<String>,
    {
        self.change_table_in(self.up, table, options, build).await
    }

    async fn change_table_in<F, I, K>(
        &mut self,
        up: bool,
        table: &str,
        options: ChangeTableOptions,
        build: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut TableChanger) -> I,
        I: IntoIterator<Item = (K, ShapeEntry)>,
        K: Into<String>,
    {
        let ast = migrations::change_table(table, options, up, build)?;
        let statements = migrations::change_table_statements(&ast, self.config.snake_case)?;
        self.run(statements, MigrationAst::ChangeTable(ast)).await
    }

    /// Renames a table, moving it to another schema when the names say so.
    pub async fn rename_table(&mut self, from: &str, to: &str) -> Result<()> {
        let ast = RenameTable::new(from, to, self.up);
        let statements = migrations::rename_table_statements(&ast);
        self.run(statements, MigrationAst::RenameTable(ast)).await
    }

    // =========================================================================
    // Columns, indexes and constraints
    // =========================================================================

    /// Adds a column under `key`.
    pub async fn add_column(&mut self, table: &str, key: &str, column: ColumnType) -> Result<()> {
        self.add_column_in(self.up, table, key, column).await
    }

    /// Drops a column; `column` describes how to restore it.
    pub async fn drop_column(&mut self, table: &str, key: &str, column: ColumnType) -> Result<()> {
        self.add_column_in(!self.up, table, key, column).await
    }

    async fn add_column_in(
        &mut self,
        up: bool,
        table: &str,
        key: &str,
        column: ColumnType,
    ) -> Result<()> {
        self.change_table_in(up, table, ChangeTableOptions::default(), |t| {
            [(key, t.add(column))]
        })
        .await
    }

    /// Creates an index on `columns`.
    pub async fn add_index<C: Into<IndexColumn>>(
        &mut self,
        table: &str,
        columns: impl IntoIterator<Item = C>,
        options: IndexOptions,
    ) -> Result<()> {
        let item = table::index_with(columns, options);
        self.add_item_in(self.up, table, item).await
    }

    /// Drops the index on `columns`.
    pub async fn drop_index<C: Into<IndexColumn>>(
        &mut self,
        table: &str,
        columns: impl IntoIterator<Item = C>,
        options: IndexOptions,
    ) -> Result<()> {
        let item = table::index_with(columns, options);
        self.add_item_in(!self.up, table, item).await
    }

    /// Adds a foreign key from `columns` to `foreign_table`.
    pub async fn add_foreign_key<S: Into<String>, F: Into<String>>(
        &mut self,
        table: &str,
        columns: impl IntoIterator<Item = S>,
        foreign_table: &str,
        foreign_columns: impl IntoIterator<Item = F>,
        options: ForeignKeyOptions,
    ) -> Result<()> {
        let item = table::foreign_key_with(columns, foreign_table, foreign_columns, options);
        self.add_item_in(self.up, table, item).await
    }

    /// Drops a foreign key.
    pub async fn drop_foreign_key<S: Into<String>, F: Into<String>>(
        &mut self,
        table: &str,
        columns: impl IntoIterator<Item = S>,
        foreign_table: &str,
        foreign_columns: impl IntoIterator<Item = F>,
        options: ForeignKeyOptions,
    ) -> Result<()> {
        let item = table::foreign_key_with(columns, foreign_table, foreign_columns, options);
        self.add_item_in(!self.up, table, item).await
    }

    /// Adds a primary key, named `<table>_pkey` unless `name` is given.
    pub async fn add_primary_key<S: Into<String>>(
        &mut self,
        table: &str,
        columns: impl IntoIterator<Item = S>,
        name: Option<&str>,
    ) -> Result<()> {
        self.add_item_in(self.up, table, primary_key_item(columns, name))
            .await
    }

    /// Drops a primary key.
    pub async fn drop_primary_key<S: Into<String>>(
        &mut self,
        table: &str,
        columns: impl IntoIterator<Item = S>,
        name: Option<&str>,
    ) -> Result<()> {
        self.add_item_in(!self.up, table, primary_key_item(columns, name))
            .await
    }

    /// Adds a table-level check.
    pub async fn add_check(&mut self, table: &str, check: impl Into<RawSql>) -> Result<()> {
        self.add_item_in(self.up, table, table::check(check)).await
    }

    /// Drops a table-level check.
    pub async fn drop_check(&mut self, table: &str, check: impl Into<RawSql>) -> Result<()> {
        self.add_item_in(!self.up, table, table::check(check)).await
    }

    /// Adds a constraint.
    pub async fn add_constraint(&mut self, table: &str, constraint: TableConstraint) -> Result<()> {
        self.add_item_in(self.up, table, table::constraint(constraint))
            .await
    }

    /// Drops a constraint.
    pub async fn drop_constraint(
        &mut self,
        table: &str,
        constraint: TableConstraint,
    ) -> Result<()> {
        self.add_item_in(!self.up, table, table::constraint(constraint))
            .await
    }

    async fn add_item_in(&mut self, up: bool, table: &str, item: TableItem) -> Result<()> {
        self.change_table_in(up, table, ChangeTableOptions::default(), |t| {
            t.add_item(item);
            Vec::<(String, ShapeEntry)>::new()
        })
        .await
    }

    /// Renames a column.
    pub async fn rename_column(&mut self, table: &str, from: &str, to: &str) -> Result<()> {
        self.change_table_in(self.up, table, ChangeTableOptions::default(), |t| {
            [(from, t.rename(to))]
        })
        .await
    }

    // =========================================================================
    // Schemas, extensions, enums and domains
    // =========================================================================

    /// Creates a schema.
    pub async fn create_schema(&mut self, name: &str) -> Result<()> {
        self.create_schema_in(self.up, name).await
    }

    /// Drops a schema.
    pub async fn drop_schema(&mut self, name: &str) -> Result<()> {
        self.create_schema_in(!self.up, name).await
    }

    async fn create_schema_in(&mut self, up: bool, name: &str) -> Result<()> {
        let ast = SchemaAst {
            action: Action::from_direction(up),
            name: String::from(name),
        };
        let statement = migrations::schema_statement(&ast);
        self.run(vec![statement], MigrationAst::Schema(ast)).await
    }

    /// Creates an extension.
    pub async fn create_extension(&mut self, name: &str, options: ExtensionOptions) -> Result<()> {
        self.create_extension_in(self.up, name, options).await
    }

    /// Drops an extension.
    pub async fn drop_extension(&mut self, name: &str, options: ExtensionOptions) -> Result<()> {
        self.create_extension_in(!self.up, name, options).await
    }

    async fn create_extension_in(
        &mut self,
        up: bool,
        name: &str,
        options: ExtensionOptions,
    ) -> Result<()> {
        let ast = ExtensionAst {
            action: Action::from_direction(up),
            name: String::from(name),
            options,
        };
        let statement = migrations::extension_statement(&ast);
        self.run(vec![statement], MigrationAst::Extension(ast)).await
    }

    /// Creates an enum type with `values` in order.
    pub async fn create_enum<S: Into<String>>(
        &mut self,
        name: &str,
        values: impl IntoIterator<Item = S>,
        options: EnumOptions,
    ) -> Result<()> {
        self.create_enum_in(self.up, name, values, options).await
    }

    /// Drops an enum type; `values` restore it when migrating down.
    pub async fn drop_enum<S: Into<String>>(
        &mut self,
        name: &str,
        values: impl IntoIterator<Item = S>,
        options: EnumOptions,
    ) -> Result<()> {
        self.create_enum_in(!self.up, name, values, options).await
    }

    async fn create_enum_in<S: Into<String>>(
        &mut self,
        up: bool,
        name: &str,
        values: impl IntoIterator<Item = S>,
        options: EnumOptions,
    ) -> Result<()> {
        let (schema, name) = split_schema(name);
        let ast = EnumAst {
            action: Action::from_direction(up),
            schema: schema.map(String::from),
            name: String::from(name),
            values: values.into_iter().map(Into::into).collect(),
            drop_if_exists: options.drop_if_exists,
            cascade: options.cascade,
        };
        let statement = migrations::enum_statement(&ast);
        self.run(vec![statement], MigrationAst::Enum(ast)).await
    }

    /// Creates a domain over `base_type`.
    pub async fn create_domain(
        &mut self,
        name: &str,
        base_type: ColumnType,
        options: DomainOptions,
    ) -> Result<()> {
        self.create_domain_in(self.up, name, base_type, options).await
    }

    /// Drops a domain.
    pub async fn drop_domain(
        &mut self,
        name: &str,
        base_type: ColumnType,
        options: DomainOptions,
    ) -> Result<()> {
        self.create_domain_in(!self.up, name, base_type, options)
            .await
    }

    async fn create_domain_in(
        &mut self,
        up: bool,
        name: &str,
        base_type: ColumnType,
        options: DomainOptions,
    ) -> Result<()> {
        let (schema, name) = split_schema(name);
        let ast = DomainAst {
            action: Action::from_direction(up),
            schema: schema.map(String::from),
            name: String::from(name),
            base_type,
            options,
        };
        let statement = migrations::domain_statement(&ast)?;
        self.run(vec![statement], MigrationAst::Domain(ast)).await
    }

    // =========================================================================
    // Probes and raw statements
    // =========================================================================

    /// Whether `table` exists.
    pub async fn table_exists(&self, table: &str) -> Result<bool> {
        self.exists(&migrations::table_exists_sql(table)?).await
    }

    /// Whether `table` has `column`.
    pub async fn column_exists(&self, table: &str, column: &str) -> Result<bool> {
        self.exists(&migrations::column_exists_sql(table, column)?)
            .await
    }

    /// Whether a constraint named `name` exists.
    pub async fn constraint_exists(&self, name: &str) -> Result<bool> {
        self.exists(&migrations::constraint_exists_sql(name)?).await
    }

    async fn exists(&self, sql: &Sql) -> Result<bool> {
        let result = self.adapter.query(sql).await?;
        Ok(result.row_count > 0)
    }

    /// Runs `sql` through the log, returning rows as objects.
    pub async fn query(&self, sql: &Sql) -> Result<QueryResult> {
        Ok(self.adapter.query(sql).await?)
    }

    /// Runs `sql` through the log, returning rows as value tuples.
    pub async fn arrays(&self, sql: &Sql) -> Result<ArraysResult> {
        Ok(self.adapter.arrays(sql).await?)
    }

    async fn run(&mut self, statements: Vec<DdlStatement>, mut ast: MigrationAst) -> Result<()> {
        for statement in statements {
            match statement.then {
                Some(PostAction::PopulateEnum(name)) => {
                    let result = self.adapter.arrays(&statement.sql).await?;
                    let values = first_column_text(result);
                    debug!(enum_name = %name, values = values.len(), "Read enum labels");
                    ast.populate_enum(&name, &values);
                }
                None => {
                    self.adapter.query(&statement.sql).await?;
                }
            }
        }
        self.migrated_asts.push(ast);
        Ok(())
    }
}

fn primary_key_item<S: Into<String>>(
    columns: impl IntoIterator<Item = S>,
    name: Option<&str>,
) -> TableItem {
    match name {
        Some(name) => table::primary_key_named(columns, name),
        None => table::primary_key(columns),
    }
}

fn first_column_text(result: ArraysResult) -> Vec<String> {
    result
        .rows
        .into_iter()
        .filter_map(|row| row.into_iter().next())
        .filter_map(|value| value.as_str().map(String::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Instant;

    use serde_json::json;
    use sqlweave_core::migrations::types::{enum_type, integer, text};
    use sqlweave_db::{DbError, MemoryAdapter};

    use super::*;

    fn quiet() -> MigrationConfig {
        MigrationConfig {
            log: false,
            ..MigrationConfig::default()
        }
    }

    #[derive(Default)]
    struct Recorder {
        statements: Mutex<Vec<String>>,
    }

    impl QueryLog for Recorder {
        fn after_query(&self, sql: &Sql, _started: Instant) {
            self.statements.lock().unwrap().push(sql.text.clone());
        }

        fn on_error(&self, _error: &DbError, _sql: &Sql, _started: Instant) {}
    }

    #[tokio::test]
    async fn test_create_table_records_the_ast() {
        let adapter = MemoryAdapter::new();
        let mut db = Migration::new(&adapter, true, quiet());

        db.create_table("user", CreateTableOptions::default(), |_| {
            [("id", integer().primary_key()), ("name", text())]
        })
        .await
        .unwrap();

        assert!(adapter.texts()[0].starts_with("CREATE TABLE \"user\" ("));
        assert!(matches!(db.migrated_asts(), [MigrationAst::Table(t)] if t.action == Action::Create));
    }

    #[tokio::test]
    async fn test_drop_table_runs_create_backwards() {
        let adapter = MemoryAdapter::new();
        let mut db = Migration::new(&adapter, false, quiet());

        db.drop_table("user", CreateTableOptions::default(), |_| {
            [("id", integer().primary_key())]
        })
        .await
        .unwrap();

        assert!(adapter.texts()[0].starts_with("CREATE TABLE \"user\" ("));
    }

    #[tokio::test]
    async fn test_add_column_in_both_directions() {
        let adapter = MemoryAdapter::new();

        let mut up = Migration::new(&adapter, true, quiet());
        up.add_column("user", "name", text()).await.unwrap();
        let mut down = Migration::new(&adapter, false, quiet());
        down.add_column("user", "name", text()).await.unwrap();

        assert_eq!(
            adapter.texts(),
            [
                "ALTER TABLE \"user\"\n  ADD COLUMN \"name\" text",
                "ALTER TABLE \"user\"\n  DROP COLUMN \"name\"",
            ]
        );
    }

    #[tokio::test]
    async fn test_index_twins() {
        let adapter = MemoryAdapter::new();
        let mut db = Migration::new(&adapter, true, quiet());

        db.add_index("user", ["name"], IndexOptions::default()).await.unwrap();
        db.drop_index("user", ["name"], IndexOptions::default()).await.unwrap();

        assert_eq!(
            adapter.texts(),
            [
                r#"CREATE INDEX "user_name_idx" ON "user" ("name")"#,
                r#"DROP INDEX "user_name_idx""#,
            ]
        );
        assert_eq!(db.migrated_asts().len(), 2);
    }

    #[tokio::test]
    async fn test_rename_column() {
        let adapter = MemoryAdapter::new();
        let mut db = Migration::new(&adapter, true, quiet());

        db.rename_column("user", "login", "username").await.unwrap();

        assert_eq!(
            adapter.texts(),
            ["ALTER TABLE \"user\"\n  RENAME COLUMN \"login\" TO \"username\""]
        );
    }

    #[tokio::test]
    async fn test_enum_labels_land_on_the_logged_ast() {
        let adapter = MemoryAdapter::new();
        adapter.respond(["unnest"], [vec![json!("sad")], vec![json!("ok")]]);
        let mut db = Migration::new(&adapter, true, quiet());

        db.change_table("user", ChangeTableOptions::default(), |t| {
            [("mood", t.add(enum_type("mood", Vec::<String>::new())))]
        })
        .await
        .unwrap();

        let [MigrationAst::ChangeTable(ast)] = db.migrated_asts() else {
            panic!("expected one change");
        };
        let column: Vec<&ColumnType> = ast
            .items()
            .filter_map(|(_, item)| match item {
                migrations::ChangeItem::Add { column, .. } => Some(column),
                _ => None,
            })
            .collect();
        assert_eq!(column[0].enum_values, ["sad", "ok"]);
    }

    #[tokio::test]
    async fn test_create_and_drop_enum() {
        let adapter = MemoryAdapter::new();
        let mut db = Migration::new(&adapter, false, quiet());

        db.create_enum("mood", ["sad", "ok"], EnumOptions::default())
            .await
            .unwrap();
        db.drop_enum("mood", ["sad", "ok"], EnumOptions::default())
            .await
            .unwrap();

        assert_eq!(
            adapter.texts(),
            [
                r#"DROP TYPE "mood""#,
                r#"CREATE TYPE "mood" AS ENUM ('sad', 'ok')"#,
            ]
        );
    }

    #[tokio::test]
    async fn test_schema_and_extension() {
        let adapter = MemoryAdapter::new();
        let mut db = Migration::new(&adapter, true, quiet());

        db.create_schema("app").await.unwrap();
        db.drop_extension(
            "citext",
            ExtensionOptions {
                create_if_not_exists: true,
                ..ExtensionOptions::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(
            adapter.texts(),
            [r#"CREATE SCHEMA "app""#, r#"DROP EXTENSION "citext""#]
        );
    }

    #[tokio::test]
    async fn test_existence_probes_count_rows() {
        let adapter = MemoryAdapter::new();
        adapter.respond(["?column?"], [vec![json!(1)]]);
        let db = Migration::new(&adapter, true, quiet());

        assert!(db.table_exists("user").await.unwrap());
        assert!(!db.column_exists("user", "name").await.unwrap());

        let probes = adapter.statements();
        assert_eq!(probes[0].values.len(), 1);
        assert_eq!(probes[1].values.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_statement_is_not_logged_as_migrated() {
        let adapter = MemoryAdapter::new();
        adapter.fail_with(DbError::with_code("42P07", "relation already exists"));
        let mut db = Migration::new(&adapter, true, quiet());

        let err = db.create_schema("app").await.unwrap_err();

        assert!(matches!(err, crate::MigrateError::Db(_)));
        assert!(db.migrated_asts().is_empty());
    }

    #[tokio::test]
    async fn test_build_error_stops_before_the_database() {
        let adapter = MemoryAdapter::new();
        let mut db = Migration::new(&adapter, true, quiet());

        let err = db
            .create_table("tag", CreateTableOptions::default(), |_| [("name", text())])
            .await
            .unwrap_err();

        assert!(matches!(err, crate::MigrateError::Build(_)));
        assert!(adapter.statements().is_empty());
    }

    #[tokio::test]
    async fn test_custom_log_sees_migration_statements_only() {
        let adapter = MemoryAdapter::new();
        let log = Recorder::default();
        let mut db = Migration::new(&adapter, true, quiet()).with_log(&log);

        db.create_schema("app").await.unwrap();
        db.silent().query(&Sql::text("SELECT 1")).await.unwrap();

        assert_eq!(*log.statements.lock().unwrap(), [r#"CREATE SCHEMA "app""#]);
        assert_eq!(adapter.statements().len(), 2);
    }
}
