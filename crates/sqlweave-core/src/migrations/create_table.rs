//! `CREATE TABLE` and `DROP TABLE`.

use indexmap::IndexMap;

use super::ast::{Action, CreateTable, NoPrimaryKey};
use super::column::{ColumnType, DropMode};
use super::ddl::{
    case, column_comment_sql, column_name, column_to_sql, comment_literal, constraint_to_sql,
    create_index_sql, primary_key_sql, DdlStatement,
};
use super::table::{IndexColumn, PrimaryKey, TableData, TableIndex};
use crate::error::{BuildError, Result};
use crate::quote::{quote_with_schema, split_schema};

/// Options of a created table.
#[derive(Debug, Clone, Default)]
pub struct CreateTableOptions {
    /// Table comment.
    pub comment: Option<String>,
    /// What to do without a primary key.
    pub no_primary_key: NoPrimaryKey,
    /// Drop mode used when the table is dropped.
    pub drop_mode: Option<DropMode>,
}

/// Describes a table from its keyed columns.
///
/// `build` may also add table-level items to the given [`TableData`].
/// With `up` false the description drops the table instead.
pub fn create_table<F, I, K>(
    table: &str,
    options: CreateTableOptions,
    up: bool,
    build: F,
) -> CreateTable
where
    F: FnOnce(&mut TableData) -> I,
    I: IntoIterator<Item = (K, ColumnType)>,
    K: Into<String>,
{
    let mut data = TableData::default();
    let shape: IndexMap<String, ColumnType> = build(&mut data)
        .into_iter()
        .map(|(key, column)| (key.into(), column))
        .collect();
    let (schema, name) = split_schema(table);

    CreateTable {
        action: Action::from_direction(up),
        schema: schema.map(String::from),
        name: String::from(name),
        shape,
        data,
        comment: options.comment,
        no_primary_key: options.no_primary_key,
        drop_mode: options.drop_mode,
    }
}

impl CreateTable {
    /// SQL names of the primary key columns, from column flags and the
    /// table-level key.
    #[must_use]
    pub fn primary_key_columns(&self, snake_case: bool) -> Vec<String> {
        let mut columns: Vec<String> = self
            .shape
            .iter()
            .filter(|(_, column)| column.primary_key)
            .map(|(key, column)| column_name(Some(column), key, snake_case))
            .collect();
        if let Some(key) = &self.data.primary_key {
            for column in &key.columns {
                let column = case(column, snake_case);
                if !columns.contains(&column) {
                    columns.push(column);
                }
            }
        }
        columns
    }
}

/// Compiles `ast` into the statements that create or drop the table.
pub fn create_table_statements(ast: &CreateTable, snake_case: bool) -> Result<Vec<DdlStatement>> {
    let schema = ast.schema.as_deref();
    let table = quote_with_schema(schema, &ast.name);

    if ast.action == Action::Drop {
        let mut sql = format!("DROP TABLE {table}");
        if let Some(mode) = ast.drop_mode {
            sql.push(' ');
            sql.push_str(mode.as_sql());
        }
        return Ok(vec![DdlStatement::new(sql)]);
    }

    let key_columns = ast.primary_key_columns(snake_case);
    if key_columns.is_empty() && ast.no_primary_key == NoPrimaryKey::Error {
        return Err(BuildError::NoPrimaryKey(ast.name.clone()));
    }
    let composite_key = key_columns.len() > 1;

    let mut statements: Vec<DdlStatement> = ast
        .shape
        .values()
        .filter_map(|column| column.enum_name.as_deref())
        .map(DdlStatement::populate_enum)
        .collect();

    let mut lines = Vec::new();
    let mut indexes = ast.data.indexes.clone();
    let mut comments = Vec::new();
    for (key, column) in &ast.shape {
        let name = column_name(Some(column), key, snake_case);
        lines.push(column_to_sql(&name, column, composite_key, snake_case)?);
        for options in &column.indexes {
            indexes.push(TableIndex {
                columns: vec![IndexColumn {
                    column: name.clone(),
                    expression: false,
                    collate: options.collate.clone(),
                    opclass: options.opclass.clone(),
                    order: options.order.clone(),
                }],
                options: options.clone(),
            });
        }
        if let Some(comment) = &column.comment {
            comments.push((name, comment.clone()));
        }
    }

    let inline_key = !composite_key && ast.shape.values().any(|c| c.primary_key);
    if !key_columns.is_empty() && !inline_key {
        let key = PrimaryKey {
            columns: key_columns,
            name: ast.data.primary_key.as_ref().and_then(|k| k.name.clone()),
        };
        lines.push(primary_key_sql(&key, false));
    }
    for constraint in &ast.data.constraints {
        lines.push(constraint_to_sql(&ast.name, true, constraint, snake_case)?);
    }

    let body: Vec<String> = lines.iter().map(|line| format!("    {line}")).collect();
    statements.push(DdlStatement::new(format!(
        "CREATE TABLE {table} (\n{}\n)",
        body.join(",\n")
    )));

    for index in &indexes {
        statements.push(DdlStatement::new(create_index_sql(
            schema, &ast.name, index, snake_case,
        )));
    }
    if let Some(comment) = &ast.comment {
        statements.push(DdlStatement::new(format!(
            "COMMENT ON TABLE {table} IS {}",
            comment_literal(Some(comment))
        )));
    }
    for (column, comment) in &comments {
        statements.push(DdlStatement::new(column_comment_sql(
            schema,
            &ast.name,
            column,
            Some(comment),
        )));
    }

    Ok(statements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::table::{primary_key, unique_index};
    use crate::migrations::types::{identity, integer, text, timestamps};

    fn texts(statements: Vec<DdlStatement>) -> Vec<String> {
        statements.into_iter().map(|s| s.sql.text).collect()
    }

    #[test]
    fn test_create_table() {
        let ast = create_table("user", CreateTableOptions::default(), true, |_| {
            let mut columns = vec![
                (String::from("id"), identity().primary_key()),
                (String::from("name"), text().not_null().comment("display name")),
            ];
            columns.extend(timestamps());
            columns
        });

        assert_eq!(
            texts(create_table_statements(&ast, false).unwrap()),
            [
                "CREATE TABLE \"user\" (\n    \"id\" integer GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,\n    \"name\" text NOT NULL,\n    \"created_at\" timestamptz NOT NULL DEFAULT now(),\n    \"updated_at\" timestamptz NOT NULL DEFAULT now()\n)",
                r#"COMMENT ON COLUMN "user"."name" IS 'display name'"#,
            ]
        );
    }

    #[test]
    fn test_composite_primary_key_and_index() {
        let ast = create_table("app.membership", CreateTableOptions::default(), true, |t| {
            t.push(primary_key(["userId", "groupId"]));
            t.push(unique_index(["groupId"]));
            [("userId", integer()), ("groupId", integer())]
        });

        assert_eq!(
            texts(create_table_statements(&ast, true).unwrap()),
            [
                "CREATE TABLE \"app\".\"membership\" (\n    \"user_id\" integer,\n    \"group_id\" integer,\n    PRIMARY KEY (\"user_id\", \"group_id\")\n)",
                r#"CREATE UNIQUE INDEX "membership_group_id_idx" ON "app"."membership" ("group_id")"#,
            ]
        );
    }

    #[test]
    fn test_missing_primary_key() {
        let build = |_: &mut TableData| [("name", text())];

        let ast = create_table("tag", CreateTableOptions::default(), true, build);
        assert_eq!(
            create_table_statements(&ast, false).unwrap_err(),
            BuildError::NoPrimaryKey(String::from("tag"))
        );

        let options = CreateTableOptions {
            no_primary_key: NoPrimaryKey::Ignore,
            ..CreateTableOptions::default()
        };
        let ast = create_table("tag", options, true, build);
        assert!(create_table_statements(&ast, false).is_ok());
    }

    #[test]
    fn test_drop_table() {
        let options = CreateTableOptions {
            drop_mode: Some(DropMode::Cascade),
            ..CreateTableOptions::default()
        };
        let ast = create_table("user", options, false, |_| [("id", integer().primary_key())]);
        assert_eq!(
            texts(create_table_statements(&ast, false).unwrap()),
            [r#"DROP TABLE "user" CASCADE"#]
        );
    }
}
