//! Compiles a [`ChangeTable`] into ordered DDL statements.
//!
//! The output order is fixed:
//!
//! 1. `COMMENT ON TABLE`, when the table comment changes.
//! 2. Enum label reads for every enum column involved.
//! 3. `ALTER TABLE .. RENAME COLUMN` statements.
//! 4. One `ALTER TABLE` with every other column and constraint change. The
//!    old primary key and dropped constraints come first, the new primary
//!    key and added constraints last.
//! 5. `DROP INDEX`, then `CREATE INDEX`.
//! 6. `COMMENT ON COLUMN`.
//! 7. Reversed renames, which run back to the key once every statement
//!    above has used the renamed column.
//!
//! Primary keys are never altered in place: column flags and table-level
//! keys are gathered first, then the old key is dropped once and the new
//! one added once.

use super::ast::{ChangeItem, ChangeTable, ChangeUsing, ColumnChange};
use super::column::{DefaultValue, DropMode, ForeignKey, IndexOptions};
use super::ddl::{
    case, column_comment_sql, column_name, column_to_sql, comment_literal, constraint_to_sql,
    create_index_sql, drop_index_sql, primary_key_sql, DdlStatement,
};
use super::table::{IndexColumn, PrimaryKey, References, TableConstraint, TableIndex};
use crate::error::Result;
use crate::quote::{quote_ident, quote_name, quote_with_schema};

#[derive(Debug, Default)]
struct PrimaryKeyChange {
    name: Option<String>,
    columns: Vec<String>,
    changed: bool,
}

#[derive(Debug, Default)]
struct AlterParts {
    lines: Vec<String>,
    renames: Vec<String>,
    reverse_renames: Vec<String>,
    add_indexes: Vec<TableIndex>,
    drop_indexes: Vec<TableIndex>,
    add_constraints: Vec<TableConstraint>,
    drop_constraints: Vec<TableConstraint>,
    comments: Vec<(String, Option<String>)>,
}

/// Compiles `ast` into the statements that apply it.
///
/// `snake_case` converts column keys and table-level column names to
/// `snake_case`.
pub fn change_table_statements(ast: &ChangeTable, snake_case: bool) -> Result<Vec<DdlStatement>> {
    let schema = ast.schema.as_deref();
    let table = quote_with_schema(schema, &ast.name);
    let mut statements = Vec::new();

    if let Some(comment) = &ast.comment {
        statements.push(DdlStatement::new(format!(
            "COMMENT ON TABLE {table} IS {}",
            comment_literal(comment.to.as_deref())
        )));
    }

    let mut add_key = PrimaryKeyChange::default();
    let mut drop_key = PrimaryKeyChange::default();
    for (key, item) in ast.items() {
        prepare_item(key, item, snake_case, &mut add_key, &mut drop_key, &mut statements);
    }

    if let Some(key) = &ast.add.primary_key {
        add_key.name.clone_from(&key.name);
        add_key.columns.extend(key.columns.iter().map(|c| case(c, snake_case)));
    }
    if let Some(key) = &ast.drop.primary_key {
        drop_key.name.clone_from(&key.name);
        drop_key.columns.extend(key.columns.iter().map(|c| case(c, snake_case)));
    }

    let mut parts = AlterParts {
        add_indexes: ast.add.indexes.clone(),
        drop_indexes: ast.drop.indexes.clone(),
        add_constraints: ast.add.constraints.clone(),
        drop_constraints: ast.drop.constraints.clone(),
        ..AlterParts::default()
    };

    let composite_key = add_key.columns.len() > 1;
    for (key, item) in ast.items() {
        item_changes(ast, key, item, composite_key, snake_case, &mut parts)?;
    }

    let mut lines = Vec::new();
    if ast.drop.primary_key.is_some() || drop_key.changed || drop_key.columns.len() > 1 {
        let name = drop_key
            .name
            .clone()
            .unwrap_or_else(|| format!("{}_pkey", ast.name));
        lines.push(format!("DROP CONSTRAINT {}", quote_ident(&name)));
    }
    for constraint in &parts.drop_constraints {
        lines.push(format!(
            "DROP {}",
            constraint_to_sql(&ast.name, false, constraint, snake_case)?
        ));
    }
    lines.append(&mut parts.lines);

    if ast.add.primary_key.is_some() || add_key.changed || add_key.columns.len() > 1 {
        let mut columns: Vec<String> = Vec::with_capacity(add_key.columns.len());
        for column in add_key.columns {
            if !columns.contains(&column) {
                columns.push(column);
            }
        }
        let key = PrimaryKey {
            columns,
            name: Some(
                add_key
                    .name
                    .unwrap_or_else(|| format!("{}_pkey", ast.name)),
            ),
        };
        // Key columns were already resolved to their SQL names.
        lines.push(format!("ADD {}", primary_key_sql(&key, false)));
    }
    for constraint in &parts.add_constraints {
        lines.push(format!(
            "ADD {}",
            constraint_to_sql(&ast.name, true, constraint, snake_case)?
        ));
    }

    if !parts.renames.is_empty() {
        statements.push(alter_table(&table, &parts.renames));
    }
    if !lines.is_empty() {
        statements.push(alter_table(&table, &lines));
    }

    for index in &parts.drop_indexes {
        statements.push(DdlStatement::new(drop_index_sql(
            schema, &ast.name, index, snake_case,
        )));
    }
    for index in &parts.add_indexes {
        statements.push(DdlStatement::new(create_index_sql(
            schema, &ast.name, index, snake_case,
        )));
    }

    for (column, comment) in &parts.comments {
        statements.push(DdlStatement::new(column_comment_sql(
            schema,
            &ast.name,
            column,
            comment.as_deref(),
        )));
    }

    if !parts.reverse_renames.is_empty() {
        statements.push(alter_table(&table, &parts.reverse_renames));
    }

    Ok(statements)
}

fn alter_table(table: &str, lines: &[String]) -> DdlStatement {
    DdlStatement::new(format!("ALTER TABLE {table}\n  {}", lines.join(",\n  ")))
}

/// Enum label reads and primary key bookkeeping for one item.
fn prepare_item(
    key: &str,
    item: &ChangeItem,
    snake_case: bool,
    add_key: &mut PrimaryKeyChange,
    drop_key: &mut PrimaryKeyChange,
    statements: &mut Vec<DdlStatement>,
) {
    match item {
        ChangeItem::Add { column, .. } | ChangeItem::Drop { column, .. } => {
            if let Some(name) = &column.enum_name {
                statements.push(DdlStatement::populate_enum(name));
            }
            if column.primary_key {
                let target = if matches!(item, ChangeItem::Add { .. }) {
                    add_key
                } else {
                    drop_key
                };
                target
                    .columns
                    .push(column_name(Some(column), key, snake_case));
            }
        }
        ChangeItem::Change { name, from, to, .. } => {
            for side in [from, to] {
                if let Some(enum_name) = side.column.as_ref().and_then(|c| c.enum_name.as_ref()) {
                    statements.push(DdlStatement::populate_enum(enum_name));
                }
            }

            if from.primary_key {
                drop_key
                    .columns
                    .push(change_column_name(name.as_deref(), from, key, snake_case));
                drop_key.changed = true;
            }
            if to.primary_key {
                add_key
                    .columns
                    .push(change_column_name(name.as_deref(), to, key, snake_case));
                add_key.changed = true;
            }
        }
        ChangeItem::Rename { .. } => {}
    }
}

fn change_column_name(
    name: Option<&str>,
    side: &ColumnChange,
    key: &str,
    snake_case: bool,
) -> String {
    name.map_or_else(
        || column_name(side.column.as_ref(), key, snake_case),
        String::from,
    )
}

fn item_changes(
    ast: &ChangeTable,
    key: &str,
    item: &ChangeItem,
    composite_key: bool,
    snake_case: bool,
    parts: &mut AlterParts,
) -> Result<()> {
    match item {
        ChangeItem::Add { column, .. } => {
            let name = column_name(Some(column), key, snake_case);
            parts.lines.push(format!(
                "ADD COLUMN {}",
                column_to_sql(&name, column, composite_key, snake_case)?
            ));
            column_indexes(&mut parts.add_indexes, &name, &column.indexes);
            if column.comment.is_some() {
                parts.comments.push((name, column.comment.clone()));
            }
        }
        ChangeItem::Drop { column, drop_mode } => {
            let name = column_name(Some(column), key, snake_case);
            parts.lines.push(drop_column(&name, *drop_mode));
        }
        ChangeItem::Change {
            name,
            from,
            to,
            using,
        } => column_change(ast, key, name.as_deref(), from, to, using, snake_case, parts)?,
        ChangeItem::Rename { name, reverse } => {
            let key = quote_ident(&case(key, snake_case));
            let name = quote_ident(&case(name, snake_case));
            if *reverse {
                parts
                    .reverse_renames
                    .push(format!("RENAME COLUMN {name} TO {key}"));
            } else {
                parts.renames.push(format!("RENAME COLUMN {key} TO {name}"));
            }
        }
    }
    Ok(())
}

fn drop_column(name: &str, mode: Option<DropMode>) -> String {
    match mode {
        Some(mode) => format!("DROP COLUMN {} {}", quote_ident(name), mode.as_sql()),
        None => format!("DROP COLUMN {}", quote_ident(name)),
    }
}

fn column_indexes(target: &mut Vec<TableIndex>, name: &str, indexes: &[IndexOptions]) {
    for options in indexes {
        target.push(TableIndex {
            columns: vec![IndexColumn {
                column: String::from(name),
                expression: false,
                collate: options.collate.clone(),
                opclass: options.opclass.clone(),
                order: options.order.clone(),
            }],
            options: options.clone(),
        });
    }
}

#[allow(clippy::too_many_arguments)]
fn column_change(
    ast: &ChangeTable,
    key: &str,
    explicit_name: Option<&str>,
    from: &ColumnChange,
    to: &ColumnChange,
    using: &ChangeUsing,
    snake_case: bool,
    parts: &mut AlterParts,
) -> Result<()> {
    let from_name = change_column_name(explicit_name, from, key, snake_case);
    let name = change_column_name(explicit_name, to, key, snake_case);
    if from_name != name {
        parts.renames.push(format!(
            "RENAME COLUMN {} TO {}",
            quote_ident(&from_name),
            quote_ident(&name)
        ));
    }
    let column = quote_ident(&name);
    let lines = &mut parts.lines;

    let type_changed = match &to.data_type {
        Some(data_type) => {
            from.data_type.as_ref() != Some(data_type) || from.collate != to.collate
        }
        None => false,
    };
    if let Some(data_type) = to.data_type.as_ref().filter(|_| type_changed) {
        let quoted = match &to.column {
            Some(column) => column.custom,
            None => true,
        };
        let target_type = if quoted {
            quote_name(data_type)
        } else {
            data_type.clone()
        };
        let mut line = format!("ALTER COLUMN {column} TYPE {target_type}");
        if let Some(collate) = &to.collate {
            line.push_str(" COLLATE ");
            line.push_str(&quote_ident(collate));
        }
        if let Some(cast) = &using.using_up {
            line.push_str(" USING ");
            line.push_str(&cast.render_inline()?);
        } else if to.is_enum() {
            line.push_str(&format!(" USING {column}::text::{target_type}"));
        }
        lines.push(line);
    }

    if from.identity != to.identity {
        if from.identity.is_some() {
            lines.push(format!("ALTER COLUMN {column} DROP IDENTITY"));
        }
        if let Some(identity) = &to.identity {
            lines.push(format!("ALTER COLUMN {column} ADD {}", identity.to_sql()));
        }
    }

    if from.default != to.default {
        match to
            .default
            .as_ref()
            .filter(|default| !matches!(default, DefaultValue::Null))
        {
            Some(default) => {
                if type_changed {
                    lines.push(format!("ALTER COLUMN {column} DROP DEFAULT"));
                }
                lines.push(format!("ALTER COLUMN {column} SET DEFAULT {}", default.to_sql()?));
            }
            None => lines.push(format!("ALTER COLUMN {column} DROP DEFAULT")),
        }
    }

    if from.nullable != to.nullable {
        let action = if to.nullable == Some(true) { "DROP" } else { "SET" };
        lines.push(format!("ALTER COLUMN {column} {action} NOT NULL"));
    }

    if from.compression != to.compression {
        lines.push(format!(
            "ALTER COLUMN {column} SET COMPRESSION {}",
            to.compression.as_deref().unwrap_or("DEFAULT")
        ));
    }

    if from.check != to.check {
        let check_name = quote_ident(&format!("{}_{name}_check", ast.name));
        if from.check.is_some() {
            lines.push(format!("DROP CONSTRAINT {check_name}"));
        }
        if let Some(check) = &to.check {
            lines.push(format!(
                "ADD CONSTRAINT {check_name}\n    CHECK ({})",
                check.render_inline()?
            ));
        }
    }

    for i in 0..from.foreign_keys.len().max(to.foreign_keys.len()) {
        let (old, new) = (from.foreign_keys.get(i), to.foreign_keys.get(i));
        if old == new {
            continue;
        }
        if let Some(old) = old {
            parts.drop_constraints.push(column_constraint(&name, old));
        }
        if let Some(new) = new {
            parts.add_constraints.push(column_constraint(&name, new));
        }
    }

    for i in 0..from.indexes.len().max(to.indexes.len()) {
        let (old, new) = (from.indexes.get(i), to.indexes.get(i));
        if old == new {
            continue;
        }
        if let Some(old) = old {
            column_indexes(&mut parts.drop_indexes, &name, std::slice::from_ref(old));
        }
        if let Some(new) = new {
            column_indexes(&mut parts.add_indexes, &name, std::slice::from_ref(new));
        }
    }

    if from.comment != to.comment {
        parts.comments.push((name, to.comment.clone()));
    }

    Ok(())
}

/// A column-level foreign key as a table constraint on `column`.
fn column_constraint(column: &str, foreign_key: &ForeignKey) -> TableConstraint {
    TableConstraint {
        name: foreign_key.options.name.clone(),
        references: Some(References {
            columns: vec![String::from(column)],
            table: foreign_key.table.clone(),
            foreign_columns: foreign_key.columns.clone(),
            options: foreign_key.options.clone(),
        }),
        check: None,
        drop_mode: foreign_key.options.drop_mode,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::ast::{CommentChange, ShapeItem};
    use crate::migrations::column::Identity;
    use crate::migrations::types::{integer, text};
    use crate::raw::raw;

    fn compile(ast: &ChangeTable) -> Vec<String> {
        change_table_statements(ast, false)
            .unwrap()
            .into_iter()
            .map(|s| s.sql.text)
            .collect()
    }

    fn one_change(key: &str, from: ColumnChange, to: ColumnChange) -> ChangeTable {
        let mut ast = ChangeTable::new(None, "user");
        ast.shape.insert(
            String::from(key),
            ShapeItem::One(ChangeItem::Change {
                name: None,
                from: Box::new(from),
                to: Box::new(to),
                using: ChangeUsing::default(),
            }),
        );
        ast
    }

    #[test]
    fn test_table_comment_comes_first() {
        let mut ast = one_change(
            "name",
            ColumnChange::new().nullable(true),
            ColumnChange::new().nullable(false),
        );
        ast.comment = Some(CommentChange::set("people"));
        assert_eq!(
            compile(&ast),
            [
                r#"COMMENT ON TABLE "user" IS 'people'"#,
                "ALTER TABLE \"user\"\n  ALTER COLUMN \"name\" SET NOT NULL",
            ]
        );
    }

    #[test]
    fn test_default_is_dropped_before_type_change() {
        let ast = one_change("age", text().into(), integer().default(0).into());
        assert_eq!(
            compile(&ast),
            ["ALTER TABLE \"user\"\n  ALTER COLUMN \"age\" TYPE integer,\n  ALTER COLUMN \"age\" DROP DEFAULT,\n  ALTER COLUMN \"age\" SET DEFAULT 0"]
        );
    }

    #[test]
    fn test_null_default_is_dropped() {
        let ast = one_change(
            "age",
            ColumnChange::new().default(0),
            ColumnChange::new().default(DefaultValue::Null),
        );
        assert_eq!(
            compile(&ast),
            ["ALTER TABLE \"user\"\n  ALTER COLUMN \"age\" DROP DEFAULT"]
        );
    }

    #[test]
    fn test_bare_type_name_is_quoted() {
        let ast = one_change(
            "status",
            ColumnChange::new().data_type("text"),
            ColumnChange::new().data_type("app.status"),
        );
        assert_eq!(
            compile(&ast),
            ["ALTER TABLE \"user\"\n  ALTER COLUMN \"status\" TYPE \"app\".\"status\""]
        );
    }

    #[test]
    fn test_identity_change() {
        let ast = one_change(
            "id",
            ColumnChange {
                identity: Some(Identity::by_default()),
                ..<ColumnChange as Default>::default()
            },
            ColumnChange {
                identity: Some(Identity::always()),
                ..<ColumnChange as Default>::default()
            },
        );
        assert_eq!(
            compile(&ast),
            ["ALTER TABLE \"user\"\n  ALTER COLUMN \"id\" DROP IDENTITY,\n  ALTER COLUMN \"id\" ADD GENERATED ALWAYS AS IDENTITY"]
        );
    }

    #[test]
    fn test_check_change_uses_derived_name() {
        let ast = one_change(
            "age",
            ColumnChange::new().check(raw("age > 0")),
            ColumnChange::new().check(raw("age > 1")),
        );
        assert_eq!(
            compile(&ast),
            ["ALTER TABLE \"user\"\n  DROP CONSTRAINT \"user_age_check\",\n  ADD CONSTRAINT \"user_age_check\"\n    CHECK (age > 1)"]
        );
    }

    #[test]
    fn test_rename_is_a_separate_statement() {
        let mut ast = one_change(
            "name",
            ColumnChange::new().nullable(true),
            ColumnChange::new().nullable(false),
        );
        ast.shape.insert(
            String::from("login"),
            ShapeItem::One(ChangeItem::Rename {
                name: String::from("username"),
                reverse: false,
            }),
        );
        assert_eq!(
            compile(&ast),
            [
                "ALTER TABLE \"user\"\n  RENAME COLUMN \"login\" TO \"username\"",
                "ALTER TABLE \"user\"\n  ALTER COLUMN \"name\" SET NOT NULL",
            ]
        );
    }

    #[test]
    fn test_comment_change_is_trailing() {
        let ast = one_change(
            "name",
            ColumnChange::new(),
            ColumnChange::new().comment("display name"),
        );
        assert_eq!(
            compile(&ast),
            [r#"COMMENT ON COLUMN "user"."name" IS 'display name'"#]
        );
    }

    #[test]
    fn test_snake_case_keys() {
        let ast = one_change(
            "firstName",
            ColumnChange::new().nullable(true),
            ColumnChange::new().nullable(false),
        );
        let statements = change_table_statements(&ast, true).unwrap();
        assert_eq!(
            statements[0].sql.text,
            "ALTER TABLE \"user\"\n  ALTER COLUMN \"first_name\" SET NOT NULL"
        );
    }
}
