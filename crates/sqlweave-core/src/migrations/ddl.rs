//! DDL fragments shared by the table compilers.
//!
//! DDL does not accept bound parameters, so every value here is inlined
//! as a literal.

use super::column::{ColumnType, ForeignKey, ForeignKeyOptions};
use super::table::{IndexColumn, PrimaryKey, TableConstraint, TableIndex};
use crate::error::Result;
use crate::quote::{quote_ident, quote_name, quote_with_schema, to_snake_case};
use crate::raw::Sql;
use crate::value::quote_literal;

/// Work the driver does after running a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostAction {
    /// The statement returns the labels of enum type `name`; record them on
    /// the logged AST.
    PopulateEnum(String),
}

/// One compiled DDL statement.
#[derive(Debug, Clone, PartialEq)]
pub struct DdlStatement {
    /// SQL to run.
    pub sql: Sql,
    /// Follow-up work with the statement's result.
    pub then: Option<PostAction>,
}

impl DdlStatement {
    /// A statement without follow-up work.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            sql: Sql::text(text),
            then: None,
        }
    }

    /// Reads the labels of enum type `name`.
    #[must_use]
    pub fn populate_enum(name: &str) -> Self {
        Self {
            sql: Sql::text(format!(
                "SELECT unnest(enum_range(NULL::{}))::text",
                quote_name(name)
            )),
            then: Some(PostAction::PopulateEnum(String::from(name))),
        }
    }
}

/// Resolves a column's SQL name: explicit name, else the (snake-cased) key.
pub(crate) fn column_name(column: Option<&ColumnType>, key: &str, snake_case: bool) -> String {
    column
        .and_then(|c| c.name.clone())
        .unwrap_or_else(|| case(key, snake_case))
}

pub(crate) fn case(name: &str, snake_case: bool) -> String {
    if snake_case {
        to_snake_case(name)
    } else {
        String::from(name)
    }
}

fn column_list(columns: &[String], snake_case: bool) -> String {
    let quoted: Vec<String> = columns
        .iter()
        .map(|c| quote_ident(&case(c, snake_case)))
        .collect();
    quoted.join(", ")
}

/// The type as written in DDL; user-defined types are quoted.
pub(crate) fn type_sql(column: &ColumnType) -> String {
    if column.custom {
        quote_name(&column.data_type)
    } else {
        column.data_type.clone()
    }
}

/// `"name" type ...` as used by `ADD COLUMN` and `CREATE TABLE`.
///
/// When the table has a composite primary key the column gets `NOT NULL`
/// and the key is declared separately.
pub(crate) fn column_to_sql(
    name: &str,
    column: &ColumnType,
    composite_primary_key: bool,
    snake_case: bool,
) -> Result<String> {
    let mut sql = format!("{} {}", quote_ident(name), type_sql(column));

    if let Some(compression) = &column.compression {
        sql.push_str(" COMPRESSION ");
        sql.push_str(compression);
    }
    if let Some(collate) = &column.collate {
        sql.push_str(" COLLATE ");
        sql.push_str(&quote_ident(collate));
    }
    if let Some(identity) = &column.identity {
        sql.push(' ');
        sql.push_str(&identity.to_sql());
    }

    if column.primary_key && !composite_primary_key {
        sql.push_str(" PRIMARY KEY");
    } else if !column.nullable {
        sql.push_str(" NOT NULL");
    }

    if let Some(check) = &column.check {
        sql.push_str(&format!(" CHECK ({})", check.render_inline()?));
    }
    if let Some(default) = &column.default {
        sql.push_str(" DEFAULT ");
        sql.push_str(&default.to_sql()?);
    }

    for foreign_key in &column.foreign_keys {
        sql.push(' ');
        sql.push_str(&column_reference(foreign_key, snake_case));
    }

    Ok(sql)
}

fn column_reference(foreign_key: &ForeignKey, snake_case: bool) -> String {
    let references = references_sql(
        &foreign_key.table,
        &foreign_key.columns,
        &foreign_key.options,
        snake_case,
    );
    match &foreign_key.options.name {
        Some(name) => format!("CONSTRAINT {} {references}", quote_ident(name)),
        None => references,
    }
}

/// `REFERENCES table(columns) [MATCH ..] [ON DELETE ..] [ON UPDATE ..]`.
fn references_sql(
    table: &str,
    foreign_columns: &[String],
    options: &ForeignKeyOptions,
    snake_case: bool,
) -> String {
    let mut sql = format!(
        "REFERENCES {}({})",
        quote_name(table),
        column_list(foreign_columns, snake_case)
    );
    if let Some(mode) = options.match_mode {
        sql.push_str(" MATCH ");
        sql.push_str(mode.as_sql());
    }
    if let Some(action) = options.on_delete {
        sql.push_str(" ON DELETE ");
        sql.push_str(action.as_sql());
    }
    if let Some(action) = options.on_update {
        sql.push_str(" ON UPDATE ");
        sql.push_str(action.as_sql());
    }
    sql
}

/// Name of a constraint; derived from the table and columns when unset.
pub(crate) fn constraint_name(table: &str, constraint: &TableConstraint, snake_case: bool) -> String {
    if let Some(name) = &constraint.name {
        return name.clone();
    }
    match &constraint.references {
        Some(references) => {
            let columns: Vec<String> = references
                .columns
                .iter()
                .map(|c| case(c, snake_case))
                .collect();
            format!("{table}_{}_fkey", columns.join("_"))
        }
        None => format!("{table}_check"),
    }
}

/// `CONSTRAINT "name" ..` for adding, or `CONSTRAINT "name" [mode]` for
/// dropping.
pub(crate) fn constraint_to_sql(
    table: &str,
    add: bool,
    constraint: &TableConstraint,
    snake_case: bool,
) -> Result<String> {
    let mut sql = format!(
        "CONSTRAINT {}",
        quote_ident(&constraint_name(table, constraint, snake_case))
    );

    if !add {
        if let Some(mode) = constraint.drop_mode {
            sql.push(' ');
            sql.push_str(mode.as_sql());
        }
        return Ok(sql);
    }

    if let Some(references) = &constraint.references {
        sql.push_str(&format!(
            " FOREIGN KEY ({}) {}",
            column_list(&references.columns, snake_case),
            references_sql(
                &references.table,
                &references.foreign_columns,
                &references.options,
                snake_case,
            )
        ));
    }
    if let Some(check) = &constraint.check {
        sql.push_str(&format!(" CHECK ({})", check.render_inline()?));
    }
    Ok(sql)
}

/// `[CONSTRAINT "name" ]PRIMARY KEY ("a", "b")`.
pub(crate) fn primary_key_sql(key: &PrimaryKey, snake_case: bool) -> String {
    let columns = column_list(&key.columns, snake_case);
    match &key.name {
        Some(name) => format!("CONSTRAINT {} PRIMARY KEY ({columns})", quote_ident(name)),
        None => format!("PRIMARY KEY ({columns})"),
    }
}

/// Name of an index; derived from the table and columns when unset.
pub(crate) fn index_name(table: &str, index: &TableIndex, snake_case: bool) -> String {
    if let Some(name) = &index.options.name {
        return name.clone();
    }
    let columns: Vec<String> = index
        .columns
        .iter()
        .map(|c| {
            if c.expression {
                String::from("expression")
            } else {
                case(&c.column, snake_case)
            }
        })
        .collect();
    format!("{table}_{}_idx", columns.join("_"))
}

fn index_column_sql(column: &IndexColumn, snake_case: bool) -> String {
    let mut sql = if column.expression {
        format!("({})", column.column)
    } else {
        quote_ident(&case(&column.column, snake_case))
    };
    if let Some(collate) = &column.collate {
        sql.push_str(" COLLATE ");
        sql.push_str(&quote_ident(collate));
    }
    if let Some(opclass) = &column.opclass {
        sql.push(' ');
        sql.push_str(opclass);
    }
    if let Some(order) = &column.order {
        sql.push(' ');
        sql.push_str(order);
    }
    sql
}

/// `CREATE [UNIQUE] INDEX ..`.
pub(crate) fn create_index_sql(
    schema: Option<&str>,
    table: &str,
    index: &TableIndex,
    snake_case: bool,
) -> String {
    let options = &index.options;
    let mut sql = String::from("CREATE ");
    if options.unique {
        sql.push_str("UNIQUE ");
    }
    sql.push_str(&format!(
        "INDEX {} ON {}",
        quote_ident(&index_name(table, index, snake_case)),
        quote_with_schema(schema, table)
    ));
    if let Some(using) = &options.using {
        sql.push_str(" USING ");
        sql.push_str(using);
    }

    let columns: Vec<String> = index
        .columns
        .iter()
        .map(|c| index_column_sql(c, snake_case))
        .collect();
    sql.push_str(&format!(" ({})", columns.join(", ")));

    if !options.include.is_empty() {
        sql.push_str(&format!(" INCLUDE ({})", column_list(&options.include, snake_case)));
    }
    if options.nulls_not_distinct {
        sql.push_str(" NULLS NOT DISTINCT");
    }
    if let Some(with) = &options.with {
        sql.push_str(&format!(" WITH ({with})"));
    }
    if let Some(tablespace) = &options.tablespace {
        sql.push_str(" TABLESPACE ");
        sql.push_str(&quote_ident(tablespace));
    }
    if let Some(filter) = &options.filter {
        sql.push_str(" WHERE ");
        sql.push_str(filter);
    }
    sql
}

/// `DROP INDEX "name" [mode]`.
pub(crate) fn drop_index_sql(
    schema: Option<&str>,
    table: &str,
    index: &TableIndex,
    snake_case: bool,
) -> String {
    let mut sql = format!(
        "DROP INDEX {}",
        quote_with_schema(schema, &index_name(table, index, snake_case))
    );
    if let Some(mode) = index.options.drop_mode {
        sql.push(' ');
        sql.push_str(mode.as_sql());
    }
    sql
}

/// A literal for `COMMENT ON .. IS`, or `NULL` to remove the comment.
pub(crate) fn comment_literal(comment: Option<&str>) -> String {
    comment.map_or_else(|| String::from("NULL"), quote_literal)
}

/// `COMMENT ON COLUMN table."column" IS ..`.
pub(crate) fn column_comment_sql(
    schema: Option<&str>,
    table: &str,
    column: &str,
    comment: Option<&str>,
) -> String {
    format!(
        "COMMENT ON COLUMN {}.{} IS {}",
        quote_with_schema(schema, table),
        quote_ident(column),
        comment_literal(comment)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::column::{ForeignKeyAction, IndexOptions};
    use crate::migrations::table::References;
    use crate::migrations::types::{enum_type, integer, text};
    use crate::raw::raw;

    #[test]
    fn test_column_to_sql() {
        let column = text().not_null().collate("C").default("x");
        assert_eq!(
            column_to_sql("name", &column, false, false).unwrap(),
            r#""name" text COLLATE "C" NOT NULL DEFAULT 'x'"#
        );
    }

    #[test]
    fn test_column_to_sql_primary_key() {
        let column = integer().primary_key();
        assert_eq!(
            column_to_sql("id", &column, false, false).unwrap(),
            r#""id" integer PRIMARY KEY"#
        );
        assert_eq!(
            column_to_sql("id", &column, true, false).unwrap(),
            r#""id" integer NOT NULL"#
        );
    }

    #[test]
    fn test_column_to_sql_references() {
        let column = integer().foreign_key_with(
            "app.user",
            "id",
            ForeignKeyOptions::new().on_delete(ForeignKeyAction::Cascade),
        );
        assert_eq!(
            column_to_sql("authorId", &column, false, false).unwrap(),
            r#""authorId" integer REFERENCES "app"."user"("id") ON DELETE CASCADE"#
        );
    }

    #[test]
    fn test_enum_column_type_is_quoted() {
        let column = enum_type("mood", ["sad"]);
        assert_eq!(
            column_to_sql("mood", &column, false, false).unwrap(),
            r#""mood" "mood""#
        );
    }

    #[test]
    fn test_constraint_to_sql() {
        let constraint = TableConstraint {
            name: None,
            references: Some(References {
                columns: vec![String::from("authorId")],
                table: String::from("user"),
                foreign_columns: vec![String::from("id")],
                options: ForeignKeyOptions::default(),
            }),
            check: Some(raw("\"authorId\" > 0")),
            drop_mode: None,
        };
        assert_eq!(
            constraint_to_sql("post", true, &constraint, true).unwrap(),
            r#"CONSTRAINT "post_author_id_fkey" FOREIGN KEY ("author_id") REFERENCES "user"("id") CHECK ("authorId" > 0)"#
        );
        assert_eq!(
            constraint_to_sql("post", false, &constraint, true).unwrap(),
            r#"CONSTRAINT "post_author_id_fkey""#
        );
    }

    #[test]
    fn test_create_and_drop_index() {
        let index = TableIndex {
            columns: vec![IndexColumn::name("email"), IndexColumn::expression("lower(name)")],
            options: IndexOptions::new().unique().include(["id"]).filter("active"),
        };
        assert_eq!(
            create_index_sql(None, "user", &index, false),
            r#"CREATE UNIQUE INDEX "user_email_expression_idx" ON "user" ("email", (lower(name))) INCLUDE ("id") WHERE active"#
        );
        assert_eq!(
            drop_index_sql(Some("app"), "user", &index, false),
            r#"DROP INDEX "app"."user_email_expression_idx""#
        );
    }

    #[test]
    fn test_populate_enum_statement() {
        let statement = DdlStatement::populate_enum("app.mood");
        assert_eq!(
            statement.sql.text,
            r#"SELECT unnest(enum_range(NULL::"app"."mood"))::text"#
        );
        assert_eq!(
            statement.then,
            Some(PostAction::PopulateEnum(String::from("app.mood")))
        );
    }
}
