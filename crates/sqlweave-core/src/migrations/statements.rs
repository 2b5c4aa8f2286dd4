//! Standalone DDL: table renames, schemas, extensions, enums and domains,
//! plus the `information_schema` probes used by migrations.

use super::ast::{Action, DomainAst, EnumAst, ExtensionAst, RenameTable, SchemaAst};
use super::ddl::{type_sql, DdlStatement};
use crate::error::Result;
use crate::query::{col, Compare, Query};
use crate::quote::{quote_ident, quote_with_schema, split_schema};
use crate::raw::{raw, Sql};
use crate::value::quote_literal;

impl RenameTable {
    /// Renames `from` to `to`, or `to` back to `from` when `up` is false.
    #[must_use]
    pub fn new(from: &str, to: &str, up: bool) -> Self {
        let (from, to) = if up { (from, to) } else { (to, from) };
        let (from_schema, from) = split_schema(from);
        let (to_schema, to) = split_schema(to);
        Self {
            from_schema: from_schema.map(String::from),
            from: String::from(from),
            to_schema: to_schema.map(String::from),
            to: String::from(to),
        }
    }
}

/// `ALTER TABLE .. RENAME TO ..`, then `SET SCHEMA` when the schema moves.
#[must_use]
pub fn rename_table_statements(ast: &RenameTable) -> Vec<DdlStatement> {
    let mut statements = Vec::new();
    if ast.from != ast.to {
        statements.push(DdlStatement::new(format!(
            "ALTER TABLE {} RENAME TO {}",
            quote_with_schema(ast.from_schema.as_deref(), &ast.from),
            quote_ident(&ast.to)
        )));
    }
    if ast.from_schema != ast.to_schema {
        statements.push(DdlStatement::new(format!(
            "ALTER TABLE {} SET SCHEMA {}",
            quote_with_schema(ast.from_schema.as_deref(), &ast.to),
            quote_ident(ast.to_schema.as_deref().unwrap_or("public"))
        )));
    }
    statements
}

/// `CREATE SCHEMA` / `DROP SCHEMA`.
#[must_use]
pub fn schema_statement(ast: &SchemaAst) -> DdlStatement {
    let verb = match ast.action {
        Action::Create => "CREATE",
        Action::Drop => "DROP",
    };
    DdlStatement::new(format!("{verb} SCHEMA {}", quote_ident(&ast.name)))
}

/// `CREATE EXTENSION` / `DROP EXTENSION`.
#[must_use]
pub fn extension_statement(ast: &ExtensionAst) -> DdlStatement {
    let options = &ast.options;
    let mut sql = match ast.action {
        Action::Create => {
            let mut sql = String::from("CREATE EXTENSION");
            if options.create_if_not_exists {
                sql.push_str(" IF NOT EXISTS");
            }
            sql.push(' ');
            sql.push_str(&quote_ident(&ast.name));
            if let Some(schema) = &options.schema {
                sql.push_str(" SCHEMA ");
                sql.push_str(&quote_ident(schema));
            }
            if let Some(version) = &options.version {
                sql.push_str(" VERSION ");
                sql.push_str(&quote_literal(version));
            }
            sql
        }
        Action::Drop => {
            let mut sql = String::from("DROP EXTENSION");
            if options.drop_if_exists {
                sql.push_str(" IF EXISTS");
            }
            sql.push(' ');
            sql.push_str(&quote_ident(&ast.name));
            sql
        }
    };
    if options.cascade {
        sql.push_str(" CASCADE");
    }
    DdlStatement::new(sql)
}

/// `CREATE TYPE .. AS ENUM` / `DROP TYPE`.
#[must_use]
pub fn enum_statement(ast: &EnumAst) -> DdlStatement {
    let name = quote_with_schema(ast.schema.as_deref(), &ast.name);
    let sql = match ast.action {
        Action::Create => {
            let values: Vec<String> = ast.values.iter().map(|v| quote_literal(v)).collect();
            format!("CREATE TYPE {name} AS ENUM ({})", values.join(", "))
        }
        Action::Drop => {
            let mut sql = String::from("DROP TYPE");
            if ast.drop_if_exists {
                sql.push_str(" IF EXISTS");
            }
            sql.push(' ');
            sql.push_str(&name);
            if ast.cascade {
                sql.push_str(" CASCADE");
            }
            sql
        }
    };
    DdlStatement::new(sql)
}

/// `CREATE DOMAIN` / `DROP DOMAIN`.
pub fn domain_statement(ast: &DomainAst) -> Result<DdlStatement> {
    let name = quote_with_schema(ast.schema.as_deref(), &ast.name);
    let options = &ast.options;

    let sql = match ast.action {
        Action::Create => {
            let mut sql = format!("CREATE DOMAIN {name} AS {}", type_sql(&ast.base_type));
            if let Some(collation) = &options.collation {
                sql.push_str("\nCOLLATE ");
                sql.push_str(&quote_ident(collation));
            }
            if let Some(default) = &options.default {
                sql.push_str("\nDEFAULT ");
                sql.push_str(&default.render_inline()?);
            }
            let mut constraints = Vec::new();
            if options.not_null {
                constraints.push(String::from("NOT NULL"));
            }
            if let Some(check) = &options.check {
                constraints.push(format!("CHECK ({})", check.render_inline()?));
            }
            if !constraints.is_empty() {
                sql.push('\n');
                sql.push_str(&constraints.join(" "));
            }
            sql
        }
        Action::Drop => {
            let mut sql = format!("DROP DOMAIN {name}");
            if options.cascade {
                sql.push_str(" CASCADE");
            }
            sql
        }
    };
    Ok(DdlStatement::new(sql))
}

/// Probe returning a row when the table exists.
pub fn table_exists_sql(table: &str) -> Result<Sql> {
    Query::table("information_schema.tables")
        .select([raw("1")])
        .filter([col("table_name").eq(table)])
        .to_sql()
}

/// Probe returning a row when the column exists.
pub fn column_exists_sql(table: &str, column: &str) -> Result<Sql> {
    Query::table("information_schema.columns")
        .select([raw("1")])
        .filter([col("table_name").eq(table), col("column_name").eq(column)])
        .to_sql()
}

/// Probe returning a row when the constraint exists.
pub fn constraint_exists_sql(name: &str) -> Result<Sql> {
    Query::table("information_schema.table_constraints")
        .select([raw("1")])
        .filter([col("constraint_name").eq(name)])
        .to_sql()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::ast::{DomainOptions, ExtensionOptions};
    use crate::migrations::types::integer;
    use crate::value::SqlValue;

    #[test]
    fn test_rename_table_both_directions() {
        let up = rename_table_statements(&RenameTable::new("user", "person", true));
        assert_eq!(up[0].sql.text, r#"ALTER TABLE "user" RENAME TO "person""#);

        let down = rename_table_statements(&RenameTable::new("user", "person", false));
        assert_eq!(down[0].sql.text, r#"ALTER TABLE "person" RENAME TO "user""#);
    }

    #[test]
    fn test_rename_table_across_schemas() {
        let statements = rename_table_statements(&RenameTable::new("user", "archive.user", true));
        assert_eq!(statements.len(), 1);
        assert_eq!(
            statements[0].sql.text,
            r#"ALTER TABLE "user" SET SCHEMA "archive""#
        );
    }

    #[test]
    fn test_extension() {
        let create = ExtensionAst {
            action: Action::Create,
            name: String::from("citext"),
            options: ExtensionOptions {
                schema: Some(String::from("ext")),
                version: Some(String::from("1.6")),
                create_if_not_exists: true,
                ..ExtensionOptions::default()
            },
        };
        assert_eq!(
            extension_statement(&create).sql.text,
            r#"CREATE EXTENSION IF NOT EXISTS "citext" SCHEMA "ext" VERSION '1.6'"#
        );

        let drop = ExtensionAst {
            action: Action::Drop,
            options: ExtensionOptions {
                drop_if_exists: true,
                cascade: true,
                ..ExtensionOptions::default()
            },
            ..create
        };
        assert_eq!(
            extension_statement(&drop).sql.text,
            r#"DROP EXTENSION IF EXISTS "citext" CASCADE"#
        );
    }

    #[test]
    fn test_enum() {
        let mut ast = EnumAst {
            action: Action::Create,
            schema: None,
            name: String::from("mood"),
            values: vec![String::from("sad"), String::from("it's ok")],
            drop_if_exists: false,
            cascade: false,
        };
        assert_eq!(
            enum_statement(&ast).sql.text,
            r#"CREATE TYPE "mood" AS ENUM ('sad', 'it''s ok')"#
        );

        ast.action = Action::Drop;
        ast.cascade = true;
        assert_eq!(enum_statement(&ast).sql.text, r#"DROP TYPE "mood" CASCADE"#);
    }

    #[test]
    fn test_domain() {
        let ast = DomainAst {
            action: Action::Create,
            schema: None,
            name: String::from("positive"),
            base_type: integer(),
            options: DomainOptions {
                default: Some(raw("1")),
                not_null: true,
                check: Some(raw("VALUE > 0")),
                ..DomainOptions::default()
            },
        };
        assert_eq!(
            domain_statement(&ast).unwrap().sql.text,
            "CREATE DOMAIN \"positive\" AS integer\nDEFAULT 1\nNOT NULL CHECK (VALUE > 0)"
        );
    }

    #[test]
    fn test_existence_probes() {
        let sql = column_exists_sql("user", "name").unwrap();
        assert_eq!(
            sql.text,
            r#"SELECT 1 FROM "information_schema"."columns" WHERE "columns"."table_name" = $1 AND "columns"."column_name" = $2"#
        );
        assert_eq!(
            sql.values,
            [
                SqlValue::Text(String::from("user")),
                SqlValue::Text(String::from("name"))
            ]
        );
    }
}
