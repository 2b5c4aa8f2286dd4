//! SELECT-side clause compilers: projection, sources, joins, CTEs, set
//! operations and locking.

use crate::error::{BuildError, Result};
use crate::query::{
    Expr, JoinItem, JoinTarget, LockClause, Query, ReturnType, SelectItem, Source, UnionItem,
    WithItem,
};
use crate::quote::{quote_column, quote_ident, quote_name, quote_with_schema};
use crate::value::SqlValue;

use super::compile_query;
use super::expr::expr;
use super::predicate::and_items;

/// Alias of the derived table used to aggregate sub-query rows into JSON.
const JSON_ROW_ALIAS: &str = "\"t\"";

pub(crate) fn select_list(
    query: &Query,
    quoted_as: Option<&str>,
    values: &mut Vec<SqlValue>,
) -> Result<String> {
    let select = &query.data().select;
    if select.is_empty() {
        return Ok(quoted_as.map_or_else(|| String::from("*"), |alias| format!("{alias}.*")));
    }

    let own_name = query.alias_or_table();
    let parts = select
        .iter()
        .map(|item| select_item(item, own_name, quoted_as, values))
        .collect::<Result<Vec<_>>>()?;
    Ok(parts.join(", "))
}

fn select_item(
    item: &SelectItem,
    own_name: Option<&str>,
    quoted_as: Option<&str>,
    values: &mut Vec<SqlValue>,
) -> Result<String> {
    match item {
        SelectItem::Column(column) => {
            if let Some(alias) = column.strip_suffix(".*") {
                if Some(alias) != own_name {
                    let quoted = quote_ident(alias);
                    return Ok(format!("row_to_json({quoted}.*) AS {quoted}"));
                }
            }
            Ok(quote_column(column, quoted_as))
        }
        SelectItem::Aliased {
            expr: Expr::SubQuery(sub),
            alias,
        } => Ok(format!(
            "{} AS {}",
            json_sub_query(sub, values)?,
            quote_ident(alias)
        )),
        SelectItem::Aliased { expr: e, alias } => Ok(format!(
            "{} AS {}",
            expr(e, quoted_as, values)?,
            quote_ident(alias)
        )),
        SelectItem::Raw(raw) => raw.render(values),
    }
}

/// Wraps a sub-query selected as a column so it yields one JSON value.
fn json_sub_query(sub: &Query, values: &mut Vec<SqlValue>) -> Result<String> {
    let inner = compile_query(sub, values)?;
    let t = JSON_ROW_ALIAS;
    let sql = match sub.data().return_type {
        ReturnType::All | ReturnType::Rows => format!(
            "(SELECT COALESCE(json_agg(row_to_json({t}.*)), '[]') FROM ({inner}) AS {t})"
        ),
        ReturnType::One | ReturnType::OneOptional => {
            format!("(SELECT row_to_json({t}.*) FROM ({inner}) AS {t})")
        }
        ReturnType::Pluck => {
            let column = sub
                .data()
                .select
                .first()
                .and_then(output_name)
                .map_or_else(|| format!("{t}.*"), |name| format!("{t}.{}", quote_ident(name)));
            format!("(SELECT COALESCE(json_agg({column}), '[]') FROM ({inner}) AS {t})")
        }
        ReturnType::Value | ReturnType::ValueOptional | ReturnType::Void => format!("({inner})"),
    };
    Ok(sql)
}

/// Name of the output column a select item produces, when it is known.
fn output_name(item: &SelectItem) -> Option<&str> {
    match item {
        SelectItem::Column(column) => {
            let name = column.rsplit('.').next().unwrap_or(column);
            (name != "*").then_some(name)
        }
        SelectItem::Aliased { alias, .. } => Some(alias),
        SelectItem::Raw(_) => None,
    }
}

/// `FROM ..` for a select.
pub(crate) fn from_clause(query: &Query, values: &mut Vec<SqlValue>) -> Result<Option<String>> {
    let data = query.data();
    let alias = data.alias.as_deref();

    match (&data.from, query.table_name()) {
        (Some(Source::Query(sub)), _) => {
            let alias = alias.ok_or(BuildError::MissingAlias("from"))?;
            Ok(Some(format!(
                "({}) AS {}",
                compile_query(sub, values)?,
                quote_ident(alias)
            )))
        }
        (Some(source), _) => {
            let sql = source_sql(source, values)?;
            Ok(Some(match alias {
                Some(alias) => format!("{sql} AS {}", quote_ident(alias)),
                None => sql,
            }))
        }
        (None, Some(table)) => {
            let quoted = quote_with_schema(data.schema.as_deref(), table);
            Ok(Some(match alias {
                Some(alias) if alias != table => format!("{quoted} AS {}", quote_ident(alias)),
                _ => quoted,
            }))
        }
        (None, None) => Ok(None),
    }
}

fn source_sql(source: &Source, values: &mut Vec<SqlValue>) -> Result<String> {
    match source {
        Source::Table(name) => Ok(quote_name(name)),
        Source::Query(query) => Ok(format!("({})", compile_query(query, values)?)),
        Source::Raw(raw) => raw.render(values),
    }
}

pub(crate) fn join_item(
    join: &JoinItem,
    quoted_as: Option<&str>,
    values: &mut Vec<SqlValue>,
) -> Result<String> {
    let mut sql = String::from(join.kind.as_sql());
    if join.lateral {
        sql.push_str(" LATERAL");
    }
    sql.push(' ');
    sql.push_str(&join_target(join, values)?);
    sql.push_str(" ON ");
    sql.push_str(&and_items(&join.on, quoted_as, values)?);
    Ok(sql)
}

/// The joined source with its alias, as used by `JOIN` and `USING`.
pub(crate) fn join_target(join: &JoinItem, values: &mut Vec<SqlValue>) -> Result<String> {
    match &join.target {
        JoinTarget::Table(table) => Ok(match &join.alias {
            Some(alias) => format!("{} AS {}", quote_name(table), quote_ident(alias)),
            None => quote_name(table),
        }),
        JoinTarget::Query(query) => {
            let alias = join
                .reference_name()
                .ok_or(BuildError::MissingAlias("join"))?;
            Ok(format!(
                "({}) AS {}",
                compile_query(query, values)?,
                quote_ident(alias)
            ))
        }
    }
}

pub(crate) fn with_clause(items: &[WithItem], values: &mut Vec<SqlValue>) -> Result<String> {
    let recursive = items.iter().any(|item| item.options.recursive);
    let mut parts = Vec::with_capacity(items.len());
    for item in items {
        let mut sql = quote_ident(&item.name);
        if !item.options.columns.is_empty() {
            let columns: Vec<String> = item.options.columns.iter().map(|c| quote_ident(c)).collect();
            sql.push_str(&format!("({})", columns.join(", ")));
        }
        sql.push_str(" AS ");
        match item.options.materialized {
            Some(true) => sql.push_str("MATERIALIZED "),
            Some(false) => sql.push_str("NOT MATERIALIZED "),
            None => {}
        }
        let body = match &item.body {
            Source::Table(name) => format!("SELECT * FROM {}", quote_name(name)),
            Source::Query(query) => compile_query(query, values)?,
            Source::Raw(raw) => raw.render(values)?,
        };
        sql.push_str(&format!("({body})"));
        parts.push(sql);
    }

    Ok(format!(
        "WITH {}{}",
        if recursive { "RECURSIVE " } else { "" },
        parts.join(", ")
    ))
}

pub(crate) fn union_item(item: &UnionItem, values: &mut Vec<SqlValue>) -> Result<String> {
    let arg = match &item.arg {
        Source::Table(name) => format!("SELECT * FROM {}", quote_name(name)),
        Source::Query(query) => compile_query(query, values)?,
        Source::Raw(raw) => raw.render(values)?,
    };
    if item.wrap {
        Ok(format!("{} ({arg})", item.kind.as_sql()))
    } else {
        Ok(format!("{} {arg}", item.kind.as_sql()))
    }
}

pub(crate) fn lock_clause(lock: &LockClause) -> String {
    let mut sql = format!("FOR {}", lock.strength.as_sql());
    if !lock.tables.is_empty() {
        let tables: Vec<String> = lock.tables.iter().map(|t| quote_ident(t)).collect();
        sql.push_str(" OF ");
        sql.push_str(&tables.join(", "));
    }
    if let Some(wait) = lock.wait {
        sql.push(' ');
        sql.push_str(wait.as_sql());
    }
    sql
}
