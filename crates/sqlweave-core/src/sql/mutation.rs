//! INSERT, UPDATE, DELETE, TRUNCATE and column-info compilers.
//!
//! Each of these needs a table; a query without one is a configuration
//! error.

use crate::error::{BuildError, Result};
use crate::query::{
    ConflictAction, ConflictTarget, InsertData, InsertSource, OnConflict, Query, SetValue,
    TruncateOptions, UpdateSet,
};
use crate::quote::{quote_column, quote_ident, quote_with_schema};
use crate::value::{push_value, SqlValue};

use super::compile_query;
use super::expr::expr;
use super::predicate::{and_items, where_groups};
use super::select::join_target;

/// The quoted target table, with `AS alias` when an alias is set.
fn target(query: &Query, statement: &'static str) -> Result<String> {
    let table = query
        .table_name()
        .ok_or(BuildError::MissingTable(statement))?;
    let quoted = quote_with_schema(query.data().schema.as_deref(), table);
    Ok(match query.data().alias.as_deref() {
        Some(alias) if alias != table => format!("{quoted} AS {}", quote_ident(alias)),
        _ => quoted,
    })
}

fn returning(query: &Query) -> Option<String> {
    let columns = &query.data().returning;
    if columns.is_empty() {
        return None;
    }
    let columns: Vec<String> = columns.iter().map(|c| quote_column(c, None)).collect();
    Some(format!("RETURNING {}", columns.join(", ")))
}

pub(crate) fn insert(
    query: &Query,
    data: &InsertData,
    quoted_as: Option<&str>,
    values: &mut Vec<SqlValue>,
) -> Result<Vec<String>> {
    let mut tokens = vec![format!("INSERT INTO {}", target(query, "insert")?)];

    let columns = match &data.source {
        InsertSource::Values(records) => {
            if records.is_empty() {
                return Err(BuildError::EmptyInsert);
            }

            let mut columns: Vec<&str> = Vec::new();
            for record in records {
                for column in record.columns() {
                    if !columns.contains(&column) {
                        columns.push(column);
                    }
                }
            }

            if columns.is_empty() {
                tokens.push(String::from("DEFAULT VALUES"));
            } else {
                tokens.push(column_list(&columns));
                let mut rows = Vec::with_capacity(records.len());
                for record in records {
                    let mut cells = Vec::with_capacity(columns.len());
                    for column in &columns {
                        cells.push(match record.get(column) {
                            Some(value) => expr(value, quoted_as, values)?,
                            None => String::from("DEFAULT"),
                        });
                    }
                    rows.push(format!("({})", cells.join(", ")));
                }
                tokens.push(format!("VALUES {}", rows.join(", ")));
            }
            columns.into_iter().map(String::from).collect()
        }
        InsertSource::Query { columns, query: source } => {
            let names: Vec<&str> = columns.iter().map(String::as_str).collect();
            tokens.push(column_list(&names));
            tokens.push(compile_query(source, values)?);
            columns.clone()
        }
    };

    if let Some(conflict) = &data.on_conflict {
        tokens.push(on_conflict(conflict, &columns, quoted_as, values)?);
    }
    tokens.extend(returning(query));
    Ok(tokens)
}

fn column_list(columns: &[&str]) -> String {
    let quoted: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    format!("({})", quoted.join(", "))
}

fn on_conflict(
    conflict: &OnConflict,
    inserted: &[String],
    quoted_as: Option<&str>,
    values: &mut Vec<SqlValue>,
) -> Result<String> {
    let mut sql = String::from("ON CONFLICT");
    match &conflict.target {
        Some(ConflictTarget::Columns(columns)) => {
            let names: Vec<&str> = columns.iter().map(String::as_str).collect();
            sql.push(' ');
            sql.push_str(&column_list(&names));
        }
        Some(ConflictTarget::Constraint(name)) => {
            sql.push_str(" ON CONSTRAINT ");
            sql.push_str(&quote_ident(name));
        }
        Some(ConflictTarget::Raw(raw)) => {
            sql.push(' ');
            sql.push_str(&raw.render(values)?);
        }
        None => {}
    }

    let sets = match &conflict.action {
        ConflictAction::Nothing => Vec::new(),
        ConflictAction::Merge(columns) => {
            let columns = if columns.is_empty() { inserted } else { columns };
            columns
                .iter()
                .map(|c| {
                    let quoted = quote_ident(c);
                    format!("{quoted} = excluded.{quoted}")
                })
                .collect()
        }
        ConflictAction::Set(sets) => set_list(sets, quoted_as, values)?,
    };

    if sets.is_empty() {
        sql.push_str(" DO NOTHING");
    } else {
        sql.push_str(" DO UPDATE SET ");
        sql.push_str(&sets.join(", "));
    }
    Ok(sql)
}

fn set_list(
    sets: &[UpdateSet],
    quoted_as: Option<&str>,
    values: &mut Vec<SqlValue>,
) -> Result<Vec<String>> {
    let mut parts = Vec::with_capacity(sets.len());
    for set in sets {
        let column = quote_ident(&set.column);
        parts.push(match &set.value {
            SetValue::Set(value) => format!("{column} = {}", expr(value, quoted_as, values)?),
            SetValue::Increment(by) => {
                format!("{column} = {column} + {}", push_value(values, by.clone()))
            }
            SetValue::Decrement(by) => {
                format!("{column} = {column} - {}", push_value(values, by.clone()))
            }
        });
    }
    Ok(parts)
}

/// WHERE for UPDATE and DELETE: join conditions AND-ed with the filters.
fn mutation_where(
    query: &Query,
    statement: &'static str,
    quoted_as: Option<&str>,
    values: &mut Vec<SqlValue>,
) -> Result<Option<String>> {
    let data = query.data();
    if !query.has_conditions() && !data.all_rows {
        return Err(BuildError::UnconditionedMutation(statement));
    }

    let mut parts = Vec::new();
    for join in &data.joins {
        if !join.on.is_empty() {
            parts.push(and_items(&join.on, quoted_as, values)?);
        }
    }
    if let Some(filters) = where_groups(&data.and, &data.or, quoted_as, values)? {
        if parts.is_empty() || data.or.is_empty() {
            parts.push(filters);
        } else {
            parts.push(format!("({filters})"));
        }
    }

    Ok((!parts.is_empty()).then(|| format!("WHERE {}", parts.join(" AND "))))
}

fn joined_sources(query: &Query, values: &mut Vec<SqlValue>) -> Result<Option<String>> {
    let joins = &query.data().joins;
    if joins.is_empty() {
        return Ok(None);
    }
    let parts = joins
        .iter()
        .map(|join| join_target(join, values))
        .collect::<Result<Vec<_>>>()?;
    Ok(Some(parts.join(", ")))
}

pub(crate) fn update(
    query: &Query,
    sets: &[UpdateSet],
    quoted_as: Option<&str>,
    values: &mut Vec<SqlValue>,
) -> Result<Vec<String>> {
    let mut tokens = vec![format!("UPDATE {}", target(query, "update")?)];
    if sets.is_empty() {
        return Err(BuildError::EmptyUpdate);
    }
    tokens.push(format!("SET {}", set_list(sets, quoted_as, values)?.join(", ")));
    if let Some(sources) = joined_sources(query, values)? {
        tokens.push(format!("FROM {sources}"));
    }
    tokens.extend(mutation_where(query, "update", quoted_as, values)?);
    tokens.extend(returning(query));
    Ok(tokens)
}

pub(crate) fn delete(
    query: &Query,
    quoted_as: Option<&str>,
    values: &mut Vec<SqlValue>,
) -> Result<Vec<String>> {
    let mut tokens = vec![format!("DELETE FROM {}", target(query, "delete")?)];
    if let Some(sources) = joined_sources(query, values)? {
        tokens.push(format!("USING {sources}"));
    }
    tokens.extend(mutation_where(query, "delete", quoted_as, values)?);
    tokens.extend(returning(query));
    Ok(tokens)
}

pub(crate) fn truncate(query: &Query, options: TruncateOptions) -> Result<Vec<String>> {
    let table = query
        .table_name()
        .ok_or(BuildError::MissingTable("truncate"))?;
    let mut tokens = vec![format!(
        "TRUNCATE {}",
        quote_with_schema(query.data().schema.as_deref(), table)
    )];
    if options.restart_identity {
        tokens.push(String::from("RESTART IDENTITY"));
    }
    if options.cascade {
        tokens.push(String::from("CASCADE"));
    }
    Ok(tokens)
}

pub(crate) fn column_info(
    query: &Query,
    column: Option<&str>,
    values: &mut Vec<SqlValue>,
) -> Result<Vec<String>> {
    let table = query
        .table_name()
        .ok_or(BuildError::MissingTable("column info"))?;

    let mut conditions = vec![
        format!(
            "table_name = {}",
            push_value(values, SqlValue::Text(String::from(table)))
        ),
        String::from("table_catalog = current_database()"),
    ];
    conditions.push(match query.data().schema.as_deref() {
        Some(schema) => format!(
            "table_schema = {}",
            push_value(values, SqlValue::Text(String::from(schema)))
        ),
        None => String::from("table_schema = current_schema()"),
    });
    if let Some(column) = column {
        conditions.push(format!(
            "column_name = {}",
            push_value(values, SqlValue::Text(String::from(column)))
        ));
    }

    Ok(vec![
        String::from("SELECT * FROM information_schema.columns"),
        format!("WHERE {}", conditions.join(" AND ")),
    ])
}
