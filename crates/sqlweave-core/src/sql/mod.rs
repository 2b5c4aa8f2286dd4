//! Clause compilers and the statement assembler.
//!
//! Every compiler appends its values to one running parameter list, so
//! placeholders stay numbered in text order even across sub-queries.

mod expr;
mod mutation;
mod predicate;
mod select;

use crate::error::Result;
use crate::query::{Query, QueryKind};
use crate::quote::quote_ident;
use crate::raw::Sql;
use crate::value::SqlValue;

/// Compiles `query` into SQL text and its parameter list.
pub(crate) fn to_sql(query: &Query) -> Result<Sql> {
    let mut values = Vec::new();
    let text = compile_query(query, &mut values)?;
    Ok(Sql::new(text, values))
}

/// Compiles `query` into text, appending its values to `values`.
pub(crate) fn compile_query(query: &Query, values: &mut Vec<SqlValue>) -> Result<String> {
    let data = query.data();
    let quoted_as = query.alias_or_table().map(quote_ident);
    let quoted_as = quoted_as.as_deref();

    match &data.kind {
        QueryKind::Truncate(options) => return Ok(mutation::truncate(query, *options)?.join(" ")),
        QueryKind::ColumnInfo(column) => {
            return Ok(mutation::column_info(query, column.as_deref(), values)?.join(" "));
        }
        _ => {}
    }

    let mut tokens = Vec::new();
    if !data.with.is_empty() {
        tokens.push(select::with_clause(&data.with, values)?);
    }

    match &data.kind {
        QueryKind::Insert(insert) => {
            tokens.extend(mutation::insert(query, insert, quoted_as, values)?);
        }
        QueryKind::Update(sets) => tokens.extend(mutation::update(query, sets, quoted_as, values)?),
        QueryKind::Delete => tokens.extend(mutation::delete(query, quoted_as, values)?),
        QueryKind::Select | QueryKind::Truncate(_) | QueryKind::ColumnInfo(_) => {
            select_tokens(query, quoted_as, values, &mut tokens)?;
        }
    }

    Ok(tokens.join(" "))
}

fn select_tokens(
    query: &Query,
    quoted_as: Option<&str>,
    values: &mut Vec<SqlValue>,
    tokens: &mut Vec<String>,
) -> Result<()> {
    let data = query.data();

    tokens.push(String::from("SELECT"));
    match &data.distinct {
        Some(on) if on.is_empty() => tokens.push(String::from("DISTINCT")),
        Some(on) => tokens.push(format!(
            "DISTINCT ON ({})",
            expr::expr_list(on, quoted_as, values)?
        )),
        None => {}
    }
    tokens.push(select::select_list(query, quoted_as, values)?);

    if let Some(from) = select::from_clause(query, values)? {
        tokens.push(format!("FROM {from}"));
    }

    for join in &data.joins {
        tokens.push(select::join_item(join, quoted_as, values)?);
    }

    if let Some(filters) = predicate::where_groups(&data.and, &data.or, quoted_as, values)? {
        tokens.push(format!("WHERE {filters}"));
    }

    if !data.group.is_empty() {
        tokens.push(format!(
            "GROUP BY {}",
            expr::expr_list(&data.group, quoted_as, values)?
        ));
    }

    if let Some(having) =
        predicate::where_groups(&data.having, &data.having_or, quoted_as, values)?
    {
        tokens.push(format!("HAVING {having}"));
    }

    if !data.windows.is_empty() {
        let windows = data
            .windows
            .iter()
            .map(|(name, spec)| {
                Ok(format!(
                    "{} AS ({})",
                    quote_ident(name),
                    expr::window_spec(spec, quoted_as, values)?
                ))
            })
            .collect::<Result<Vec<_>>>()?;
        tokens.push(format!("WINDOW {}", windows.join(", ")));
    }

    for union in &data.unions {
        tokens.push(select::union_item(union, values)?);
    }

    if !data.order.is_empty() {
        tokens.push(format!(
            "ORDER BY {}",
            expr::order_list(&data.order, quoted_as, values)?
        ));
    }

    let limit = if data.return_type.is_single_row() {
        Some(1)
    } else {
        data.limit
    };
    if let Some(limit) = limit {
        tokens.push(format!("LIMIT {limit}"));
    }
    if let Some(offset) = data.offset {
        tokens.push(format!("OFFSET {offset}"));
    }

    if let Some(lock) = &data.lock {
        tokens.push(select::lock_clause(lock));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildError;
    use crate::query::{col, Compare, Record, TruncateOptions};

    #[test]
    fn test_select_without_table() {
        let sql = Query::new().select_as("one", crate::raw::raw("1")).to_sql().unwrap();
        assert_eq!(sql.text, r#"SELECT 1 AS "one""#);
    }

    #[test]
    fn test_mutations_need_a_table() {
        let err = Query::new().insert(Record::new().set("a", 1)).to_sql().unwrap_err();
        assert_eq!(err, BuildError::MissingTable("insert"));
        let err = Query::new().truncate(TruncateOptions::new()).to_sql().unwrap_err();
        assert_eq!(err, BuildError::MissingTable("truncate"));
    }

    #[test]
    fn test_unconditioned_delete_is_rejected() {
        let err = Query::table("user").delete().to_sql().unwrap_err();
        assert_eq!(err, BuildError::UnconditionedMutation("delete"));

        let sql = Query::table("user").all_rows().delete().to_sql().unwrap();
        assert_eq!(sql.text, r#"DELETE FROM "user""#);
    }

    #[test]
    fn test_single_row_shapes_force_limit_one() {
        let sql = Query::table("user")
            .filter([col("id").eq(1)])
            .limit(10)
            .take()
            .to_sql()
            .unwrap();
        assert!(sql.text.ends_with("LIMIT 1"));
    }
}
