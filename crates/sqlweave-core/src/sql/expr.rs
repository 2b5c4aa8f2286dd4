//! Expression, function-call and ordering compilers.

use crate::error::Result;
use crate::query::{Direction, Expr, FnCall, Nulls, OrderItem, Over, WindowSpec};
use crate::quote::{quote_column, quote_ident};
use crate::value::{push_value, SqlValue};

use super::predicate::and_items;
use super::compile_query;

pub(crate) fn expr(expr: &Expr, quoted_as: Option<&str>, values: &mut Vec<SqlValue>) -> Result<String> {
    match expr {
        Expr::Column(name) => Ok(quote_column(name, quoted_as)),
        Expr::Value(value) => Ok(push_value(values, value.clone())),
        Expr::Raw(raw) => raw.render(values),
        Expr::Fn(call) => fn_call(call, quoted_as, values),
        Expr::SubQuery(query) => Ok(format!("({})", compile_query(query, values)?)),
    }
}

pub(crate) fn expr_list(
    exprs: &[Expr],
    quoted_as: Option<&str>,
    values: &mut Vec<SqlValue>,
) -> Result<String> {
    let parts = exprs
        .iter()
        .map(|e| expr(e, quoted_as, values))
        .collect::<Result<Vec<_>>>()?;
    Ok(parts.join(", "))
}

fn fn_call(call: &FnCall, quoted_as: Option<&str>, values: &mut Vec<SqlValue>) -> Result<String> {
    let mut sql = format!("{}(", call.name);
    if call.distinct {
        sql.push_str("DISTINCT ");
    }
    sql.push_str(&expr_list(&call.args, quoted_as, values)?);
    if !call.order.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&order_list(&call.order, quoted_as, values)?);
    }
    sql.push(')');

    if !call.filter.is_empty() {
        sql.push_str(" FILTER (WHERE ");
        sql.push_str(&and_items(&call.filter, quoted_as, values)?);
        sql.push(')');
    }

    match &call.over {
        Some(Over::Named(name)) => {
            sql.push_str(" OVER ");
            sql.push_str(&quote_ident(name));
        }
        Some(Over::Spec(spec)) => {
            sql.push_str(" OVER (");
            sql.push_str(&window_spec(spec, quoted_as, values)?);
            sql.push(')');
        }
        None => {}
    }

    Ok(sql)
}

pub(crate) fn window_spec(
    spec: &WindowSpec,
    quoted_as: Option<&str>,
    values: &mut Vec<SqlValue>,
) -> Result<String> {
    let mut parts = Vec::new();
    if !spec.partition_by.is_empty() {
        parts.push(format!(
            "PARTITION BY {}",
            expr_list(&spec.partition_by, quoted_as, values)?
        ));
    }
    if !spec.order.is_empty() {
        parts.push(format!(
            "ORDER BY {}",
            order_list(&spec.order, quoted_as, values)?
        ));
    }
    Ok(parts.join(" "))
}

pub(crate) fn order_list(
    items: &[OrderItem],
    quoted_as: Option<&str>,
    values: &mut Vec<SqlValue>,
) -> Result<String> {
    let mut parts = Vec::with_capacity(items.len());
    for item in items {
        let mut sql = expr(&item.expr, quoted_as, values)?;
        sql.push_str(match item.direction {
            Direction::Asc => " ASC",
            Direction::Desc => " DESC",
        });
        match item.nulls {
            Some(Nulls::First) => sql.push_str(" NULLS FIRST"),
            Some(Nulls::Last) => sql.push_str(" NULLS LAST"),
            None => {}
        }
        parts.push(sql);
    }
    Ok(parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{col, count, desc, Compare, WindowSpec};

    #[test]
    fn test_aggregate_with_filter_and_window() {
        let call = count("id")
            .distinct()
            .filter([col("active").eq(true)])
            .over(WindowSpec::new().partition_by("team").order_by(desc("score")));
        let mut values = Vec::new();
        let sql = expr(&Expr::Fn(Box::new(call)), Some("\"u\""), &mut values).unwrap();
        assert_eq!(
            sql,
            r#"count(DISTINCT "u"."id") FILTER (WHERE "u"."active" = $1) OVER (PARTITION BY "u"."team" ORDER BY "u"."score" DESC)"#
        );
        assert_eq!(values, [SqlValue::Bool(true)]);
    }

    #[test]
    fn test_order_nulls_placement() {
        let mut values = Vec::new();
        let sql = order_list(&[desc("at").nulls_last()], None, &mut values).unwrap();
        assert_eq!(sql, r#""at" DESC NULLS LAST"#);
    }
}
