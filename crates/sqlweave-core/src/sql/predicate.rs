//! WHERE / HAVING / ON predicate compiler.

use crate::error::Result;
use crate::query::{Op, Operand, WhereItem};
use crate::quote::quote_column;
use crate::value::{push_value, SqlValue};

use super::compile_query;
use super::expr::expr;

/// Compiles an AND-list plus OR-groups.
///
/// A single group is joined with `AND` as is. Several groups are each
/// parenthesized and joined with `OR`. Returns `None` when nothing is set.
pub(crate) fn where_groups(
    and: &[WhereItem],
    or: &[Vec<WhereItem>],
    quoted_as: Option<&str>,
    values: &mut Vec<SqlValue>,
) -> Result<Option<String>> {
    let mut groups: Vec<&[WhereItem]> = Vec::with_capacity(or.len() + 1);
    if !and.is_empty() {
        groups.push(and);
    }
    groups.extend(or.iter().filter(|g| !g.is_empty()).map(Vec::as_slice));

    match groups.as_slice() {
        [] => Ok(None),
        [single] => and_items(single, quoted_as, values).map(Some),
        many => {
            let parts = many
                .iter()
                .map(|group| Ok(format!("({})", and_items(group, quoted_as, values)?)))
                .collect::<Result<Vec<_>>>()?;
            Ok(Some(parts.join(" OR ")))
        }
    }
}

pub(crate) fn and_items(
    items: &[WhereItem],
    quoted_as: Option<&str>,
    values: &mut Vec<SqlValue>,
) -> Result<String> {
    if items.is_empty() {
        return Ok(String::from("true"));
    }
    let parts = items
        .iter()
        .map(|item| where_item(item, quoted_as, values))
        .collect::<Result<Vec<_>>>()?;
    Ok(parts.join(" AND "))
}

fn where_item(item: &WhereItem, quoted_as: Option<&str>, values: &mut Vec<SqlValue>) -> Result<String> {
    match item {
        WhereItem::Compare { left, op, right } => compare(left, *op, right, quoted_as, values),
        WhereItem::And(items) => Ok(format!("({})", and_items(items, quoted_as, values)?)),
        WhereItem::Or(groups) => {
            let parts = groups
                .iter()
                .map(|group| {
                    let sql = and_items(group, quoted_as, values)?;
                    Ok(if group.len() > 1 { format!("({sql})") } else { sql })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(format!("({})", parts.join(" OR ")))
        }
        WhereItem::Not(items) => Ok(format!("NOT ({})", and_items(items, quoted_as, values)?)),
        WhereItem::Raw(raw) => Ok(format!("({})", raw.render(values)?)),
        WhereItem::Exists(query) => Ok(format!("EXISTS ({})", compile_query(query, values)?)),
    }
}

fn compare(
    left: &crate::query::Expr,
    op: Op,
    right: &Operand,
    quoted_as: Option<&str>,
    values: &mut Vec<SqlValue>,
) -> Result<String> {
    let left = expr(left, quoted_as, values)?;

    let sql = match (op, right) {
        (Op::Eq, Operand::Value(SqlValue::Null)) => format!("{left} IS NULL"),
        (Op::NotEq, Operand::Value(SqlValue::Null)) => format!("{left} IS NOT NULL"),
        (Op::In, Operand::List(list)) if list.is_empty() => String::from("false"),
        (Op::NotIn, Operand::List(list)) if list.is_empty() => String::from("true"),
        (Op::Contains | Op::ContainsInsensitive, right) => {
            let right = operand(right, quoted_as, values)?;
            format!("{left} {} '%' || {right} || '%'", op.as_sql())
        }
        (Op::StartsWith, right) => {
            let right = operand(right, quoted_as, values)?;
            format!("{left} {} {right} || '%'", op.as_sql())
        }
        (Op::EndsWith, right) => {
            let right = operand(right, quoted_as, values)?;
            format!("{left} {} '%' || {right}", op.as_sql())
        }
        (op, right) => {
            let right = operand(right, quoted_as, values)?;
            format!("{left} {} {right}", op.as_sql())
        }
    };
    Ok(sql)
}

fn operand(operand: &Operand, quoted_as: Option<&str>, values: &mut Vec<SqlValue>) -> Result<String> {
    match operand {
        Operand::Value(value) => Ok(push_value(values, value.clone())),
        Operand::List(list) => {
            let placeholders: Vec<String> = list
                .iter()
                .map(|value| push_value(values, value.clone()))
                .collect();
            Ok(format!("({})", placeholders.join(", ")))
        }
        Operand::Column(name) => Ok(quote_column(name, quoted_as)),
        Operand::Raw(raw) => raw.render(values),
        Operand::SubQuery(query) => Ok(format!("({})", compile_query(query, values)?)),
        Operand::Range(low, high) => {
            let low = push_value(values, low.clone());
            let high = push_value(values, high.clone());
            Ok(format!("{low} AND {high}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{and, col, not, or, Compare};
    use crate::raw::raw_with;

    fn compile(items: &[WhereItem]) -> (String, Vec<SqlValue>) {
        let mut values = Vec::new();
        let sql = and_items(items, Some("\"t\""), &mut values).unwrap();
        (sql, values)
    }

    #[test]
    fn test_null_comparison_uses_is_null() {
        let (sql, values) = compile(&[col("a").is_null(), col("b").not_eq(SqlValue::Null)]);
        assert_eq!(sql, r#""t"."a" IS NULL AND "t"."b" IS NOT NULL"#);
        assert!(values.is_empty());
    }

    #[test]
    fn test_empty_in_lists() {
        let (sql, _) = compile(&[
            col("a").in_list(Vec::<i64>::new()),
            col("b").not_in_list(Vec::<i64>::new()),
        ]);
        assert_eq!(sql, "false AND true");
    }

    #[test]
    fn test_in_list_binds_each_value() {
        let (sql, values) = compile(&[col("id").in_list([1, 2, 3])]);
        assert_eq!(sql, r#""t"."id" IN ($1, $2, $3)"#);
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn test_nested_combinators_are_parenthesized() {
        let (sql, _) = compile(&[
            or([col("a").eq(1), and([col("b").eq(2), col("c").eq(3)])]),
            not([col("d").eq(4)]),
        ]);
        assert_eq!(
            sql,
            r#"("t"."a" = $1 OR ("t"."b" = $2 AND "t"."c" = $3)) AND NOT ("t"."d" = $4)"#
        );
    }

    #[test]
    fn test_raw_fragment_keeps_parameter_order() {
        let (sql, values) = compile(&[
            col("a").eq("x"),
            WhereItem::Raw(raw_with("length(b) > $1", [3])),
            col("c").between(1, 9),
        ]);
        assert_eq!(
            sql,
            r#""t"."a" = $1 AND (length(b) > $2) AND "t"."c" BETWEEN $3 AND $4"#
        );
        assert_eq!(
            values,
            [
                SqlValue::Text(String::from("x")),
                SqlValue::Int(3),
                SqlValue::Int(1),
                SqlValue::Int(9)
            ]
        );
    }

    #[test]
    fn test_pattern_operators() {
        let (sql, _) = compile(&[
            col("a").contains("x"),
            col("b").starts_with("y"),
            col("c").ends_with("z"),
            col("d").contains_insensitive("w"),
        ]);
        assert_eq!(
            sql,
            r#""t"."a" LIKE '%' || $1 || '%' AND "t"."b" LIKE $2 || '%' AND "t"."c" LIKE '%' || $3 AND "t"."d" ILIKE '%' || $4 || '%'"#
        );
    }

    #[test]
    fn test_or_groups_are_parenthesized() {
        let mut values = Vec::new();
        let sql = where_groups(
            &[col("a").eq(1)],
            &[vec![col("b").eq(2)]],
            Some("\"t\""),
            &mut values,
        )
        .unwrap();
        assert_eq!(sql.as_deref(), Some(r#"("t"."a" = $1) OR ("t"."b" = $2)"#));
    }
}
