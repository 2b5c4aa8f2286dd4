//! Query execution.
//!
//! Compiles a [`Query`], runs it through an [`Adapter`], and shapes the rows
//! according to the query's [`ReturnType`]. Column parsers and callbacks
//! stored on the query are applied here.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use sqlweave_core::query::{ColumnParser, HookPoint, Query, QueryKind, ReturnType, SelectItem};
use sqlweave_core::Sql;
use tracing::debug;

use crate::adapter::Adapter;
use crate::error::{DbError, Result};
use crate::log::{with_log, QueryLog};

/// Runs queries through an adapter.
pub struct QueryExecutor<'a> {
    adapter: &'a dyn Adapter,
    log: Option<&'a dyn QueryLog>,
}

impl<'a> QueryExecutor<'a> {
    /// Creates an executor without logging.
    #[must_use]
    pub const fn new(adapter: &'a dyn Adapter) -> Self {
        Self { adapter, log: None }
    }

    /// Reports every statement to `log`.
    #[must_use]
    pub const fn with_log(mut self, log: &'a dyn QueryLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Runs `query` and returns its output in the query's result shape.
    ///
    /// | shape            | output                                   |
    /// |------------------|------------------------------------------|
    /// | `All`            | array of row objects                     |
    /// | `One`            | row object, or [`DbError::NotFound`]     |
    /// | `OneOptional`    | row object or `null`                     |
    /// | `Rows`           | array of value arrays                    |
    /// | `Pluck`          | array of first-column values             |
    /// | `Value`          | first value, or [`DbError::NotFound`]    |
    /// | `ValueOptional`  | first value or `null`                    |
    /// | `Void`           | affected row count                       |
    pub async fn run(&self, query: &Query) -> Result<Value> {
        let sql = query.to_sql()?;
        let (before, after) = hook_points(&query.data().kind);

        for point in [HookPoint::BeforeQuery].into_iter().chain(before) {
            for hook in query.hooks_for(point) {
                hook.call(query, None);
            }
        }

        let output = self.shape(query, &sql).await?;

        for point in [HookPoint::AfterQuery].into_iter().chain(after) {
            for hook in query.hooks_for(point) {
                hook.call(query, Some(&output));
            }
        }
        Ok(output)
    }

    /// Whether `query` matches any row.
    pub async fn exists(&self, query: &Query) -> Result<bool> {
        let output = self.run(&query.exists()).await?;
        Ok(!output.is_null())
    }

    /// Number of rows matching `query`.
    pub async fn count(&self, query: &Query) -> Result<i64> {
        let output = self.run(&query.count_rows()).await?;
        Ok(output.as_i64().unwrap_or_default())
    }

    async fn shape(&self, query: &Query, sql: &Sql) -> Result<Value> {
        let return_type = query.data().return_type;
        let parsers = effective_parsers(query);
        debug!(sql = %sql.text, shape = ?return_type, "Running query");

        match return_type {
            ReturnType::All | ReturnType::One | ReturnType::OneOptional | ReturnType::Void => {
                let result = with_log(self.log, sql, self.adapter.query(sql)).await?;
                if return_type == ReturnType::Void {
                    return Ok(Value::from(result.row_count));
                }
                let mut rows = result
                    .rows
                    .into_iter()
                    .map(|row| parse_object(row, &parsers, &query.data().joined_parsers));
                match return_type {
                    ReturnType::One => rows.next().ok_or_else(|| not_found(sql)),
                    ReturnType::OneOptional => Ok(rows.next().unwrap_or(Value::Null)),
                    _ => Ok(Value::Array(rows.collect())),
                }
            }
            ReturnType::Rows | ReturnType::Pluck | ReturnType::Value | ReturnType::ValueOptional => {
                let result = with_log(self.log, sql, self.adapter.arrays(sql)).await?;
                let fields = result.fields;
                let mut rows = result
                    .rows
                    .into_iter()
                    .map(|row| parse_array(row, &fields, &parsers));
                match return_type {
                    ReturnType::Rows => Ok(Value::Array(rows.map(Value::Array).collect())),
                    ReturnType::Pluck => Ok(Value::Array(rows.filter_map(first).collect())),
                    ReturnType::Value => rows.next().and_then(first).ok_or_else(|| not_found(sql)),
                    _ => Ok(rows.next().and_then(first).unwrap_or(Value::Null)),
                }
            }
        }
    }
}

fn not_found(sql: &Sql) -> DbError {
    DbError::NotFound {
        sql: sql.text.clone(),
    }
}

fn first(row: Vec<Value>) -> Option<Value> {
    row.into_iter().next()
}

const fn hook_points(kind: &QueryKind) -> (Option<HookPoint>, Option<HookPoint>) {
    match kind {
        QueryKind::Insert(_) => (Some(HookPoint::BeforeInsert), Some(HookPoint::AfterInsert)),
        QueryKind::Update(_) => (Some(HookPoint::BeforeUpdate), Some(HookPoint::AfterUpdate)),
        QueryKind::Delete => (Some(HookPoint::BeforeDelete), Some(HookPoint::AfterDelete)),
        QueryKind::Select | QueryKind::Truncate(_) | QueryKind::ColumnInfo(_) => (None, None),
    }
}

/// Parsers by output column: the query's own, plus joined parsers for
/// `alias.col` and `alias.*` selections.
fn effective_parsers(query: &Query) -> BTreeMap<String, ColumnParser> {
    let data = query.data();
    let mut parsers = data.parsers.clone();
    for item in &data.select {
        let SelectItem::Column(name) = item else {
            continue;
        };
        let Some((alias, column)) = name.split_once('.') else {
            continue;
        };
        let Some(joined) = data.joined_parsers.get(alias) else {
            continue;
        };
        if column == "*" {
            parsers.extend(joined.iter().map(|(k, p)| (k.clone(), p.clone())));
        } else if let Some(parser) = joined.get(column) {
            parsers.insert(String::from(column), parser.clone());
        }
    }
    parsers
}

fn parse_object(
    mut row: Map<String, Value>,
    parsers: &BTreeMap<String, ColumnParser>,
    joined: &BTreeMap<String, BTreeMap<String, ColumnParser>>,
) -> Value {
    for (column, parser) in parsers {
        if let Some(value) = row.remove(column) {
            row.insert(column.clone(), parser.parse(value));
        }
    }
    for (alias, parsers) in joined {
        match row.get_mut(alias) {
            Some(Value::Object(nested)) => apply(nested, parsers),
            Some(Value::Array(items)) => {
                for item in items {
                    if let Value::Object(nested) = item {
                        apply(nested, parsers);
                    }
                }
            }
            _ => {}
        }
    }
    Value::Object(row)
}

fn apply(object: &mut Map<String, Value>, parsers: &BTreeMap<String, ColumnParser>) {
    for (column, parser) in parsers {
        if let Some(value) = object.get_mut(column) {
            *value = parser.parse(value.take());
        }
    }
}

fn parse_array(
    row: Vec<Value>,
    fields: &[String],
    parsers: &BTreeMap<String, ColumnParser>,
) -> Vec<Value> {
    row.into_iter()
        .zip(fields)
        .map(|(value, field)| match parsers.get(field) {
            Some(parser) => parser.parse(value),
            None => value,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use serde_json::json;
    use sqlweave_core::query::{col, Compare, Record};

    use super::*;
    use crate::memory::MemoryAdapter;

    fn doubled() -> ColumnParser {
        ColumnParser::new(|v| Value::from(v.as_i64().unwrap_or(0) * 2))
    }

    #[tokio::test]
    async fn test_all_returns_objects() {
        let adapter = MemoryAdapter::new();
        adapter.respond(["id", "name"], [vec![json!(1), json!("Ann")]]);

        let output = QueryExecutor::new(&adapter)
            .run(&Query::table("user").select(["id", "name"]))
            .await
            .unwrap();

        assert_eq!(output, json!([{"id": 1, "name": "Ann"}]));
    }

    #[tokio::test]
    async fn test_take_without_rows_is_not_found() {
        let adapter = MemoryAdapter::new();
        let err = QueryExecutor::new(&adapter)
            .run(&Query::table("user").take())
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::NotFound { ref sql } if sql.ends_with("LIMIT 1")));
    }

    #[tokio::test]
    async fn test_optional_shapes_return_null() {
        let adapter = MemoryAdapter::new();
        let executor = QueryExecutor::new(&adapter);

        let row = executor.run(&Query::table("user").take_optional()).await.unwrap();
        let value = executor.run(&Query::table("user").get_optional("name")).await.unwrap();

        assert_eq!(row, Value::Null);
        assert_eq!(value, Value::Null);
    }

    #[tokio::test]
    async fn test_pluck_and_value() {
        let adapter = MemoryAdapter::new();
        adapter.respond(["id"], [vec![json!(1)], vec![json!(2)]]);
        adapter.respond(["count"], [vec![json!(5)]]);
        let executor = QueryExecutor::new(&adapter);

        let ids = executor.run(&Query::table("user").pluck("id")).await.unwrap();
        let count = executor.count(&Query::table("user")).await.unwrap();

        assert_eq!(ids, json!([1, 2]));
        assert_eq!(count, 5);
    }

    #[tokio::test]
    async fn test_void_returns_row_count() {
        let adapter = MemoryAdapter::new();
        adapter.respond_count(3);

        let output = QueryExecutor::new(&adapter)
            .run(&Query::table("user").filter([col("active").eq(false)]).delete().exec())
            .await
            .unwrap();

        assert_eq!(output, json!(3));
    }

    #[tokio::test]
    async fn test_parsers_apply_to_objects_and_arrays() {
        let adapter = MemoryAdapter::new();
        adapter.respond(["age"], [vec![json!(20)]]);
        adapter.respond(["age"], [vec![json!(21)]]);
        let executor = QueryExecutor::new(&adapter);
        let query = Query::table("user").select(["age"]).parse("age", doubled());

        let objects = executor.run(&query).await.unwrap();
        let rows = executor.run(&query.rows()).await.unwrap();

        assert_eq!(objects, json!([{"age": 40}]));
        assert_eq!(rows, json!([[42]]));
    }

    #[tokio::test]
    async fn test_insert_fires_callbacks_in_order() {
        let adapter = MemoryAdapter::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let before = Arc::clone(&calls);
        let after = Arc::clone(&calls);

        let query = Query::table("user")
            .insert(Record::new().set("name", "Ann"))
            .before_insert(move |_| {
                assert_eq!(before.fetch_add(1, Ordering::SeqCst), 0);
            })
            .after_insert(move |_, output| {
                assert_eq!(output, &json!(0));
                assert_eq!(after.fetch_add(1, Ordering::SeqCst), 1);
            });

        QueryExecutor::new(&adapter).run(&query).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(adapter.statements().len(), 1);
    }

    #[tokio::test]
    async fn test_exists_reads_a_boolean() {
        let adapter = MemoryAdapter::new();
        adapter.respond(["bool"], [vec![json!(true)]]);
        let executor = QueryExecutor::new(&adapter);

        assert!(executor.exists(&Query::table("user")).await.unwrap());
        assert!(!executor.exists(&Query::table("user")).await.unwrap());
    }
}
