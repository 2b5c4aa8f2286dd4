//! PostgreSQL adapters backed by sqlx.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures::TryStreamExt;
use serde_json::Value;
use sqlweave_core::{Sql, SqlValue};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Either, Executor, PgPool, Postgres, Row, Transaction, TypeInfo};
use tokio::sync::Mutex;
use tracing::debug;

use crate::adapter::{Adapter, ArraysResult, QueryResult};
use crate::error::{DbError, Result};

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// Adapter running each statement on a pooled connection.
#[derive(Debug, Clone)]
pub struct PgAdapter {
    pool: PgPool,
}

impl PgAdapter {
    /// Wraps a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Starts a transaction; the caller commits or rolls it back.
    pub async fn begin(&self) -> Result<PgTransactionAdapter> {
        Ok(PgTransactionAdapter::new(self.pool.begin().await?))
    }
}

#[async_trait]
impl Adapter for PgAdapter {
    async fn query(&self, sql: &Sql) -> Result<QueryResult> {
        self.arrays(sql).await.map(QueryResult::from)
    }

    async fn arrays(&self, sql: &Sql) -> Result<ArraysResult> {
        run(&self.pool, sql).await
    }
}

/// Adapter running every statement inside one transaction.
///
/// All statements share the transaction's connection. Dropping the adapter
/// without committing rolls the transaction back.
pub struct PgTransactionAdapter {
    tx: Mutex<Option<Transaction<'static, Postgres>>>,
}

impl PgTransactionAdapter {
    /// Wraps an open transaction.
    #[must_use]
    pub fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self {
            tx: Mutex::new(Some(tx)),
        }
    }

    /// Commits the transaction.
    pub async fn commit(&self) -> Result<()> {
        let tx = self
            .tx
            .lock()
            .await
            .take()
            .ok_or(DbError::TransactionFinished)?;
        tx.commit().await?;
        Ok(())
    }

    /// Rolls the transaction back.
    pub async fn rollback(&self) -> Result<()> {
        let tx = self
            .tx
            .lock()
            .await
            .take()
            .ok_or(DbError::TransactionFinished)?;
        tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl Adapter for PgTransactionAdapter {
    async fn query(&self, sql: &Sql) -> Result<QueryResult> {
        self.arrays(sql).await.map(QueryResult::from)
    }

    async fn arrays(&self, sql: &Sql) -> Result<ArraysResult> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or(DbError::TransactionFinished)?;
        run(&mut **tx, sql).await
    }
}

/// Runs one statement, collecting its rows and affected row count.
async fn run<'c, E>(executor: E, sql: &'c Sql) -> Result<ArraysResult>
where
    E: Executor<'c, Database = Postgres>,
{
    let mut query = sqlx::query(&sql.text);
    for value in &sql.values {
        query = bind_value(query, value);
    }

    let mut result = ArraysResult::default();
    let mut stream = executor.fetch_many(query);
    while let Some(item) = stream.try_next().await? {
        match item {
            Either::Left(done) => result.row_count += done.rows_affected(),
            Either::Right(row) => {
                if result.fields.is_empty() {
                    result.fields = row.columns().iter().map(|c| String::from(c.name())).collect();
                }
                result.rows.push(convert_row(&row));
            }
        }
    }
    Ok(result)
}

fn bind_value<'q>(query: PgQuery<'q>, value: &'q SqlValue) -> PgQuery<'q> {
    match value {
        SqlValue::Null => query.bind(None::<i32>),
        SqlValue::Bool(b) => query.bind(b),
        SqlValue::Int(i) => query.bind(i),
        SqlValue::Float(f) => query.bind(f),
        SqlValue::Text(s) => query.bind(s),
        SqlValue::Bytes(b) => query.bind(b),
        SqlValue::Json(json) => query.bind(json),
        SqlValue::Array(items) => bind_array(query, items),
    }
}

/// Binds a homogeneous array as a typed Postgres array, anything else as JSON.
fn bind_array<'q>(query: PgQuery<'q>, items: &'q [SqlValue]) -> PgQuery<'q> {
    if let Some(ints) = collect(items, |v| match v {
        SqlValue::Int(i) => Some(*i),
        _ => None,
    }) {
        return query.bind(ints);
    }
    if let Some(floats) = collect(items, |v| match v {
        SqlValue::Float(f) => Some(*f),
        _ => None,
    }) {
        return query.bind(floats);
    }
    if let Some(bools) = collect(items, |v| match v {
        SqlValue::Bool(b) => Some(*b),
        _ => None,
    }) {
        return query.bind(bools);
    }
    if let Some(texts) = collect(items, |v| match v {
        SqlValue::Text(s) => Some(s.clone()),
        _ => None,
    }) {
        return query.bind(texts);
    }
    query.bind(Value::Array(items.iter().map(to_json).collect()))
}

fn collect<T>(items: &[SqlValue], pick: impl Fn(&SqlValue) -> Option<T>) -> Option<Vec<T>> {
    items.iter().map(pick).collect()
}

fn to_json(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Bool(b) => Value::from(*b),
        SqlValue::Int(i) => Value::from(*i),
        SqlValue::Float(f) => Value::from(*f),
        SqlValue::Text(s) => Value::from(s.as_str()),
        SqlValue::Bytes(b) => Value::from(hex(b)),
        SqlValue::Json(json) => json.clone(),
        SqlValue::Array(items) => Value::Array(items.iter().map(to_json).collect()),
    }
}

fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("\\x");
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

fn convert_row(row: &PgRow) -> Vec<Value> {
    (0..row.columns().len())
        .map(|index| convert_cell(row, index))
        .collect()
}

/// Decodes one cell by its Postgres type name.
fn convert_cell(row: &PgRow, index: usize) -> Value {
    let column = &row.columns()[index];
    let decoded = match column.type_info().name() {
        "BOOL" => decode::<bool>(row, index, Value::from),
        "INT2" => decode::<i16>(row, index, Value::from),
        "INT4" => decode::<i32>(row, index, Value::from),
        "INT8" => decode::<i64>(row, index, Value::from),
        "FLOAT4" => decode::<f32>(row, index, Value::from),
        "FLOAT8" => decode::<f64>(row, index, Value::from),
        "JSON" | "JSONB" => decode::<Value>(row, index, std::convert::identity),
        "BYTEA" => decode::<Vec<u8>>(row, index, |b| Value::from(hex(&b))),
        "TIMESTAMPTZ" => {
            decode::<DateTime<Utc>>(row, index, |t| Value::from(t.to_rfc3339()))
        }
        "TIMESTAMP" => decode::<NaiveDateTime>(row, index, |t| Value::from(t.to_string())),
        "DATE" => decode::<NaiveDate>(row, index, |d| Value::from(d.to_string())),
        "TIME" => decode::<NaiveTime>(row, index, |t| Value::from(t.to_string())),
        "INT4[]" => decode::<Vec<i32>>(row, index, Value::from),
        "INT8[]" => decode::<Vec<i64>>(row, index, Value::from),
        "TEXT[]" | "VARCHAR[]" => decode::<Vec<String>>(row, index, Value::from),
        "BOOL[]" => decode::<Vec<bool>>(row, index, Value::from),
        _ => None,
    };
    decoded.unwrap_or_else(|| {
        // Text-like types (text, varchar, name, enums) arrive as UTF-8.
        row.try_get_unchecked::<Option<String>, _>(index)
            .map_or_else(
                |err| {
                    debug!(
                        column = column.name(),
                        type_name = column.type_info().name(),
                        error = %err,
                        "Undecodable column, returning null"
                    );
                    Value::Null
                },
                |text| text.map_or(Value::Null, Value::from),
            )
    })
}

fn decode<'r, T>(row: &'r PgRow, index: usize, convert: impl Fn(T) -> Value) -> Option<Value>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get::<Option<T>, _>(index)
        .ok()
        .map(|value| value.map_or(Value::Null, convert))
}
