//! The adapter boundary every statement goes through.

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlweave_core::Sql;

use crate::error::Result;

/// Rows decoded as objects keyed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// Rows returned or affected.
    pub row_count: u64,
    /// Column names, in select order.
    pub fields: Vec<String>,
    /// Rows.
    pub rows: Vec<Map<String, Value>>,
}

/// Rows decoded as value tuples in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArraysResult {
    /// Rows returned or affected.
    pub row_count: u64,
    /// Column names, in select order.
    pub fields: Vec<String>,
    /// Rows.
    pub rows: Vec<Vec<Value>>,
}

impl From<ArraysResult> for QueryResult {
    fn from(result: ArraysResult) -> Self {
        let rows = result
            .rows
            .into_iter()
            .map(|row| result.fields.iter().cloned().zip(row).collect())
            .collect();
        Self {
            row_count: result.row_count,
            fields: result.fields,
            rows,
        }
    }
}

/// Runs compiled SQL against a database.
///
/// Implementations never build connections on behalf of the caller; a
/// pool or an open transaction is handed in.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Runs `sql` and returns rows as objects.
    async fn query(&self, sql: &Sql) -> Result<QueryResult>;

    /// Runs `sql` and returns rows as value tuples.
    async fn arrays(&self, sql: &Sql) -> Result<ArraysResult>;
}

#[async_trait]
impl<A: Adapter + ?Sized> Adapter for &A {
    async fn query(&self, sql: &Sql) -> Result<QueryResult> {
        (**self).query(sql).await
    }

    async fn arrays(&self, sql: &Sql) -> Result<ArraysResult> {
        (**self).arrays(sql).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_arrays_convert_to_objects() {
        let arrays = ArraysResult {
            row_count: 1,
            fields: vec![String::from("id"), String::from("name")],
            rows: vec![vec![json!(1), json!("Ann")]],
        };
        let result = QueryResult::from(arrays);
        assert_eq!(Value::Object(result.rows[0].clone()), json!({"id": 1, "name": "Ann"}));
        assert_eq!(result.fields, ["id", "name"]);
    }
}
