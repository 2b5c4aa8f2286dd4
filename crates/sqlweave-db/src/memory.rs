//! In-memory adapter for tests.
//!
//! Records every statement it receives and answers from a queue of scripted
//! responses. An empty queue answers with no rows.
//!
//! ```
//! use serde_json::json;
//! use sqlweave_core::Sql;
//! use sqlweave_db::{Adapter, MemoryAdapter};
//!
//! #[tokio::main]
//! async fn main() {
//!     let adapter = MemoryAdapter::new();
//!     adapter.respond(["id"], [vec![json!(1)]]);
//!
//!     let result = adapter.query(&Sql::text("SELECT id FROM t")).await.unwrap();
//!     assert_eq!(result.rows[0]["id"], json!(1));
//!     assert_eq!(adapter.statements()[0].text, "SELECT id FROM t");
//! }
//! ```

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use sqlweave_core::Sql;

use crate::adapter::{Adapter, ArraysResult, QueryResult};
use crate::error::{DbError, Result};

/// Adapter answering from memory.
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    statements: Mutex<Vec<Sql>>,
    responses: Mutex<VecDeque<Result<ArraysResult>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryAdapter {
    /// An adapter with no scripted responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response with the given columns and rows.
    pub fn respond<S: Into<String>>(
        &self,
        fields: impl IntoIterator<Item = S>,
        rows: impl IntoIterator<Item = Vec<Value>>,
    ) {
        let rows: Vec<Vec<Value>> = rows.into_iter().collect();
        lock(&self.responses).push_back(Ok(ArraysResult {
            row_count: rows.len() as u64,
            fields: fields.into_iter().map(Into::into).collect(),
            rows,
        }));
    }

    /// Queues a response that only reports an affected row count.
    pub fn respond_count(&self, row_count: u64) {
        lock(&self.responses).push_back(Ok(ArraysResult {
            row_count,
            ..ArraysResult::default()
        }));
    }

    /// Queues a failure.
    pub fn fail_with(&self, error: DbError) {
        lock(&self.responses).push_back(Err(error));
    }

    /// Statements received so far, in order.
    #[must_use]
    pub fn statements(&self) -> Vec<Sql> {
        lock(&self.statements).clone()
    }

    /// Texts of the statements received so far.
    #[must_use]
    pub fn texts(&self) -> Vec<String> {
        lock(&self.statements)
            .iter()
            .map(|sql| sql.text.clone())
            .collect()
    }

    fn next(&self, sql: &Sql) -> Result<ArraysResult> {
        lock(&self.statements).push(sql.clone());
        lock(&self.responses)
            .pop_front()
            .unwrap_or_else(|| Ok(ArraysResult::default()))
    }
}

#[async_trait]
impl Adapter for MemoryAdapter {
    async fn query(&self, sql: &Sql) -> Result<QueryResult> {
        self.next(sql).map(QueryResult::from)
    }

    async fn arrays(&self, sql: &Sql) -> Result<ArraysResult> {
        self.next(sql)
    }
}
