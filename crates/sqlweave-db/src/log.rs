//! Query logging around adapter calls.
//!
//! A [`QueryLog`] sees every statement three ways: before it runs, after it
//! succeeds, and when it fails. Logging never changes the outcome; errors
//! are passed through untouched after `on_error` has seen them.

use std::time::Instant;

use async_trait::async_trait;
use sqlweave_core::Sql;
use tracing::{debug, error};

use crate::adapter::{Adapter, ArraysResult, QueryResult};
use crate::error::{DbError, Result};

/// Hooks invoked around each statement.
pub trait QueryLog: Send + Sync {
    /// Called before the statement runs; the returned instant is handed
    /// back to `after_query` or `on_error`.
    fn before_query(&self, _sql: &Sql) -> Instant {
        Instant::now()
    }

    /// Called after the statement succeeded.
    fn after_query(&self, sql: &Sql, started: Instant);

    /// Called after the statement failed.
    fn on_error(&self, error: &DbError, sql: &Sql, started: Instant);
}

/// Logs statements through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl QueryLog for TracingLog {
    fn after_query(&self, sql: &Sql, started: Instant) {
        debug!(
            sql = %sql.text,
            values = sql.values.len(),
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Query"
        );
    }

    fn on_error(&self, error: &DbError, sql: &Sql, started: Instant) {
        error!(
            sql = %sql.text,
            values = sql.values.len(),
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            error = %error,
            "Query failed"
        );
    }
}

/// Runs `run` between the hooks of `log`, or directly without one.
pub async fn with_log<T, F>(log: Option<&dyn QueryLog>, sql: &Sql, run: F) -> Result<T>
where
    F: std::future::Future<Output = Result<T>> + Send,
{
    let Some(log) = log else {
        return run.await;
    };
    let started = log.before_query(sql);
    match run.await {
        Ok(result) => {
            log.after_query(sql, started);
            Ok(result)
        }
        Err(err) => {
            log.on_error(&err, sql, started);
            Err(err)
        }
    }
}

/// An adapter whose calls are reported to a [`QueryLog`].
pub struct LoggedAdapter<'a> {
    adapter: &'a dyn Adapter,
    log: Option<&'a dyn QueryLog>,
}

impl<'a> LoggedAdapter<'a> {
    /// Wraps `adapter`; without a log, calls pass straight through.
    #[must_use]
    pub const fn new(adapter: &'a dyn Adapter, log: Option<&'a dyn QueryLog>) -> Self {
        Self { adapter, log }
    }

    /// The wrapped adapter, bypassing the log.
    #[must_use]
    pub const fn silent(&self) -> &'a dyn Adapter {
        self.adapter
    }
}

#[async_trait]
impl Adapter for LoggedAdapter<'_> {
    async fn query(&self, sql: &Sql) -> Result<QueryResult> {
        with_log(self.log, sql, self.adapter.query(sql)).await
    }

    async fn arrays(&self, sql: &Sql) -> Result<ArraysResult> {
        with_log(self.log, sql, self.adapter.arrays(sql)).await
    }
}
