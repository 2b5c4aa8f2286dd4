//! # sqlweave-db
//!
//! Runs [`sqlweave_core`] queries against a database.
//!
//! Every statement goes through an [`Adapter`], which knows how to run
//! compiled SQL and return rows either as objects or as value tuples. A
//! [`QueryExecutor`] compiles a query, fires its callbacks, and shapes the
//! rows into the query's result shape. Adapters never open connections
//! themselves: [`PgAdapter`] is handed a pool and [`PgTransactionAdapter`]
//! an open transaction.
//!
//! ## Example
//!
//! ```rust,ignore
//! use sqlx::postgres::PgPoolOptions;
//! use sqlweave_core::query::{col, Compare, Query};
//! use sqlweave_db::{PgAdapter, QueryExecutor, TracingLog};
//!
//! let pool = PgPoolOptions::new().connect("postgres://localhost/app").await?;
//! let adapter = PgAdapter::new(pool);
//! let executor = QueryExecutor::new(&adapter).with_log(&TracingLog);
//!
//! let names = executor
//!     .run(&Query::table("user").filter([col("active").eq(true)]).pluck("name"))
//!     .await?;
//! ```

pub mod adapter;
pub mod error;
pub mod executor;
pub mod log;
pub mod memory;
pub mod postgres;

pub use adapter::{Adapter, ArraysResult, QueryResult};
pub use error::{DbError, Result};
pub use executor::QueryExecutor;
pub use log::{with_log, LoggedAdapter, QueryLog, TracingLog};
pub use memory::MemoryAdapter;
pub use postgres::{PgAdapter, PgTransactionAdapter};
