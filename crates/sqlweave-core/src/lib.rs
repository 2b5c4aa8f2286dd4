//! # sqlweave-core
//!
//! An immutable Postgres query builder and a reversible schema-change
//! compiler.
//!
//! This crate provides:
//! - A chainable query state that compiles to SQL text plus positional
//!   parameters
//! - A table-change differ that turns declarative column changes into
//!   ordered DDL, with an exact inverse for rollback
//!
//! Nothing here touches a database; execution lives in `sqlweave-db` and
//! `sqlweave-migrate`.
//!
//! ## Building queries
//!
//! ```rust
//! use sqlweave_core::query::{col, Compare, Query};
//! use sqlweave_core::SqlValue;
//!
//! let sql = Query::table("user")
//!     .select(["id", "name"])
//!     .filter([col("id").gt(0)])
//!     .to_sql()
//!     .unwrap();
//!
//! assert_eq!(
//!     sql.text,
//!     r#"SELECT "user"."id", "user"."name" FROM "user" WHERE "user"."id" > $1"#
//! );
//! assert_eq!(sql.values, [SqlValue::Int(0)]);
//! ```
//!
//! ## SQL injection prevention
//!
//! Values only ever travel through the parameter list, and identifiers are
//! always quoted:
//!
//! ```rust
//! use sqlweave_core::query::{col, Compare, Query};
//!
//! let user_input = "'; DROP TABLE users; --";
//! let sql = Query::table("users")
//!     .select(["id"])
//!     .filter([col("name").eq(user_input)])
//!     .to_sql()
//!     .unwrap();
//!
//! assert_eq!(
//!     sql.text,
//!     r#"SELECT "users"."id" FROM "users" WHERE "users"."name" = $1"#
//! );
//! ```

pub mod error;
pub mod migrations;
pub mod query;
pub mod quote;
pub mod raw;
mod sql;
pub mod value;

pub use error::{BuildError, Result};
pub use query::Query;
pub use raw::{raw, raw_with, RawSql, Sql};
pub use value::{SqlValue, ToSqlValue};
