//! Column type factories.
//!
//! ```rust
//! use sqlweave_core::migrations::types::{integer, text};
//!
//! let id = integer().primary_key();
//! let name = text().not_null().default("anonymous");
//! assert_eq!(id.data_type, "integer");
//! assert!(!name.nullable);
//! ```

use super::column::{ColumnType, Identity};
use crate::quote::quote_name;
use crate::raw::raw;

/// `smallint`
#[must_use]
pub fn smallint() -> ColumnType {
    ColumnType::new("smallint")
}

/// `integer`
#[must_use]
pub fn integer() -> ColumnType {
    ColumnType::new("integer")
}

/// `bigint`
#[must_use]
pub fn bigint() -> ColumnType {
    ColumnType::new("bigint")
}

/// `serial`
#[must_use]
pub fn serial() -> ColumnType {
    ColumnType::new("serial").not_null()
}

/// `bigserial`
#[must_use]
pub fn bigserial() -> ColumnType {
    ColumnType::new("bigserial").not_null()
}

/// `decimal`, with optional precision and scale.
#[must_use]
pub fn decimal(precision: Option<u32>, scale: Option<u32>) -> ColumnType {
    match (precision, scale) {
        (Some(p), Some(s)) => ColumnType::new(format!("decimal({p}, {s})")),
        (Some(p), None) => ColumnType::new(format!("decimal({p})")),
        _ => ColumnType::new("decimal"),
    }
}

/// `real`
#[must_use]
pub fn real() -> ColumnType {
    ColumnType::new("real")
}

/// `double precision`
#[must_use]
pub fn double_precision() -> ColumnType {
    ColumnType::new("double precision")
}

/// `boolean`
#[must_use]
pub fn boolean() -> ColumnType {
    ColumnType::new("boolean")
}

/// `text`
#[must_use]
pub fn text() -> ColumnType {
    ColumnType::new("text")
}

/// `varchar`, with an optional length limit.
#[must_use]
pub fn varchar(limit: Option<u32>) -> ColumnType {
    match limit {
        Some(n) => ColumnType::new(format!("varchar({n})")),
        None => ColumnType::new("varchar"),
    }
}

/// `char(n)`
#[must_use]
pub fn char(length: u32) -> ColumnType {
    ColumnType::new(format!("char({length})"))
}

/// `uuid`
#[must_use]
pub fn uuid() -> ColumnType {
    ColumnType::new("uuid")
}

/// `date`
#[must_use]
pub fn date() -> ColumnType {
    ColumnType::new("date")
}

/// `timestamp` (without time zone).
#[must_use]
pub fn timestamp() -> ColumnType {
    ColumnType::new("timestamp")
}

/// `timestamptz`
#[must_use]
pub fn timestamptz() -> ColumnType {
    ColumnType::new("timestamptz")
}

/// `time`
#[must_use]
pub fn time() -> ColumnType {
    ColumnType::new("time")
}

/// `json`
#[must_use]
pub fn json() -> ColumnType {
    ColumnType::new("json")
}

/// `jsonb`
#[must_use]
pub fn jsonb() -> ColumnType {
    ColumnType::new("jsonb")
}

/// `bytea`
#[must_use]
pub fn bytea() -> ColumnType {
    ColumnType::new("bytea")
}

/// A column of enum type `name` (optionally `schema.name`).
///
/// The values are optional; when unknown they are read back from the
/// database while migrating.
#[must_use]
pub fn enum_type<S: Into<String>>(name: &str, values: impl IntoIterator<Item = S>) -> ColumnType {
    let mut column = ColumnType::new(quote_name(name));
    column.enum_name = Some(String::from(name));
    column.enum_values = values.into_iter().map(Into::into).collect();
    column
}

/// A column of a user-defined type; the type name is quoted in DDL.
#[must_use]
pub fn custom_type(name: &str) -> ColumnType {
    let mut column = ColumnType::new(name);
    column.custom = true;
    column
}

/// A column of a domain type.
#[must_use]
pub fn domain(name: &str) -> ColumnType {
    custom_type(name)
}

/// An `integer GENERATED BY DEFAULT AS IDENTITY` column.
#[must_use]
pub fn identity() -> ColumnType {
    integer().identity(Identity::by_default())
}

/// The `created_at`/`updated_at` pair, both `timestamptz NOT NULL DEFAULT now()`.
#[must_use]
pub fn timestamps() -> Vec<(String, ColumnType)> {
    ["created_at", "updated_at"]
        .into_iter()
        .map(|key| {
            (
                String::from(key),
                timestamptz().not_null().default(raw("now()")),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameterized_types() {
        assert_eq!(varchar(Some(255)).data_type, "varchar(255)");
        assert_eq!(varchar(None).data_type, "varchar");
        assert_eq!(decimal(Some(10), Some(2)).data_type, "decimal(10, 2)");
        assert_eq!(char(3).data_type, "char(3)");
    }

    #[test]
    fn test_enum_type_is_quoted() {
        let column = enum_type("app.mood", ["sad", "happy"]);
        assert_eq!(column.data_type, "\"app\".\"mood\"");
        assert_eq!(column.enum_name.as_deref(), Some("app.mood"));
        assert!(column.is_enum());
        assert!(!column.custom);
    }

    #[test]
    fn test_timestamps_pair() {
        let pair = timestamps();
        assert_eq!(pair[0].0, "created_at");
        assert_eq!(pair[1].0, "updated_at");
        assert!(!pair[0].1.nullable);
        assert_eq!(pair[1].1.data_type, "timestamptz");
    }

    #[test]
    fn test_identity_column() {
        let column = identity();
        assert!(column.identity.is_some());
        assert!(!column.nullable);
    }
}
