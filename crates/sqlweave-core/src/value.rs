//! SQL values and parameter handling.
//!
//! Values travel to the database through the positional parameter list. DDL
//! cannot take bound parameters, so values used there are rendered as
//! escaped literals with [`SqlValue::to_sql_inline`].

use std::fmt::Write as _;

/// A SQL value that can be used as a parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Binary value (`bytea`).
    Bytes(Vec<u8>),
    /// JSON document (`json`/`jsonb`).
    Json(serde_json::Value),
    /// Postgres array.
    Array(Vec<SqlValue>),
}

impl SqlValue {
    /// Returns the Postgres literal for inline use.
    ///
    /// **Warning**: Prefer parameters. This exists for DDL, where Postgres
    /// does not accept bound values.
    #[must_use]
    pub fn to_sql_inline(&self) -> String {
        match self {
            Self::Null => String::from("NULL"),
            Self::Bool(b) => {
                if *b {
                    String::from("true")
                } else {
                    String::from("false")
                }
            }
            Self::Int(n) => format!("{n}"),
            Self::Float(f) => {
                if f.is_finite() {
                    format!("{f}")
                } else if f.is_nan() {
                    String::from("'NaN'")
                } else if f.is_sign_positive() {
                    String::from("'Infinity'")
                } else {
                    String::from("'-Infinity'")
                }
            }
            Self::Text(s) => quote_literal(s),
            Self::Bytes(b) => {
                let mut hex = String::with_capacity(b.len() * 2);
                for byte in b {
                    let _ = write!(hex, "{byte:02x}");
                }
                format!("'\\x{hex}'::bytea")
            }
            Self::Json(value) => quote_literal(&value.to_string()),
            Self::Array(items) => {
                if items.is_empty() {
                    String::from("'{}'")
                } else {
                    let items: Vec<String> = items.iter().map(Self::to_sql_inline).collect();
                    format!("ARRAY[{}]", items.join(", "))
                }
            }
        }
    }

    /// Returns true for [`SqlValue::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Quotes a string literal.
///
/// Single quotes are doubled. Strings containing a backslash use the `E'..'`
/// form with the backslashes doubled, so the result reads back the same
/// regardless of `standard_conforming_strings`.
#[must_use]
pub fn quote_literal(s: &str) -> String {
    let escaped = s.replace('\'', "''");
    if escaped.contains('\\') {
        format!("E'{}'", escaped.replace('\\', "\\\\"))
    } else {
        format!("'{escaped}'")
    }
}

/// Appends `value` to the parameter list and returns its `$n` placeholder.
pub fn push_value(values: &mut Vec<SqlValue>, value: SqlValue) -> String {
    values.push(value);
    format!("${}", values.len())
}

/// Trait for types that can be converted to SQL values.
pub trait ToSqlValue {
    /// Converts the value to a `SqlValue`.
    fn to_sql_value(self) -> SqlValue;
}

impl ToSqlValue for SqlValue {
    fn to_sql_value(self) -> SqlValue {
        self
    }
}

impl ToSqlValue for bool {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Bool(self)
    }
}

impl ToSqlValue for i64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(self)
    }
}

impl ToSqlValue for i32 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(i64::from(self))
    }
}

impl ToSqlValue for i16 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(i64::from(self))
    }
}

impl ToSqlValue for u32 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(i64::from(self))
    }
}

impl ToSqlValue for u16 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(i64::from(self))
    }
}

impl ToSqlValue for f64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float(self)
    }
}

impl ToSqlValue for f32 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float(f64::from(self))
    }
}

impl ToSqlValue for String {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self)
    }
}

impl ToSqlValue for &str {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(String::from(self))
    }
}

impl ToSqlValue for &String {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self.clone())
    }
}

impl ToSqlValue for serde_json::Value {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Json(self)
    }
}

impl<T: ToSqlValue> ToSqlValue for Option<T> {
    fn to_sql_value(self) -> SqlValue {
        match self {
            Some(v) => v.to_sql_value(),
            None => SqlValue::Null,
        }
    }
}

impl ToSqlValue for Vec<u8> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Bytes(self)
    }
}

impl ToSqlValue for &[u8] {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Bytes(self.to_vec())
    }
}

impl ToSqlValue for Vec<i64> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Array(self.into_iter().map(SqlValue::Int).collect())
    }
}

impl ToSqlValue for Vec<String> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Array(self.into_iter().map(SqlValue::Text).collect())
    }
}

impl ToSqlValue for Vec<&str> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Array(self.into_iter().map(ToSqlValue::to_sql_value).collect())
    }
}
