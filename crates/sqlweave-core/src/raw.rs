//! Compiled SQL and raw SQL fragments.

use crate::error::{BuildError, Result};
use crate::value::{push_value, SqlValue, ToSqlValue};

/// Compiled SQL: text with `$1..$n` placeholders and the matching values.
///
/// `values[i - 1]` is bound to placeholder `$i`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sql {
    /// SQL text.
    pub text: String,
    /// Positional parameters.
    pub values: Vec<SqlValue>,
}

impl Sql {
    /// Creates SQL with parameters.
    #[must_use]
    pub fn new(text: impl Into<String>, values: Vec<SqlValue>) -> Self {
        Self {
            text: text.into(),
            values,
        }
    }

    /// Creates SQL without parameters.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(text, Vec::new())
    }
}

impl From<&str> for Sql {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

impl From<String> for Sql {
    fn from(text: String) -> Self {
        Self::text(text)
    }
}

/// A hand-written SQL fragment with its own local parameters.
///
/// Placeholders inside the fragment are numbered from `$1` regardless of
/// where the fragment ends up; they are renumbered when spliced into a
/// larger statement.
///
/// ```rust
/// use sqlweave_core::raw::{raw_with, RawSql};
/// use sqlweave_core::value::SqlValue;
///
/// let fragment = raw_with("age > $1", [18]);
/// let mut values = vec![SqlValue::Text("x".into())];
/// assert_eq!(fragment.render(&mut values).unwrap(), "age > $2");
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawSql {
    /// Fragment text.
    pub text: String,
    /// Values for the fragment's local placeholders.
    pub values: Vec<SqlValue>,
}

/// Creates a raw fragment without parameters.
#[must_use]
pub fn raw(text: impl Into<String>) -> RawSql {
    RawSql {
        text: text.into(),
        values: Vec::new(),
    }
}

/// Creates a raw fragment with local parameters.
#[must_use]
pub fn raw_with<V: ToSqlValue>(text: impl Into<String>, values: impl IntoIterator<Item = V>) -> RawSql {
    RawSql {
        text: text.into(),
        values: values.into_iter().map(ToSqlValue::to_sql_value).collect(),
    }
}

impl RawSql {
    /// Splices the fragment into a statement whose parameters are `values`.
    pub fn render(&self, values: &mut Vec<SqlValue>) -> Result<String> {
        rewrite_placeholders(&self.text, |index| {
            let value = self.value_at(index)?;
            Ok(push_value(values, value.clone()))
        })
    }

    /// Renders the fragment with its values inlined as literals.
    pub fn render_inline(&self) -> Result<String> {
        rewrite_placeholders(&self.text, |index| {
            Ok(self.value_at(index)?.to_sql_inline())
        })
    }

    fn value_at(&self, index: usize) -> Result<&SqlValue> {
        index
            .checked_sub(1)
            .and_then(|i| self.values.get(i))
            .ok_or(BuildError::RawPlaceholder {
                index,
                available: self.values.len(),
            })
    }
}

impl From<&str> for RawSql {
    fn from(text: &str) -> Self {
        raw(text)
    }
}

impl From<String> for RawSql {
    fn from(text: String) -> Self {
        raw(text)
    }
}

/// Rewrites every `$n` outside of quoted regions through `replace`.
///
/// Single-quoted strings, double-quoted identifiers and dollar-quoted bodies
/// are copied verbatim.
fn rewrite_placeholders(
    text: &str,
    mut replace: impl FnMut(usize) -> Result<String>,
) -> Result<String> {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    let mut copied = 0;

    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    i += 1;
                }
                i += 1;
            }
            b'$' => {
                let start = i;
                let mut end = i + 1;
                while end < bytes.len() && bytes[end].is_ascii_digit() {
                    end += 1;
                }
                if end > start + 1 {
                    let index: usize = text[start + 1..end].parse().unwrap_or(0);
                    out.push_str(&text[copied..start]);
                    out.push_str(&replace(index)?);
                    copied = end;
                    i = end;
                    continue;
                }

                match dollar_tag(&text[start..]) {
                    Some(tag) => {
                        let body_start = start + tag.len();
                        i = text[body_start..]
                            .find(tag)
                            .map_or(bytes.len(), |pos| body_start + pos + tag.len());
                    }
                    None => i += 1,
                }
            }
            _ => i += 1,
        }
    }

    out.push_str(&text[copied.min(text.len())..]);
    Ok(out)
}

/// Returns the `$tag$` opening a dollar-quoted string at the start of `s`.
fn dollar_tag(s: &str) -> Option<&str> {
    let rest = &s[1..];
    let close = rest.find('$')?;
    let tag = &rest[..close];
    let valid = tag
        .chars()
        .enumerate()
        .all(|(i, c)| c == '_' || c.is_ascii_alphabetic() || (i > 0 && c.is_ascii_digit()));
    valid.then(|| &s[..close + 2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_renumbers_after_existing_values() {
        let fragment = raw_with("a = $1 AND b = $2", [1, 2]);
        let mut values = vec![SqlValue::Int(0)];
        let sql = fragment.render(&mut values).unwrap();
        assert_eq!(sql, "a = $2 AND b = $3");
        assert_eq!(values, vec![SqlValue::Int(0), SqlValue::Int(1), SqlValue::Int(2)]);
    }

    #[test]
    fn test_render_skips_quoted_regions() {
        let fragment = raw_with("x = '$1' AND \"$2\" = $1 AND $q$ $1 $q$ = y", ["v"]);
        let mut values = Vec::new();
        let sql = fragment.render(&mut values).unwrap();
        assert_eq!(sql, "x = '$1' AND \"$2\" = $1 AND $q$ $1 $q$ = y");
        assert_eq!(values, vec![SqlValue::Text(String::from("v"))]);
    }

    #[test]
    fn test_render_inline_uses_literals() {
        let fragment = raw_with("length(name) > $1 AND kind <> $2", [
            SqlValue::Int(3),
            SqlValue::Text(String::from("it's")),
        ]);
        assert_eq!(
            fragment.render_inline().unwrap(),
            "length(name) > 3 AND kind <> 'it''s'"
        );
    }

    #[test]
    fn test_missing_placeholder_value_is_an_error() {
        let fragment = raw("a = $2");
        let err = fragment.render(&mut Vec::new()).unwrap_err();
        assert_eq!(err, BuildError::RawPlaceholder { index: 2, available: 0 });
    }

    #[test]
    fn test_lone_dollar_is_copied() {
        assert_eq!(raw("price $ x").render_inline().unwrap(), "price $ x");
    }
}
