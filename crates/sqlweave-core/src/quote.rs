//! Identifier quoting and naming helpers.
//!
//! Identifiers are always double-quoted, with embedded `"` doubled, so user
//! supplied names can never terminate the quoted region.

/// Quotes a single identifier.
///
/// ```rust
/// use sqlweave_core::quote::quote_ident;
///
/// assert_eq!(quote_ident("user"), "\"user\"");
/// assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
/// ```
#[must_use]
pub fn quote_ident(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push('"');
    for ch in name.chars() {
        if ch == '"' {
            out.push('"');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

/// Quotes a possibly schema-qualified name such as `public.user`.
#[must_use]
pub fn quote_name(name: &str) -> String {
    let (schema, table) = split_schema(name);
    quote_with_schema(schema, table)
}

/// Quotes `name`, prefixed by `schema` when one is given.
#[must_use]
pub fn quote_with_schema(schema: Option<&str>, name: &str) -> String {
    match schema {
        Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(name)),
        None => quote_ident(name),
    }
}

/// Splits `schema.name` into its parts. Names without a dot have no schema.
#[must_use]
pub fn split_schema(name: &str) -> (Option<&str>, &str) {
    match name.split_once('.') {
        Some((schema, rest)) => (Some(schema), rest),
        None => (None, name),
    }
}

/// Quotes a column reference.
///
/// `alias.column` is quoted part by part and `*` is left bare. A plain
/// column is qualified with `quoted_as` when the query has a table.
#[must_use]
pub fn quote_column(column: &str, quoted_as: Option<&str>) -> String {
    if let Some((table, name)) = column.split_once('.') {
        let name = if name == "*" {
            String::from("*")
        } else {
            quote_ident(name)
        };
        return format!("{}.{name}", quote_ident(table));
    }

    let name = if column == "*" {
        String::from("*")
    } else {
        quote_ident(column)
    };

    match quoted_as {
        Some(alias) => format!("{alias}.{name}"),
        None => name,
    }
}

/// Converts a `camelCase` key to `snake_case`.
#[must_use]
pub fn to_snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            out.push('_');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
        assert_eq!(quote_ident("\""), "\"\"\"\"");
    }

    #[test]
    fn test_quote_ident_keeps_single_quotes() {
        assert_eq!(quote_ident("it's"), "\"it's\"");
    }

    #[test]
    fn test_quote_name_with_schema() {
        assert_eq!(quote_name("public.user"), "\"public\".\"user\"");
        assert_eq!(quote_name("user"), "\"user\"");
    }

    #[test]
    fn test_quote_column_qualification() {
        assert_eq!(quote_column("id", Some("\"user\"")), "\"user\".\"id\"");
        assert_eq!(quote_column("id", None), "\"id\"");
        assert_eq!(quote_column("p.bio", Some("\"user\"")), "\"p\".\"bio\"");
        assert_eq!(quote_column("p.*", None), "\"p\".*");
        assert_eq!(quote_column("*", Some("\"user\"")), "\"user\".*");
    }

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("createdAt"), "created_at");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
        assert_eq!(to_snake_case("userID"), "user_i_d");
    }
}
