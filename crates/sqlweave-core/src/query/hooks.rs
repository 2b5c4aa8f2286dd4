//! Column parsers and query callbacks.
//!
//! Both are stored on the query state and shared by clones; the executor in
//! `sqlweave-db` applies them.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::{chain, Query};

type ParseFn = dyn Fn(Value) -> Value + Send + Sync;
type HookFn = dyn Fn(&Query, Option<&Value>) + Send + Sync;

/// Decoder applied to one output column of every returned row.
#[derive(Clone)]
pub struct ColumnParser(Arc<ParseFn>);

impl ColumnParser {
    /// Wraps a decoding function.
    pub fn new(parse: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        Self(Arc::new(parse))
    }

    /// Decodes one value.
    #[must_use]
    pub fn parse(&self, value: Value) -> Value {
        (self.0)(value)
    }
}

impl fmt::Debug for ColumnParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ColumnParser")
    }
}

/// When a callback fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPoint {
    /// Before any statement.
    BeforeQuery,
    /// After any statement, with its output.
    AfterQuery,
    /// Before an INSERT.
    BeforeInsert,
    /// After an INSERT.
    AfterInsert,
    /// Before an UPDATE.
    BeforeUpdate,
    /// After an UPDATE.
    AfterUpdate,
    /// Before a DELETE.
    BeforeDelete,
    /// After a DELETE.
    AfterDelete,
}

/// Callback receiving the query and, for `After*` points, the output.
#[derive(Clone)]
pub struct QueryHook(Arc<HookFn>);

impl QueryHook {
    /// Wraps a callback.
    pub fn new(hook: impl Fn(&Query, Option<&Value>) + Send + Sync + 'static) -> Self {
        Self(Arc::new(hook))
    }

    /// Invokes the callback.
    pub fn call(&self, query: &Query, output: Option<&Value>) {
        (self.0)(query, output);
    }
}

impl fmt::Debug for QueryHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("QueryHook")
    }
}

impl Query {
    chain! {
        /// Registers a decoder for an output column.
        parse => parse_mut(column: &str, parser: ColumnParser)
    }

    /// Registers a decoder in place.
    pub fn parse_mut(&mut self, column: &str, parser: ColumnParser) -> &mut Self {
        self.data.parsers.insert(String::from(column), parser);
        self
    }

    chain! {
        /// Registers a callback.
        hook => hook_mut(point: HookPoint, hook: QueryHook)
    }

    /// Registers a callback in place.
    pub fn hook_mut(&mut self, point: HookPoint, hook: QueryHook) -> &mut Self {
        self.data.hooks.push((point, hook));
        self
    }

    /// Callback fired before the statement runs.
    #[must_use]
    pub fn before_query(&self, hook: impl Fn(&Self) + Send + Sync + 'static) -> Self {
        self.hook(HookPoint::BeforeQuery, QueryHook::new(move |q, _| hook(q)))
    }

    /// Callback fired after the statement ran, with its output.
    #[must_use]
    pub fn after_query(&self, hook: impl Fn(&Self, &Value) + Send + Sync + 'static) -> Self {
        self.hook(HookPoint::AfterQuery, after(hook))
    }

    /// Callback fired before an INSERT runs.
    #[must_use]
    pub fn before_insert(&self, hook: impl Fn(&Self) + Send + Sync + 'static) -> Self {
        self.hook(HookPoint::BeforeInsert, QueryHook::new(move |q, _| hook(q)))
    }

    /// Callback fired after an INSERT ran.
    #[must_use]
    pub fn after_insert(&self, hook: impl Fn(&Self, &Value) + Send + Sync + 'static) -> Self {
        self.hook(HookPoint::AfterInsert, after(hook))
    }

    /// Callback fired before an UPDATE runs.
    #[must_use]
    pub fn before_update(&self, hook: impl Fn(&Self) + Send + Sync + 'static) -> Self {
        self.hook(HookPoint::BeforeUpdate, QueryHook::new(move |q, _| hook(q)))
    }

    /// Callback fired after an UPDATE ran.
    #[must_use]
    pub fn after_update(&self, hook: impl Fn(&Self, &Value) + Send + Sync + 'static) -> Self {
        self.hook(HookPoint::AfterUpdate, after(hook))
    }

    /// Callback fired before a DELETE runs.
    #[must_use]
    pub fn before_delete(&self, hook: impl Fn(&Self) + Send + Sync + 'static) -> Self {
        self.hook(HookPoint::BeforeDelete, QueryHook::new(move |q, _| hook(q)))
    }

    /// Callback fired after a DELETE ran.
    #[must_use]
    pub fn after_delete(&self, hook: impl Fn(&Self, &Value) + Send + Sync + 'static) -> Self {
        self.hook(HookPoint::AfterDelete, after(hook))
    }

    /// Returns the callbacks registered for `point`, in registration order.
    pub fn hooks_for(&self, point: HookPoint) -> impl Iterator<Item = &QueryHook> {
        self.data
            .hooks
            .iter()
            .filter(move |(p, _)| *p == point)
            .map(|(_, hook)| hook)
    }
}

fn after(hook: impl Fn(&Query, &Value) + Send + Sync + 'static) -> QueryHook {
    QueryHook::new(move |query, output| hook(query, output.unwrap_or(&Value::Null)))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_parser_applies_function() {
        let parser = ColumnParser::new(|v| Value::from(v.as_i64().unwrap_or(0) * 2));
        assert_eq!(parser.parse(Value::from(21)), Value::from(42));
    }

    #[test]
    fn test_hooks_are_filtered_by_point() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let query = Query::table("user")
            .before_query(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .after_query(|_, _| {});

        for hook in query.hooks_for(HookPoint::BeforeQuery) {
            hook.call(&query, None);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(query.hooks_for(HookPoint::AfterQuery).count(), 1);
        assert_eq!(query.hooks_for(HookPoint::AfterInsert).count(), 0);
    }
}
