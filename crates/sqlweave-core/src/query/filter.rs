//! WHERE builders.
//!
//! `filter` items are AND-ed. `or_filter` adds alternatives: every item
//! becomes its own AND-group, and the groups (together with the AND-ed
//! items) are OR-ed. An [`and`](super::and) item passed to `or_filter`
//! is one group holding all of its items.

use super::predicate::WhereItem;
use super::{chain, Query};
use crate::raw::RawSql;

impl Query {
    chain! {
        /// Adds conditions that must all hold.
        filter => filter_mut(items: impl IntoIterator<Item = WhereItem>)
    }

    /// Adds conditions that must all hold, in place.
    pub fn filter_mut(&mut self, items: impl IntoIterator<Item = WhereItem>) -> &mut Self {
        self.data.and.extend(items);
        self
    }

    chain! {
        /// Adds alternatives, one group per item.
        or_filter => or_filter_mut(items: impl IntoIterator<Item = WhereItem>)
    }

    /// Adds alternatives in place.
    pub fn or_filter_mut(&mut self, items: impl IntoIterator<Item = WhereItem>) -> &mut Self {
        self.data.or.extend(items.into_iter().map(|item| match item {
            WhereItem::And(group) => group,
            item => vec![item],
        }));
        self
    }

    chain! {
        /// Adds `NOT (a AND b ..)` for the given items.
        exclude => exclude_mut(items: impl IntoIterator<Item = WhereItem>)
    }

    /// Adds a negated AND-group in place.
    pub fn exclude_mut(&mut self, items: impl IntoIterator<Item = WhereItem>) -> &mut Self {
        self.data.and.push(WhereItem::Not(items.into_iter().collect()));
        self
    }

    chain! {
        /// Adds `EXISTS (query)`.
        filter_exists => filter_exists_mut(query: Query)
    }

    /// Adds `EXISTS (query)` in place.
    pub fn filter_exists_mut(&mut self, query: Query) -> &mut Self {
        self.data.and.push(WhereItem::Exists(Box::new(query)));
        self
    }

    chain! {
        /// Adds a raw boolean fragment.
        filter_raw => filter_raw_mut(raw: RawSql)
    }

    /// Adds a raw boolean fragment in place.
    pub fn filter_raw_mut(&mut self, raw: RawSql) -> &mut Self {
        self.data.and.push(WhereItem::Raw(raw));
        self
    }

    /// Returns true when any WHERE condition is set.
    #[must_use]
    pub fn has_conditions(&self) -> bool {
        !self.data.and.is_empty() || !self.data.or.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::query::{and, col, Compare, Query};
    use crate::raw::raw_with;

    #[test]
    fn test_or_filter_adds_one_group_per_item() {
        let query = Query::table("user").or_filter([col("a").eq(1), col("b").eq(2)]);
        assert_eq!(query.data().or.len(), 2);
        assert!(query.data().and.is_empty());
    }

    #[test]
    fn test_or_filter_and_item_is_one_group() {
        let query = Query::table("user").or_filter([and([col("a").eq(1), col("b").eq(2)])]);
        assert_eq!(query.data().or.len(), 1);
        assert_eq!(query.data().or[0].len(), 2);
    }

    #[test]
    fn test_filter_raw_and_exists_are_and_items() {
        let sub = Query::table("post");
        let query = Query::table("user")
            .filter_raw(raw_with("age > $1", [18]))
            .filter_exists(sub);
        assert_eq!(query.data().and.len(), 2);
        assert!(query.has_conditions());
    }
}
