//! ORDER BY, LIMIT and OFFSET builders.

use super::expr::OrderItem;
use super::{chain, Query};

impl Query {
    chain! {
        /// Appends ordering terms; bare strings sort ascending.
        order => order_mut(items: impl IntoIterator<Item = impl Into<OrderItem>>)
    }

    /// Appends ordering terms in place.
    pub fn order_mut(&mut self, items: impl IntoIterator<Item = impl Into<OrderItem>>) -> &mut Self {
        self.data.order.extend(items.into_iter().map(Into::into));
        self
    }

    chain! {
        /// Sets `LIMIT`.
        limit => limit_mut(limit: u64)
    }

    /// Sets `LIMIT` in place.
    pub fn limit_mut(&mut self, limit: u64) -> &mut Self {
        self.data.limit = Some(limit);
        self
    }

    chain! {
        /// Sets `OFFSET`.
        offset => offset_mut(offset: u64)
    }

    /// Sets `OFFSET` in place.
    pub fn offset_mut(&mut self, offset: u64) -> &mut Self {
        self.data.offset = Some(offset);
        self
    }

    /// Removes `LIMIT` and `OFFSET`.
    #[must_use]
    pub fn unpaginated(&self) -> Self {
        let mut query = self.clone();
        query.data.limit = None;
        query.data.offset = None;
        query
    }
}
