//! Order registry: every order ever created, by id.
//!
//! Entries are never removed. Orders that left the book stay queryable so
//! their top-of-book duration can be read after the stream ends, which
//! means memory grows with the number of distinct orders in the session.
//! That is acceptable for a bounded offline replay.
//!
//! Iteration follows creation order.

use std::sync::Arc;

use ahash::RandomState;
use indexmap::IndexMap;

use crate::error::{Result, ResidencyError};
use crate::types::{Order, Side};

/// Process-wide map from order id to [`Order`].
#[derive(Debug, Clone, Default)]
pub struct OrderRegistry {
    orders: IndexMap<u64, Order, RandomState>,
}

impl OrderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with room for `capacity` orders.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            orders: IndexMap::with_capacity_and_hasher(capacity, RandomState::new()),
        }
    }

    /// Insert a new order.
    ///
    /// # Errors
    /// `DuplicateOrder` if `order_id` is already registered.
    pub fn create(
        &mut self,
        order_id: u64,
        symbol: Arc<str>,
        side: Side,
        size: i64,
        price: i64,
    ) -> Result<&mut Order> {
        match self.orders.entry(order_id) {
            indexmap::map::Entry::Occupied(_) => Err(ResidencyError::DuplicateOrder(order_id)),
            indexmap::map::Entry::Vacant(slot) => {
                Ok(slot.insert(Order::new(order_id, symbol, side, size, price)))
            }
        }
    }

    /// Look up an order.
    ///
    /// # Errors
    /// `OrderNotFound` if the id was never created.
    #[inline]
    pub fn lookup(&self, order_id: u64) -> Result<&Order> {
        self.orders
            .get(&order_id)
            .ok_or(ResidencyError::OrderNotFound(order_id))
    }

    /// Look up an order for mutation.
    #[inline]
    pub fn lookup_mut(&mut self, order_id: u64) -> Result<&mut Order> {
        self.orders
            .get_mut(&order_id)
            .ok_or(ResidencyError::OrderNotFound(order_id))
    }

    /// Check if an id has been registered.
    #[inline]
    pub fn contains(&self, order_id: u64) -> bool {
        self.orders.contains_key(&order_id)
    }

    /// Number of orders ever created.
    #[inline]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Whether no order has been created yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Iterate over all orders in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }
}
