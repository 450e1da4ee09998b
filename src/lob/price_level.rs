//! Price level membership.
//!
//! A `PriceLevel` records which order ids rest at one exact price on one
//! side of a book. It holds ids only: size, price and timing state live in
//! the [`OrderRegistry`](super::registry::OrderRegistry).
//!
//! # Performance
//!
//! | Operation | Complexity |
//! |-----------|------------|
//! | `insert` | O(1) amortized |
//! | `remove` | O(1) amortized |
//! | `contains` | O(1) |
//! | `is_empty` | O(1) |

use ahash::AHashSet;

/// Set of order ids resident at a single price.
#[derive(Debug, Clone, Default)]
pub struct PriceLevel {
    orders: AHashSet<u64>,
}

impl PriceLevel {
    /// Create a new empty price level.
    #[inline]
    pub fn new() -> Self {
        Self {
            orders: AHashSet::new(),
        }
    }

    /// Add an order id. Returns `false` if it was already resident.
    #[inline]
    pub fn insert(&mut self, order_id: u64) -> bool {
        self.orders.insert(order_id)
    }

    /// Remove an order id. Returns `false` if it was not resident.
    #[inline]
    pub fn remove(&mut self, order_id: u64) -> bool {
        self.orders.remove(&order_id)
    }

    /// Check if the price level has no orders.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Get the number of orders at this price level.
    #[inline]
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Check if an order is resident at this price level.
    #[inline]
    pub fn contains(&self, order_id: u64) -> bool {
        self.orders.contains(&order_id)
    }

    /// Iterate over resident order ids (no particular order).
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.orders.iter().copied()
    }
}
