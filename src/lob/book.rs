//! Single-instrument order book with top-of-book timing.
//!
//! Implementation:
//! - BTreeMap of price → [`PriceLevel`] per side, so the extremum after a
//!   depletion is a direct O(log n) lookup instead of a rescan
//! - Cached best bid/ask as `Option<i64>` (`None` = side empty)
//! - Order state lives in the [`OrderRegistry`]; the book only tracks ids
//!
//! Timing rules applied on every mutation:
//! - `add_order` stamps the entry time once, marks `entered_top` when the
//!   price ties or beats the best, and on a *strict* improvement stamps the
//!   exit time of every order still resting at the old best level.
//! - `remove_order` stamps the exit time once and recomputes the best price
//!   when the removed price was at or beyond it.

use std::collections::BTreeMap;

use crate::error::{Result, ResidencyError};
use crate::lob::price_level::PriceLevel;
use crate::lob::registry::OrderRegistry;
use crate::types::{Side, Timestamp};

/// Counters for one book.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookStats {
    /// Orders admitted (creations and price-change re-insertions)
    pub adds: u64,

    /// Orders removed from the index
    pub removes: u64,

    /// Orders whose exit time was stamped by a strictly better price
    pub displaced: u64,

    /// Number of times either best price changed value
    pub best_changes: u64,
}

/// Two-sided price-level index for one instrument.
#[derive(Debug, Clone)]
pub struct OrderBook {
    symbol: String,

    /// Bid levels; best bid is the last key
    bids: BTreeMap<i64, PriceLevel>,

    /// Ask levels; best ask is the first key
    asks: BTreeMap<i64, PriceLevel>,

    best_bid: Option<i64>,
    best_ask: Option<i64>,

    stats: BookStats,
}

impl OrderBook {
    /// Create an empty book.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            best_bid: None,
            best_ask: None,
            stats: BookStats::default(),
        }
    }

    /// Instrument this book belongs to.
    #[inline]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Admit an order to the book at its current price.
    ///
    /// # Errors
    /// `OrderNotFound` if `order_id` (or any order at the displaced level)
    /// is missing from `registry`.
    pub fn add_order(
        &mut self,
        registry: &mut OrderRegistry,
        order_id: u64,
        time: Timestamp,
    ) -> Result<()> {
        let order = registry.lookup_mut(order_id)?;
        order.stamp_entry(time);

        let side = order.side;
        let price = order.price;
        let old_best = self.best(side);

        self.levels_mut(side).entry(price).or_default().insert(order_id);
        self.stats.adds += 1;

        // Ties count as reaching the top
        if old_best.map_or(true, |best| side.is_at_or_better(price, best)) {
            order.entered_top = true;
        }

        if old_best.map_or(true, |best| side.is_better(price, best)) {
            if let Some(best) = old_best {
                let mut displaced = 0;
                if let Some(level) = self.levels(side).get(&best) {
                    for resident in level.iter() {
                        if registry.lookup_mut(resident)?.stamp_exit(time) {
                            displaced += 1;
                        }
                    }
                }
                self.stats.displaced += displaced;
            }
            self.set_best(side, Some(price));
        }

        Ok(())
    }

    /// Take an order out of the book.
    ///
    /// # Errors
    /// `PriceLevelNotFound` / `OrderNotAtLevel` if the order is not resident
    /// where its registry record says it is.
    pub fn remove_order(
        &mut self,
        registry: &mut OrderRegistry,
        order_id: u64,
        time: Timestamp,
    ) -> Result<()> {
        let order = registry.lookup_mut(order_id)?;
        order.stamp_exit(time);

        let side = order.side;
        let price = order.price;

        let levels = self.levels_mut(side);
        let level = levels
            .get_mut(&price)
            .ok_or(ResidencyError::PriceLevelNotFound { side, price })?;
        if !level.remove(order_id) {
            return Err(ResidencyError::OrderNotAtLevel { order_id, price });
        }
        if level.is_empty() {
            levels.remove(&price);
        }
        self.stats.removes += 1;

        if self
            .best(side)
            .map_or(true, |best| side.is_at_or_better(price, best))
        {
            let extremum = self.extremum(side);
            self.set_best(side, extremum);
        }

        Ok(())
    }

    /// Current best price on `side`, `None` when the side is empty.
    #[inline]
    pub fn best(&self, side: Side) -> Option<i64> {
        match side {
            Side::Buy => self.best_bid,
            Side::Sell => self.best_ask,
        }
    }

    /// Highest resident bid.
    #[inline]
    pub fn best_bid(&self) -> Option<i64> {
        self.best_bid
    }

    /// Lowest resident ask.
    #[inline]
    pub fn best_ask(&self) -> Option<i64> {
        self.best_ask
    }

    /// Price level on `side` at `price`, if any order rests there.
    #[inline]
    pub fn level(&self, side: Side, price: i64) -> Option<&PriceLevel> {
        self.levels(side).get(&price)
    }

    /// Resident prices on `side`, best first.
    pub fn prices(&self, side: Side) -> Vec<i64> {
        match side {
            Side::Buy => self.bids.keys().rev().copied().collect(),
            Side::Sell => self.asks.keys().copied().collect(),
        }
    }

    /// Whether `order_id` is resident anywhere on `side`.
    pub fn is_resident(&self, side: Side, order_id: u64) -> bool {
        self.levels(side).values().any(|level| level.contains(order_id))
    }

    /// Check that both cached best prices equal the true extremum of the
    /// resident levels (or are `None` on an empty side).
    pub fn is_consistent(&self) -> bool {
        self.best_bid == self.extremum(Side::Buy) && self.best_ask == self.extremum(Side::Sell)
    }

    /// Get number of price levels on bid side.
    pub fn bid_levels(&self) -> usize {
        self.bids.len()
    }

    /// Get number of price levels on ask side.
    pub fn ask_levels(&self) -> usize {
        self.asks.len()
    }

    /// Get number of resident orders across both sides.
    pub fn order_count(&self) -> usize {
        self.bids
            .values()
            .chain(self.asks.values())
            .map(PriceLevel::order_count)
            .sum()
    }

    /// Get current statistics.
    pub fn stats(&self) -> &BookStats {
        &self.stats
    }

    #[inline(always)]
    fn levels(&self, side: Side) -> &BTreeMap<i64, PriceLevel> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    #[inline(always)]
    fn levels_mut(&mut self, side: Side) -> &mut BTreeMap<i64, PriceLevel> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    #[inline(always)]
    fn extremum(&self, side: Side) -> Option<i64> {
        match side {
            Side::Buy => self.bids.keys().next_back().copied(),
            Side::Sell => self.asks.keys().next().copied(),
        }
    }

    #[inline]
    fn set_best(&mut self, side: Side, price: Option<i64>) {
        let slot = match side {
            Side::Buy => &mut self.best_bid,
            Side::Sell => &mut self.best_ask,
        };
        if *slot != price {
            log::trace!("{} best {:?} {:?} -> {:?}", self.symbol, side, *slot, price);
            *slot = price;
            self.stats.best_changes += 1;
        }
    }
}
