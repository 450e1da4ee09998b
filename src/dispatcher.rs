//! Sequential event dispatcher.
//!
//! Pulls events from an [`EventSource`] in arrival order, keeps the session
//! clock, and turns each order-lifecycle event into registry and book
//! operations. Nothing is reordered or skipped: the first protocol
//! violation ends the run with an error.
//!
//! # Routing
//!
//! | Event | Effect |
//! |-------|--------|
//! | `Time` | advance clock base |
//! | `Trade`, `TradeBreak`, `EndOfSession` | none (not counted as processed) |
//! | `AddOrder` | create order, lazily create book, `add_order` |
//! | `ModifyOrder` | set size; price change → remove + re-add; else remove if size ≤ 0 |
//! | `DeleteOrder` | `remove_order` |
//! | `OrderExecuted` | size -= executed; remove if size ≤ 0 |
//! | `OrderExecutedAtPriceSize` | size -= executed; remove if *reported* remaining ≤ 0 |
//! | `ReduceSize` | size -= canceled; remove if size ≤ 0 |

use std::sync::Arc;

use crate::clock::SessionClock;
use crate::error::Result;
use crate::lob::{BookSet, OrderBook, OrderRegistry};
use crate::source::EventSource;
use crate::statistics::{OpenOrderPolicy, ResidencyReport, TopOfBookAggregator};
use crate::types::{EventKind, FeedEvent, Order, Side, Timestamp};

/// Configuration for a replay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayConfig {
    /// What to do with orders still at top when the stream ends
    pub open_order_policy: OpenOrderPolicy,

    /// Log progress every N processed messages (`None` = silent)
    pub progress_interval: Option<u64>,
}

impl ReplayConfig {
    /// Create the default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the open-order policy used when building the report.
    pub fn with_open_order_policy(mut self, policy: OpenOrderPolicy) -> Self {
        self.open_order_policy = policy;
        self
    }

    /// Enable progress logging every `interval` processed messages.
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = (interval > 0).then_some(interval);
        self
    }
}

/// Counters for a replay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Every event pulled from the source
    pub events_seen: u64,

    /// Order-lifecycle events (excludes clock updates and ignored kinds)
    pub messages_processed: u64,

    /// Clock-update events
    pub clock_updates: u64,

    /// Trade, trade-break and end-of-session events
    pub ignored: u64,

    /// Orders created
    pub orders_created: u64,

    /// Books created lazily
    pub books_created: u64,

    /// Latest effective event time
    pub last_event_time: Option<Timestamp>,
}

/// Single-pass replay engine.
#[derive(Debug, Clone, Default)]
pub struct EventDispatcher {
    config: ReplayConfig,
    clock: SessionClock,
    registry: OrderRegistry,
    books: BookSet,
    stats: DispatchStats,
}

impl EventDispatcher {
    /// Create a dispatcher with default configuration.
    pub fn new() -> Self {
        Self::with_config(ReplayConfig::default())
    }

    /// Create a dispatcher with custom configuration.
    pub fn with_config(config: ReplayConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Consume `source` to its end, processing every event.
    ///
    /// The source's resources are released when its iterator is dropped,
    /// which also happens when this returns early with an error.
    pub fn run<S: EventSource>(&mut self, source: S) -> Result<&DispatchStats> {
        log::info!("Replaying events from {}", source.metadata().describe());

        for event in source.events()? {
            let event = event?;
            if let Err(e) = self.process_event(&event) {
                log::debug!(
                    "Replay stopped at {} event (order {:?}) after {} events",
                    event.kind.name(),
                    event.kind.order_id(),
                    self.stats.events_seen
                );
                return Err(e);
            }
        }

        log::info!(
            "Stream ended: {} events, {} processed, {} orders, {} books",
            self.stats.events_seen,
            self.stats.messages_processed,
            self.stats.orders_created,
            self.stats.books_created
        );
        Ok(&self.stats)
    }

    /// Apply one event.
    pub fn process_event(&mut self, event: &FeedEvent) -> Result<()> {
        self.stats.events_seen += 1;

        if let EventKind::Time { seconds } = event.kind {
            self.clock.advance(seconds);
            self.stats.clock_updates += 1;
            return Ok(());
        }

        let time = self.clock.stamp(event.time_offset_ns);
        self.stats.last_event_time = self.clock.last_event_time();

        if event.kind.is_ignored() {
            self.stats.ignored += 1;
            return Ok(());
        }

        self.stats.messages_processed += 1;

        match &event.kind {
            EventKind::AddOrder {
                order_id,
                side,
                shares,
                symbol,
                price,
            } => self.create_order(*order_id, symbol, *side, *shares, *price, time)?,
            EventKind::ModifyOrder {
                order_id,
                shares,
                price,
            } => self.modify_order(*order_id, *shares, *price, time)?,
            EventKind::DeleteOrder { order_id } => self.remove_order(*order_id, time)?,
            EventKind::OrderExecuted {
                order_id,
                executed_shares,
            } => self.reduce_order(*order_id, *executed_shares, time)?,
            EventKind::OrderExecutedAtPriceSize {
                order_id,
                executed_shares,
                remaining_shares,
                ..
            } => {
                self.registry.lookup_mut(*order_id)?.size -= *executed_shares;
                // The feed's remainder is authoritative here, not ours
                if *remaining_shares <= 0 {
                    self.remove_order(*order_id, time)?;
                }
            }
            EventKind::ReduceSize {
                order_id,
                canceled_shares,
            } => self.reduce_order(*order_id, *canceled_shares, time)?,
            EventKind::Time { .. }
            | EventKind::Trade { .. }
            | EventKind::TradeBreak { .. }
            | EventKind::EndOfSession => {}
        }

        if let Some(interval) = self.config.progress_interval {
            if self.stats.messages_processed % interval == 0 {
                log::info!(
                    "Processed {} messages ({} orders, {} books)",
                    self.stats.messages_processed,
                    self.registry.len(),
                    self.books.len()
                );
            }
        }

        Ok(())
    }

    /// Aggregate top-of-book durations over every order created so far.
    pub fn report(&self) -> ResidencyReport {
        let policy = self.config.open_order_policy;
        let report = TopOfBookAggregator::new(policy)
            .aggregate(self.registry.iter(), self.clock.last_event_time());

        if report.open_at_end > 0 {
            log::warn!(
                "{} order(s) still at top of book at end of stream ({})",
                report.open_at_end,
                policy.describe()
            );
        }
        report
    }

    fn create_order(
        &mut self,
        order_id: u64,
        symbol: &str,
        side: Side,
        shares: i64,
        price: i64,
        time: Timestamp,
    ) -> Result<()> {
        if !self.books.has_symbol(symbol) {
            self.stats.books_created += 1;
        }
        let (symbol, book) = self.books.get_or_create(symbol);
        self.registry.create(order_id, symbol, side, shares, price)?;
        self.stats.orders_created += 1;
        book.add_order(&mut self.registry, order_id, time)
    }

    fn modify_order(&mut self, order_id: u64, shares: i64, price: i64, time: Timestamp) -> Result<()> {
        let order = self.registry.lookup_mut(order_id)?;
        order.size = shares;
        let old_price = order.price;
        let symbol = Arc::clone(&order.symbol);

        let book = self.books.get_mut(&symbol)?;
        if old_price != price {
            book.remove_order(&mut self.registry, order_id, time)?;
            self.registry.lookup_mut(order_id)?.price = price;
            book.add_order(&mut self.registry, order_id, time)?;
        } else if shares <= 0 {
            book.remove_order(&mut self.registry, order_id, time)?;
        }
        Ok(())
    }

    fn reduce_order(&mut self, order_id: u64, quantity: i64, time: Timestamp) -> Result<()> {
        let order = self.registry.lookup_mut(order_id)?;
        order.size -= quantity;
        if order.size <= 0 {
            self.remove_order(order_id, time)?;
        }
        Ok(())
    }

    fn remove_order(&mut self, order_id: u64, time: Timestamp) -> Result<()> {
        let symbol = Arc::clone(&self.registry.lookup(order_id)?.symbol);
        self.books
            .get_mut(&symbol)?
            .remove_order(&mut self.registry, order_id, time)
    }

    /// Look up an order by id.
    pub fn order(&self, order_id: u64) -> Result<&Order> {
        self.registry.lookup(order_id)
    }

    /// Book for `symbol`, if it has been created.
    pub fn book(&self, symbol: &str) -> Result<&OrderBook> {
        self.books.get(symbol)
    }

    /// All orders ever created.
    pub fn registry(&self) -> &OrderRegistry {
        &self.registry
    }

    /// All books created so far.
    pub fn books(&self) -> &BookSet {
        &self.books
    }

    /// Get current statistics.
    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    /// Get a reference to the current configuration.
    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }
}
