//! Core data types for feed events and order state.
//!
//! Events arrive already decoded: each one carries a nanosecond offset
//! relative to the most recent clock update plus kind-specific fields.
//! Prices are integer ticks and sizes are signed share counts.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Absolute session time in nanoseconds since the session clock origin.
pub type Timestamp = u64;

/// Nanoseconds in one second of session time.
pub const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Side {
    /// Buy order (bid)
    Buy = b'B',
    /// Sell order (ask)
    Sell = b'S',
}

impl Side {
    /// Parse side from a byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'B' => Some(Side::Buy),
            b'S' => Some(Side::Sell),
            _ => None,
        }
    }

    /// Convert to byte representation.
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// `price` is at or beyond `reference` on this side
    /// (`>=` for buys, `<=` for sells).
    #[inline(always)]
    pub fn is_at_or_better(self, price: i64, reference: i64) -> bool {
        match self {
            Side::Buy => price >= reference,
            Side::Sell => price <= reference,
        }
    }

    /// `price` strictly improves on `reference` on this side.
    #[inline(always)]
    pub fn is_better(self, price: i64, reference: i64) -> bool {
        match self {
            Side::Buy => price > reference,
            Side::Sell => price < reference,
        }
    }
}

/// What a feed event says happened.
///
/// Long and short wire encodings of the same message share one variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// New clock base, whole seconds since session origin
    Time { seconds: u32 },

    /// A new order enters the book
    AddOrder {
        order_id: u64,
        side: Side,
        shares: i64,
        symbol: String,
        price: i64,
    },

    /// A resting order was filled for `executed_shares`
    OrderExecuted { order_id: u64, executed_shares: i64 },

    /// A fill that also reports the order's authoritative remainder
    OrderExecutedAtPriceSize {
        order_id: u64,
        executed_shares: i64,
        remaining_shares: i64,
        price: i64,
    },

    /// Partial cancel
    ReduceSize { order_id: u64, canceled_shares: i64 },

    /// New size and (possibly unchanged) price for an order
    ModifyOrder { order_id: u64, shares: i64, price: i64 },

    /// Order removed from the book
    DeleteOrder { order_id: u64 },

    /// Trade report against a non-displayed order
    Trade {
        symbol: String,
        shares: i64,
        price: i64,
    },

    /// A previously reported trade was broken
    TradeBreak { execution_id: u64 },

    /// Session is over
    EndOfSession,
}

impl EventKind {
    /// Kinds that are consumed without touching any book.
    #[inline]
    pub fn is_ignored(&self) -> bool {
        matches!(
            self,
            EventKind::Trade { .. } | EventKind::TradeBreak { .. } | EventKind::EndOfSession
        )
    }

    /// Order id this event refers to, if it is an order-lifecycle event.
    pub fn order_id(&self) -> Option<u64> {
        match self {
            EventKind::AddOrder { order_id, .. }
            | EventKind::OrderExecuted { order_id, .. }
            | EventKind::OrderExecutedAtPriceSize { order_id, .. }
            | EventKind::ReduceSize { order_id, .. }
            | EventKind::ModifyOrder { order_id, .. }
            | EventKind::DeleteOrder { order_id } => Some(*order_id),
            _ => None,
        }
    }

    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Time { .. } => "time",
            EventKind::AddOrder { .. } => "add_order",
            EventKind::OrderExecuted { .. } => "order_executed",
            EventKind::OrderExecutedAtPriceSize { .. } => "order_executed_at_price_size",
            EventKind::ReduceSize { .. } => "reduce_size",
            EventKind::ModifyOrder { .. } => "modify_order",
            EventKind::DeleteOrder { .. } => "delete_order",
            EventKind::Trade { .. } => "trade",
            EventKind::TradeBreak { .. } => "trade_break",
            EventKind::EndOfSession => "end_of_session",
        }
    }
}

/// A single decoded feed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEvent {
    /// Nanoseconds since the last clock update
    #[serde(default)]
    pub time_offset_ns: u32,

    /// Event payload
    #[serde(flatten)]
    pub kind: EventKind,
}

impl FeedEvent {
    /// Create an event with a zero time offset.
    pub fn new(kind: EventKind) -> Self {
        Self {
            time_offset_ns: 0,
            kind,
        }
    }

    /// Set the offset from the last clock update.
    pub fn with_offset(mut self, time_offset_ns: u32) -> Self {
        self.time_offset_ns = time_offset_ns;
        self
    }

    /// Clock update to `seconds`.
    pub fn time(seconds: u32) -> Self {
        Self::new(EventKind::Time { seconds })
    }

    /// Order creation.
    pub fn add(order_id: u64, symbol: &str, side: Side, shares: i64, price: i64) -> Self {
        Self::new(EventKind::AddOrder {
            order_id,
            side,
            shares,
            symbol: symbol.to_string(),
            price,
        })
    }

    /// Fill of `executed_shares`.
    pub fn execute(order_id: u64, executed_shares: i64) -> Self {
        Self::new(EventKind::OrderExecuted {
            order_id,
            executed_shares,
        })
    }

    /// Fill reporting the authoritative remaining size.
    pub fn execute_at_price_size(
        order_id: u64,
        executed_shares: i64,
        remaining_shares: i64,
        price: i64,
    ) -> Self {
        Self::new(EventKind::OrderExecutedAtPriceSize {
            order_id,
            executed_shares,
            remaining_shares,
            price,
        })
    }

    /// Partial cancel of `canceled_shares`.
    pub fn reduce(order_id: u64, canceled_shares: i64) -> Self {
        Self::new(EventKind::ReduceSize {
            order_id,
            canceled_shares,
        })
    }

    /// Size/price modification.
    pub fn modify(order_id: u64, shares: i64, price: i64) -> Self {
        Self::new(EventKind::ModifyOrder {
            order_id,
            shares,
            price,
        })
    }

    /// Order deletion.
    pub fn delete(order_id: u64) -> Self {
        Self::new(EventKind::DeleteOrder { order_id })
    }
}

/// Order record kept by the registry for the whole run.
///
/// `entered_top` only ever goes false → true, and `exit_time` is written at
/// most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub order_id: u64,
    pub symbol: Arc<str>,
    pub side: Side,
    /// Remaining size; may go to zero or below before removal
    pub size: i64,
    pub price: i64,
    pub entered_top: bool,
    pub entry_time: Option<Timestamp>,
    pub exit_time: Option<Timestamp>,
}

impl Order {
    /// Create an order that has not yet been admitted to a book.
    pub fn new(order_id: u64, symbol: Arc<str>, side: Side, size: i64, price: i64) -> Self {
        Self {
            order_id,
            symbol,
            side,
            size,
            price,
            entered_top: false,
            entry_time: None,
            exit_time: None,
        }
    }

    /// Time spent at top of book, if the order reached it and has left.
    #[inline]
    pub fn top_duration(&self) -> Option<u64> {
        if !self.entered_top {
            return None;
        }
        match (self.entry_time, self.exit_time) {
            (Some(entry), Some(exit)) => Some(exit.saturating_sub(entry)),
            _ => None,
        }
    }

    /// Reached top of book but never received an exit time.
    #[inline]
    pub fn is_open_at_top(&self) -> bool {
        self.entered_top && self.exit_time.is_none()
    }

    /// Record the entry time unless one is already set.
    #[inline]
    pub(crate) fn stamp_entry(&mut self, time: Timestamp) {
        if self.entry_time.is_none() {
            self.entry_time = Some(time);
        }
    }

    /// Record the exit time unless one is already set.
    #[inline]
    pub(crate) fn stamp_exit(&mut self, time: Timestamp) -> bool {
        if self.exit_time.is_none() {
            self.exit_time = Some(time);
            true
        } else {
            false
        }
    }
}
