//! Top-of-book residency statistics.
//!
//! After a replay, every order that ever reached the top of its side
//! contributes `exit_time - entry_time` to its symbol's total. The report
//! gives the per-symbol average plus min/max/std of the individual
//! durations.
//!
//! # Orders still at top when the stream ends
//!
//! Such orders have `entered_top == true` but no exit time. What happens to
//! them is an explicit [`OpenOrderPolicy`]:
//! - `Exclude` (default): left out of every average, counted in
//!   `ResidencyReport::open_at_end`
//! - `CloseAtStreamEnd`: closed at the last event time seen in the stream
//!
//! # Usage
//!
//! ```
//! use tob_residency::{EventDispatcher, FeedEvent, Side};
//!
//! let mut dispatcher = EventDispatcher::new();
//! for event in [
//!     FeedEvent::time(1),
//!     FeedEvent::add(1, "X", Side::Buy, 10, 100),
//!     FeedEvent::time(3),
//!     FeedEvent::delete(1),
//! ] {
//!     dispatcher.process_event(&event).unwrap();
//! }
//!
//! let report = dispatcher.report();
//! assert_eq!(report.average_secs("X"), Some(2.0));
//! ```

use std::sync::Arc;

use ahash::RandomState;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ResidencyError};
use crate::types::{Order, Timestamp, NANOS_PER_SECOND};

// ============================================================================
// Running Statistics (Welford's Algorithm)
// ============================================================================

/// Online algorithm for computing running mean and standard deviation.
///
/// Uses Welford's algorithm for numerical stability with large datasets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningStats {
    /// Number of observations
    pub count: u64,
    /// Running mean
    pub mean: f64,
    /// Running M2 (sum of squared differences from mean)
    m2: f64,
    /// Minimum value observed
    pub min: f64,
    /// Maximum value observed
    pub max: f64,
}

impl Default for RunningStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RunningStats {
    /// Create a new running statistics tracker.
    pub fn new() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// Update statistics with a new value (Welford's online algorithm).
    #[inline]
    pub fn update(&mut self, value: f64) {
        if !value.is_finite() {
            return; // Skip NaN/Inf values
        }

        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;

        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// Get the population variance.
    #[inline]
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / self.count as f64
        }
    }

    /// Get the population standard deviation.
    #[inline]
    pub fn std(&self) -> f64 {
        self.variance().sqrt()
    }
}

// ============================================================================
// Open-order policy
// ============================================================================

/// Treatment of orders that reached the top but never got an exit time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenOrderPolicy {
    /// Leave them out of the averages
    #[default]
    Exclude,

    /// Treat the last event time of the stream as their exit
    CloseAtStreamEnd,
}

impl OpenOrderPolicy {
    /// Human-readable description for logs.
    pub fn describe(&self) -> &'static str {
        match self {
            OpenOrderPolicy::Exclude => "excluded from averages",
            OpenOrderPolicy::CloseAtStreamEnd => "closed at end of stream",
        }
    }
}

// ============================================================================
// Per-symbol residency
// ============================================================================

/// Top-of-book durations for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolResidency {
    pub symbol: String,

    /// Orders that contributed a duration
    pub orders: u64,

    /// Sum of their durations (nanoseconds)
    pub total_duration_ns: u64,

    /// Distribution of individual durations (nanoseconds)
    pub durations: RunningStats,
}

impl SymbolResidency {
    fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            orders: 0,
            total_duration_ns: 0,
            durations: RunningStats::new(),
        }
    }

    fn record(&mut self, duration_ns: u64) {
        self.orders += 1;
        self.total_duration_ns += duration_ns;
        self.durations.update(duration_ns as f64);
    }

    /// `total_duration_ns / orders`, `None` when nothing was recorded.
    #[inline]
    pub fn average_ns(&self) -> Option<f64> {
        if self.orders == 0 {
            return None;
        }
        Some(self.total_duration_ns as f64 / self.orders as f64)
    }

    /// Average in seconds.
    #[inline]
    pub fn average_secs(&self) -> Option<f64> {
        self.average_ns().map(|ns| ns / NANOS_PER_SECOND as f64)
    }
}

// ============================================================================
// Report
// ============================================================================

/// Result of aggregating a whole replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidencyReport {
    /// Policy applied to orders still at top when the stream ended
    pub policy: OpenOrderPolicy,

    /// Last event time of the stream, if any event was stamped
    pub stream_end: Option<Timestamp>,

    /// Orders that reached the top and never got an exit time
    pub open_at_end: u64,

    /// Symbols with at least one contributing order, in first-seen order
    pub symbols: Vec<SymbolResidency>,
}

impl ResidencyReport {
    /// Residency for `symbol`, if it had any contributing order.
    pub fn get(&self, symbol: &str) -> Option<&SymbolResidency> {
        self.symbols.iter().find(|s| s.symbol == symbol)
    }

    /// Average top-of-book duration for `symbol` in seconds.
    pub fn average_secs(&self, symbol: &str) -> Option<f64> {
        self.get(symbol).and_then(SymbolResidency::average_secs)
    }

    /// Whether no symbol had a contributing order.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ResidencyError::generic(e.to_string()))
    }
}

// ============================================================================
// Aggregator
// ============================================================================

/// Post-pass over all orders ever created.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopOfBookAggregator {
    policy: OpenOrderPolicy,
}

impl TopOfBookAggregator {
    /// Create an aggregator applying `policy` to open orders.
    pub fn new(policy: OpenOrderPolicy) -> Self {
        Self { policy }
    }

    /// Sum durations per symbol over `orders`.
    ///
    /// `stream_end` is only consulted under
    /// [`OpenOrderPolicy::CloseAtStreamEnd`].
    pub fn aggregate<'a>(
        &self,
        orders: impl IntoIterator<Item = &'a Order>,
        stream_end: Option<Timestamp>,
    ) -> ResidencyReport {
        let mut by_symbol: IndexMap<Arc<str>, SymbolResidency, RandomState> =
            IndexMap::with_hasher(RandomState::new());
        let mut open_at_end = 0;

        for order in orders {
            if !order.entered_top {
                continue;
            }

            let duration = if order.exit_time.is_some() {
                order.top_duration()
            } else {
                open_at_end += 1;
                match self.policy {
                    OpenOrderPolicy::Exclude => None,
                    OpenOrderPolicy::CloseAtStreamEnd => stream_end
                        .zip(order.entry_time)
                        .map(|(end, entry)| end.saturating_sub(entry)),
                }
            };

            if let Some(duration) = duration {
                by_symbol
                    .entry(Arc::clone(&order.symbol))
                    .or_insert_with(|| SymbolResidency::new(&order.symbol))
                    .record(duration);
            }
        }

        ResidencyReport {
            policy: self.policy,
            stream_end,
            open_at_end,
            symbols: by_symbol.into_values().collect(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
