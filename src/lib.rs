//! # tob-residency
//!
//! Order book replay that measures how long orders spend at the top of book.
//!
//! The library replays a session's order-lifecycle events (add, modify,
//! execute, reduce, delete) in arrival order, rebuilds every instrument's
//! bid and ask price levels, and stamps each order with the time it first
//! reached the best price on its side and the time it stopped being there.
//! After the stream ends, those durations are averaged per instrument.
//!
//! ## Features
//!
//! - **Price-Level Index**: `BTreeMap` per side, so the new best price after
//!   a depletion is a direct lookup rather than a rescan
//! - **Explicit Empty Sides**: best prices are `Option<i64>`, no sentinels
//! - **Tie-Inclusive Entry, Strict Displacement**: joining the best price
//!   counts as reaching the top; only a strictly better price ends the
//!   residency of orders already there
//! - **Fatal Protocol Violations**: unknown ids or missing levels stop the
//!   replay with a typed error
//! - **JSON Lines / zstd Input**: pre-decoded events from stdin or files
//!
//! ## Quick Start
//!
//! ```rust
//! use tob_residency::{EventDispatcher, FeedEvent, Side};
//!
//! let mut dispatcher = EventDispatcher::new();
//!
//! let events = [
//!     FeedEvent::time(1),
//!     FeedEvent::add(1, "X", Side::Buy, 10, 100),   // A reaches top
//!     FeedEvent::time(2),
//!     FeedEvent::add(2, "X", Side::Buy, 5, 100),    // B ties
//!     FeedEvent::time(3),
//!     FeedEvent::add(3, "X", Side::Buy, 3, 105),    // C improves, A and B exit
//! ];
//! for event in &events {
//!     dispatcher.process_event(event).unwrap();
//! }
//!
//! let book = dispatcher.book("X").unwrap();
//! assert_eq!(book.best_bid(), Some(105));
//!
//! let report = dispatcher.report();
//! assert_eq!(report.average_secs("X"), Some(1.5));
//! ```
//!
//! ## Replaying a File
//!
//! ```ignore
//! use tob_residency::{EventDispatcher, JsonLinesSource, ReplayConfig, OpenOrderPolicy};
//!
//! let config = ReplayConfig::new()
//!     .with_open_order_policy(OpenOrderPolicy::CloseAtStreamEnd);
//! let mut dispatcher = EventDispatcher::with_config(config);
//!
//! dispatcher.run(JsonLinesSource::open("session.jsonl.zst")?)?;
//! for symbol in &dispatcher.report().symbols {
//!     println!("{} {:.2}", symbol.symbol, symbol.average_secs().unwrap_or_default());
//! }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`types`] | Core types: `FeedEvent`, `EventKind`, `Order`, `Side` |
//! | [`lob`] | Book reconstruction: `OrderBook`, `OrderRegistry`, `BookSet`, `PriceLevel` |
//! | [`clock`] | Session clock: `SessionClock` |
//! | [`dispatcher`] | Event routing: `EventDispatcher`, `ReplayConfig`, `DispatchStats` |
//! | [`statistics`] | Residency aggregation: `TopOfBookAggregator`, `ResidencyReport` |
//! | [`source`] | Event sources: `EventSource`, `VecSource`, `JsonLinesSource` |
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `zstd` | ✅ | Read zstd-compressed `.zst` event files |

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod clock;
pub mod dispatcher;
pub mod error;
pub mod lob;
pub mod source;
pub mod statistics;
pub mod types;

// Re-exports - Core types
pub use error::{ResidencyError, Result};
pub use types::{EventKind, FeedEvent, Order, Side, Timestamp, NANOS_PER_SECOND};

// Re-exports - Book reconstruction
pub use lob::{BookSet, BookStats, OrderBook, OrderRegistry, PriceLevel};

// Re-exports - Replay
pub use clock::SessionClock;
pub use dispatcher::{DispatchStats, EventDispatcher, ReplayConfig};

// Re-exports - Statistics
pub use statistics::{
    OpenOrderPolicy, ResidencyReport, RunningStats, SymbolResidency, TopOfBookAggregator,
};

// Re-exports - Source abstraction
pub use source::{EventSource, JsonLinesSource, SourceMetadata, VecSource};
