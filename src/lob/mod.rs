//! Order book reconstruction module.
//!
//! Per-instrument price-level indexes with best-price tracking, and the
//! registry that owns every order record for the run.

pub mod book;
mod multi_symbol;
pub mod price_level;
pub mod registry;

pub use book::{BookStats, OrderBook};
pub use multi_symbol::BookSet;
pub use price_level::PriceLevel;
pub use registry::OrderRegistry;
