//! Multi-symbol book manager.
//!
//! Holds one [`OrderBook`] per instrument, created lazily on the first order
//! for that instrument. Symbols are interned as `Arc<str>` so orders can
//! share the book's key instead of owning a copy.

use std::sync::Arc;

use ahash::AHashMap;

use super::book::OrderBook;
use crate::error::{Result, ResidencyError};

/// Collection of per-instrument books.
#[derive(Debug, Clone, Default)]
pub struct BookSet {
    books: AHashMap<Arc<str>, OrderBook>,
}

impl BookSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the book for `symbol`, creating it if this is the symbol's first
    /// order. Returns the interned symbol alongside the book.
    pub fn get_or_create(&mut self, symbol: &str) -> (Arc<str>, &mut OrderBook) {
        let key = match self.books.get_key_value(symbol) {
            Some((key, _)) => Arc::clone(key),
            None => {
                log::debug!("Creating book for {symbol}");
                Arc::from(symbol)
            }
        };
        let book = self
            .books
            .entry(Arc::clone(&key))
            .or_insert_with(|| OrderBook::new(symbol));
        (key, book)
    }

    /// Get an existing book.
    pub fn get(&self, symbol: &str) -> Result<&OrderBook> {
        self.books
            .get(symbol)
            .ok_or_else(|| ResidencyError::BookNotFound(symbol.to_string()))
    }

    /// Get an existing book for mutation.
    pub fn get_mut(&mut self, symbol: &str) -> Result<&mut OrderBook> {
        self.books
            .get_mut(symbol)
            .ok_or_else(|| ResidencyError::BookNotFound(symbol.to_string()))
    }

    /// Check if a symbol has a book.
    pub fn has_symbol(&self, symbol: &str) -> bool {
        self.books.contains_key(symbol)
    }

    /// Get number of books.
    pub fn len(&self) -> usize {
        self.books.len()
    }

    /// Whether no book has been created.
    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Get list of all tracked symbols.
    pub fn symbols(&self) -> Vec<&str> {
        self.books.keys().map(|s| s.as_ref()).collect()
    }

    /// Iterate over all books.
    pub fn iter(&self) -> impl Iterator<Item = &OrderBook> {
        self.books.values()
    }
}
