//! Error types for top-of-book replay.
//!
//! Every variant here is fatal to a replay: the feed is trusted to be
//! complete and correctly ordered, so nothing is retried or skipped.

use thiserror::Error;

use crate::types::Side;

/// Result type alias for replay operations.
pub type Result<T> = std::result::Result<T, ResidencyError>;

/// Main error type for replay operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResidencyError {
    /// A mutation event referenced an order id that was never created
    #[error("Order not found: {0}")]
    OrderNotFound(u64),

    /// A creation event reused an order id already in the registry
    #[error("Duplicate order ID: {0}")]
    DuplicateOrder(u64),

    /// Removal targeted a price level that is not in the book
    #[error("Price level {price} not found on {side:?} side")]
    PriceLevelNotFound { side: Side, price: i64 },

    /// Removal targeted an order that is not resident at its price level
    #[error("Order {order_id} not resident at price level {price}")]
    OrderNotAtLevel { order_id: u64, price: i64 },

    /// An order was routed to a symbol whose book was never created
    #[error("No book for symbol: {0}")]
    BookNotFound(String),

    /// A source record could not be decoded into an event
    #[error("Decode error at line {line}: {message}")]
    Decode { line: u64, message: String },

    /// I/O failure while reading the source or writing a report
    #[error("IO error: {0}")]
    Io(String),

    /// Generic error with context
    #[error("Error: {0}")]
    Generic(String),
}

impl ResidencyError {
    /// Create a generic error from any string-like type.
    pub fn generic(msg: impl Into<String>) -> Self {
        ResidencyError::Generic(msg.into())
    }

    /// Whether this error means the feed broke its ordering contract
    /// (as opposed to an I/O or decoding failure).
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            ResidencyError::OrderNotFound(_)
                | ResidencyError::DuplicateOrder(_)
                | ResidencyError::PriceLevelNotFound { .. }
                | ResidencyError::OrderNotAtLevel { .. }
                | ResidencyError::BookNotFound(_)
        )
    }
}

impl From<std::io::Error> for ResidencyError {
    fn from(err: std::io::Error) -> Self {
        ResidencyError::Io(err.to_string())
    }
}

impl From<String> for ResidencyError {
    fn from(err: String) -> Self {
        ResidencyError::Generic(err)
    }
}

impl From<&str> for ResidencyError {
    fn from(err: &str) -> Self {
        ResidencyError::Generic(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ResidencyError::OrderNotFound(12345);
        assert_eq!(err.to_string(), "Order not found: 12345");

        let err = ResidencyError::PriceLevelNotFound {
            side: Side::Sell,
            price: 1000,
        };
        assert_eq!(err.to_string(), "Price level 1000 not found on Sell side");
    }

    #[test]
    fn test_protocol_violation_classification() {
        assert!(ResidencyError::OrderNotFound(1).is_protocol_violation());
        assert!(ResidencyError::DuplicateOrder(1).is_protocol_violation());
        assert!(ResidencyError::OrderNotAtLevel {
            order_id: 1,
            price: 10
        }
        .is_protocol_violation());
        assert!(!ResidencyError::Io("broken pipe".into()).is_protocol_violation());
        assert!(!ResidencyError::Decode {
            line: 3,
            message: "eof".into()
        }
        .is_protocol_violation());
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ResidencyError = io.into();
        assert!(matches!(err, ResidencyError::Io(_)));
    }
}
