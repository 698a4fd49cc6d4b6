//! Error types for the matching engine
//!
//! Error taxonomy using thiserror. Validation errors never leave a side
//! effect; delivery errors never undo a match.

use thiserror::Error;

use crate::ids::OrderId;
use crate::trade::Trade;

/// Top-level engine error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Malformed price/quantity/kind combination; rejected before any book mutation
    #[error("Invalid order: {0}")]
    InvalidOrder(#[from] OrderError),

    /// No book exists for the instrument; nothing was changed
    #[error("Unknown instrument: {symbol}")]
    UnknownInstrument { symbol: String },

    #[error("Order not found: {order_id}")]
    OrderNotFound { order_id: OrderId },

    /// Trades were applied to the book but could not be handed to the
    /// publication boundary. The trades travel with the error.
    #[error("Publication failed for order {order_id} ({} trades applied): {reason}", .trades.len())]
    PublicationFailure {
        order_id: OrderId,
        trades: Vec<Trade>,
        reason: String,
    },

    /// Same policy as PublicationFailure, for the trade record store
    #[error("Persistence failed for trade {trade_id}: {reason}")]
    PersistenceFailure { trade_id: String, reason: String },
}

/// Order validation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrderError {
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Invalid instrument: {0}")]
    InvalidInstrument(String),

    #[error("Duplicate order id: {0}")]
    DuplicateOrderId(OrderId),
}

/// Failure reported by a publication or persistence sink
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SinkError {
    #[error("Sink unavailable: {0}")]
    Unavailable(String),

    #[error("Sink rejected trade: {0}")]
    Rejected(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_error_display() {
        let err = OrderError::InvalidPrice("negative".to_string());
        assert_eq!(err.to_string(), "Invalid price: negative");
    }

    #[test]
    fn test_engine_error_from_order_error() {
        let order_err = OrderError::InvalidQuantity("zero".to_string());
        let engine_err: EngineError = order_err.into();
        assert!(matches!(engine_err, EngineError::InvalidOrder(_)));
        assert!(engine_err.to_string().contains("zero"));
    }

    #[test]
    fn test_publication_failure_display() {
        let err = EngineError::PublicationFailure {
            order_id: OrderId::new(),
            trades: Vec::new(),
            reason: "channel closed".to_string(),
        };
        assert!(err.to_string().contains("0 trades applied"));
        assert!(err.to_string().contains("channel closed"));
    }
}
