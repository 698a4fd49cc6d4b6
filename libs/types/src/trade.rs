//! Trade execution types
//!
//! A trade is the immutable record of one match between a buy and a sell
//! order. It is created exactly once and never mutated afterwards.

use crate::ids::{AccountId, InstrumentId, OrderId, TradeId};
use crate::numeric::{Price, Quantity};
use crate::order::Side;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: TradeId,
    pub sequence: u64, // Per-instrument monotonic sequence
    pub instrument: InstrumentId,

    // Order references
    pub buyer_order_id: OrderId,
    pub seller_order_id: OrderId,

    // Account references
    pub buyer_account_id: AccountId,
    pub seller_account_id: AccountId,

    /// Side of the order that arrived later and crossed the resting one
    pub taker_side: Side,
    pub price: Price,
    pub quantity: Quantity,

    pub executed_at: i64, // Unix nanos
}

impl Trade {
    /// Create a new trade record
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sequence: u64,
        instrument: InstrumentId,
        buyer_order_id: OrderId,
        seller_order_id: OrderId,
        buyer_account_id: AccountId,
        seller_account_id: AccountId,
        taker_side: Side,
        price: Price,
        quantity: Quantity,
        executed_at: i64,
    ) -> Self {
        Self {
            trade_id: TradeId::new(),
            sequence,
            instrument,
            buyer_order_id,
            seller_order_id,
            buyer_account_id,
            seller_account_id,
            taker_side,
            price,
            quantity,
            executed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trade() -> Trade {
        Trade::new(
            7,
            InstrumentId::new("BTC-USD"),
            OrderId::new(),
            OrderId::new(),
            AccountId::new("0xbuyer"),
            AccountId::new("0xseller"),
            Side::BUY,
            Price::from_u64(30000),
            Quantity::from_str("0.01").unwrap(),
            1708123456789000000,
        )
    }

    #[test]
    fn test_trade_serialization() {
        let trade = sample_trade();
        let json = serde_json::to_string(&trade).unwrap();
        assert!(json.contains("\"price\":\"30000\""));

        let deserialized: Trade = serde_json::from_str(&json).unwrap();
        assert_eq!(trade, deserialized);
    }
}
