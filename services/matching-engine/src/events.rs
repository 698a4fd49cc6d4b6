//! Messages crossing the engine boundary
//!
//! `SubmitOrderRequest` is the inbound order shape accepted from the request
//! layer; `TradeExecutedEvent` is the outbound payload delivered to the
//! settlement consumer and the trade record store.

use serde::{Deserialize, Serialize};
use types::clock;
use types::errors::{EngineError, OrderError};
use types::ids::{AccountId, InstrumentId, OrderId, TradeId};
use types::numeric::{Price, Quantity};
use types::order::{Order, OrderKind, Side};
use types::trade::Trade;

/// Inbound order submission
///
/// Type-checked by the caller; the book validates the price/kind
/// combination again before accepting it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitOrderRequest {
    pub instrument: String,
    pub account_id: String,
    pub side: Side,
    pub kind: OrderKind,
    #[serde(default)]
    pub price: Option<Price>,
    pub quantity: Quantity,
}

impl SubmitOrderRequest {
    /// Build the engine order, assigning its id and creation time
    pub fn into_order(self) -> Result<Order, EngineError> {
        let instrument = InstrumentId::try_new(self.instrument.as_str())
            .ok_or_else(|| OrderError::InvalidInstrument(self.instrument.clone()))?;
        Ok(Order::new(
            AccountId::new(self.account_id),
            instrument,
            self.side,
            self.kind,
            self.price,
            self.quantity,
            clock::now_nanos(),
        ))
    }
}

/// Trade executed event, one per emitted trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeExecutedEvent {
    pub trade_id: TradeId,
    pub sequence: u64,
    pub instrument: InstrumentId,
    pub buyer_order_id: OrderId,
    pub seller_order_id: OrderId,
    pub buyer_account_id: AccountId,
    pub seller_account_id: AccountId,
    pub price: Price,
    pub quantity: Quantity,
    pub timestamp: i64,
}

impl From<&Trade> for TradeExecutedEvent {
    fn from(trade: &Trade) -> Self {
        Self {
            trade_id: trade.trade_id,
            sequence: trade.sequence,
            instrument: trade.instrument.clone(),
            buyer_order_id: trade.buyer_order_id,
            seller_order_id: trade.seller_order_id,
            buyer_account_id: trade.buyer_account_id.clone(),
            seller_account_id: trade.seller_account_id.clone(),
            price: trade.price,
            quantity: trade.quantity,
            timestamp: trade.executed_at,
        }
    }
}
