//! Order types
//!
//! An order is one resting or incoming intent to trade. Only the matching
//! algorithm mutates `remaining_quantity`, and only downwards.

use crate::errors::OrderError;
use crate::ids::{AccountId, InstrumentId, OrderId};
use crate::numeric::{Price, Quantity};
use serde::{Deserialize, Serialize};

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order (bid)
    BUY,
    /// Sell order (ask)
    SELL,
}

/// Order kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderKind {
    /// Executes at its limit price or better; may rest
    LIMIT,
    /// Executes against whatever liquidity exists; never rests
    MARKET,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub account_id: AccountId,
    pub instrument: InstrumentId,
    pub side: Side,
    pub kind: OrderKind,
    /// Present for limit orders, absent for market orders
    pub price: Option<Price>,
    pub quantity: Quantity,
    pub remaining_quantity: Quantity,
    /// Submission sequence assigned by the book; time priority tie-break
    pub sequence: u64,
    pub created_at: i64, // Unix nanos
}

impl Order {
    /// Create an order of either kind. The price/kind combination is not
    /// checked here; see [`Order::validate`].
    pub fn new(
        account_id: AccountId,
        instrument: InstrumentId,
        side: Side,
        kind: OrderKind,
        price: Option<Price>,
        quantity: Quantity,
        timestamp: i64,
    ) -> Self {
        Self {
            order_id: OrderId::new(),
            account_id,
            instrument,
            side,
            kind,
            price,
            quantity,
            remaining_quantity: quantity,
            sequence: 0,
            created_at: timestamp,
        }
    }

    /// Create a limit order
    pub fn limit(
        account_id: AccountId,
        instrument: InstrumentId,
        side: Side,
        price: Price,
        quantity: Quantity,
        timestamp: i64,
    ) -> Self {
        Self::new(account_id, instrument, side, OrderKind::LIMIT, Some(price), quantity, timestamp)
    }

    /// Create a market order
    pub fn market(
        account_id: AccountId,
        instrument: InstrumentId,
        side: Side,
        quantity: Quantity,
        timestamp: i64,
    ) -> Self {
        Self::new(account_id, instrument, side, OrderKind::MARKET, None, quantity, timestamp)
    }

    /// Check the price/quantity/kind combination
    pub fn validate(&self) -> Result<(), OrderError> {
        if !self.remaining_quantity.is_positive() {
            return Err(OrderError::InvalidQuantity(format!(
                "remaining quantity must be positive, got {}",
                self.remaining_quantity
            )));
        }
        if self.quantity > Quantity::upper_bound() {
            return Err(OrderError::InvalidQuantity(format!(
                "quantity {} exceeds maximum {}",
                self.quantity,
                Quantity::upper_bound()
            )));
        }
        if self.remaining_quantity > self.quantity {
            return Err(OrderError::InvalidQuantity(format!(
                "remaining quantity {} exceeds order quantity {}",
                self.remaining_quantity, self.quantity
            )));
        }

        match (self.kind, self.price) {
            (OrderKind::LIMIT, None) => {
                Err(OrderError::InvalidPrice("limit orders must specify a price".into()))
            }
            (OrderKind::LIMIT, Some(price)) if !price.is_positive() => Err(
                OrderError::InvalidPrice(format!("limit price must be positive, got {}", price)),
            ),
            (OrderKind::LIMIT, Some(price)) if price > Price::upper_bound() => {
                Err(OrderError::InvalidPrice(format!(
                    "limit price {} exceeds maximum {}",
                    price,
                    Price::upper_bound()
                )))
            }
            (OrderKind::MARKET, Some(_)) => {
                Err(OrderError::InvalidPrice("market orders must not carry a price".into()))
            }
            _ => Ok(()),
        }
    }

    pub fn is_market(&self) -> bool {
        matches!(self.kind, OrderKind::MARKET)
    }

    /// Check if order is completely filled
    pub fn is_filled(&self) -> bool {
        self.remaining_quantity.is_zero()
    }

    /// Reduce the remaining quantity by a fill
    ///
    /// # Panics
    /// Panics if the fill would exceed the remaining quantity
    pub fn add_fill(&mut self, fill_quantity: Quantity) {
        assert!(
            fill_quantity <= self.remaining_quantity,
            "Fill would exceed remaining quantity"
        );
        self.remaining_quantity = self.remaining_quantity.saturating_sub(fill_quantity);
    }
}
