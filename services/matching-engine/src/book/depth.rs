//! Aggregated depth view
//!
//! Read-only projection of live orders grouped by price level, consumed by
//! the client-facing depth feed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use types::ids::InstrumentId;
use types::numeric::{Price, Quantity};
use types::order::{Order, Side};

/// One aggregated price level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthLevel {
    pub price: Price,
    pub quantity: Quantity,
    pub order_count: usize,
}

/// Depth snapshot for one instrument, both sides best-first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthSnapshot {
    pub instrument: InstrumentId,
    pub bids: Vec<DepthLevel>,
    pub asks: Vec<DepthLevel>,
}

impl DepthSnapshot {
    /// Aggregate live orders into price levels
    ///
    /// Orders without a price (market orders mid-submission) and orders with
    /// nothing left are skipped.
    pub fn build<'a>(instrument: InstrumentId, orders: impl IntoIterator<Item = &'a Order>) -> Self {
        // BTreeMap keeps levels sorted, which also makes the output deterministic
        let mut bids: BTreeMap<Price, DepthLevel> = BTreeMap::new();
        let mut asks: BTreeMap<Price, DepthLevel> = BTreeMap::new();

        for order in orders {
            let Some(price) = order.price else { continue };
            if !order.remaining_quantity.is_positive() {
                continue;
            }
            let side = match order.side {
                Side::BUY => &mut bids,
                Side::SELL => &mut asks,
            };
            let level = side.entry(price).or_insert_with(|| DepthLevel {
                price,
                quantity: Quantity::zero(),
                order_count: 0,
            });
            level.quantity = level.quantity.saturating_add(order.remaining_quantity);
            level.order_count += 1;
        }

        Self {
            instrument,
            bids: bids.into_values().rev().collect(),
            asks: asks.into_values().collect(),
        }
    }

    /// Keep only the top `levels` price levels per side
    pub fn truncated(mut self, levels: usize) -> Self {
        self.bids.truncate(levels);
        self.asks.truncate(levels);
        self
    }

    pub fn best_bid(&self) -> Option<&DepthLevel> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&DepthLevel> {
        self.asks.first()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}
