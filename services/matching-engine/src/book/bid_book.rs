//! Bid (buy-side) ranking
//!
//! Buy orders rank by price descending, then by submission sequence
//! ascending. A market buy has no price limit and outranks every limit bid.

use std::cmp::Ordering;
use types::ids::OrderId;
use types::numeric::Price;
use types::order::Order;

use super::ranking::{RankKey, Ranking};

/// Bid (buy) side ranking, best bid on top
pub type BidBook = Ranking<BidKey>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BidKey {
    price: Option<Price>,
    sequence: u64,
    order_id: OrderId,
}

impl RankKey for BidKey {
    fn from_order(order: &Order) -> Self {
        Self {
            price: order.price,
            sequence: order.sequence,
            order_id: order.order_id,
        }
    }

    fn order_id(&self) -> OrderId {
        self.order_id
    }
}

impl Ord for BidKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // (is_market, price): market first, then the higher price
        (self.price.is_none(), self.price)
            .cmp(&(other.price.is_none(), other.price))
            // earlier sequence wins ties
            .then_with(|| other.sequence.cmp(&self.sequence))
            .then_with(|| other.order_id.cmp(&self.order_id))
    }
}

impl PartialOrd for BidKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
