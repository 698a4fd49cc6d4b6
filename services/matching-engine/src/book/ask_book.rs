//! Ask (sell-side) ranking
//!
//! Sell orders rank by price ascending, then by submission sequence
//! ascending. A market sell outranks every limit ask.

use std::cmp::Ordering;
use types::ids::OrderId;
use types::numeric::Price;
use types::order::Order;

use super::ranking::{RankKey, Ranking};

/// Ask (sell) side ranking, best ask on top
pub type AskBook = Ranking<AskKey>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AskKey {
    price: Option<Price>,
    sequence: u64,
    order_id: OrderId,
}

impl RankKey for AskKey {
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

impl Ord for AskKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.price
            .is_none()
            .cmp(&other.price.is_none())
            // lower price is better, so compare reversed
            .then_with(|| other.price.cmp(&self.price))
            .then_with(|| other.sequence.cmp(&self.sequence))
            .then_with(|| other.order_id.cmp(&self.order_id))
    }
}

impl PartialOrd for AskKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
