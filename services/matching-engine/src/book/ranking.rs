//! Lazily pruned priority ranking
//!
//! A ranking is an append-only max-heap of order references. Fills and
//! cancels never touch it; entries whose order is gone are discarded only
//! when they surface at the top. The side-specific ordering lives in the
//! key type (see `BidKey` and `AskKey`).

use std::collections::BinaryHeap;
use types::ids::OrderId;
use types::order::Order;

/// Heap key for one side of the book. The greatest key is the best order.
pub trait RankKey: Ord + Copy {
    fn from_order(order: &Order) -> Self;
    fn order_id(&self) -> OrderId;
}

/// Price-time ranking for one side of the book
#[derive(Debug, Clone)]
pub struct Ranking<K: RankKey> {
    heap: BinaryHeap<K>,
}

impl<K: RankKey> Ranking<K> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }

    /// Rank an order. O(log n).
    pub fn push(&mut self, order: &Order) {
        self.heap.push(K::from_order(order));
    }

    /// Discard stale entries at the top and return the best live order id
    ///
    /// `is_live` must return false for orders that were filled, cancelled or
    /// discarded since they were ranked.
    pub fn best_live(&mut self, is_live: impl Fn(&OrderId) -> bool) -> Option<OrderId> {
        while let Some(top) = self.heap.peek() {
            let order_id = top.order_id();
            if is_live(&order_id) {
                return Some(order_id);
            }
            self.heap.pop();
        }
        None
    }

    /// Drop every stale entry, not just those at the top
    pub fn compact(&mut self, is_live: impl Fn(&OrderId) -> bool) {
        self.heap.retain(|key| is_live(&key.order_id()));
    }

    /// Number of entries, including stale ones not yet pruned
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl<K: RankKey> Default for Ranking<K> {
    fn default() -> Self {
        Self::new()
    }
}
