//! Order book for a single instrument
//!
//! Owns every resting order of its instrument and runs the crossing loop
//! after each insertion. Rankings are append-only heaps; the live-order map
//! is the source of truth and stale heap entries are pruned when they reach
//! the top.

use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};
use types::errors::{EngineError, OrderError};
use types::ids::{InstrumentId, OrderId};
use types::numeric::Price;
use types::order::{Order, Side};
use types::trade::Trade;

use super::ask_book::AskBook;
use super::bid_book::BidBook;
use super::depth::DepthSnapshot;
use crate::matching::{crossing, MatchExecutor};

/// Rankings are compacted once stale entries outnumber live orders by this factor
const COMPACT_FACTOR: usize = 4;
/// Minimum ranking size before compaction is considered
const COMPACT_MIN_ENTRIES: usize = 1024;

#[derive(Debug, Clone)]
pub struct OrderBook {
    instrument: InstrumentId,
    bids: BidBook,
    asks: AskBook,
    /// Live orders keyed by id; every order here has remaining quantity > 0
    live: HashMap<OrderId, Order>,
    /// Every id ever accepted, so filled or cancelled ids cannot come back
    accepted: HashSet<OrderId>,
    executor: MatchExecutor,
    /// Last sequence handed to a submitted order
    last_sequence: u64,
    last_trade_price: Option<Price>,
    trade_count: u64,
}

fn is_live(live: &HashMap<OrderId, Order>, order_id: &OrderId) -> bool {
    live.get(order_id)
        .is_some_and(|order| order.remaining_quantity.is_positive())
}

impl OrderBook {
    pub fn new(instrument: InstrumentId) -> Self {
        Self {
            executor: MatchExecutor::new(instrument.clone(), 1),
            instrument,
            bids: BidBook::new(),
            asks: AskBook::new(),
            live: HashMap::new(),
            accepted: HashSet::new(),
            last_sequence: 0,
            last_trade_price: None,
            trade_count: 0,
        }
    }

    pub fn instrument(&self) -> &InstrumentId {
        &self.instrument
    }

    /// Submit an order and match it against the book
    ///
    /// Returns the trades produced by this submission in generation order.
    /// Validation failures return before anything is changed. Whatever part
    /// of a market order cannot be filled is discarded, never rested.
    pub fn submit(&mut self, mut order: Order) -> Result<Vec<Trade>, EngineError> {
        if order.instrument != self.instrument {
            return Err(EngineError::UnknownInstrument {
                symbol: order.instrument.to_string(),
            });
        }
        order.validate()?;
        if !self.accepted.insert(order.order_id) {
            return Err(OrderError::DuplicateOrderId(order.order_id).into());
        }

        self.last_sequence += 1;
        order.sequence = self.last_sequence;

        let order_id = order.order_id;
        let is_market = order.is_market();

        match order.side {
            Side::BUY => self.bids.push(&order),
            Side::SELL => self.asks.push(&order),
        }
        debug!(
            instrument = %self.instrument,
            %order_id,
            side = ?order.side,
            kind = ?order.kind,
            sequence = order.sequence,
            "Order accepted"
        );
        self.live.insert(order_id, order);

        let trades = self.cross();

        if is_market {
            if let Some(unfilled) = self.live.remove(&order_id) {
                debug!(
                    instrument = %self.instrument,
                    %order_id,
                    discarded = %unfilled.remaining_quantity,
                    "Market order remainder discarded"
                );
            }
        }

        self.maybe_compact();
        Ok(trades)
    }

    /// Run the crossing loop until the best bid and ask no longer cross
    fn cross(&mut self) -> Vec<Trade> {
        let mut trades = Vec::new();

        loop {
            let live = &self.live;
            let Some(bid_id) = self.bids.best_live(|id| is_live(live, id)) else {
                break;
            };
            let Some(ask_id) = self.asks.best_live(|id| is_live(live, id)) else {
                break;
            };

            let (bid, ask) = (&self.live[&bid_id], &self.live[&ask_id]);
            if !crossing::crosses(bid, ask) {
                break;
            }

            let Some(price) = crossing::execution_price(bid, ask, self.last_trade_price) else {
                // Only reachable when both sides are market orders and nothing
                // has traded yet. The incoming market order is discarded by
                // the caller.
                warn!(
                    instrument = %self.instrument,
                    bid = %bid_id,
                    ask = %ask_id,
                    "No reference price for market-to-market match; match rejected"
                );
                break;
            };

            let (Some(mut bid), Some(mut ask)) =
                (self.live.remove(&bid_id), self.live.remove(&ask_id))
            else {
                break;
            };

            let trade = self.executor.execute(&mut bid, &mut ask, price);
            debug!(
                instrument = %self.instrument,
                trade_id = %trade.trade_id,
                sequence = trade.sequence,
                price = %trade.price,
                quantity = %trade.quantity,
                "Trade executed"
            );

            self.last_trade_price = Some(price);
            self.trade_count += 1;

            // Fully filled orders leave the lookup; their ranking entries go stale
            if !bid.is_filled() {
                self.live.insert(bid_id, bid);
            }
            if !ask.is_filled() {
                self.live.insert(ask_id, ask);
            }

            trades.push(trade);
        }

        trades
    }

    /// Remove a live order from the book
    ///
    /// The ranking entry is left in place and pruned lazily.
    pub fn cancel(&mut self, order_id: &OrderId) -> Result<Order, EngineError> {
        let order = self
            .live
            .remove(order_id)
            .ok_or(EngineError::OrderNotFound { order_id: *order_id })?;
        debug!(instrument = %self.instrument, %order_id, "Order cancelled");
        self.maybe_compact();
        Ok(order)
    }

    /// Aggregated depth of all live orders, both sides best-first
    pub fn depth_snapshot(&self) -> DepthSnapshot {
        DepthSnapshot::build(self.instrument.clone(), self.live.values())
    }

    /// Best live buy order
    pub fn best_bid(&mut self) -> Option<&Order> {
        let live = &self.live;
        let id = self.bids.best_live(|id| is_live(live, id))?;
        self.live.get(&id)
    }

    /// Best live sell order
    pub fn best_ask(&mut self) -> Option<&Order> {
        let live = &self.live;
        let id = self.asks.best_live(|id| is_live(live, id))?;
        self.live.get(&id)
    }

    pub fn order(&self, order_id: &OrderId) -> Option<&Order> {
        self.live.get(order_id)
    }

    pub fn last_trade_price(&self) -> Option<Price> {
        self.last_trade_price
    }

    /// Number of trades emitted since the book was created
    pub fn trade_count(&self) -> u64 {
        self.trade_count
    }

    pub fn live_order_count(&self) -> usize {
        self.live.len()
    }

    fn maybe_compact(&mut self) {
        let ranked = self.bids.len() + self.asks.len();
        if ranked < COMPACT_MIN_ENTRIES || ranked <= COMPACT_FACTOR * self.live.len() {
            return;
        }
        let live = &self.live;
        self.bids.compact(|id| is_live(live, id));
        self.asks.compact(|id| is_live(live, id));
        debug!(
            instrument = %self.instrument,
            before = ranked,
            after = self.bids.len() + self.asks.len(),
            "Rankings compacted"
        );
    }
}
