//! Matching engine core
//!
//! Main coordinator: one order book per configured instrument, each behind
//! its own read/write lock, plus the hand-off of emitted trades to the
//! dispatcher.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use types::errors::EngineError;
use types::ids::{InstrumentId, OrderId};
use types::order::Order;
use types::trade::Trade;

use crate::book::{DepthSnapshot, OrderBook};
use crate::config::{ConfigError, EngineConfig};
use crate::dispatch::DispatchHandle;
use crate::events::SubmitOrderRequest;

/// Outcome of a routed order
#[derive(Debug, Clone, PartialEq)]
pub struct RouteReceipt {
    pub order_id: OrderId,
    /// Trades in generation order
    pub trades: Vec<Trade>,
}

/// Main matching engine
///
/// The set of books is fixed at construction. Submissions and cancels on
/// one instrument are serialised by that book's write lock; depth reads
/// share its read lock. Instruments never contend with each other.
pub struct MatchingEngine {
    books: HashMap<InstrumentId, Arc<RwLock<OrderBook>>>,
    dispatch: Option<DispatchHandle>,
}

impl MatchingEngine {
    /// Create an engine that returns trades to the caller only
    pub fn new(config: &EngineConfig) -> Result<Self, ConfigError> {
        let instruments = config.instrument_ids()?;
        Ok(Self::with_instruments(instruments, None))
    }

    /// Create an engine that also hands every trade to the dispatcher
    pub fn with_dispatcher(
        config: &EngineConfig,
        dispatch: DispatchHandle,
    ) -> Result<Self, ConfigError> {
        let instruments = config.instrument_ids()?;
        Ok(Self::with_instruments(instruments, Some(dispatch)))
    }

    pub fn with_instruments(
        instruments: impl IntoIterator<Item = InstrumentId>,
        dispatch: Option<DispatchHandle>,
    ) -> Self {
        let books: HashMap<_, _> = instruments
            .into_iter()
            .map(|id| (id.clone(), Arc::new(RwLock::new(OrderBook::new(id)))))
            .collect();
        info!(
            instruments = books.len(),
            dispatcher = dispatch.is_some(),
            "Matching engine ready"
        );
        Self { books, dispatch }
    }

    /// Route an order to its instrument's book and match it
    ///
    /// Trades are handed to the dispatcher in generation order before the
    /// book lock is released. A failed hand-off does not undo the match:
    /// the trades come back inside `PublicationFailure`.
    pub fn route(&self, order: Order) -> Result<RouteReceipt, EngineError> {
        let order_id = order.order_id;
        let book = self.book(&order.instrument)?;

        let mut book = book.write();
        let trades = book.submit(order).inspect_err(|err| {
            warn!(instrument = %book.instrument(), %order_id, error = %err, "Order rejected");
        })?;

        if let Some(dispatch) = &self.dispatch {
            for trade in &trades {
                if let Err(err) = dispatch.hand_off(trade.clone()) {
                    drop(book);
                    warn!(%order_id, trades = trades.len(), error = %err, "Trade hand-off failed");
                    return Err(EngineError::PublicationFailure {
                        order_id,
                        trades,
                        reason: err.to_string(),
                    });
                }
            }
        }
        drop(book);

        debug!(%order_id, trades = trades.len(), "Order routed");
        Ok(RouteReceipt { order_id, trades })
    }

    /// Build an order from the inbound request shape and route it
    pub fn submit_order(&self, request: SubmitOrderRequest) -> Result<RouteReceipt, EngineError> {
        let order = request.into_order().inspect_err(|err| {
            warn!(error = %err, "Order request rejected");
        })?;
        self.route(order)
    }

    pub fn cancel(&self, instrument: &InstrumentId, order_id: &OrderId) -> Result<Order, EngineError> {
        self.book(instrument)?.write().cancel(order_id)
    }

    pub fn depth_snapshot(&self, instrument: &InstrumentId) -> Result<DepthSnapshot, EngineError> {
        Ok(self.book(instrument)?.read().depth_snapshot())
    }

    /// Depth truncated to the best `levels` price levels per side
    pub fn depth(&self, instrument: &InstrumentId, levels: usize) -> Result<DepthSnapshot, EngineError> {
        self.depth_snapshot(instrument)
            .map(|snapshot| snapshot.truncated(levels))
    }

    /// Configured instruments, sorted
    pub fn instruments(&self) -> Vec<InstrumentId> {
        let mut instruments: Vec<_> = self.books.keys().cloned().collect();
        instruments.sort();
        instruments
    }

    /// Shared handle to one instrument's book
    pub fn book(&self, instrument: &InstrumentId) -> Result<Arc<RwLock<OrderBook>>, EngineError> {
        self.books
            .get(instrument)
            .cloned()
            .ok_or_else(|| EngineError::UnknownInstrument {
                symbol: instrument.to_string(),
            })
    }
}
