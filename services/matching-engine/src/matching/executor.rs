//! Trade execution logic
//!
//! Applies one fill to a crossing bid/ask pair and produces the trade record.

use types::clock;
use types::ids::InstrumentId;
use types::numeric::{Price, Quantity};
use types::order::{Order, Side};
use types::trade::Trade;

/// Match executor for handling trade generation
#[derive(Debug, Clone)]
pub struct MatchExecutor {
    instrument: InstrumentId,
    sequence_counter: u64,
}

impl MatchExecutor {
    /// Create a new match executor with starting sequence number
    pub fn new(instrument: InstrumentId, starting_sequence: u64) -> Self {
        Self {
            instrument,
            sequence_counter: starting_sequence,
        }
    }

    /// Get next sequence number (monotonically increasing)
    fn next_sequence(&mut self) -> u64 {
        let seq = self.sequence_counter;
        self.sequence_counter += 1;
        seq
    }

    /// Fill a crossing pair at `price`
    ///
    /// The fill quantity is the smaller of the two remaining quantities; both
    /// orders are reduced by it. The order with the higher sequence is the
    /// taker.
    pub fn execute(&mut self, bid: &mut Order, ask: &mut Order, price: Price) -> Trade {
        let quantity: Quantity = bid.remaining_quantity.min(ask.remaining_quantity);

        bid.add_fill(quantity);
        ask.add_fill(quantity);

        let taker_side = if bid.sequence > ask.sequence {
            Side::BUY
        } else {
            Side::SELL
        };

        Trade::new(
            self.next_sequence(),
            self.instrument.clone(),
            bid.order_id,
            ask.order_id,
            bid.account_id.clone(),
            ask.account_id.clone(),
            taker_side,
            price,
            quantity,
            clock::now_nanos(),
        )
    }
}
