//! Crossing detection and execution price selection
//!
//! Determines when the best bid and best ask can match and at which price.

use types::numeric::Price;
use types::order::Order;

/// Check if a bid and ask can match at given prices
///
/// For a buy order to match with a sell order the buy price must be >= the
/// sell price.
pub fn can_match(bid_price: Price, ask_price: Price) -> bool {
    bid_price >= ask_price
}

/// Check if the best bid and best ask cross
///
/// A market order has no price limit, so it crosses any opposite order.
pub fn crosses(bid: &Order, ask: &Order) -> bool {
    match (bid.price, ask.price) {
        (Some(bid_price), Some(ask_price)) => can_match(bid_price, ask_price),
        _ => true,
    }
}

/// Pick the execution price for a crossing pair
///
/// - Both limit: the resting (earlier sequence) order's price.
/// - One market: the limit side's price.
/// - Both market: the last traded price, or None when there is none, in
///   which case the pair must not match.
pub fn execution_price(bid: &Order, ask: &Order, last_trade_price: Option<Price>) -> Option<Price> {
    match (bid.price, ask.price) {
        (Some(bid_price), Some(ask_price)) => {
            if bid.sequence < ask.sequence {
                Some(bid_price)
            } else {
                Some(ask_price)
            }
        }
        (Some(bid_price), None) => Some(bid_price),
        (None, Some(ask_price)) => Some(ask_price),
        (None, None) => last_trade_price,
    }
}
