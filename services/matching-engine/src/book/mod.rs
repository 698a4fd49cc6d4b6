//! Order book infrastructure module
//!
//! Contains the side rankings, the aggregated depth view and the
//! per-instrument order book that ties them together.

pub mod ask_book;
pub mod bid_book;
pub mod depth;
pub mod order_book;
pub mod ranking;

pub use ask_book::AskBook;
pub use bid_book::BidBook;
pub use depth::{DepthLevel, DepthSnapshot};
pub use order_book::OrderBook;
