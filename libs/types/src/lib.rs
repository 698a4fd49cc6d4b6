//! Types library for the matching engine
//!
//! Core type definitions shared by the order book, the engine front and
//! the trade delivery adapters.
//!
//! # Modules
//! - `ids`: Unique identifiers (OrderId, TradeId, AccountId, InstrumentId)
//! - `numeric`: Fixed-point decimal types (Price, Quantity)
//! - `order`: Order types
//! - `trade`: Trade execution types
//! - `errors`: Error taxonomy
//! - `clock`: Wall-clock timestamps

// Public modules
pub mod clock;
pub mod errors;
pub mod ids;
pub mod numeric;
pub mod order;
pub mod trade;

