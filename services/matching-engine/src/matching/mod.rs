//! Matching logic module
//!
//! Crossing rules and fill execution for the price-time priority algorithm

pub mod crossing;
pub mod executor;

pub use crossing::{can_match, crosses, execution_price};
pub use executor::MatchExecutor;
