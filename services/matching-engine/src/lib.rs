//! Matching Engine Service
//!
//! Continuous limit-order matching with price-time priority, one book per
//! configured instrument.
//!
//! **Key Invariants:**
//! - Price-time priority strictly enforced (better price first, then earlier sequence)
//! - No crossed book between resting limit orders after any submission
//! - Conservation of quantity: every matched unit appears in exactly one trade
//! - A computed match is final; delivery failures never undo it
//!
//! Trades leave the engine through the [`dispatch`] module, which delivers
//! them to a [`dispatch::TradeRecorder`] and a [`dispatch::TradePublisher`]
//! in generation order per instrument.

pub mod book;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod events;
pub mod journal;
pub mod matching;

pub use book::{DepthLevel, DepthSnapshot, OrderBook};
pub use config::{DispatchConfig, EngineConfig};
pub use dispatch::{DispatchHandle, TradeDispatcher};
pub use engine::{MatchingEngine, RouteReceipt};
