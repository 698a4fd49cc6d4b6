//! End-to-end matching scenarios through the engine front
//!
//! Covers the reference crossing scenario, partial fills, time priority,
//! market orders and the delivery pipeline into the trade journal.

use matching_engine::config::DispatchConfig;
use matching_engine::dispatch::{MemorySink, TradeDispatcher};
use matching_engine::journal::{self, TradeJournal};
use matching_engine::{DepthLevel, EngineConfig, MatchingEngine};
use std::sync::Arc;
use tempfile::TempDir;
use types::errors::EngineError;
use types::ids::{AccountId, InstrumentId};
use types::numeric::{Price, Quantity};
use types::order::{Order, Side};

fn btc() -> InstrumentId {
    InstrumentId::new("BTC-USD")
}

fn engine() -> MatchingEngine {
    MatchingEngine::new(&EngineConfig::default()).unwrap()
}

fn limit(account: &str, side: Side, price: &str, qty: &str) -> Order {
    Order::limit(
        AccountId::new(account),
        btc(),
        side,
        Price::from_str(price).unwrap(),
        Quantity::from_str(qty).unwrap(),
        1708123456789000000,
    )
}

fn market(account: &str, side: Side, qty: &str) -> Order {
    Order::market(
        AccountId::new(account),
        btc(),
        side,
        Quantity::from_str(qty).unwrap(),
        1708123456789000000,
    )
}

fn level(price: &str, qty: &str, count: usize) -> DepthLevel {
    DepthLevel {
        price: Price::from_str(price).unwrap(),
        quantity: Quantity::from_str(qty).unwrap(),
        order_count: count,
    }
}

#[test]
fn test_reference_crossing_scenario() {
    let engine = engine();

    let first = engine.route(limit("0xs1", Side::SELL, "30000", "0.01")).unwrap();
    assert!(first.trades.is_empty());
    let second = engine.route(limit("0xs2", Side::SELL, "30001", "0.02")).unwrap();
    assert!(second.trades.is_empty());

    let buy = engine.route(limit("0xb", Side::BUY, "30000.5", "0.015")).unwrap();

    assert_eq!(buy.trades.len(), 1);
    let trade = &buy.trades[0];
    assert_eq!(trade.price, Price::from_u64(30000));
    assert_eq!(trade.quantity, Quantity::from_str("0.01").unwrap());
    assert_eq!(trade.buyer_order_id, buy.order_id);
    assert_eq!(trade.seller_order_id, first.order_id);
    assert_eq!(trade.buyer_account_id, AccountId::new("0xb"));
    assert_eq!(trade.seller_account_id, AccountId::new("0xs1"));

    let depth = engine.depth_snapshot(&btc()).unwrap();
    assert_eq!(depth.asks, vec![level("30001", "0.02", 1)]);
    assert_eq!(depth.bids, vec![level("30000.5", "0.005", 1)]);
}

#[test]
fn test_partial_fill_rests_remainder() {
    let engine = engine();
    engine.route(limit("0xs", Side::SELL, "99", "3")).unwrap();
    let buy = engine.route(limit("0xb", Side::BUY, "100", "5")).unwrap();

    assert_eq!(buy.trades.len(), 1);
    assert_eq!(buy.trades[0].price, Price::from_u64(99));
    assert_eq!(buy.trades[0].quantity, Quantity::from_u64(3));

    let depth = engine.depth_snapshot(&btc()).unwrap();
    assert!(depth.asks.is_empty());
    assert_eq!(depth.bids, vec![level("100", "2", 1)]);
}

#[test]
fn test_no_cross_leaves_both_resting() {
    let engine = engine();
    engine.route(limit("0xb", Side::BUY, "99", "1")).unwrap();
    let sell = engine.route(limit("0xs", Side::SELL, "100", "1")).unwrap();

    assert!(sell.trades.is_empty());
    let depth = engine.depth_snapshot(&btc()).unwrap();
    assert_eq!(depth.bids, vec![level("99", "1", 1)]);
    assert_eq!(depth.asks, vec![level("100", "1", 1)]);
}

#[test]
fn test_earlier_order_fills_first_at_same_price() {
    let engine = engine();
    let early = engine.route(limit("0xs1", Side::SELL, "100", "1")).unwrap();
    let late = engine.route(limit("0xs2", Side::SELL, "100", "1")).unwrap();

    let buy = engine.route(limit("0xb", Side::BUY, "100", "1")).unwrap();
    assert_eq!(buy.trades[0].seller_order_id, early.order_id);

    let book = engine.book(&btc()).unwrap();
    let book = book.read();
    assert!(book.order(&early.order_id).is_none());
    assert!(book.order(&late.order_id).is_some());
}

#[test]
fn test_market_order_sweeps_and_never_rests() {
    let engine = engine();
    engine.route(limit("0xs1", Side::SELL, "100", "1")).unwrap();
    engine.route(limit("0xs2", Side::SELL, "101", "1")).unwrap();

    let sweep = engine.route(market("0xb", Side::BUY, "5")).unwrap();
    let prices: Vec<Price> = sweep.trades.iter().map(|t| t.price).collect();
    assert_eq!(prices, vec![Price::from_u64(100), Price::from_u64(101)]);

    let depth = engine.depth_snapshot(&btc()).unwrap();
    assert!(depth.is_empty());

    let empty = engine.route(market("0xs", Side::SELL, "1")).unwrap();
    assert!(empty.trades.is_empty());
    assert_eq!(engine.book(&btc()).unwrap().read().live_order_count(), 0);
}

#[test]
fn test_snapshots_are_stable_without_submissions() {
    let engine = engine();
    engine.route(limit("0xb", Side::BUY, "98", "1")).unwrap();
    engine.route(limit("0xb", Side::BUY, "98", "2")).unwrap();
    engine.route(limit("0xs", Side::SELL, "101", "4")).unwrap();

    let a = engine.depth_snapshot(&btc()).unwrap();
    let b = engine.depth_snapshot(&btc()).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.bids, vec![level("98", "3", 2)]);
}

#[test]
fn test_invalid_order_rejected_without_change() {
    let engine = engine();
    engine.route(limit("0xs", Side::SELL, "100", "1")).unwrap();

    let mut zero = limit("0xb", Side::BUY, "100", "1");
    zero.quantity = Quantity::zero();
    zero.remaining_quantity = Quantity::zero();
    assert!(matches!(engine.route(zero), Err(EngineError::InvalidOrder(_))));

    let depth = engine.depth_snapshot(&btc()).unwrap();
    assert_eq!(depth.asks, vec![level("100", "1", 1)]);
    assert!(depth.bids.is_empty());
}

#[tokio::test]
async fn test_trades_reach_journal_in_order() {
    let tmp = TempDir::new().unwrap();
    let journal = Arc::new(TradeJournal::open(tmp.path()).unwrap());
    let publisher = Arc::new(MemorySink::new());
    let dispatcher = TradeDispatcher::spawn(publisher.clone(), journal, DispatchConfig::default());
    let engine = MatchingEngine::with_dispatcher(&EngineConfig::default(), dispatcher.handle()).unwrap();

    for price in ["100", "101", "102"] {
        engine.route(limit("0xs", Side::SELL, price, "1")).unwrap();
    }
    let sweep = engine.route(limit("0xb", Side::BUY, "102", "3")).unwrap();
    dispatcher.shutdown().await;

    let replayed = journal::replay(tmp.path()).unwrap();
    assert!(replayed.corruption.is_none());
    assert_eq!(replayed.trades, sweep.trades);

    let published: Vec<u64> = publisher.published().iter().map(|e| e.sequence).collect();
    assert_eq!(published, vec![1, 2, 3]);
}
