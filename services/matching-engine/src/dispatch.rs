//! Asynchronous trade delivery
//!
//! The book hands trades to a `DispatchHandle` without blocking; a single
//! background task delivers them, in hand-off order, to the trade record
//! store and then to the publication boundary. Delivery failures are retried
//! here and never reach back into the book: a computed match is final.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use types::errors::{EngineError, SinkError};
use types::ids::TradeId;
use types::trade::Trade;

use crate::config::DispatchConfig;
use crate::events::TradeExecutedEvent;

/// Downstream settlement hand-off (e.g. a durable queue)
#[async_trait]
pub trait TradePublisher: Send + Sync {
    async fn publish(&self, event: &TradeExecutedEvent) -> Result<(), SinkError>;
}

/// Audit/history store for executed trades
#[async_trait]
pub trait TradeRecorder: Send + Sync {
    async fn record(&self, trade: &Trade) -> Result<(), SinkError>;
}

/// Delivery counters shared between the handle and the worker
#[derive(Debug, Default)]
pub struct DispatchStats {
    handed_off: AtomicU64,
    published: AtomicU64,
    recorded: AtomicU64,
    publish_failures: AtomicU64,
    record_failures: AtomicU64,
    last_failure: Mutex<Option<EngineError>>,
}

impl DispatchStats {
    pub fn handed_off(&self) -> u64 {
        self.handed_off.load(Ordering::Relaxed)
    }

    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub fn recorded(&self) -> u64 {
        self.recorded.load(Ordering::Relaxed)
    }

    pub fn publish_failures(&self) -> u64 {
        self.publish_failures.load(Ordering::Relaxed)
    }

    pub fn record_failures(&self) -> u64 {
        self.record_failures.load(Ordering::Relaxed)
    }

    /// Most recent delivery failure, if any
    pub fn last_failure(&self) -> Option<EngineError> {
        self.last_failure.lock().clone()
    }

    fn fail(&self, counter: &AtomicU64, err: EngineError) {
        counter.fetch_add(1, Ordering::Relaxed);
        *self.last_failure.lock() = Some(err);
    }
}

enum DispatchMessage {
    Trade(Trade),
    Shutdown,
}

/// The dispatcher worker has stopped; the trade was not handed off
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("trade dispatcher is closed")]
pub struct HandoffClosed;

/// Cheap cloneable sender side of the dispatcher
#[derive(Clone)]
pub struct DispatchHandle {
    tx: mpsc::UnboundedSender<DispatchMessage>,
    stats: Arc<DispatchStats>,
}

impl DispatchHandle {
    /// Queue a trade for delivery. Never blocks.
    pub fn hand_off(&self, trade: Trade) -> Result<(), HandoffClosed> {
        self.tx
            .send(DispatchMessage::Trade(trade))
            .map_err(|_| HandoffClosed)?;
        self.stats.handed_off.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }
}

/// Owner of the background delivery task
pub struct TradeDispatcher {
    handle: DispatchHandle,
    task: JoinHandle<()>,
}

impl TradeDispatcher {
    /// Spawn the delivery task on the current tokio runtime
    pub fn spawn(
        publisher: Arc<dyn TradePublisher>,
        recorder: Arc<dyn TradeRecorder>,
        config: DispatchConfig,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let stats = Arc::new(DispatchStats::default());
        info!(
            max_attempts = config.max_attempts,
            retry_backoff_ms = config.retry_backoff_ms,
            "Trade dispatcher started"
        );

        let worker = Worker {
            publisher,
            recorder,
            config,
            stats: stats.clone(),
        };
        let task = tokio::spawn(worker.run(rx));

        Self {
            handle: DispatchHandle { tx, stats },
            task,
        }
    }

    pub fn handle(&self) -> DispatchHandle {
        self.handle.clone()
    }

    pub fn stats(&self) -> &DispatchStats {
        self.handle.stats()
    }

    /// Deliver everything already handed off, then stop
    ///
    /// Hand-offs after this call fail with `HandoffClosed`.
    pub async fn shutdown(self) {
        if self.handle.tx.send(DispatchMessage::Shutdown).is_ok() {
            if let Err(err) = self.task.await {
                error!(error = %err, "Trade dispatcher task failed");
            }
        }
        info!(
            handed_off = self.handle.stats.handed_off(),
            published = self.handle.stats.published(),
            recorded = self.handle.stats.recorded(),
            "Trade dispatcher stopped"
        );
    }
}

struct Worker {
    publisher: Arc<dyn TradePublisher>,
    recorder: Arc<dyn TradeRecorder>,
    config: DispatchConfig,
    stats: Arc<DispatchStats>,
}

impl Worker {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<DispatchMessage>) {
        while let Some(message) = rx.recv().await {
            match message {
                DispatchMessage::Trade(trade) => self.deliver(trade).await,
                // Closing still yields the messages already queued
                DispatchMessage::Shutdown => rx.close(),
            }
        }
    }

    async fn deliver(&self, trade: Trade) {
        let trade_id = trade.trade_id;

        let recorded = self
            .with_retry("record", trade_id, || self.recorder.record(&trade))
            .await;
        match recorded {
            Ok(()) => {
                self.stats.recorded.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                let err = EngineError::PersistenceFailure {
                    trade_id: trade_id.to_string(),
                    reason: err.to_string(),
                };
                error!(error = %err, "Trade record not persisted");
                self.stats.fail(&self.stats.record_failures, err);
            }
        }

        let event = TradeExecutedEvent::from(&trade);
        let published = self
            .with_retry("publish", trade_id, || self.publisher.publish(&event))
            .await;
        match published {
            Ok(()) => {
                self.stats.published.fetch_add(1, Ordering::Relaxed);
                debug!(%trade_id, sequence = trade.sequence, "Trade published");
            }
            Err(err) => {
                let err = EngineError::PublicationFailure {
                    order_id: trade.buyer_order_id,
                    trades: vec![trade.clone()],
                    reason: err.to_string(),
                };
                error!(%trade_id, error = %err, "Trade not published");
                self.stats.fail(&self.stats.publish_failures, err);
            }
        }
    }

    /// Retry transient sink failures with linear backoff
    async fn with_retry<F, Fut>(
        &self,
        sink: &'static str,
        trade_id: TradeId,
        mut attempt_once: F,
    ) -> Result<(), SinkError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), SinkError>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match attempt_once().await {
                Ok(()) => return Ok(()),
                Err(err @ SinkError::Rejected(_)) => return Err(err),
                Err(err) if attempt >= max_attempts => return Err(err),
                Err(err) => {
                    warn!(sink, %trade_id, attempt, error = %err, "Delivery failed, retrying");
                    tokio::time::sleep(self.config.retry_backoff() * attempt).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// In-memory sink, used in tests and for embedding
#[derive(Debug, Default)]
pub struct MemorySink {
    published: Mutex<Vec<TradeExecutedEvent>>,
    recorded: Mutex<Vec<Trade>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<TradeExecutedEvent> {
        self.published.lock().clone()
    }

    pub fn recorded(&self) -> Vec<Trade> {
        self.recorded.lock().clone()
    }
}

#[async_trait]
impl TradePublisher for MemorySink {
    async fn publish(&self, event: &TradeExecutedEvent) -> Result<(), SinkError> {
        self.published.lock().push(event.clone());
        Ok(())
    }
}

#[async_trait]
impl TradeRecorder for MemorySink {
    async fn record(&self, trade: &Trade) -> Result<(), SinkError> {
        self.recorded.lock().push(trade.clone());
        Ok(())
    }
}

/// Sink that writes each trade as a structured log line
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl TradePublisher for LogSink {
    async fn publish(&self, event: &TradeExecutedEvent) -> Result<(), SinkError> {
        let payload =
            serde_json::to_string(event).map_err(|e| SinkError::Rejected(e.to_string()))?;
        info!(target: "trades", %payload, "trade_executed");
        Ok(())
    }
}

#[async_trait]
impl TradeRecorder for LogSink {
    async fn record(&self, trade: &Trade) -> Result<(), SinkError> {
        debug!(
            target: "trades",
            trade_id = %trade.trade_id,
            instrument = %trade.instrument,
            price = %trade.price,
            quantity = %trade.quantity,
            "trade_recorded"
        );
        Ok(())
    }
}
