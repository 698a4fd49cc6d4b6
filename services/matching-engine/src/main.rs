//! `matchd`: line-oriented front end for the matching engine
//!
//! Reads one JSON command per line from stdin and writes one JSON response
//! per line to stdout. Logs go to stderr.
//!
//! ```text
//! {"instrument":"BTC-USD","account_id":"0xabc","side":"BUY","kind":"LIMIT","price":"30000.5","quantity":"0.015"}
//! {"cancel":{"instrument":"BTC-USD","order_id":"0190..."}}
//! {"depth":"BTC-USD"}
//! ```

use matching_engine::dispatch::{LogSink, TradeDispatcher, TradePublisher, TradeRecorder};
use matching_engine::events::SubmitOrderRequest;
use matching_engine::journal::TradeJournal;
use matching_engine::{EngineConfig, MatchingEngine};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;
use types::errors::EngineError;
use types::ids::{InstrumentId, OrderId};

#[derive(Debug, Deserialize)]
struct CancelRequest {
    instrument: String,
    order_id: OrderId,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Command {
    Cancel { cancel: CancelRequest },
    Depth { depth: String },
    Submit(SubmitOrderRequest),
}

fn error_kind(err: &EngineError) -> &'static str {
    match err {
        EngineError::InvalidOrder(_) => "invalid_order",
        EngineError::UnknownInstrument { .. } => "unknown_instrument",
        EngineError::OrderNotFound { .. } => "order_not_found",
        EngineError::PublicationFailure { .. } => "publication_failure",
        EngineError::PersistenceFailure { .. } => "persistence_failure",
    }
}

fn error_response(err: &EngineError) -> Value {
    let mut response = json!({ "error": error_kind(err), "message": err.to_string() });
    if let EngineError::PublicationFailure { order_id, trades, .. } = err {
        response["order_id"] = json!(order_id);
        response["trades"] = json!(trades);
    }
    response
}

fn parse_instrument(symbol: &str) -> Result<InstrumentId, EngineError> {
    InstrumentId::try_new(symbol).ok_or_else(|| EngineError::UnknownInstrument {
        symbol: symbol.to_string(),
    })
}

fn execute(engine: &MatchingEngine, config: &EngineConfig, line: &str) -> Value {
    let command: Command = match serde_json::from_str(line) {
        Ok(command) => command,
        Err(err) => return json!({ "error": "malformed_command", "message": err.to_string() }),
    };

    let result = match command {
        Command::Submit(request) => engine
            .submit_order(request)
            .map(|receipt| json!({ "order_id": receipt.order_id, "trades": receipt.trades })),
        Command::Cancel { cancel } => parse_instrument(&cancel.instrument)
            .and_then(|instrument| engine.cancel(&instrument, &cancel.order_id))
            .map(|order| json!({ "cancelled": order })),
        Command::Depth { depth } => parse_instrument(&depth)
            .and_then(|instrument| engine.depth(&instrument, config.depth_levels))
            .map(|snapshot| json!(snapshot)),
    };

    result.unwrap_or_else(|err| error_response(&err))
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting matchd");

    let config = EngineConfig::from_env()?;

    let recorder: Arc<dyn TradeRecorder> = match &config.journal_dir {
        Some(dir) => Arc::new(TradeJournal::open(dir)?),
        None => Arc::new(LogSink),
    };
    let publisher: Arc<dyn TradePublisher> = Arc::new(LogSink);
    let dispatcher = TradeDispatcher::spawn(publisher, recorder, config.dispatch.clone());
    let engine = MatchingEngine::with_dispatcher(&config, dispatcher.handle())?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let response = execute(&engine, &config, line);
        stdout.write_all(format!("{}\n", response).as_bytes()).await?;
        stdout.flush().await?;
    }

    for instrument in engine.instruments() {
        let depth = engine.depth(&instrument, config.depth_levels)?;
        stdout
            .write_all(format!("{}\n", json!({ "final_depth": depth })).as_bytes())
            .await?;
    }
    stdout.flush().await?;

    drop(engine);
    let stats = dispatcher.stats();
    tracing::info!(
        handed_off = stats.handed_off(),
        publish_failures = stats.publish_failures(),
        record_failures = stats.record_failures(),
        "Input closed, draining trade dispatcher"
    );
    dispatcher.shutdown().await;

    Ok(())
}
