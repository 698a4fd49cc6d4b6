//! Trade journal: append-only trade record store with checksums
//!
//! # Binary Format (per entry)
//! ```text
//! [body_len:    u32]
//! [sequence:    u64]   // journal entry number, starts at 1
//! [timestamp:   i64]   // trade execution time, unix nanos
//! [payload_len: u32][payload: bytes]   // bincode-encoded Trade
//! [checksum:    u32]   // CRC32C over sequence+timestamp+payload
//! ```
//!
//! A torn or corrupted tail is tolerated on read: replay stops at the first
//! entry that does not decode or verify, and the valid prefix is returned.

use async_trait::async_trait;
use crc32c::crc32c;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use types::errors::SinkError;
use types::trade::Trade;

use crate::dispatch::TradeRecorder;

const JOURNAL_FILE: &str = "trades.journal";

/// Copy of the journal as found on open, kept when a corrupted tail is cut off
const CORRUPT_COPY_FILE: &str = "trades.journal.corrupt";

/// seq + ts + payload_len + crc
const MIN_BODY_LEN: usize = 8 + 8 + 4 + 4;

/// Anything larger is treated as corruption
const MAX_BODY_LEN: usize = 16 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Corruption at byte offset {offset}: {detail}")]
    Corruption { offset: u64, detail: String },
}

/// A single decoded journal entry
#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
    pub sequence: u64,
    pub timestamp: i64,
    pub payload: Vec<u8>,
    pub checksum: u32,
}

impl JournalEntry {
    pub fn for_trade(sequence: u64, trade: &Trade) -> Result<Self, JournalError> {
        let payload = bincode::serialize(trade)?;
        let checksum = Self::compute_checksum(sequence, trade.executed_at, &payload);
        Ok(Self {
            sequence,
            timestamp: trade.executed_at,
            payload,
            checksum,
        })
    }

    pub fn compute_checksum(sequence: u64, timestamp: i64, payload: &[u8]) -> u32 {
        let mut buf = Vec::with_capacity(16 + payload.len());
        buf.extend_from_slice(&sequence.to_le_bytes());
        buf.extend_from_slice(&timestamp.to_le_bytes());
        buf.extend_from_slice(payload);
        crc32c(&buf)
    }

    pub fn verify_checksum(&self) -> bool {
        self.checksum == Self::compute_checksum(self.sequence, self.timestamp, &self.payload)
    }

    pub fn trade(&self) -> Result<Trade, JournalError> {
        Ok(bincode::deserialize(&self.payload)?)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let body_len = (MIN_BODY_LEN + self.payload.len()) as u32;
        let mut buf = Vec::with_capacity(4 + body_len as usize);
        buf.extend_from_slice(&body_len.to_le_bytes());
        buf.extend_from_slice(&self.sequence.to_le_bytes());
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
        buf.extend_from_slice(&(self.payload.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.payload);
        buf.extend_from_slice(&self.checksum.to_le_bytes());
        buf
    }

    /// Decode one entry from the front of `data`
    ///
    /// Returns `(entry, bytes_consumed)`. Checksums are not verified here.
    pub fn from_bytes(data: &[u8]) -> Result<(Self, usize), String> {
        let mut cursor = Cursor { data, pos: 0 };

        let body_len = cursor.u32().ok_or("not enough data for length prefix")? as usize;
        if !(MIN_BODY_LEN..=MAX_BODY_LEN).contains(&body_len) {
            return Err(format!("implausible body length {}", body_len));
        }
        if data.len() < 4 + body_len {
            return Err(format!(
                "incomplete entry: need {} bytes, have {}",
                4 + body_len,
                data.len()
            ));
        }

        let sequence = cursor.u64().ok_or("truncated sequence")?;
        let timestamp = cursor.i64().ok_or("truncated timestamp")?;
        let payload_len = cursor.u32().ok_or("truncated payload length")? as usize;
        if payload_len != body_len - MIN_BODY_LEN {
            return Err(format!(
                "payload length {} disagrees with body length {}",
                payload_len, body_len
            ));
        }
        let payload = cursor.bytes(payload_len).ok_or("truncated payload")?.to_vec();
        let checksum = cursor.u32().ok_or("truncated checksum")?;

        Ok((
            Self {
                sequence,
                timestamp,
                payload,
                checksum,
            },
            cursor.pos,
        ))
    }
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn bytes(&mut self, n: usize) -> Option<&'a [u8]> {
        let slice = self.data.get(self.pos..self.pos.checked_add(n)?)?;
        self.pos += n;
        Some(slice)
    }

    fn u32(&mut self) -> Option<u32> {
        Some(u32::from_le_bytes(self.bytes(4)?.try_into().ok()?))
    }

    fn u64(&mut self) -> Option<u64> {
        Some(u64::from_le_bytes(self.bytes(8)?.try_into().ok()?))
    }

    fn i64(&mut self) -> Option<i64> {
        Some(i64::from_le_bytes(self.bytes(8)?.try_into().ok()?))
    }
}

/// Result of replaying a journal file
#[derive(Debug, Default)]
pub struct Replay {
    pub trades: Vec<Trade>,
    /// Byte length of the valid prefix
    pub valid_len: u64,
    /// Set when replay stopped before the end of the file
    pub corruption: Option<JournalError>,
}

/// Read every valid trade from the journal in `dir`
pub fn replay(dir: &Path) -> Result<Replay, JournalError> {
    let path = dir.join(JOURNAL_FILE);
    if !path.exists() {
        return Ok(Replay::default());
    }
    let data = fs::read(&path)?;

    let mut replay = Replay::default();
    let mut offset = 0usize;
    while offset < data.len() {
        let corruption = |detail: String| JournalError::Corruption {
            offset: offset as u64,
            detail,
        };
        let (entry, consumed) = match JournalEntry::from_bytes(&data[offset..]) {
            Ok(decoded) => decoded,
            Err(detail) => {
                replay.corruption = Some(corruption(detail));
                break;
            }
        };
        if !entry.verify_checksum() {
            replay.corruption = Some(corruption(format!(
                "checksum mismatch for entry {}",
                entry.sequence
            )));
            break;
        }
        match entry.trade() {
            Ok(trade) => replay.trades.push(trade),
            Err(err) => {
                replay.corruption = Some(corruption(err.to_string()));
                break;
            }
        }
        offset += consumed;
    }
    replay.valid_len = offset as u64;

    if let Some(err) = &replay.corruption {
        warn!(error = %err, recovered = replay.trades.len(), "Trade journal has a corrupted tail");
    }
    Ok(replay)
}

struct JournalWriter {
    writer: BufWriter<File>,
    next_sequence: u64,
}

impl JournalWriter {
    fn append(&mut self, trade: &Trade) -> Result<u64, JournalError> {
        let sequence = self.next_sequence;
        let entry = JournalEntry::for_trade(sequence, trade)?;

        self.writer.write_all(&entry.to_bytes())?;
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        self.next_sequence += 1;

        debug!(sequence, trade_id = %trade.trade_id, "Trade journaled");
        Ok(sequence)
    }
}

/// Append-only trade journal, flushed and fsynced per entry
pub struct TradeJournal {
    path: PathBuf,
    inner: Arc<Mutex<JournalWriter>>,
}

impl TradeJournal {
    /// Open (or create) the journal in `dir`, continuing its entry numbering
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, JournalError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let existing = replay(dir)?;
        let next_sequence = existing.trades.len() as u64 + 1;
        let path = dir.join(JOURNAL_FILE);

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        if let Some(err) = &existing.corruption {
            // New entries must not land behind an unreadable one
            let found_len = file.metadata()?.len();
            let copy = dir.join(CORRUPT_COPY_FILE);
            fs::copy(&path, &copy)?;
            warn!(
                error = %err,
                dropped_bytes = found_len - existing.valid_len,
                kept_entries = existing.trades.len(),
                copy = %copy.display(),
                "Cutting trade journal back to its last valid entry"
            );
            file.set_len(existing.valid_len)?;
        }
        info!(path = %path.display(), next_sequence, "Trade journal opened");

        Ok(Self {
            path,
            inner: Arc::new(Mutex::new(JournalWriter {
                writer: BufWriter::new(file),
                next_sequence,
            })),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn next_sequence(&self) -> u64 {
        self.inner.lock().next_sequence
    }

    /// Append one trade. Returns the journal entry number.
    ///
    /// Blocks on the file write and fsync.
    pub fn append(&self, trade: &Trade) -> Result<u64, JournalError> {
        self.inner.lock().append(trade)
    }

    pub fn sync(&self) -> Result<(), JournalError> {
        let mut inner = self.inner.lock();
        inner.writer.flush()?;
        inner.writer.get_ref().sync_all()?;
        Ok(())
    }
}

#[async_trait]
impl TradeRecorder for TradeJournal {
    async fn record(&self, trade: &Trade) -> Result<(), SinkError> {
        let inner = Arc::clone(&self.inner);
        let trade = trade.clone();
        let appended = tokio::task::spawn_blocking(move || inner.lock().append(&trade))
            .await
            .map_err(|err| SinkError::Unavailable(format!("journal writer task failed: {}", err)))?;

        match appended {
            Ok(_) => Ok(()),
            Err(JournalError::Io(err)) => Err(SinkError::Unavailable(err.to_string())),
            Err(err) => Err(SinkError::Rejected(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use types::ids::{AccountId, InstrumentId, OrderId};
    use types::numeric::{Price, Quantity};
    use types::order::Side;

    fn sample_trade(sequence: u64) -> Trade {
        Trade::new(
            sequence,
            InstrumentId::new("BTC-USD"),
            OrderId::new(),
            OrderId::new(),
            AccountId::new("0xbuyer"),
            AccountId::new("0xseller"),
            Side::SELL,
            Price::from_str("30000.5").unwrap(),
            Quantity::from_str("0.25").unwrap(),
            1_708_123_456_789_000_000 + sequence as i64,
        )
    }

    #[test]
    fn test_entry_checksum_detects_tamper() {
        let mut entry = JournalEntry::for_trade(1, &sample_trade(1)).unwrap();
        assert!(entry.verify_checksum());
        entry.payload[0] ^= 0xff;
        assert!(!entry.verify_checksum());
    }

    #[test]
    fn test_append_and_replay() {
        let tmp = TempDir::new().unwrap();
        let journal = TradeJournal::open(tmp.path()).unwrap();
        let trades: Vec<Trade> = (1..=3).map(sample_trade).collect();

        for trade in &trades {
            journal.append(trade).unwrap();
        }
        journal.sync().unwrap();

        let replayed = replay(tmp.path()).unwrap();
        assert!(replayed.corruption.is_none());
        assert_eq!(replayed.trades, trades);
    }

    #[test]
    fn test_reopen_continues_numbering() {
        let tmp = TempDir::new().unwrap();
        {
            let journal = TradeJournal::open(tmp.path()).unwrap();
            assert_eq!(journal.append(&sample_trade(1)).unwrap(), 1);
            assert_eq!(journal.append(&sample_trade(2)).unwrap(), 2);
        }
        let journal = TradeJournal::open(tmp.path()).unwrap();
        assert_eq!(journal.next_sequence(), 3);
        assert_eq!(journal.append(&sample_trade(3)).unwrap(), 3);
        assert_eq!(replay(tmp.path()).unwrap().trades.len(), 3);
    }

    #[test]
    fn test_replay_stops_at_torn_tail() {
        let tmp = TempDir::new().unwrap();
        let journal = TradeJournal::open(tmp.path()).unwrap();
        journal.append(&sample_trade(1)).unwrap();
        journal.append(&sample_trade(2)).unwrap();

        // Chop the last few bytes off the second entry
        let path = journal.path().to_path_buf();
        let len = fs::metadata(&path).unwrap().len();
        let file = OpenOptions::new().write(true).open(&path).unwrap();
        file.set_len(len - 3).unwrap();

        let replayed = replay(tmp.path()).unwrap();
        assert_eq!(replayed.trades.len(), 1);
        assert!(matches!(
            replayed.corruption,
            Some(JournalError::Corruption { .. })
        ));

        drop(journal);
        let journal = TradeJournal::open(tmp.path()).unwrap();
        assert_eq!(journal.append(&sample_trade(3)).unwrap(), 2);
        let replayed = replay(tmp.path()).unwrap();
        assert!(replayed.corruption.is_none());
        assert_eq!(replayed.trades.len(), 2);
    }

    #[test]
    fn test_reopen_after_mid_file_corruption_keeps_a_copy() {
        let tmp = TempDir::new().unwrap();
        let journal = TradeJournal::open(tmp.path()).unwrap();
        for sequence in 1..=3 {
            journal.append(&sample_trade(sequence)).unwrap();
        }
        drop(journal);

        // Flip a payload byte of the second entry; the third stays intact
        let path = tmp.path().join(JOURNAL_FILE);
        let mut data = fs::read(&path).unwrap();
        let first_len = JournalEntry::from_bytes(&data).unwrap().1;
        data[first_len + 4 + 20] ^= 0xff;
        fs::write(&path, &data).unwrap();

        let journal = TradeJournal::open(tmp.path()).unwrap();
        assert_eq!(journal.next_sequence(), 2);
        assert_eq!(fs::metadata(&path).unwrap().len(), first_len as u64);

        let copy = tmp.path().join(CORRUPT_COPY_FILE);
        assert_eq!(fs::read(&copy).unwrap(), data);
    }

    #[test]
    fn test_replay_of_missing_journal_is_empty() {
        let tmp = TempDir::new().unwrap();
        let replayed = replay(tmp.path()).unwrap();
        assert!(replayed.trades.is_empty());
        assert!(replayed.corruption.is_none());
    }

    #[tokio::test]
    async fn test_records_through_recorder_trait() {
        let tmp = TempDir::new().unwrap();
        let journal = TradeJournal::open(tmp.path()).unwrap();
        let recorder: &dyn TradeRecorder = &journal;

        recorder.record(&sample_trade(7)).await.unwrap();
        assert_eq!(replay(tmp.path()).unwrap().trades[0].sequence, 7);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_records_get_distinct_entries() {
        let tmp = TempDir::new().unwrap();
        let journal = Arc::new(TradeJournal::open(tmp.path()).unwrap());

        let tasks: Vec<_> = (1..=8)
            .map(|sequence| {
                let journal = Arc::clone(&journal);
                tokio::spawn(async move { journal.record(&sample_trade(sequence)).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(journal.next_sequence(), 9);
        let mut sequences: Vec<u64> = replay(tmp.path())
            .unwrap()
            .trades
            .iter()
            .map(|trade| trade.sequence)
            .collect();
        sequences.sort_unstable();
        assert_eq!(sequences, (1..=8).collect::<Vec<_>>());
    }
}
