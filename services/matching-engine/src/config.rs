//! Engine configuration
//!
//! Loaded once at process start. The instrument list fixes the set of books
//! for the lifetime of the process.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use types::ids::InstrumentId;

/// Environment variable naming a JSON config file
pub const CONFIG_ENV: &str = "MATCHD_CONFIG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid instrument in config: {0}")]
    InvalidInstrument(String),

    #[error("Duplicate instrument in config: {0}")]
    DuplicateInstrument(String),

    #[error("At least one instrument must be configured")]
    NoInstruments,
}

/// Retry policy for trade delivery
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Attempts per sink per trade before giving up
    pub max_attempts: u32,
    /// Backoff between attempts, multiplied by the attempt number
    pub retry_backoff_ms: u64,
}

impl DispatchConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_backoff_ms: 50,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Instruments to open a book for, e.g. "BTC-USD"
    pub instruments: Vec<String>,
    pub dispatch: DispatchConfig,
    /// Directory for the trade journal; no journal when unset
    pub journal_dir: Option<PathBuf>,
    /// Levels per side included in depth responses
    pub depth_levels: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            instruments: vec!["BTC-USD".to_string()],
            dispatch: DispatchConfig::default(),
            journal_dir: None,
            depth_levels: 20,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.instrument_ids()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Load from the file named by `MATCHD_CONFIG`, or fall back to defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    /// Parse and check the configured instruments
    pub fn instrument_ids(&self) -> Result<Vec<InstrumentId>, ConfigError> {
        if self.instruments.is_empty() {
            return Err(ConfigError::NoInstruments);
        }
        let mut ids: Vec<InstrumentId> = Vec::with_capacity(self.instruments.len());
        for symbol in &self.instruments {
            let id = InstrumentId::try_new(symbol.as_str())
                .ok_or_else(|| ConfigError::InvalidInstrument(symbol.clone()))?;
            if ids.contains(&id) {
                return Err(ConfigError::DuplicateInstrument(symbol.clone()));
            }
            ids.push(id);
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.instrument_ids().unwrap(), vec![InstrumentId::new("BTC-USD")]);
        assert_eq!(config.dispatch.max_attempts, 5);
        assert!(config.journal_dir.is_none());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(
            r#"{"instruments": ["BTC-USD", "ETH/USDC"], "dispatch": {"max_attempts": 2}}"#,
        )
        .unwrap();
        assert_eq!(config.instruments.len(), 2);
        assert_eq!(config.dispatch.max_attempts, 2);
        assert_eq!(config.dispatch.retry_backoff_ms, 50);
        assert_eq!(config.depth_levels, 20);
    }

    #[test]
    fn test_rejects_bad_instruments() {
        assert!(matches!(
            EngineConfig::from_json(r#"{"instruments": ["BTCUSD"]}"#),
            Err(ConfigError::InvalidInstrument(_))
        ));
        assert!(matches!(
            EngineConfig::from_json(r#"{"instruments": ["BTC-USD", "BTC-USD"]}"#),
            Err(ConfigError::DuplicateInstrument(_))
        ));
        assert!(matches!(
            EngineConfig::from_json(r#"{"instruments": []}"#),
            Err(ConfigError::NoInstruments)
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"instruments": ["SOL-USD"], "journal_dir": "/tmp/trades"}}"#).unwrap();

        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.instruments, vec!["SOL-USD".to_string()]);
        assert_eq!(config.journal_dir, Some(PathBuf::from("/tmp/trades")));
    }
}
