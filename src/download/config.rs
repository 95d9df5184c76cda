//! Download configuration.
//!
//! Loaded from JSON (every field optional) or built in code.

use crate::download::retry::RetryConfig;
use crate::download::StrategyKind;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Receive buffer size used when none is configured.
pub const DEFAULT_BUFFER_CAPACITY: usize = 4096;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Which driver runs each transaction.
    pub strategy: StrategyKind,

    /// Upper bound on bytes taken by a single receive call.
    pub buffer_capacity: usize,

    /// Connect timeout in milliseconds (None waits for the OS).
    pub connect_timeout_ms: Option<u64>,

    /// Coordinator-level retry of connect failures.
    pub retry: RetryConfig,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            connect_timeout_ms: None,
            retry: RetryConfig::no_retry(),
        }
    }
}

/// Errors loading a [`DownloadConfig`] from disk.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("buffer_capacity must be at least 1")]
    ZeroBuffer,
}

impl DownloadConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_capacity == 0 {
            return Err(ConfigError::ZeroBuffer);
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    /// Buffer capacity clamped to at least one byte.
    pub fn receive_buffer_len(&self) -> usize {
        self.buffer_capacity.max(1)
    }
}
