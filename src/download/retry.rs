//! Retry logic with exponential backoff.
//!
//! Retries are a caller-side policy applied by the coordinator; a strategy
//! never retries on its own. Only failures that happened before any request
//! bytes reached the peer are worth another attempt.

use crate::base::neterror::NetError;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::time::Duration;

/// Reasons for retrying a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    /// Peer refused the connection (server not up yet)
    ConnectionRefused,
    /// Connection was reset or aborted during the handshake
    ConnectionReset,
    /// Connect did not finish in time
    ConnectTimeout,
}

impl RetryReason {
    /// Map a NetError to a RetryReason, if the error is retryable.
    pub fn from_error(error: &NetError) -> Option<Self> {
        match error {
            NetError::ConnectFailed { kind, .. } => match kind {
                ErrorKind::ConnectionRefused => Some(Self::ConnectionRefused),
                ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted => {
                    Some(Self::ConnectionReset)
                }
                _ => None,
            },
            NetError::ConnectionTimedOut => Some(Self::ConnectTimeout),
            _ => None,
        }
    }
}

/// How often and how patiently the coordinator retries a connect failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt; 0 disables retrying.
    pub max_attempts: usize,
    /// Delay before the first retry, doubled for each one after.
    pub base_delay_ms: u64,
    /// Upper bound on a single delay before jitter.
    pub max_delay_ms: u64,
    /// Fraction of the delay added as jitter, 0.0 to 1.0.
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 5000,
            jitter_factor: 0.1,
        }
    }
}

impl RetryConfig {
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 0,
            ..Default::default()
        }
    }

    /// Whether another attempt may follow `retries` earlier retries.
    pub fn allows(&self, retries: usize) -> bool {
        retries < self.max_attempts
    }

    /// Delay before retry number `retry` (1-based). The doubling stops at
    /// 2^10 so large retry counts cannot overflow.
    pub fn backoff(&self, retry: usize) -> Duration {
        let Some(exponent) = retry.checked_sub(1) else {
            return Duration::ZERO;
        };
        let delay = self
            .base_delay_ms
            .saturating_mul(1u64 << exponent.min(10))
            .min(self.max_delay_ms);

        // Jitter derived from the retry number keeps delays reproducible.
        let spread = (delay as f64 * self.jitter_factor) as u64;
        let jitter = match spread {
            0 => 0,
            spread => (retry as u64 * 7) % spread,
        };
        Duration::from_millis(delay.saturating_add(jitter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_exponential() {
        let config = RetryConfig {
            jitter_factor: 0.0,
            ..Default::default()
        };

        let delays: Vec<_> = (0..4).map(|n| config.backoff(n)).collect();
        assert_eq!(
            delays,
            [0, 100, 200, 400].map(Duration::from_millis).to_vec()
        );
    }

    #[test]
    fn test_backoff_capped() {
        let config = RetryConfig {
            base_delay_ms: 1000,
            max_delay_ms: 2000,
            jitter_factor: 0.0,
            ..Default::default()
        };

        assert_eq!(config.backoff(2), Duration::from_millis(2000));
        assert_eq!(config.backoff(40), Duration::from_millis(2000));
    }

    #[test]
    fn test_allows() {
        assert!(!RetryConfig::no_retry().allows(0));
        let config = RetryConfig::default();
        assert!(config.allows(2));
        assert!(!config.allows(3));
    }

    #[test]
    fn test_jitter_stays_within_spread() {
        let config = RetryConfig::default();
        for retry in 1..8 {
            let delay = config.backoff(retry).as_millis() as u64;
            let base = (100u64 << (retry - 1)).min(5000);
            assert!(delay >= base && delay <= base + base / 10, "retry {retry}: {delay}");
        }
    }

    #[test]
    fn test_only_connect_errors_retry() {
        let refused = NetError::ConnectFailed {
            addr: "127.0.0.1:1".parse().unwrap(),
            kind: ErrorKind::ConnectionRefused,
        };
        assert_eq!(
            RetryReason::from_error(&refused),
            Some(RetryReason::ConnectionRefused)
        );
        assert_eq!(
            RetryReason::from_error(&NetError::ConnectionTimedOut),
            Some(RetryReason::ConnectTimeout)
        );
        assert_eq!(RetryReason::from_error(&NetError::MissingContentLength), None);
        assert_eq!(
            RetryReason::from_error(&NetError::PrematureClose {
                received: 0,
                expected: Some(1)
            }),
            None
        );
        assert_eq!(
            RetryReason::from_error(&NetError::SendFailed(ErrorKind::BrokenPipe)),
            None
        );
    }
}
