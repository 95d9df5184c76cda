//! Download strategies and their coordinator.
//!
//! Three drivers run the same [`DownloadTransaction`](crate::http::DownloadTransaction)
//! state machine and differ only in how they suspend between network steps:
//!
//! - [`AwaitedDownloader`]: a sequential loop with an `.await` at each step
//! - [`CallbackDownloader`]: each step spawns the operation and hands a
//!   callback the transaction state when it completes
//! - [`ChainedDownloader`]: each step is a future with the next step
//!   attached as a continuation; receiving recurses until done
//!
//! Given the same peer behaviour all three produce the same [`Outcome`].

mod awaited;
mod callback;
mod chained;
pub mod config;
pub mod coordinator;
pub mod retry;

pub use awaited::AwaitedDownloader;
pub use callback::CallbackDownloader;
pub use chained::ChainedDownloader;
pub use config::DownloadConfig;
pub use coordinator::{DownloadCoordinator, DownloadReport, TransactionReport};

use crate::http::{Outcome, Target};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Alias for the `Future` returned by a download strategy.
pub type Downloading = BoxFuture<'static, Outcome>;

/// One full request/response transaction per call.
///
/// Implementations must be thread-safe; each call owns its own connection
/// and accumulator, so calls may run concurrently.
pub trait DownloadStrategy: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Run one transaction against `target`. The future always resolves to
    /// exactly one [`Outcome`].
    fn download(&self, target: Target) -> Downloading;
}

impl<S: DownloadStrategy + ?Sized> DownloadStrategy for Arc<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn download(&self, target: Target) -> Downloading {
        (**self).download(target)
    }
}

/// Selects a strategy by name (config files, command line).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    #[default]
    Awaited,
    Callback,
    Chained,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [
        StrategyKind::Awaited,
        StrategyKind::Callback,
        StrategyKind::Chained,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::Awaited => "awaited",
            StrategyKind::Callback => "callback",
            StrategyKind::Chained => "chained",
        }
    }

    /// Build the strategy with settings from `config`.
    pub fn build(self, config: &DownloadConfig) -> Arc<dyn DownloadStrategy> {
        match self {
            StrategyKind::Awaited => Arc::new(AwaitedDownloader::new(config)),
            StrategyKind::Callback => Arc::new(CallbackDownloader::new(config)),
            StrategyKind::Chained => Arc::new(ChainedDownloader::new(config)),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StrategyKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!("unknown strategy '{s}' (expected awaited, callback or chained)")
            })
    }
}

/// Log a finished transaction.
fn log_outcome(strategy: &'static str, target: &Target, outcome: &Outcome) {
    match outcome {
        Outcome::Completed(body) => {
            tracing::debug!(strategy, %target, bytes = body.len(), "download complete")
        }
        Outcome::Failed(err) => {
            tracing::warn!(strategy, %target, error = %err, code = err.as_i32(), "download failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_kind_parse() {
        assert_eq!("Callback".parse::<StrategyKind>(), Ok(StrategyKind::Callback));
        assert_eq!("chained".parse::<StrategyKind>(), Ok(StrategyKind::Chained));
        assert!("threads".parse::<StrategyKind>().is_err());
    }

    #[test]
    fn test_build_names() {
        let config = DownloadConfig::default();
        for kind in StrategyKind::ALL {
            assert_eq!(kind.build(&config).name(), kind.as_str());
        }
    }
}
