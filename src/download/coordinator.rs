//! Runs many transactions at once and waits for every one of them.
//!
//! A failed transaction never cancels its siblings, and no outcome is
//! dropped from the report.

use crate::base::neterror::NetError;
use crate::download::retry::{RetryConfig, RetryReason};
use crate::download::{DownloadConfig, DownloadStrategy};
use crate::http::{Outcome, Target};
use bytes::Bytes;
use futures::future::join_all;
use std::sync::Arc;

/// Result of one transaction launched by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReport {
    /// Launch position.
    pub index: usize,
    pub target: Target,
    pub outcome: Outcome,
    /// Number of attempts made (1 unless retried).
    pub attempts: usize,
}

/// Every transaction's outcome, in launch order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadReport {
    transactions: Vec<TransactionReport>,
}

impl DownloadReport {
    pub fn transactions(&self) -> &[TransactionReport] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn successes(&self) -> impl Iterator<Item = &TransactionReport> {
        self.transactions.iter().filter(|t| t.outcome.is_completed())
    }

    pub fn failures(&self) -> impl Iterator<Item = &TransactionReport> {
        self.transactions.iter().filter(|t| !t.outcome.is_completed())
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failure_count() == 0
    }

    pub fn outcomes(&self) -> Vec<&Outcome> {
        self.transactions.iter().map(|t| &t.outcome).collect()
    }

    /// All bodies in launch order, or every failure if any transaction failed.
    pub fn into_result(self) -> Result<Vec<Bytes>, Vec<(usize, NetError)>> {
        let mut bodies = Vec::with_capacity(self.transactions.len());
        let mut errors = Vec::new();
        for report in self.transactions {
            match report.outcome {
                Outcome::Completed(body) => bodies.push(body),
                Outcome::Failed(err) => errors.push((report.index, err)),
            }
        }
        if errors.is_empty() {
            Ok(bodies)
        } else {
            Err(errors)
        }
    }
}

#[derive(Clone)]
pub struct DownloadCoordinator {
    strategy: Arc<dyn DownloadStrategy>,
    retry: RetryConfig,
}

impl DownloadCoordinator {
    pub fn new(strategy: Arc<dyn DownloadStrategy>) -> Self {
        Self {
            strategy,
            retry: RetryConfig::no_retry(),
        }
    }

    /// Build the configured strategy and retry policy.
    pub fn from_config(config: &DownloadConfig) -> Self {
        Self::new(config.strategy.build(config)).with_retry(config.retry.clone())
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Launch one transaction per target and wait for all of them.
    pub async fn run<I>(&self, targets: I) -> DownloadReport
    where
        I: IntoIterator<Item = Target>,
    {
        let handles: Vec<_> = targets
            .into_iter()
            .enumerate()
            .map(|(index, target)| {
                let strategy = self.strategy.clone();
                let retry = self.retry.clone();
                let spawned_target = target.clone();
                let handle = tokio::spawn(async move {
                    download_with_retry(strategy, retry, spawned_target).await
                });
                (index, target, handle)
            })
            .collect();

        tracing::debug!(
            strategy = self.strategy.name(),
            count = handles.len(),
            "transactions launched"
        );

        let results = join_all(handles.into_iter().map(|(index, target, handle)| async move {
            let (outcome, attempts) = match handle.await {
                Ok(done) => done,
                Err(e) => {
                    tracing::error!(index, error = %e, "download task failed");
                    (Outcome::Failed(NetError::TransactionAborted), 1)
                }
            };
            TransactionReport {
                index,
                target,
                outcome,
                attempts,
            }
        }))
        .await;

        let report = DownloadReport {
            transactions: results,
        };
        tracing::info!(
            strategy = self.strategy.name(),
            total = report.len(),
            failed = report.failure_count(),
            "all transactions finished"
        );
        report
    }

    /// Launch `count` transactions against the same target.
    pub async fn run_repeated(&self, target: Target, count: usize) -> DownloadReport {
        self.run(std::iter::repeat(target).take(count)).await
    }
}

async fn download_with_retry(
    strategy: Arc<dyn DownloadStrategy>,
    retry: RetryConfig,
    target: Target,
) -> (Outcome, usize) {
    let mut retries = 0;
    loop {
        let outcome = strategy.download(target.clone()).await;
        let retryable = outcome
            .error()
            .and_then(RetryReason::from_error)
            .filter(|_| retry.allows(retries));

        match retryable {
            Some(reason) => {
                retries += 1;
                let delay = retry.backoff(retries);
                tracing::debug!(%target, ?reason, attempt = retries, ?delay, "retrying download");
                tokio::time::sleep(delay).await;
            }
            None => return (outcome, retries + 1),
        }
    }
}
