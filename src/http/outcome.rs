//! Terminal result of a transaction and the once-only slot it is published through.

use crate::base::neterror::NetError;
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::oneshot;

/// Terminal result of one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed(Bytes),
    Failed(NetError),
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }

    pub fn body(&self) -> Option<&Bytes> {
        match self {
            Outcome::Completed(body) => Some(body),
            Outcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&NetError> {
        match self {
            Outcome::Completed(_) => None,
            Outcome::Failed(err) => Some(err),
        }
    }

    pub fn into_result(self) -> Result<Bytes, NetError> {
        match self {
            Outcome::Completed(body) => Ok(body),
            Outcome::Failed(err) => Err(err),
        }
    }
}

impl From<Result<Bytes, NetError>> for Outcome {
    fn from(result: Result<Bytes, NetError>) -> Self {
        match result {
            Ok(body) => Outcome::Completed(body),
            Err(err) => Outcome::Failed(err),
        }
    }
}

/// Publishes an [`Outcome`] at most once.
///
/// Any number of code paths (normal completion, peer close, a late error)
/// may race to resolve; only the first wins and later attempts return `false`.
#[derive(Debug)]
pub struct OutcomeSlot {
    resolved: AtomicBool,
    sender: Mutex<Option<oneshot::Sender<Outcome>>>,
}

/// Receiving half of an [`OutcomeSlot`].
#[derive(Debug)]
pub struct OutcomeReceiver {
    inner: oneshot::Receiver<Outcome>,
}

impl OutcomeSlot {
    pub fn channel() -> (Self, OutcomeReceiver) {
        let (tx, rx) = oneshot::channel();
        let slot = Self {
            resolved: AtomicBool::new(false),
            sender: Mutex::new(Some(tx)),
        };
        (slot, OutcomeReceiver { inner: rx })
    }

    /// Resolve the slot. Returns `false` if it was already resolved.
    pub fn resolve(&self, outcome: Outcome) -> bool {
        if self
            .resolved
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!(?outcome, "outcome already published, ignoring");
            return false;
        }

        let sender = match self.sender.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(tx) = sender {
            // Receiver may be gone if the caller stopped waiting.
            let _ = tx.send(outcome);
        }
        true
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.load(Ordering::Acquire)
    }
}

impl OutcomeReceiver {
    /// Wait for the published outcome. A slot dropped without resolving
    /// yields [`NetError::TransactionAborted`].
    pub async fn wait(self) -> Outcome {
        self.inner
            .await
            .unwrap_or(Outcome::Failed(NetError::TransactionAborted))
    }
}
