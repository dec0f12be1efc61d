//! Call context — cancellation, deadlines and the transaction-id slot
//!
//! A `CallContext` accompanies every executor call. It carries:
//! - an optional deadline
//! - zero or more cancellation signals (inherited from parent contexts)
//! - an optional transaction-id slot, filled in by whoever learns the id
//!
//! Executor futures are raced against cancellation and the deadline, so an
//! expired context surfaces as `Cancelled`/`Timeout` instead of hanging.

use crate::error::{PrivateError, Result};
use crate::executor::ExecutorError;
use futures::future::{self, FutureExt};
use log::debug;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Single-slot holder for a transaction identifier
#[derive(Debug, Default)]
pub struct TransactionSlot {
    tx_id: OnceLock<String>,
}

impl TransactionSlot {
    /// Write the transaction id. Returns false if the slot was already filled.
    pub fn set(&self, tx_id: impl Into<String>) -> bool {
        self.tx_id.set(tx_id.into()).is_ok()
    }

    /// Read the transaction id, or "" before the first write
    pub fn get(&self) -> &str {
        self.tx_id.get().map(String::as_str).unwrap_or("")
    }
}

/// Cancels every context derived from it
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

#[derive(Debug, Clone, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancel_signals: Vec<watch::Receiver<bool>>,
    transaction: Option<Arc<TransactionSlot>>,
}

impl CallContext {
    /// A context that never expires
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a child context plus a handle that cancels it
    pub fn with_cancel(&self) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let mut child = self.clone();
        child.cancel_signals.push(rx);
        (child, CancelHandle { tx })
    }

    /// Derive a child context that expires after `timeout` (or earlier, if the
    /// parent deadline is sooner)
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let mut child = self.clone();
        child.deadline = earliest(self.deadline, Some(Instant::now() + timeout));
        child
    }

    /// Derive a child context for a new unit of work, with an empty
    /// transaction-id slot
    pub fn with_transaction_id(&self) -> Self {
        let mut child = self.clone();
        child.transaction = Some(Arc::new(TransactionSlot::default()));
        child
    }

    /// Fill the transaction-id slot. No-op (returns false) when the context has
    /// no slot or the slot is already set.
    pub fn set_transaction_id(&self, tx_id: impl Into<String>) -> bool {
        match &self.transaction {
            Some(slot) => slot.set(tx_id),
            None => false,
        }
    }

    /// The transaction id, or "" when absent or not yet known
    pub fn transaction_id(&self) -> String {
        self.transaction
            .as_ref()
            .map(|slot| slot.get().to_string())
            .unwrap_or_default()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_signals.iter().any(|rx| *rx.borrow())
    }

    /// Resolves once any cancellation signal fires; pending forever otherwise
    pub async fn cancelled(&self) {
        if self.cancel_signals.is_empty() {
            return future::pending().await;
        }
        let waits = self
            .cancel_signals
            .iter()
            .cloned()
            .map(|rx| wait_for_cancel(rx).boxed());
        future::select_all(waits).await;
    }

    /// Run an executor call under this context. `fallback` bounds the call
    /// when it is earlier than the context deadline.
    pub async fn run<T, F>(&self, method: &str, fallback: Option<Duration>, call: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, ExecutorError>>,
    {
        if self.is_cancelled() {
            return Err(PrivateError::Cancelled(method.to_string()));
        }
        let deadline = earliest(self.deadline, fallback.map(|d| Instant::now() + d));
        let expiry = async {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancelled() => {
                debug!("Call to {} cancelled by context", method);
                Err(PrivateError::Cancelled(method.to_string()))
            }
            _ = expiry => {
                debug!("Call to {} hit context deadline", method);
                Err(PrivateError::Timeout(method.to_string()))
            }
            res = call => res.map_err(|e| {
                if e.is_timeout() {
                    PrivateError::Timeout(method.to_string())
                } else {
                    PrivateError::Executor(e)
                }
            }),
        }
    }
}

async fn wait_for_cancel(mut rx: watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        // Handle dropped without cancelling: this signal never fires
        if rx.changed().await.is_err() {
            return future::pending().await;
        }
    }
}

fn earliest(a: Option<Instant>, b: Option<Instant>) -> Option<Instant> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, None) => a,
        (None, b) => b,
    }
}
