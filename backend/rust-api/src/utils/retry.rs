use mongodb::error::{Error as MongoError, TRANSIENT_TRANSACTION_ERROR, UNKNOWN_TRANSACTION_COMMIT_RESULT};
use std::time::Duration;

/// Backoff schedule for retrying MongoDB multi-document transactions that
/// abort with a transient error (e.g. a write conflict between two batches
/// scoring the same session).
#[derive(Clone)]
pub struct TxnRetryConfig {
    pub max_attempts: usize,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub jitter_max: Option<Duration>,
}

impl Default for TxnRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(20),
            max_backoff: Duration::from_millis(500),
            jitter_max: Some(Duration::from_millis(50)),
        }
    }
}

impl TxnRetryConfig {
    /// Exponential backoff for the given zero-based attempt, capped at
    /// `max_backoff`, plus random jitter when configured.
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let exp = attempt.min(16) as u32;
        let backoff = self
            .base_backoff
            .checked_mul(2u32.saturating_pow(exp))
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff);

        let jitter = match self.jitter_max {
            Some(jitter_max) if !jitter_max.is_zero() => {
                let jitter_ms = jitter_max.as_millis() as u64;
                Duration::from_millis(rand::random::<u64>() % (jitter_ms + 1))
            }
            _ => Duration::ZERO,
        };

        backoff + jitter
    }

    pub async fn sleep_for(&self, attempt: usize) {
        tokio::time::sleep(self.delay_for(attempt)).await;
    }
}

/// Whether the server asked us to retry the whole transaction from the top.
pub fn is_transient_txn_error(err: &MongoError) -> bool {
    err.contains_label(TRANSIENT_TRANSACTION_ERROR)
}

/// Whether a commit landed in an unknown state and may be re-committed.
pub fn is_unknown_commit_result(err: &MongoError) -> bool {
    err.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT)
}

/// Commits the active transaction, re-issuing the commit while the server
/// reports an unknown commit result.
pub async fn commit_with_retry(txn: &mut mongodb::ClientSession) -> Result<(), MongoError> {
    loop {
        match txn.commit_transaction().await {
            Ok(()) => return Ok(()),
            Err(err) if is_unknown_commit_result(&err) => {
                tracing::warn!("transaction commit result unknown, retrying: {}", err);
            }
            Err(err) => return Err(err),
        }
    }
}
