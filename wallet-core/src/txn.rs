//! Shared optimistic-transaction retry wrapper
//!
//! Every mutation is the same shape: read a fresh snapshot, validate
//! preconditions against it, stage writes conditioned on the versions read,
//! and commit. `build` is that pure decision step; this wrapper owns only
//! the retry mechanics. Typed precondition errors abort immediately and are
//! never retried; only a rejected commit loops back to a fresh snapshot.

use crate::{
    config::RetryConfig,
    error::{Error, Result},
    metrics::Metrics,
};
use rand::Rng;
use record_store::{Batch, CommitOutcome, Store};
use std::time::Duration;

/// Run one optimistic transaction to completion.
///
/// Calls `build` for a fresh `(batch, output)` on every attempt; commits
/// the batch and returns the output on success. A version conflict backs
/// off with jitter and retries, up to the configured ceiling.
pub(crate) async fn run<T, F>(
    store: &Store,
    retry: &RetryConfig,
    metrics: &Metrics,
    op: &'static str,
    mut build: F,
) -> Result<T>
where
    F: FnMut() -> Result<(Batch, T)>,
{
    for attempt in 0..retry.max_attempts {
        let (batch, output) = build()?;

        match store.commit(batch)? {
            CommitOutcome::Committed => {
                metrics.record_commit(attempt + 1);
                if attempt > 0 {
                    tracing::debug!(op, attempts = attempt + 1, "Commit succeeded after retry");
                }
                return Ok(output);
            }
            CommitOutcome::Conflict => {
                metrics.record_conflict();
                tracing::debug!(op, attempt, "Version conflict, retrying from fresh snapshot");
                tokio::time::sleep(backoff(retry, attempt)).await;
            }
        }
    }

    metrics.record_transient_failure();
    tracing::warn!(
        op,
        attempts = retry.max_attempts,
        "Giving up after repeated commit conflicts"
    );
    Err(Error::TransientConflict {
        op,
        attempts: retry.max_attempts,
    })
}

/// Exponential backoff with full jitter, capped
fn backoff(retry: &RetryConfig, attempt: u32) -> Duration {
    let exp = retry
        .backoff_base_ms
        .saturating_mul(1u64 << attempt.min(16));
    let capped = exp.min(retry.backoff_cap_ms).max(1);
    let jittered = rand::thread_rng().gen_range(0..=capped);
    Duration::from_millis(jittered)
}
