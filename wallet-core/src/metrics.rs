//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `wallet_commits_total` - Successful conditional commits
//! - `wallet_conflicts_total` - Commits rejected on a stale version
//! - `wallet_transient_failures_total` - Operations that hit the retry ceiling
//! - `wallet_commit_attempts` - Histogram of attempts per committed operation

use prometheus::{Histogram, HistogramOpts, IntCounter, Registry};
use std::sync::Arc;

/// Metrics collector
///
/// Collectors are registered in the struct's own registry rather than the
/// process-global one, so independent instances can coexist.
#[derive(Clone)]
pub struct Metrics {
    /// Successful commits
    pub commits_total: IntCounter,

    /// Version conflicts (each triggers a retry)
    pub conflicts_total: IntCounter,

    /// Operations aborted at the retry ceiling
    pub transient_failures_total: IntCounter,

    /// Attempts needed per committed operation
    pub commit_attempts: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let commits_total =
            IntCounter::new("wallet_commits_total", "Successful conditional commits")?;
        registry.register(Box::new(commits_total.clone()))?;

        let conflicts_total = IntCounter::new(
            "wallet_conflicts_total",
            "Commits rejected on a stale version",
        )?;
        registry.register(Box::new(conflicts_total.clone()))?;

        let transient_failures_total = IntCounter::new(
            "wallet_transient_failures_total",
            "Operations that exhausted the conflict retry ceiling",
        )?;
        registry.register(Box::new(transient_failures_total.clone()))?;

        let commit_attempts = Histogram::with_opts(
            HistogramOpts::new(
                "wallet_commit_attempts",
                "Attempts needed per committed operation",
            )
            .buckets(vec![1.0, 2.0, 3.0, 5.0, 8.0, 13.0, 21.0]),
        )?;
        registry.register(Box::new(commit_attempts.clone()))?;

        Ok(Self {
            commits_total,
            conflicts_total,
            transient_failures_total,
            commit_attempts,
            registry,
        })
    }

    /// Record a committed operation and how many attempts it took
    pub fn record_commit(&self, attempts: u32) {
        self.commits_total.inc();
        self.commit_attempts.observe(attempts as f64);
    }

    /// Record a rejected commit
    pub fn record_conflict(&self) {
        self.conflicts_total.inc();
    }

    /// Record an operation that gave up at the retry ceiling
    pub fn record_transient_failure(&self) {
        self.transient_failures_total.inc();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
