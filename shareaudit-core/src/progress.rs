use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Runtime-reflective progress callback, abstracted as a trait so the
/// orchestrator doesn't depend on how progress is surfaced (SSE, log line,
/// channel) — grounded on the `JobEventPublisher` shape used elsewhere in
/// the reference stack. Implementations must be cheap and non-blocking:
/// `report` is called from inside the worker pool's hot path.
pub trait ProgressSink: Send + Sync {
    /// `total` is the number of hosts submitted for this run; `done` is the
    /// count of hosts that have completed (success or failure) so far.
    /// Delivery order across calls is unspecified and may be lossy under
    /// load; callers must not rely on seeing every intermediate value.
    fn report(&self, host: &str, done: u64, total: u64);
}

/// Default sink: does nothing. Used when no subscriber is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {
    fn report(&self, _host: &str, _done: u64, _total: u64) {}
}

/// Thread-safe counters the orchestrator increments as hosts complete.
/// Readers (e.g. a status endpoint) may observe a transiently inconsistent
/// snapshot across the three fields; that's an accepted tradeoff for
/// lock-free progress reporting.
#[derive(Debug, Default)]
pub struct ProgressCounters {
    processed: AtomicU64,
    total: AtomicU64,
    sensitive_found: AtomicU64,
}

impl ProgressCounters {
    pub fn new(total: u64) -> Self {
        Self {
            processed: AtomicU64::new(0),
            total: AtomicU64::new(total),
            sensitive_found: AtomicU64::new(0),
        }
    }

    pub fn record_host_done(&self) -> u64 {
        self.processed.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_sensitive_files(&self, count: u64) {
        self.sensitive_found.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> (u64, u64, u64) {
        (
            self.processed.load(Ordering::Relaxed),
            self.total.load(Ordering::Relaxed),
            self.sensitive_found.load(Ordering::Relaxed),
        )
    }
}

/// A `ProgressSink` that forwards into a shared `ProgressCounters` and an
/// arbitrary delegate sink (e.g. one that logs or pushes to a channel).
pub struct CountingProgressSink<S: ProgressSink> {
    counters: Arc<ProgressCounters>,
    delegate: S,
}

impl<S: ProgressSink> CountingProgressSink<S> {
    pub fn new(counters: Arc<ProgressCounters>, delegate: S) -> Self {
        Self { counters, delegate }
    }
}

impl<S: ProgressSink> ProgressSink for CountingProgressSink<S> {
    fn report(&self, host: &str, _done: u64, total: u64) {
        let done = self.counters.record_host_done();
        self.delegate.report(host, done, total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment_monotonically() {
        let counters = ProgressCounters::new(3);
        assert_eq!(counters.record_host_done(), 1);
        assert_eq!(counters.record_host_done(), 2);
        let (processed, total, _) = counters.snapshot();
        assert_eq!(processed, 2);
        assert_eq!(total, 3);
    }
}
