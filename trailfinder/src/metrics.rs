use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Counters for the parse/filter pipeline, shared across requests
#[derive(Debug, Clone, Default)]
pub struct PipelineMetrics {
    runs: Arc<AtomicU64>,
    failed_runs: Arc<AtomicU64>,
    batches: Arc<AtomicU64>,
    records_scanned: Arc<AtomicU64>,
    records_matched: Arc<AtomicU64>,
}

impl PipelineMetrics {
    /// Creates a new PipelineMetrics instance
    pub fn new() -> Self {
        Default::default()
    }

    /// Records the start of a pipeline run
    pub fn record_run(&self) {
        self.runs.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a run that ended in an error
    pub fn record_failure(&self) {
        self.failed_runs.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one filtered batch
    pub fn record_batch(&self, scanned: usize, matched: usize) {
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.records_scanned
            .fetch_add(scanned as u64, Ordering::Relaxed);
        self.records_matched
            .fetch_add(matched as u64, Ordering::Relaxed);
    }

    /// Gets the current counter values
    pub fn get_stats(&self) -> PipelineStats {
        PipelineStats {
            runs: self.runs.load(Ordering::Relaxed),
            failed_runs: self.failed_runs.load(Ordering::Relaxed),
            batches: self.batches.load(Ordering::Relaxed),
            records_scanned: self.records_scanned.load(Ordering::Relaxed),
            records_matched: self.records_matched.load(Ordering::Relaxed),
        }
    }

    /// Logs the current counters
    pub fn log_stats(&self) {
        let stats = self.get_stats();
        debug!(
            "Pipeline stats: {} runs ({} failed), {} batches, {} records scanned, {} matched",
            stats.runs,
            stats.failed_runs,
            stats.batches,
            stats.records_scanned,
            stats.records_matched
        );
    }
}

/// Point-in-time copy of [`PipelineMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub runs: u64,
    pub failed_runs: u64,
    pub batches: u64,
    pub records_scanned: u64,
    pub records_matched: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = PipelineMetrics::new();
        metrics.record_run();
        metrics.record_batch(100, 7);
        metrics.record_batch(20, 3);
        metrics.record_run();
        metrics.record_failure();

        assert_eq!(
            metrics.get_stats(),
            PipelineStats {
                runs: 2,
                failed_runs: 1,
                batches: 2,
                records_scanned: 120,
                records_matched: 10,
            }
        );
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = PipelineMetrics::new();
        let clone = metrics.clone();
        clone.record_batch(5, 5);
        assert_eq!(metrics.get_stats().records_scanned, 5);
    }
}
