/// Drives a full lookup: open the source, stream batches off the parser thread,
/// filter each batch on the worker pool, and gather the survivors.
///
/// ```rust,ignore
/// let finder = TrailFinder::new(FinderConfig::default())?;
/// let criteria = Criteria::new().with("RESTROOMS", "yes");
/// let trails = finder.find(&criteria)?;
/// ```
///
/// The result is fully materialized before it is returned. Trails keep their
/// source order within a filter slice, but the order across slices and batches
/// is not fixed.
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::io::Read;
use tracing::{debug, info, warn};

use crate::config::FinderConfig;
use crate::errors::{TrailError, TrailResult};
use crate::filters::{filter_trails_parallel, Criteria};
use crate::metrics::PipelineMetrics;
use crate::parser::spawn_parser;
use crate::trail::Trail;

/// Owns the filter thread pool and the configuration it was built from
#[derive(Debug)]
pub struct TrailFinder {
    config: FinderConfig,
    pool: ThreadPool,
    metrics: PipelineMetrics,
}

impl TrailFinder {
    /// Builds a finder with a dedicated pool of `config.thread_count` threads
    pub fn new(config: FinderConfig) -> TrailResult<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.thread_count.get())
            .thread_name(|i| format!("trail-filter-{}", i))
            .build()
            .map_err(|e| TrailError::config_error(format!("failed to build thread pool: {}", e)))?;

        Ok(Self {
            config,
            pool,
            metrics: PipelineMetrics::new(),
        })
    }

    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    /// Runs the pipeline over the configured data source
    pub fn find(&self, criteria: &Criteria) -> TrailResult<Vec<Trail>> {
        self.metrics.record_run();
        let source = self.config.source();
        let reader = source.open(self.config.fetch_timeout()).map_err(|e| {
            self.metrics.record_failure();
            e
        })?;
        debug!("Searching {}", source);
        self.run_pipeline(reader, criteria)
    }

    /// Runs the pipeline over an already opened byte stream
    pub fn find_in<R>(&self, reader: R, criteria: &Criteria) -> TrailResult<Vec<Trail>>
    where
        R: Read + Send + 'static,
    {
        self.metrics.record_run();
        self.run_pipeline(reader, criteria)
    }

    fn run_pipeline<R>(&self, reader: R, criteria: &Criteria) -> TrailResult<Vec<Trail>>
    where
        R: Read + Send + 'static,
    {
        info!(
            "Starting lookup with {} active criteria",
            criteria.active().count()
        );

        let channels = spawn_parser(reader, self.config.batch_size)?;
        let mut found = Vec::new();
        let outcome = channels.drain(|batch| {
            let kept = self
                .pool
                .install(|| filter_trails_parallel(&batch, criteria));
            self.metrics.record_batch(batch.len(), kept.len());
            found.extend(kept);
        });

        if let Err(e) = outcome {
            warn!("Lookup failed: {}", e);
            self.metrics.record_failure();
            return Err(e);
        }

        self.metrics.log_stats();
        info!("Lookup complete. Found {} matching trails", found.len());
        Ok(found)
    }
}

/// One-shot lookup with a throwaway pool
pub fn find_trails(config: &FinderConfig, criteria: &Criteria) -> TrailResult<Vec<Trail>> {
    TrailFinder::new(config.clone())?.find(criteria)
}
