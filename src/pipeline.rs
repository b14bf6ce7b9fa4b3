//! Main pipeline.
//!
//! Runs the two stages strictly in sequence: the fetcher downloads and
//! extracts the archive, then the resharder splits the source table into
//! the shard set. There is no overlap, no retry, and no rollback on a
//! partial failure; the first error terminates the run.

use datafusion::prelude::SessionContext;
use tracing::info;

use crate::config::Config;
use crate::error::PipelineError;
use crate::{fetch, reshard};

/// Statistics about the pipeline run.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineStats {
    /// Data rows distributed across the shard set.
    pub rows_resharded: usize,
    /// Shard files written.
    pub shards_written: usize,
    /// Marker entries removed from the shard directory.
    pub markers_removed: usize,
}

/// Fetch-and-reshard pipeline.
pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    /// Create a new pipeline from configuration.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the pipeline: fetch, then reshard.
    pub async fn run(&self) -> Result<PipelineStats, PipelineError> {
        info!("Starting pipeline");

        fetch::fetch_and_extract(&self.config.dataset.url, &self.config.output_root).await?;

        // The session is created here once the fetch has succeeded and
        // dropped when the run ends; the resharder borrows it.
        let ctx = SessionContext::new();
        let stats = reshard::reshard(
            &ctx,
            &self.config.source_csv_path(),
            &self.config.shard_dir(),
        )
        .await?;

        info!("Pipeline completed: {:?}", stats);
        Ok(PipelineStats {
            rows_resharded: stats.rows,
            shards_written: stats.shards_written,
            markers_removed: stats.markers_removed,
        })
    }
}

/// Run the pipeline with the given configuration.
pub async fn run_pipeline(config: Config) -> Result<PipelineStats, PipelineError> {
    Pipeline::new(config).run().await
}
