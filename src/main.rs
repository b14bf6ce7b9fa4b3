//! flurry: A tool for resharding the MovieLens dataset into CSV partitions.
//!
//! Downloads the dataset zip archive, extracts it, and repartitions the
//! movies table into a fixed number of CSV shard files.

mod config;
mod error;
mod fetch;
mod pipeline;
mod reshard;

use clap::Parser;
use snafu::prelude::*;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use error::{ConfigSnafu, PipelineError};
use pipeline::run_pipeline;
use reshard::SHARD_COUNT;

/// MovieLens fetch-and-reshard tool.
#[derive(Parser, Debug)]
#[command(name = "flurry")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the output root directory.
    #[arg(long)]
    output_root: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Dry run - validate configuration without fetching or writing.
    #[arg(long)]
    dry_run: bool,
}

#[snafu::report]
#[tokio::main]
async fn main() -> Result<(), PipelineError> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("flurry starting");

    // Load or build configuration
    let config = build_config(&args)?;

    if args.dry_run {
        info!("Dry run mode - validating configuration");
        info!("Dataset URL: {}", config.dataset.url);
        info!("Source table: {}", config.source_csv_path().display());
        info!("Shard directory: {}", config.shard_dir().display());
        info!("Shard count: {}", SHARD_COUNT);
        info!("Configuration is valid");
        return Ok(());
    }

    // Run the pipeline
    let stats = run_pipeline(config).await?;

    info!("Pipeline completed successfully");
    info!("  Rows resharded: {}", stats.rows_resharded);
    info!("  Shards written: {}", stats.shards_written);
    info!("  Markers removed: {}", stats.markers_removed);

    Ok(())
}

/// Build configuration from arguments.
fn build_config(args: &Args) -> Result<Config, PipelineError> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path).context(ConfigSnafu)?,
        None => Config::default(),
    };
    if let Some(output_root) = &args.output_root {
        config.output_root = output_root.clone();
    }
    Ok(config)
}
