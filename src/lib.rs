//! flurry: A tool for resharding the MovieLens dataset into CSV partitions.
//!
//! This library provides components for downloading a zip archive of the
//! dataset, extracting it, and repartitioning the movies table into a
//! fixed number of CSV shard files via DataFusion.
//!
//! # Example
//!
//! ```ignore
//! use flurry::{Config, error::PipelineError, run_pipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), PipelineError> {
//!     let stats = run_pipeline(Config::default()).await?;
//!     println!("Wrote {} shards", stats.shards_written);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod reshard;

// Re-export main types
pub use config::Config;
pub use pipeline::{Pipeline, PipelineStats, run_pipeline};
