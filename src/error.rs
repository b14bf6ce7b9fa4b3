//! Error types for the flurry reshard pipeline.

use snafu::prelude::*;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[snafu(display("Failed to read config file {path}: {source}"))]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse the configuration YAML.
    #[snafu(display("Failed to parse config YAML: {source}"))]
    YamlParse { source: serde_yaml::Error },

    /// Dataset URL is empty.
    #[snafu(display("Dataset URL must not be empty"))]
    EmptyDatasetUrl,

    /// Dataset subdirectory is empty.
    #[snafu(display("Dataset subdirectory must not be empty"))]
    EmptyDatasetSubdir,

    /// Dataset file name is empty.
    #[snafu(display("Dataset file name must not be empty"))]
    EmptyDatasetFile,
}

/// Errors that can occur while downloading and extracting the archive.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum FetchError {
    /// HTTP request failed or returned a non-success status.
    #[snafu(display("Failed to download {url}: {source}"))]
    Request { url: String, source: reqwest::Error },

    /// Response body is not a valid zip archive.
    #[snafu(display("Failed to extract archive: {source}"))]
    Archive { source: zip::result::ZipError },

    /// Failed to remove pre-existing content at the destination path.
    #[snafu(display("Failed to clear destination {path}: {source}"))]
    ClearDestination {
        path: String,
        source: std::io::Error,
    },

    /// Failed to create the destination directory.
    #[snafu(display("Failed to create destination {path}: {source}"))]
    CreateDestination {
        path: String,
        source: std::io::Error,
    },

    /// Extraction task panicked or was cancelled.
    #[snafu(display("Archive extraction task failed: {source}"))]
    ExtractJoin { source: tokio::task::JoinError },
}

/// Errors that can occur while resharding the source table.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ReshardError {
    /// Failed to read the source CSV header row.
    #[snafu(display("Failed to read header of {path}: {source}"))]
    HeaderRead { path: String, source: csv::Error },

    /// Source CSV has no columns.
    #[snafu(display("Source table {path} has an empty header row"))]
    EmptyHeader { path: String },

    /// The dataframe engine failed to plan or execute.
    #[snafu(display("Engine error: {source}"))]
    Engine {
        source: datafusion::error::DataFusionError,
    },

    /// Failed to create a shard file.
    #[snafu(display("Failed to create shard file {path}: {source}"))]
    ShardCreate {
        path: String,
        source: std::io::Error,
    },

    /// Failed to write a record batch to a shard file.
    #[snafu(display("Failed to write shard file {path}: {source}"))]
    ShardWrite {
        path: String,
        source: datafusion::arrow::error::ArrowError,
    },

    /// Failed to create the shard output directory.
    #[snafu(display("Failed to create shard directory {path}: {source}"))]
    ShardDirCreate {
        path: String,
        source: std::io::Error,
    },

    /// Rows written to shards do not match the source row count.
    #[snafu(display("Shard row count mismatch: expected {expected}, wrote {actual}"))]
    RowCountMismatch { expected: usize, actual: usize },

    /// The engine produced a different partition count than requested.
    #[snafu(display("Engine produced {actual} partitions, expected {expected}"))]
    PartitionCountMismatch { expected: usize, actual: usize },

    /// Failed to remove engine marker files.
    #[snafu(display("Failed to remove marker files: {source}"))]
    MarkerCleanup { source: std::io::Error },

    /// Failed to delete the extracted source directory.
    #[snafu(display("Failed to remove source directory {path}: {source}"))]
    SourceRemove {
        path: String,
        source: std::io::Error,
    },
}

/// Top-level pipeline errors.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PipelineError {
    /// Configuration error.
    #[snafu(display("Configuration error: {source}"))]
    Config { source: ConfigError },

    /// Fetch error.
    #[snafu(display("Fetch error: {source}"))]
    Fetch { source: FetchError },

    /// Reshard error.
    #[snafu(display("Reshard error: {source}"))]
    Reshard { source: ReshardError },
}

impl From<ConfigError> for PipelineError {
    fn from(source: ConfigError) -> Self {
        PipelineError::Config { source }
    }
}

impl From<FetchError> for PipelineError {
    fn from(source: FetchError) -> Self {
        PipelineError::Fetch { source }
    }
}

impl From<ReshardError> for PipelineError {
    fn from(source: ReshardError) -> Self {
        PipelineError::Reshard { source }
    }
}
