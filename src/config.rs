//! Configuration for the flurry reshard pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Name of the directory the shard set is written to, under the output root.
pub const SHARD_DIR_NAME: &str = "input";

/// Configuration for the remote dataset archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// URL of the zip archive to download.
    #[serde(default = "default_url")]
    pub url: String,
    /// Top-level directory inside the archive.
    #[serde(default = "default_subdir")]
    pub subdir: String,
    /// CSV file inside the archive directory to reshard.
    #[serde(default = "default_file")]
    pub file: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            subdir: default_subdir(),
            file: default_file(),
        }
    }
}

fn default_url() -> String {
    "http://files.grouplens.org/datasets/movielens/ml-25m.zip".to_string()
}

fn default_subdir() -> String {
    "ml-25m".to_string()
}

fn default_file() -> String {
    "movies.csv".to_string()
}

fn default_output_root() -> PathBuf {
    PathBuf::from("./data")
}

/// Main configuration for flurry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root directory for the extracted archive and the shard set.
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
    /// Dataset to fetch and reshard.
    #[serde(default)]
    pub dataset: DatasetConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_root: default_output_root(),
            dataset: DatasetConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)
            .map_err(|source| ConfigError::YamlParse { source })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dataset.url.is_empty() {
            return Err(ConfigError::EmptyDatasetUrl);
        }
        if self.dataset.subdir.is_empty() {
            return Err(ConfigError::EmptyDatasetSubdir);
        }
        if self.dataset.file.is_empty() {
            return Err(ConfigError::EmptyDatasetFile);
        }
        Ok(())
    }

    /// Directory the archive extracts its dataset into.
    pub fn source_dir(&self) -> PathBuf {
        self.output_root.join(&self.dataset.subdir)
    }

    /// Path of the source CSV inside the extracted archive.
    pub fn source_csv_path(&self) -> PathBuf {
        self.source_dir().join(&self.dataset.file)
    }

    /// Directory the shard set is written to.
    pub fn shard_dir(&self) -> PathBuf {
        self.output_root.join(SHARD_DIR_NAME)
    }
}
