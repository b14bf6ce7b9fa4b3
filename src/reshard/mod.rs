//! Resharder.
//!
//! Loads the extracted source CSV into a DataFusion dataframe, repartitions
//! it into a fixed number of shards, and writes one CSV file per partition
//! with a header row in each. The source row count is verified against the
//! rows written before any destructive cleanup runs, so a bad write never
//! deletes its own input.

mod markers;

pub use markers::remove_marker_files;

use datafusion::arrow::csv::WriterBuilder;
use datafusion::arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::dataframe::DataFrame;
use datafusion::logical_expr::Partitioning;
use datafusion::prelude::{CsvReadOptions, SessionContext};
use futures::StreamExt;
use snafu::prelude::*;
use snafu::IntoError;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{
    EmptyHeaderSnafu, EngineSnafu, HeaderReadSnafu, PartitionCountMismatchSnafu, ReshardError,
    RowCountMismatchSnafu, ShardCreateSnafu, ShardDirCreateSnafu, ShardWriteSnafu,
    SourceRemoveSnafu,
};

/// Number of shards the source table is repartitioned into.
pub const SHARD_COUNT: usize = 5;

/// Statistics about a completed reshard.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReshardStats {
    /// Data rows distributed across the shard set.
    pub rows: usize,
    /// Shard files written.
    pub shards_written: usize,
    /// Marker entries removed from the shard directory.
    pub markers_removed: usize,
}

/// Reshard `source_csv` into [`SHARD_COUNT`] CSV files under `shard_dir`.
///
/// The caller owns the `SessionContext`; nothing here reaches for an
/// ambient session. On success the extracted dataset directory (the parent
/// of `source_csv`) has been deleted. On a row-count mismatch the source
/// directory is left in place for inspection.
pub async fn reshard(
    ctx: &SessionContext,
    source_csv: &Path,
    shard_dir: &Path,
) -> Result<ReshardStats, ReshardError> {
    info!(
        "Resharding {} into {} partitions",
        source_csv.display(),
        SHARD_COUNT
    );

    // All columns read as untyped strings; the header row only supplies
    // column names.
    let columns = read_header(source_csv)?;
    let schema = utf8_schema(&columns);
    let options = CsvReadOptions::new().has_header(true).schema(&schema);

    let source_path = source_csv.to_string_lossy();
    let df = ctx
        .read_csv(source_path.as_ref(), options)
        .await
        .context(EngineSnafu)?;

    let source_rows = df.clone().count().await.context(EngineSnafu)?;
    debug!("Source table has {} data rows", source_rows);

    let df = df
        .repartition(Partitioning::RoundRobinBatch(SHARD_COUNT))
        .context(EngineSnafu)?;

    tokio::fs::create_dir_all(shard_dir)
        .await
        .context(ShardDirCreateSnafu {
            path: shard_dir.display().to_string(),
        })?;

    let (rows, shards_written) = write_shards(df, shard_dir).await?;
    verify_row_count(source_rows, rows)?;

    let markers_removed = remove_marker_files(shard_dir).await?;

    // The shard set is written and verified; the extracted dataset
    // directory is no longer needed.
    if let Some(source_dir) = source_csv.parent() {
        remove_source_dir(source_dir).await?;
    }

    info!(
        "Wrote {} rows across {} shards in {}",
        rows,
        shards_written,
        shard_dir.display()
    );

    Ok(ReshardStats {
        rows,
        shards_written,
        markers_removed,
    })
}

/// Execute the repartitioned dataframe and write one CSV file per partition.
///
/// Shard files follow the engine's `part-NNNNN.csv` naming convention.
/// Every shard gets a header row, including shards that received no rows.
async fn write_shards(df: DataFrame, shard_dir: &Path) -> Result<(usize, usize), ReshardError> {
    let schema: SchemaRef = Arc::new(df.schema().as_arrow().clone());
    let streams = df.execute_stream_partitioned().await.context(EngineSnafu)?;
    ensure!(
        streams.len() == SHARD_COUNT,
        PartitionCountMismatchSnafu {
            expected: SHARD_COUNT,
            actual: streams.len(),
        }
    );

    let mut rows = 0;
    let mut shards_written = 0;

    for (index, mut stream) in streams.into_iter().enumerate() {
        let path = shard_dir.join(format!("part-{index:05}.csv"));
        let shard_path = path.display().to_string();

        let file = std::fs::File::create(&path).context(ShardCreateSnafu {
            path: shard_path.clone(),
        })?;
        let mut writer = WriterBuilder::new().with_header(true).build(file);

        // The header is emitted on the first write call, so an empty batch
        // up front guarantees it even for a shard with no rows.
        writer
            .write(&RecordBatch::new_empty(schema.clone()))
            .context(ShardWriteSnafu {
                path: shard_path.clone(),
            })?;

        let mut shard_rows = 0;
        while let Some(batch) = stream.next().await {
            let batch = batch.context(EngineSnafu)?;
            shard_rows += batch.num_rows();
            writer.write(&batch).context(ShardWriteSnafu {
                path: shard_path.clone(),
            })?;
        }

        debug!("Wrote shard {} ({} rows)", shard_path, shard_rows);
        rows += shard_rows;
        shards_written += 1;
    }

    Ok((rows, shards_written))
}

/// Read the source CSV header row to get column names.
fn read_header(path: &Path) -> Result<Vec<String>, ReshardError> {
    let mut reader = csv::Reader::from_path(path).context(HeaderReadSnafu {
        path: path.display().to_string(),
    })?;
    let headers = reader.headers().context(HeaderReadSnafu {
        path: path.display().to_string(),
    })?;
    ensure!(
        !headers.is_empty(),
        EmptyHeaderSnafu {
            path: path.display().to_string(),
        }
    );
    Ok(headers.iter().map(str::to_string).collect())
}

/// Build an all-Utf8 schema from the header column names.
fn utf8_schema(columns: &[String]) -> Schema {
    let fields: Vec<Field> = columns
        .iter()
        .map(|name| Field::new(name, DataType::Utf8, true))
        .collect();
    Schema::new(fields)
}

/// Verify that the rows written across the shard set match the source.
///
/// Runs before any destructive cleanup, so a mismatch leaves the extracted
/// directory in place for inspection.
fn verify_row_count(expected: usize, actual: usize) -> Result<(), ReshardError> {
    ensure!(expected == actual, RowCountMismatchSnafu { expected, actual });
    Ok(())
}

/// Delete the extracted dataset directory if it still exists.
///
/// An absent directory is a no-op; any other metadata error propagates
/// rather than being mistaken for "already gone".
async fn remove_source_dir(source_dir: &Path) -> Result<(), ReshardError> {
    let context = SourceRemoveSnafu {
        path: source_dir.display().to_string(),
    };
    match tokio::fs::metadata(source_dir).await {
        Ok(_) => {
            tokio::fs::remove_dir_all(source_dir).await.context(context)?;
            debug!("Removed source directory {}", source_dir.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(context.into_error(source)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MOVIES_CSV: &str = "\
movieId,title,genres
1,Toy Story (1995),Adventure|Animation
2,Jumanji (1995),Adventure|Children
3,Grumpier Old Men (1995),Comedy|Romance
4,Waiting to Exhale (1995),Comedy|Drama
5,Father of the Bride Part II (1995),Comedy
6,Heat (1995),Action|Crime|Thriller
7,Sabrina (1995),Comedy|Romance
8,Tom and Huck (1995),Adventure|Children
9,Sudden Death (1995),Action
";

    fn seed_source(root: &Path) -> std::path::PathBuf {
        let source_dir = root.join("ml-25m");
        std::fs::create_dir_all(&source_dir).unwrap();
        let source_csv = source_dir.join("movies.csv");
        std::fs::write(&source_csv, MOVIES_CSV).unwrap();
        source_csv
    }

    fn count_data_rows(path: &Path) -> usize {
        let mut reader = csv::Reader::from_path(path).unwrap();
        reader.records().count()
    }

    #[test]
    fn test_read_header() {
        let temp_dir = TempDir::new().unwrap();
        let source_csv = seed_source(temp_dir.path());
        let columns = read_header(&source_csv).unwrap();
        assert_eq!(columns, vec!["movieId", "title", "genres"]);
    }

    #[test]
    fn test_utf8_schema() {
        let schema = utf8_schema(&["movieId".to_string(), "title".to_string()]);
        assert_eq!(schema.fields().len(), 2);
        assert_eq!(schema.field(0).data_type(), &DataType::Utf8);
        assert_eq!(schema.field(1).name(), "title");
    }

    #[tokio::test]
    async fn test_reshard_conserves_rows() {
        let temp_dir = TempDir::new().unwrap();
        let source_csv = seed_source(temp_dir.path());
        let shard_dir = temp_dir.path().join("input");

        let ctx = SessionContext::new();
        let stats = reshard(&ctx, &source_csv, &shard_dir).await.unwrap();

        assert_eq!(stats.rows, 9);
        assert_eq!(stats.shards_written, SHARD_COUNT);

        let mut shard_files: Vec<_> = std::fs::read_dir(&shard_dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        shard_files.sort();
        assert_eq!(shard_files.len(), SHARD_COUNT);

        let mut total_rows = 0;
        for shard in &shard_files {
            assert_eq!(shard.extension().unwrap(), "csv");
            let header = std::fs::read_to_string(shard)
                .unwrap()
                .lines()
                .next()
                .map(str::to_string)
                .unwrap_or_default();
            assert_eq!(header, "movieId,title,genres");
            total_rows += count_data_rows(shard);
        }
        assert_eq!(total_rows, 9);

        // Source directory is gone after a verified write
        assert!(!temp_dir.path().join("ml-25m").exists());
    }

    #[tokio::test]
    async fn test_reshard_cleans_preexisting_markers() {
        let temp_dir = TempDir::new().unwrap();
        let source_csv = seed_source(temp_dir.path());
        let shard_dir = temp_dir.path().join("input");
        std::fs::create_dir_all(&shard_dir).unwrap();
        std::fs::write(shard_dir.join("._SUCCESS.crc"), "crc").unwrap();
        std::fs::write(shard_dir.join(".part-stale.crc"), "crc").unwrap();

        let ctx = SessionContext::new();
        let stats = reshard(&ctx, &source_csv, &shard_dir).await.unwrap();

        assert_eq!(stats.markers_removed, 2);
        for entry in std::fs::read_dir(&shard_dir).unwrap() {
            let name = entry.unwrap().file_name();
            let name = name.to_string_lossy();
            assert!(!name.starts_with(".part"), "marker left behind: {name}");
            assert!(!name.starts_with("._SUCCESS"), "marker left behind: {name}");
        }
    }

    #[tokio::test]
    async fn test_reshard_missing_source_fails() {
        let temp_dir = TempDir::new().unwrap();
        let source_csv = temp_dir.path().join("ml-25m/movies.csv");
        let shard_dir = temp_dir.path().join("input");

        let ctx = SessionContext::new();
        let result = reshard(&ctx, &source_csv, &shard_dir).await;
        assert!(matches!(result, Err(ReshardError::HeaderRead { .. })));
    }

    #[test]
    fn test_verify_row_count() {
        verify_row_count(9, 9).unwrap();

        let err = verify_row_count(9, 8).unwrap_err();
        assert!(matches!(
            err,
            ReshardError::RowCountMismatch {
                expected: 9,
                actual: 8,
            }
        ));
    }

    #[test]
    fn test_row_count_mismatch_keeps_source_dir() {
        let temp_dir = TempDir::new().unwrap();
        seed_source(temp_dir.path());

        // The verification gate sits between the shard write and the
        // destructive cleanup, so a mismatch must leave the source alone.
        let result = verify_row_count(9, 8);
        assert!(result.is_err());
        assert!(temp_dir.path().join("ml-25m/movies.csv").exists());
    }

    #[tokio::test]
    async fn test_write_shards_rejects_unexpected_partitioning() {
        let temp_dir = TempDir::new().unwrap();
        let source_csv = seed_source(temp_dir.path());
        let shard_dir = temp_dir.path().join("input");
        std::fs::create_dir_all(&shard_dir).unwrap();

        let ctx = SessionContext::new();
        let df = ctx
            .read_csv(
                source_csv.to_string_lossy().as_ref(),
                CsvReadOptions::new().has_header(true),
            )
            .await
            .unwrap();
        let df = df.repartition(Partitioning::RoundRobinBatch(3)).unwrap();

        let result = write_shards(df, &shard_dir).await;
        assert!(matches!(
            result,
            Err(ReshardError::PartitionCountMismatch {
                expected: 5,
                actual: 3,
            })
        ));

        // No shard files were written past the guard
        assert_eq!(std::fs::read_dir(&shard_dir).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_remove_source_dir_absent_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let gone = temp_dir.path().join("ml-25m");

        remove_source_dir(&gone).await.unwrap();
        remove_source_dir(&gone).await.unwrap();
    }

    #[test]
    fn test_empty_source_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let source_csv = temp_dir.path().join("movies.csv");
        std::fs::write(&source_csv, "").unwrap();

        let result = read_header(&source_csv);
        assert!(matches!(result, Err(ReshardError::EmptyHeader { .. })));
    }
}
