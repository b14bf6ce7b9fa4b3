//! Marker file cleanup.
//!
//! Engines that write multi-file datasets leave auxiliary entries next to
//! the data files: partial-write markers and a success flag. Those are not
//! part of the logical dataset and are removed after the shard set is
//! written. Cleanup is an in-process directory listing with explicit
//! per-entry deletion; no shell is involved.

use snafu::prelude::*;
use std::path::Path;
use tracing::debug;

use crate::error::{MarkerCleanupSnafu, ReshardError};

/// Name prefixes that identify marker entries.
const MARKER_PREFIXES: &[&str] = &[".part", "._SUCCESS"];

/// Remove marker entries from `dir`, returning how many were deleted.
///
/// Safe to re-run: a directory with no markers left is a no-op.
pub async fn remove_marker_files(dir: &Path) -> Result<usize, ReshardError> {
    let mut removed = 0;

    let mut entries = tokio::fs::read_dir(dir).await.context(MarkerCleanupSnafu)?;
    while let Some(entry) = entries.next_entry().await.context(MarkerCleanupSnafu)? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !MARKER_PREFIXES.iter().any(|p| name.starts_with(p)) {
            continue;
        }

        let path = entry.path();
        let file_type = entry.file_type().await.context(MarkerCleanupSnafu)?;
        if file_type.is_dir() {
            tokio::fs::remove_dir_all(&path)
                .await
                .context(MarkerCleanupSnafu)?;
        } else {
            tokio::fs::remove_file(&path)
                .await
                .context(MarkerCleanupSnafu)?;
        }
        debug!("Removed marker entry {}", path.display());
        removed += 1;
    }

    Ok(removed)
}
