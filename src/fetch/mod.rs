//! Archive fetcher.
//!
//! Downloads a remote zip archive, buffers it in memory, and extracts it
//! into a fresh destination directory. Any pre-existing content at the
//! destination path is removed first, so repeated runs never accumulate
//! stale files.

use bytes::Bytes;
use snafu::prelude::*;
use snafu::IntoError;
use std::io::Cursor;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

use crate::error::{
    ArchiveSnafu, ClearDestinationSnafu, CreateDestinationSnafu, ExtractJoinSnafu, FetchError,
    RequestSnafu,
};

/// Download a zip archive from `url` and extract it into `destination`.
///
/// The destination is cleared first: a stale directory is removed
/// recursively, and a stray plain file at that path is removed the same
/// way. Failures propagate; there is no retry and no configured timeout.
pub async fn fetch_and_extract(url: &str, destination: &Path) -> Result<(), FetchError> {
    info!("Downloading {}", url);
    let start = Instant::now();

    let body = reqwest::get(url)
        .await
        .context(RequestSnafu { url })?
        .error_for_status()
        .context(RequestSnafu { url })?
        .bytes()
        .await
        .context(RequestSnafu { url })?;

    debug!(
        "Downloaded {} bytes in {:?}",
        body.len(),
        start.elapsed()
    );

    clear_destination(destination).await?;
    tokio::fs::create_dir_all(destination)
        .await
        .context(CreateDestinationSnafu {
            path: destination.display().to_string(),
        })?;

    // Zip extraction is CPU and filesystem bound, so it runs on the
    // blocking thread pool.
    let dest = destination.to_path_buf();
    tokio::task::spawn_blocking(move || extract_archive(body, &dest))
        .await
        .context(ExtractJoinSnafu)??;

    info!("Extracted archive into {}", destination.display());
    Ok(())
}

/// Extract every entry of the in-memory zip archive into `destination`.
fn extract_archive(body: Bytes, destination: &Path) -> Result<(), FetchError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(body)).context(ArchiveSnafu)?;
    archive.extract(destination).context(ArchiveSnafu)?;
    Ok(())
}

/// Remove whatever currently occupies the destination path.
async fn clear_destination(path: &Path) -> Result<(), FetchError> {
    let context = ClearDestinationSnafu {
        path: path.display().to_string(),
    };
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => {
            debug!("Removing stale directory {}", path.display());
            tokio::fs::remove_dir_all(path).await.context(context)
        }
        Ok(_) => {
            debug!("Removing stray file {}", path.display());
            tokio::fs::remove_file(path).await.context(context)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(context.into_error(source)),
    }
}
