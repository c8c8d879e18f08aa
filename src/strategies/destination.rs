//! Local destination naming and the chunked copy loop shared by strategies

use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use super::traits::{FetchError, Fetched};
use super::transport::TransportError;

/// Directory downloads are written into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDir(PathBuf);

impl OutputDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self(dir.into())
    }

    /// Destination path for `url`: the output directory joined with the
    /// final segment of the URL path
    pub fn path_for(&self, url: &Url) -> Result<PathBuf, FetchError> {
        Ok(self.0.join(file_name(url)?))
    }
}

impl Default for OutputDir {
    fn default() -> Self {
        Self::new(".")
    }
}

/// Final non-empty path segment of `url`, as it appears in the URL
pub fn file_name(url: &Url) -> Result<&str, FetchError> {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();

    match segment {
        "" => Err(FetchError::invalid_url(url, "no file name in path")),
        "." | ".." => Err(FetchError::invalid_url(url, "path ends in a relative segment")),
        name => Ok(name),
    }
}

/// Copy `reader` into `path`, reading at most `chunk` bytes at a time and
/// writing each chunk before reading the next.
///
/// Bytes land in a hidden sibling file that is renamed over `path` once the
/// copy is complete. A failed copy removes only its own sibling, so an
/// earlier download already at `path` is left alone.
pub async fn copy_chunked<R>(reader: &mut R, path: &Path, chunk: usize) -> Result<Fetched, FetchError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let partial = partial_path(path);

    let mut file = File::create(&partial).await.map_err(|source| FetchError::LocalIo {
        path: partial.clone(),
        source,
    })?;
    let result = copy_into(reader, &mut file, chunk.max(1), &partial).await;
    drop(file);

    let result = match result {
        Ok(bytes) => tokio::fs::rename(&partial, path)
            .await
            .map(|()| Fetched {
                path: path.to_path_buf(),
                bytes,
            })
            .map_err(|source| FetchError::LocalIo {
                path: path.to_path_buf(),
                source,
            }),
        Err(e) => Err(e),
    };

    if result.is_err() {
        if let Err(e) = tokio::fs::remove_file(&partial).await {
            warn!(path = %partial.display(), error = %e, "Failed to remove partial download");
        }
    }

    result
}

/// `dir/.name.<id>.part` next to `path`, unique per call
fn partial_path(path: &Path) -> PathBuf {
    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    path.with_file_name(format!(".{name}.{}.part", Uuid::now_v7().simple()))
}

async fn copy_into<R>(reader: &mut R, file: &mut File, chunk: usize, path: &Path) -> Result<u64, FetchError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let local_io = |source| FetchError::LocalIo {
        path: path.to_path_buf(),
        source,
    };

    let mut buf = vec![0u8; chunk];
    let mut bytes = 0u64;

    loop {
        let n = reader
            .read(&mut buf)
            .await
            .map_err(|e| FetchError::Transport(TransportError::Read(e)))?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).await.map_err(local_io)?;
        bytes += n as u64;
    }

    file.flush().await.map_err(local_io)?;
    debug!(path = %path.display(), bytes, "Copy finished");

    Ok(bytes)
}
