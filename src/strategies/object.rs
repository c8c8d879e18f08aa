//! Object-store strategy for `s3://bucket/key` URLs

use async_trait::async_trait;
use futures::TryStreamExt;
use object_store::ObjectStore;
use object_store::path::Path as ObjectPath;
use std::sync::Arc;
use tokio_util::io::StreamReader;
use tracing::info;
use url::Url;

use super::credentials::{CredentialResolver, ObjectStoreSession};
use super::destination::{OutputDir, copy_chunked};
use super::traits::{FetchError, Fetched, Fetcher};

/// Read size used when copying an object payload to disk
const OBJECT_COPY_CHUNK: usize = 64 * 1024;

/// Fetches `bucket/key` objects through a session bound to one profile
pub struct ObjectFetcher {
    session: Arc<dyn ObjectStoreSession>,
    output: OutputDir,
}

impl ObjectFetcher {
    /// Resolve a session for `profile`; an empty profile means the default
    /// credential chain
    pub fn new(credentials: &dyn CredentialResolver, profile: Option<&str>, output: OutputDir) -> Self {
        let profile = profile.filter(|p| !p.is_empty());
        Self {
            session: credentials.session(profile),
            output,
        }
    }
}

/// Split an object URL into its bucket (authority) and key (path without
/// the leading separator)
pub fn locate(url: &Url) -> Result<(String, ObjectPath), FetchError> {
    let bucket = url
        .host_str()
        .filter(|b| !b.is_empty())
        .ok_or_else(|| FetchError::invalid_url(url, "missing bucket"))?;

    let raw_key = url.path().strip_prefix('/').unwrap_or(url.path());
    if raw_key.is_empty() {
        return Err(FetchError::invalid_url(url, "missing object key"));
    }

    let key = ObjectPath::from_url_path(raw_key).map_err(|e| FetchError::invalid_url(url, e.to_string()))?;

    Ok((bucket.to_string(), key))
}

#[async_trait]
impl Fetcher for ObjectFetcher {
    fn name(&self) -> &'static str {
        "object"
    }

    async fn fetch(&self, url: &Url) -> Result<Fetched, FetchError> {
        let (bucket, key) = locate(url)?;
        let path = self.output.path_for(url)?;

        info!(bucket = %bucket, key = %key, "downloading");

        let store = self.session.bucket(&bucket)?;
        let object = store.get(&key).await?;

        let body = object.into_stream().map_err(std::io::Error::other);
        let mut reader = StreamReader::new(body);
        copy_chunked(&mut reader, &path, OBJECT_COPY_CHUNK).await
    }
}
