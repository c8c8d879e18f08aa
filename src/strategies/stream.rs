//! Generic stream strategy for `http`, `https` and `ftp`

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;
use url::Url;

use super::destination::{OutputDir, copy_chunked};
use super::traits::{FetchError, Fetched, Fetcher};
use super::transport::StreamTransport;

/// Fetches by opening a byte stream and copying it in `chunk`-sized reads
pub struct StreamFetcher {
    transport: Arc<dyn StreamTransport>,
    chunk: usize,
    output: OutputDir,
}

impl StreamFetcher {
    pub fn new(transport: Arc<dyn StreamTransport>, chunk: usize, output: OutputDir) -> Self {
        Self {
            transport,
            chunk,
            output,
        }
    }
}

#[async_trait]
impl Fetcher for StreamFetcher {
    fn name(&self) -> &'static str {
        "stream"
    }

    async fn fetch(&self, url: &Url) -> Result<Fetched, FetchError> {
        let path = self.output.path_for(url)?;

        // Open first: an unreachable resource must not leave an empty file.
        let mut reader = self.transport.open(url).await?;

        info!(%url, "downloading");
        copy_chunked(&mut reader, &path, self.chunk).await
    }
}
