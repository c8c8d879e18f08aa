use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use super::transport::TransportError;

/// Why a single download did not produce a file
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("object store error: {0}")]
    Remote(#[from] object_store::Error),

    #[error("cannot write {}: {source}", path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl FetchError {
    pub(crate) fn invalid_url(url: &Url, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}

/// A completed download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Protocol-specific retrieval strategy
///
/// Implementors provide [`Fetcher::fetch`]; callers use [`Fetcher::download`],
/// which never fails: every error is logged and reported as `false`.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Short strategy name used in log lines
    fn name(&self) -> &'static str;

    /// Fetch `url` into a local file
    async fn fetch(&self, url: &Url) -> Result<Fetched, FetchError>;

    /// Fetch `url`, logging the outcome
    async fn download(&self, url: &Url) -> bool {
        match self.fetch(url).await {
            Ok(fetched) => {
                info!(
                    strategy = self.name(),
                    %url,
                    path = %fetched.path.display(),
                    bytes = fetched.bytes,
                    "downloaded"
                );
                true
            }
            Err(FetchError::Remote(err)) => {
                error!(strategy = self.name(), %url, detail = ?err, "Error downloading: {err}");
                false
            }
            Err(err) => {
                error!(strategy = self.name(), %url, error = %err, "Error downloading");
                false
            }
        }
    }
}
