//! Stream transport: opens a URL for reading

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;
use tracing::debug;
use url::Url;

use super::ftp::{FtpConfig, FtpTransport};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("scheme '{0}' is not supported by this transport")]
    UnsupportedScheme(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("FTP {command} rejected with {code}: {message}")]
    FtpReply { command: String, code: u16, message: String },

    #[error("read failed: {0}")]
    Read(#[source] std::io::Error),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Readable byte stream handed out by a transport
pub type ByteReader = Box<dyn AsyncRead + Send + Unpin>;

/// Open-URL-for-reading capability used by the generic stream strategy
#[async_trait]
pub trait StreamTransport: Send + Sync {
    async fn open(&self, url: &Url) -> Result<ByteReader, TransportError>;
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub user_agent: String,
    pub max_redirects: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            user_agent: concat!("fetchpool/", env!("CARGO_PKG_VERSION")).to_string(),
            max_redirects: 10,
        }
    }
}

/// reqwest-backed transport for `http` and `https`
///
/// The body is exposed as a stream; nothing is buffered beyond what the
/// reader asks for. Other schemes (e.g. `ftp`) are refused with
/// [`TransportError::UnsupportedScheme`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: HttpConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(TransportError::Client)?;

        Ok(Self { client })
    }
}

#[async_trait]
impl StreamTransport for HttpTransport {
    async fn open(&self, url: &Url) -> Result<ByteReader, TransportError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(TransportError::UnsupportedScheme(url.scheme().to_string()));
        }

        debug!(%url, "Opening stream");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| TransportError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes_stream().map_err(std::io::Error::other);
        Ok(Box::new(StreamReader::new(Box::pin(body))))
    }
}

/// Hands each URL to the transport registered for its scheme
#[derive(Clone, Default)]
pub struct SchemeRouter {
    routes: HashMap<String, Arc<dyn StreamTransport>>,
}

impl SchemeRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `scheme` to `transport`, replacing any earlier route
    pub fn route(mut self, scheme: &str, transport: Arc<dyn StreamTransport>) -> Self {
        self.routes.insert(scheme.to_string(), transport);
        self
    }

    /// reqwest for `http`/`https`, the FTP client for `ftp`
    pub fn standard(http: HttpConfig, ftp: FtpConfig) -> Result<Self, TransportError> {
        let http: Arc<dyn StreamTransport> = Arc::new(HttpTransport::new(http)?);
        Ok(Self::new()
            .route("http", Arc::clone(&http))
            .route("https", http)
            .route("ftp", Arc::new(FtpTransport::new(ftp))))
    }
}

#[async_trait]
impl StreamTransport for SchemeRouter {
    async fn open(&self, url: &Url) -> Result<ByteReader, TransportError> {
        match self.routes.get(url.scheme()) {
            Some(transport) => transport.open(url).await,
            None => Err(TransportError::UnsupportedScheme(url.scheme().to_string())),
        }
    }
}
