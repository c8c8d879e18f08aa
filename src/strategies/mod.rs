//! Retrieval strategies
//!
//! A strategy fetches one URL into a local file and reports success as a
//! boolean; nothing that goes wrong inside a download escapes
//! [`Fetcher::download`].
//!
//! ## Key Components
//!
//! - [`Fetcher`] - strategy trait
//! - [`StreamFetcher`] - chunked copy from a [`StreamTransport`] (`http`, `https`, `ftp`)
//! - [`SchemeRouter`] - picks [`HttpTransport`] or [`FtpTransport`] by scheme
//! - [`ObjectFetcher`] - bucket/key download through an [`ObjectStoreSession`] (`s3`)
//! - [`Backends`] - the external capabilities strategies are built against

mod credentials;
mod destination;
mod ftp;
mod object;
mod stream;
mod traits;
mod transport;

use std::sync::Arc;

pub use credentials::{
    AwsProfileResolver, CredentialResolver, DEFAULT_PROFILE, ObjectStoreSession, ProfileCredentials,
};
pub use destination::{OutputDir, copy_chunked, file_name};
pub use ftp::{FtpConfig, FtpTransport};
pub use object::{ObjectFetcher, locate};
pub use stream::StreamFetcher;
pub use traits::{FetchError, Fetched, Fetcher};
pub use transport::{ByteReader, HttpConfig, HttpTransport, SchemeRouter, StreamTransport, TransportError};

/// Transport and credential capabilities shared by every worker
#[derive(Clone)]
pub struct Backends {
    pub transport: Arc<dyn StreamTransport>,
    pub credentials: Arc<dyn CredentialResolver>,
}

impl Backends {
    pub fn new(transport: Arc<dyn StreamTransport>, credentials: Arc<dyn CredentialResolver>) -> Self {
        Self {
            transport,
            credentials,
        }
    }

    /// reqwest for `http`/`https`, the FTP client for `ftp`, AWS profile
    /// resolution for object stores
    pub fn standard(http: HttpConfig, ftp: FtpConfig) -> Result<Self, TransportError> {
        Ok(Self::new(
            Arc::new(SchemeRouter::standard(http, ftp)?),
            Arc::new(AwsProfileResolver::from_env()),
        ))
    }
}
