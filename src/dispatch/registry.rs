use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use super::params::{GlobalParameters, ObjectParams, StreamParams};
use crate::strategies::{Backends, Fetcher, ObjectFetcher, OutputDir, StreamFetcher};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no downloader handles the protocol '{0}'")]
    UnsupportedScheme(String),
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid parameters for {kind} strategy: {source}")]
    InvalidParameters {
        kind: StrategyKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("chunk size must be positive")]
    ZeroChunk,
}

/// Strategy variants a scheme can be dispatched to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StrategyKind {
    /// Chunked byte stream (`http`, `https`, `ftp`)
    Stream,
    /// Bucket/key object download (`s3`)
    Object,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream => f.write_str("stream"),
            Self::Object => f.write_str("object"),
        }
    }
}

impl StrategyKind {
    /// Construct a strategy from an already projected parameter set
    pub fn build(&self, params: GlobalParameters, backends: &Backends) -> Result<Arc<dyn Fetcher>, BuildError> {
        let invalid = |source| BuildError::InvalidParameters { kind: *self, source };

        match self {
            Self::Stream => {
                let params: StreamParams = serde_json::from_value(Value::Object(params)).map_err(invalid)?;
                if params.chunk.is_zero() {
                    return Err(BuildError::ZeroChunk);
                }
                Ok(Arc::new(StreamFetcher::new(
                    Arc::clone(&backends.transport),
                    params.chunk.as_usize(),
                    OutputDir::new(params.output_dir),
                )))
            }
            Self::Object => {
                let params: ObjectParams = serde_json::from_value(Value::Object(params)).map_err(invalid)?;
                Ok(Arc::new(ObjectFetcher::new(
                    backends.credentials.as_ref(),
                    params.profile.as_deref(),
                    OutputDir::new(params.output_dir),
                )))
            }
        }
    }
}

const STREAM_PARAMETERS: &[&str] = &["chunk", "output_dir"];
const OBJECT_PARAMETERS: &[&str] = &["profile", "output_dir"];

/// Scheme → (strategy variant, declared parameter names)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyDescriptor {
    pub scheme: &'static str,
    pub kind: StrategyKind,
    pub parameters: &'static [&'static str],
}

const BUILTIN: &[StrategyDescriptor] = &[
    StrategyDescriptor {
        scheme: "s3",
        kind: StrategyKind::Object,
        parameters: OBJECT_PARAMETERS,
    },
    StrategyDescriptor {
        scheme: "http",
        kind: StrategyKind::Stream,
        parameters: STREAM_PARAMETERS,
    },
    StrategyDescriptor {
        scheme: "https",
        kind: StrategyKind::Stream,
        parameters: STREAM_PARAMETERS,
    },
    StrategyDescriptor {
        scheme: "ftp",
        kind: StrategyKind::Stream,
        parameters: STREAM_PARAMETERS,
    },
];

/// Lookup table from URL scheme to strategy descriptor
///
/// Filled before any worker starts and only read afterwards; lookups match
/// the scheme exactly, without case folding.
#[derive(Debug, Clone)]
pub struct StrategyRegistry {
    descriptors: BTreeMap<&'static str, StrategyDescriptor>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self {
            descriptors: BTreeMap::new(),
        }
    }

    /// Registry with the built-in `s3`, `http`, `https` and `ftp` entries
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for descriptor in BUILTIN {
            registry.register(*descriptor);
        }
        registry
    }

    /// Add or replace the descriptor for `descriptor.scheme`
    pub fn register(&mut self, descriptor: StrategyDescriptor) {
        self.descriptors.insert(descriptor.scheme, descriptor);
    }

    pub fn lookup(&self, scheme: &str) -> Result<&StrategyDescriptor, RegistryError> {
        self.descriptors
            .get(scheme)
            .ok_or_else(|| RegistryError::UnsupportedScheme(scheme.to_string()))
    }

    pub fn schemes(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.descriptors.keys().copied()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
