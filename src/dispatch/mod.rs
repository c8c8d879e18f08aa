//! Scheme dispatch: the strategy registry and parameter projection
//!
//! A worker resolves a URL in three steps:
//!
//! ```rust,ignore
//! let descriptor = registry.lookup(url.scheme())?;
//! let params = project(&global, descriptor.parameters);
//! let fetcher = descriptor.kind.build(params, &backends)?;
//! ```

mod params;
mod registry;

pub use params::{DEFAULT_CHUNK, GlobalParameters, ObjectParams, StreamParams, project};
pub use registry::{BuildError, RegistryError, StrategyDescriptor, StrategyKind, StrategyRegistry};
