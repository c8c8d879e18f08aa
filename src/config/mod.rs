//! Configuration management for fetchpool
//!
//! Settings are layered, lowest priority first:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (`FETCHPOOL__<KEY>`, also read from `.env`)
//! 4. Command-line flags ([`Overrides`])
//!
//! # Usage
//!
//! ```no_run
//! use fetchpool::config::{Overrides, Settings};
//!
//! let settings = Settings::load(None, Overrides::default()).expect("Failed to load configuration");
//! println!("Running {} workers", settings.workers);
//! ```
//!
//! # Configuration File
//!
//! By default, settings are read from `config/fetchpool.toml` when present.
//! This can be overridden using the `FETCHPOOL_CONFIG` environment variable
//! or the `--config` flag.

mod models;
mod sources;
mod validation;

pub use crate::humanize::ByteSize;
pub use models::{Overrides, Settings};
pub use validation::ValidationError;

use crate::dispatch::GlobalParameters;
use serde_json::Value;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Settings {
    /// Load from file and environment, apply `overrides`, then validate
    pub fn load(config_path: Option<&Path>, overrides: Overrides) -> Result<Self, ConfigError> {
        let mut settings = sources::load(config_path)?;
        settings.apply(overrides);
        validation::validate(&settings)?;
        Ok(settings)
    }

    /// Load from a specific file (plus environment) without overrides
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let settings = sources::load_from_sources(path)?;
        validation::validate(&settings)?;
        Ok(settings)
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(profile) = overrides.profile {
            self.profile = profile;
        }
        if let Some(chunk) = overrides.chunk {
            self.chunk = chunk;
        }
        if let Some(workers) = overrides.workers {
            self.workers = workers;
        }
        if let Some(output_dir) = overrides.output_dir {
            self.output_dir = output_dir;
        }
    }

    /// Option values strategies may declare, keyed by parameter name
    pub fn global_parameters(&self) -> GlobalParameters {
        let mut params = GlobalParameters::new();
        params.insert("profile".to_string(), Value::from(self.profile.clone()));
        params.insert("chunk".to_string(), Value::from(self.chunk.as_u64()));
        params.insert(
            "output_dir".to_string(),
            Value::from(self.output_dir.to_string_lossy().into_owned()),
        );
        params
    }
}
