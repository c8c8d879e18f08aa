use crate::humanize::ByteSize;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Run settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    /// Credential profile for object-store downloads; empty means the
    /// environment credential chain
    #[serde(default = "default_profile")]
    pub profile: String,
    /// Read size for stream downloads
    #[serde(default = "default_chunk")]
    pub chunk: ByteSize,
    /// Number of concurrent workers
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Directory downloaded files are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            chunk: default_chunk(),
            workers: default_workers(),
            output_dir: default_output_dir(),
        }
    }
}

/// Values given on the command line; `None` keeps the loaded value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub profile: Option<String>,
    pub chunk: Option<ByteSize>,
    pub workers: Option<usize>,
    pub output_dir: Option<PathBuf>,
}

fn default_profile() -> String {
    crate::strategies::DEFAULT_PROFILE.to_string()
}

fn default_chunk() -> ByteSize {
    crate::dispatch::DEFAULT_CHUNK
}

fn default_workers() -> usize {
    8
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();

        assert_eq!(settings.profile, "default");
        assert_eq!(settings.chunk.as_u64(), 1024);
        assert_eq!(settings.workers, 8);
        assert_eq!(settings.output_dir, PathBuf::from("."));
    }
}
