use super::models::Settings;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("chunk size must be positive")]
    ZeroChunk,

    #[error("worker count must be positive")]
    ZeroWorkers,
}

/// Validate the loaded settings
pub fn validate(settings: &Settings) -> Result<(), ValidationError> {
    if settings.chunk.is_zero() {
        return Err(ValidationError::ZeroChunk);
    }
    if settings.workers == 0 {
        return Err(ValidationError::ZeroWorkers);
    }
    Ok(())
}
