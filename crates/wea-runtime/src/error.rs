//! Runtime error types.

use thiserror::Error;
use wea_core::ConfigurationError;

pub use crate::config::error::{ConfigError, ConfigResult};

/// Errors that can occur while building or running the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The runtime was assembled incorrectly.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
