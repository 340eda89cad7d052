//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors. All of these are fatal to the caller.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config file parsing error")]
    Toml(#[from] toml::de::Error),

    #[error("Config validation error: {0}")]
    Validation(String),

    #[error("Invalid helper registration: {0}")]
    InvalidHelper(String),

    #[error("Page '{0}' missing one of required attributes: 'template', 'json', 'file'")]
    MissingSource(String),

    #[error("Page '{0}' declares more than one source attribute: {1}")]
    AmbiguousSource(String, String),

    #[error("Page '{0}' is invalid: {1}")]
    InvalidPage(String, String),
}
