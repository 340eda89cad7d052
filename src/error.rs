//! Errors raised while resolving names and assets during rendering.

use thiserror::Error;

/// Resolution failures. Fatal during a build, a 500 while serving.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Missing asset {0}")]
    UnknownAsset(String),

    #[error("Missing digest for {0}")]
    MissingDigest(String),

    #[error("Unresolved reference `{0}`")]
    Unresolved(String),

    #[error("File '{0}' of type '{1}' can't be included as text")]
    UnsupportedInclude(String, String),
}

/// Lifecycle errors of the builder itself.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AppError {
    #[error("VizBuilder configuration incomplete!")]
    NotConfigured,

    /// An earlier `configure` call failed; the site is left unconfigured.
    #[error("VizBuilder configuration failed: {0}")]
    ConfigureFailed(String),
}
